use serde::{
    Deserialize,
    Serialize,
};

use crate::error::{
    Error,
    Result,
};

/// Field names used by the default schema.
pub mod fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const STATUS: &str = "status";
    pub const TIME: &str = "time";
}

/// How a field's value is turned into index terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// The whole value is a single term.
    Exact,
    /// The value is analyzed into lowercased word tokens.
    Text,
    /// Unsigned integer, matched by equality or range.
    U64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub stored: bool,
    /// Keep a columnar copy so results can be ordered by this field.
    #[serde(default)]
    pub sortable: bool,
}

impl FieldDef {
    pub fn exact(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Exact,
            stored: true,
            sortable: false,
        }
    }

    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text,
            stored: true,
            sortable: false,
        }
    }

    pub fn u64(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::U64,
            stored: true,
            sortable: false,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn indexed_only(mut self) -> Self {
        self.stored = false;
        self
    }
}

/// The set of fields a document may carry, plus which one is its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub id_field: String,
    pub fields: Vec<FieldDef>,
}

impl Default for IndexSchema {
    /// `id`, `title`, `status` and `time`, all stored. `id` and `time`
    /// are sortable.
    fn default() -> Self {
        Self {
            id_field: fields::ID.to_string(),
            fields: vec![
                FieldDef::exact(fields::ID).sortable(),
                FieldDef::text(fields::TITLE),
                FieldDef::text(fields::STATUS),
                FieldDef::u64(fields::TIME).sortable(),
            ],
        }
    }
}

impl IndexSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the schema is usable: unique names, a stored exact id field,
    /// and no sortable text fields.
    pub fn validate(&self) -> Result<()> {
        for (i, def) in self.fields.iter().enumerate() {
            if def.name.is_empty() {
                return Err(Error::Config("field name is empty".into()));
            }
            if self.fields[..i].iter().any(|f| f.name == def.name) {
                return Err(Error::Config(format!(
                    "field '{}' is defined twice",
                    def.name
                )));
            }
            if def.sortable && def.kind == FieldKind::Text {
                return Err(Error::Config(format!(
                    "text field '{}' cannot be sortable",
                    def.name
                )));
            }
        }

        match self.field(&self.id_field) {
            Some(def) if def.kind == FieldKind::Exact && def.stored => Ok(()),
            Some(_) => Err(Error::Config(format!(
                "id field '{}' must be a stored exact field",
                self.id_field
            ))),
            None => Err(Error::Config(format!(
                "id field '{}' is not defined",
                self.id_field
            ))),
        }
    }
}
