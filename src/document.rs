use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::{
        Error,
        Result,
    },
    schema::{
        FieldKind,
        IndexSchema,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    U64(u64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::U64(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::U64(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::U64(value)
    }
}

/// An ordered list of named field values.
///
/// How each field is indexed and whether it is stored is decided by the
/// [`IndexSchema`], not by the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.push((name.to_string(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every field against the schema and return the document id.
    pub fn validate<'a>(&'a self, schema: &IndexSchema) -> Result<&'a str> {
        for (name, value) in &self.fields {
            let def = schema.field(name).ok_or_else(|| {
                Error::InvalidDocument(format!("unknown field '{name}'"))
            })?;
            let type_ok = match def.kind {
                FieldKind::Exact | FieldKind::Text => value.as_text().is_some(),
                FieldKind::U64 => value.as_u64().is_some(),
            };
            if !type_ok {
                return Err(Error::InvalidDocument(format!(
                    "field '{name}' has the wrong value type"
                )));
            }
        }

        let id = self.text(&schema.id_field).ok_or_else(|| {
            Error::InvalidDocument(format!(
                "missing id field '{}'",
                schema.id_field
            ))
        })?;
        if id.is_empty() {
            return Err(Error::InvalidDocument("id is empty".into()));
        }
        if self.fields.iter().filter(|(n, _)| *n == schema.id_field).count()
            > 1
        {
            return Err(Error::InvalidDocument(format!(
                "document has more than one '{}'",
                schema.id_field
            )));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document::new().with("id", id).with("title", "Hello").with("time", 7u64)
    }

    #[test]
    fn keeps_insertion_order() {
        let d = doc("1");
        let names: Vec<_> = d.fields().map(|(n, _)| n).collect();
        assert_eq!(names, ["id", "title", "time"]);
        assert_eq!(d.text("title"), Some("Hello"));
        assert_eq!(d.get("time").and_then(FieldValue::as_u64), Some(7));
    }

    #[test]
    fn validate_returns_id() {
        let schema = IndexSchema::default();
        assert_eq!(doc("42").validate(&schema).unwrap(), "42");
    }

    #[test]
    fn validate_rejects_missing_id() {
        let schema = IndexSchema::default();
        let d = Document::new().with("title", "orphan");
        assert!(matches!(d.validate(&schema), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn validate_rejects_unknown_field() {
        let schema = IndexSchema::default();
        let d = doc("1").with("colour", "red");
        assert!(d.validate(&schema).is_err());
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let schema = IndexSchema::default();
        let d = Document::new().with("id", "1").with("time", "yesterday");
        assert!(d.validate(&schema).is_err());
    }

    #[test]
    fn validate_rejects_repeated_id() {
        let schema = IndexSchema::default();
        let d = doc("1").with("id", "2");
        assert!(d.validate(&schema).is_err());
    }

    #[test]
    fn json_shape_is_plain() {
        let json = serde_json::to_string(&doc("1")).unwrap();
        assert_eq!(
            json,
            r#"{"fields":[["id","1"],["title","Hello"],["time",7]]}"#
        );
    }
}
