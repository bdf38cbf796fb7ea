use std::{
    ops::Bound,
    path::Path,
    sync::Arc,
};

use tantivy::{
    DocAddress,
    Index,
    IndexReader,
    IndexWriter,
    Order,
    ReloadPolicy,
    Searcher,
    TantivyDocument,
    Term,
    collector::{
        Count,
        TopDocs,
    },
    directory::MmapDirectory,
    query::{
        AllQuery,
        BooleanQuery,
        EmptyQuery,
        Occur,
        Query,
        QueryParser,
        QueryParserError,
        RangeQuery,
        RegexQuery,
        TermQuery,
    },
    schema::{
        Field,
        IndexRecordOption,
        NumericOptions,
        Schema,
        TextFieldIndexing,
        TextOptions,
        Value,
    },
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        TextAnalyzer,
    },
};
use tracing::info;

use crate::{
    document::{
        Document,
        FieldValue,
    },
    engine::{
        IndexWriteHandle,
        RankedHits,
        SnapshotView,
    },
    error::{
        Error,
        Result,
    },
    query::{
        Clause,
        Occurrence,
        Predicate,
        SortOrder,
        SortSpec,
        wildcard_clauses,
    },
    schema::{
        FieldDef,
        FieldKind,
        IndexSchema,
    },
};

/// Name of the analyzer used for [`FieldKind::Text`] fields.
const TEXT_ANALYZER: &str = "snapdex_text";

/// Characters that must be escaped to appear literally in a term regex.
const REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
    '#', '&', '-', '~',
];

/// Our field definitions paired with their tantivy handles.
#[derive(Debug)]
struct Layout {
    schema: IndexSchema,
    fields: Vec<(FieldDef, Field)>,
    id: Field,
}

impl Layout {
    fn lookup(&self, name: &str) -> Option<&(FieldDef, Field)> {
        self.fields.iter().find(|(def, _)| def.name == name)
    }
}

fn build_schema(schema: &IndexSchema) -> Result<(Schema, Layout)> {
    schema.validate()?;
    let mut builder = Schema::builder();
    let mut fields = Vec::with_capacity(schema.fields.len());

    for def in &schema.fields {
        let field = match def.kind {
            FieldKind::Exact => {
                let mut opts = TextOptions::default().set_indexing_options(
                    TextFieldIndexing::default()
                        .set_tokenizer("raw")
                        .set_index_option(IndexRecordOption::Basic),
                );
                if def.stored {
                    opts = opts.set_stored();
                }
                if def.sortable {
                    opts = opts.set_fast(Some("raw"));
                }
                builder.add_text_field(&def.name, opts)
            }
            FieldKind::Text => {
                let mut opts = TextOptions::default().set_indexing_options(
                    TextFieldIndexing::default()
                        .set_tokenizer(TEXT_ANALYZER)
                        .set_index_option(
                            IndexRecordOption::WithFreqsAndPositions,
                        ),
                );
                if def.stored {
                    opts = opts.set_stored();
                }
                builder.add_text_field(&def.name, opts)
            }
            FieldKind::U64 => {
                let mut opts = NumericOptions::default().set_indexed();
                if def.stored {
                    opts = opts.set_stored();
                }
                if def.sortable {
                    opts = opts.set_fast();
                }
                builder.add_u64_field(&def.name, opts)
            }
        };
        fields.push((def.clone(), field));
    }

    let id = fields
        .iter()
        .find(|(def, _)| def.name == schema.id_field)
        .map(|(_, field)| *field)
        .ok_or_else(|| Error::Config("id field missing".into()))?;

    let layout = Layout {
        schema: schema.clone(),
        fields,
        id,
    };
    Ok((builder.build(), layout))
}

fn register_tokenizers(index: &Index) {
    let text = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(TEXT_ANALYZER, text);
}

/// Bring a query value into the form the field was indexed in.
fn normalize(def: &FieldDef, value: &str) -> String {
    match def.kind {
        FieldKind::Text => value.to_lowercase(),
        FieldKind::Exact | FieldKind::U64 => value.to_string(),
    }
}

/// Translate a `*`/`?` pattern into an anchored term regex.
fn wildcard_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            c if REGEX_META.contains(&c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    regex
}

/// A tantivy index laid out according to an [`IndexSchema`].
pub struct TantivyIndex {
    index: Index,
    layout: Arc<Layout>,
}

impl TantivyIndex {
    /// Open or create an index in the given directory.
    pub fn open(dir: &Path, schema: &IndexSchema) -> Result<Self> {
        let storage_err = |reason: String| Error::StorageOpen {
            path: dir.to_path_buf(),
            reason,
        };

        std::fs::create_dir_all(dir).map_err(|e| storage_err(e.to_string()))?;
        let (tantivy_schema, layout) = build_schema(schema)?;

        let mmap_dir =
            MmapDirectory::open(dir).map_err(|e| storage_err(e.to_string()))?;
        let index = Index::open_or_create(mmap_dir, tantivy_schema)
            .map_err(|e| storage_err(e.to_string()))?;
        register_tokenizers(&index);

        info!(path = %dir.display(), "opened index");
        Ok(Self {
            index,
            layout: Arc::new(layout),
        })
    }

    /// Create an in-memory index (for testing).
    pub fn open_in_ram(schema: &IndexSchema) -> Result<Self> {
        let (tantivy_schema, layout) = build_schema(schema)?;
        let index = Index::create_in_ram(tantivy_schema);
        register_tokenizers(&index);

        Ok(Self {
            index,
            layout: Arc::new(layout),
        })
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.layout.schema
    }

    /// Take the index's write lock with the given memory budget (in
    /// bytes). Only one writer may exist per index.
    pub fn writer(&self, memory_budget: usize) -> Result<TantivyWriter> {
        let writer: IndexWriter = self.index.writer(memory_budget)?;
        let reader: IndexReader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(TantivyWriter {
            writer,
            reader,
            index: self.index.clone(),
            layout: Arc::clone(&self.layout),
        })
    }
}

impl std::fmt::Debug for TantivyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyIndex").finish_non_exhaustive()
    }
}

pub struct TantivyWriter {
    writer: IndexWriter,
    reader: IndexReader,
    index: Index,
    layout: Arc<Layout>,
}

impl IndexWriteHandle for TantivyWriter {
    type Snapshot = TantivySnapshot;

    fn delete(&mut self, id: &str) -> Result<()> {
        let term = Term::from_field_text(self.layout.id, id);
        self.writer.delete_term(term);
        Ok(())
    }

    fn add(&mut self, doc: &Document) -> Result<()> {
        let mut out = TantivyDocument::default();
        for (name, value) in doc.fields() {
            let (_, field) = self.layout.lookup(name).ok_or_else(|| {
                Error::InvalidDocument(format!("unknown field '{name}'"))
            })?;
            match value {
                FieldValue::Text(text) => out.add_text(*field, text),
                FieldValue::U64(v) => out.add_u64(*field, *v),
            }
        }
        self.writer.add_document(out)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.writer.rollback()?;
        Ok(())
    }

    fn open_snapshot(&self) -> Result<TantivySnapshot> {
        self.reader.reload()?;
        Ok(TantivySnapshot {
            searcher: self.reader.searcher(),
            index: self.index.clone(),
            layout: Arc::clone(&self.layout),
        })
    }
}

/// A tantivy searcher pinned to one committed generation of the index.
///
/// The searcher holds its segments open, so files merged away by later
/// commits stay readable until the snapshot is dropped.
pub struct TantivySnapshot {
    searcher: Searcher,
    index: Index,
    layout: Arc<Layout>,
}

impl TantivySnapshot {
    fn compile(&self, predicate: &Predicate) -> Result<Box<dyn Query>> {
        let query: Box<dyn Query> = match predicate {
            Predicate::All => Box::new(AllQuery),
            Predicate::Term { field, value } => {
                match self.term(field, value) {
                    Some((term, def)) => Box::new(TermQuery::new(
                        term,
                        record_option(def),
                    )),
                    None => Box::new(EmptyQuery),
                }
            }
            Predicate::Wildcard { field, pattern } => {
                match self.layout.lookup(field) {
                    Some((def, f)) => wildcard_query(def, *f, pattern)?,
                    None => Box::new(EmptyQuery),
                }
            }
            Predicate::AnyOf { field, values } => {
                let clauses: Vec<(Occur, Box<dyn Query>)> = values
                    .iter()
                    .filter_map(|v| {
                        self.term(field, &FieldValue::Text(v.clone()))
                    })
                    .map(|(term, def)| {
                        let query: Box<dyn Query> =
                            Box::new(TermQuery::new(term, record_option(def)));
                        (Occur::Should, query)
                    })
                    .collect();
                if clauses.is_empty() {
                    Box::new(EmptyQuery)
                } else {
                    Box::new(BooleanQuery::new(clauses))
                }
            }
            Predicate::Range {
                field,
                lower,
                upper,
            } => {
                let bounds = self.layout.lookup(field).and_then(|(def, f)| {
                    Some((
                        bound_term(def, *f, lower)?,
                        bound_term(def, *f, upper)?,
                    ))
                });
                match bounds {
                    Some((lower, upper)) => {
                        Box::new(RangeQuery::new(lower, upper))
                    }
                    None => Box::new(EmptyQuery),
                }
            }
            Predicate::QueryString { text, .. } if text.trim().is_empty() => {
                Box::new(EmptyQuery)
            }
            Predicate::QueryString { field, text } => {
                match wildcard_clauses(text)? {
                    None => self.parse_text(field, text)?,
                    Some(clauses) => {
                        let mut parts = Vec::with_capacity(clauses.len());
                        for clause in &clauses {
                            parts.push((
                                tantivy_occur(clause.occur),
                                self.compile_clause(field, clause)?,
                            ));
                        }
                        Box::new(BooleanQuery::new(parts))
                    }
                }
            }
        };
        Ok(query)
    }

    /// Run the query parser with `default_field` for unqualified terms.
    ///
    /// An unknown default field matches nothing, but the text must still
    /// parse.
    fn parse_text(
        &self,
        default_field: &str,
        text: &str,
    ) -> Result<Box<dyn Query>> {
        let defaults: Vec<Field> = self
            .layout
            .lookup(default_field)
            .map(|(_, f)| vec![*f])
            .unwrap_or_default();
        let known = !defaults.is_empty();

        match QueryParser::for_index(&self.index, defaults).parse_query(text) {
            Ok(query) => Ok(query),
            Err(QueryParserError::NoDefaultFieldDeclared) if !known => {
                Ok(Box::new(EmptyQuery))
            }
            Err(e) => Err(Error::QuerySyntax(e.to_string())),
        }
    }

    fn compile_clause(
        &self,
        default_field: &str,
        clause: &Clause<'_>,
    ) -> Result<Box<dyn Query>> {
        if !clause.is_wildcard() {
            let text = match clause.field {
                Some(field) => format!("{field}:{}", clause.term),
                None => clause.term.to_string(),
            };
            return self.parse_text(default_field, &text);
        }

        let name = clause.field.unwrap_or(default_field);
        match self.layout.lookup(name) {
            Some((def, f)) => wildcard_query(def, *f, clause.term),
            // Same as the parser for a qualified term on a missing field.
            None if clause.field.is_some() => Err(Error::QuerySyntax(
                format!("field does not exist: '{name}'"),
            )),
            None => Ok(Box::new(EmptyQuery)),
        }
    }

    /// Resolve a field/value pair to an index term. `None` when the field
    /// is unknown or the value cannot occur in it.
    fn term(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> Option<(Term, &FieldDef)> {
        let (def, f) = self.layout.lookup(field)?;
        let term = value_term(def, *f, value)?;
        Some((term, def))
    }

    fn sort_field(&self, sort: &SortSpec) -> Result<&FieldDef> {
        match self.layout.lookup(&sort.field) {
            Some((def, _)) if def.sortable => Ok(def),
            _ => Err(Error::InvalidSort(sort.field.clone())),
        }
    }
}

fn wildcard_query(
    def: &FieldDef,
    field: Field,
    pattern: &str,
) -> Result<Box<dyn Query>> {
    if def.kind == FieldKind::U64 {
        return Ok(Box::new(EmptyQuery));
    }
    let regex = wildcard_regex(&normalize(def, pattern));
    let query = RegexQuery::from_pattern(&regex, field)
        .map_err(|e| Error::QuerySyntax(e.to_string()))?;
    Ok(Box::new(query))
}

fn tantivy_occur(occur: Occurrence) -> Occur {
    match occur {
        Occurrence::Should => Occur::Should,
        Occurrence::Must => Occur::Must,
        Occurrence::MustNot => Occur::MustNot,
    }
}

fn record_option(def: &FieldDef) -> IndexRecordOption {
    match def.kind {
        FieldKind::Text => IndexRecordOption::WithFreqs,
        FieldKind::Exact | FieldKind::U64 => IndexRecordOption::Basic,
    }
}

fn value_term(def: &FieldDef, field: Field, value: &FieldValue) -> Option<Term> {
    match (def.kind, value) {
        (FieldKind::U64, FieldValue::U64(v)) => {
            Some(Term::from_field_u64(field, *v))
        }
        (FieldKind::U64, FieldValue::Text(s)) => {
            s.trim().parse().ok().map(|v| Term::from_field_u64(field, v))
        }
        (_, FieldValue::Text(s)) => {
            Some(Term::from_field_text(field, &normalize(def, s)))
        }
        (_, FieldValue::U64(v)) => {
            Some(Term::from_field_text(field, &v.to_string()))
        }
    }
}

fn bound_term(
    def: &FieldDef,
    field: Field,
    bound: &Bound<FieldValue>,
) -> Option<Bound<Term>> {
    Some(match bound {
        Bound::Included(v) => Bound::Included(value_term(def, field, v)?),
        Bound::Excluded(v) => Bound::Excluded(value_term(def, field, v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

fn tantivy_order(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

impl SnapshotView for TantivySnapshot {
    type Hit = DocAddress;

    fn matches(
        &self,
        predicate: &Predicate,
        sort: Option<&SortSpec>,
        limit: usize,
    ) -> Result<RankedHits<DocAddress>> {
        let query = self.compile(predicate)?;
        let sort_def = sort.map(|s| self.sort_field(s)).transpose()?;

        // TopDocs preallocates for its limit, and cannot take zero.
        let limit = limit.min(self.searcher.num_docs() as usize);
        if limit == 0 {
            let total_matches = self.searcher.search(&*query, &Count)?;
            return Ok(RankedHits {
                hits: Vec::new(),
                total_matches,
            });
        }

        let top = TopDocs::with_limit(limit);
        let (hits, total_matches) = match (sort, sort_def) {
            (Some(sort), Some(def)) if def.kind == FieldKind::U64 => {
                let collector = top.order_by_fast_field::<u64>(
                    &sort.field,
                    tantivy_order(sort.order),
                );
                let (docs, total) =
                    self.searcher.search(&*query, &(collector, Count))?;
                (docs.into_iter().map(|(_, addr)| addr).collect(), total)
            }
            (Some(sort), Some(_)) => {
                let collector = top.order_by_string_fast_field(
                    &sort.field,
                    tantivy_order(sort.order),
                );
                let (docs, total) =
                    self.searcher.search(&*query, &(collector, Count))?;
                (docs.into_iter().map(|(_, addr)| addr).collect(), total)
            }
            _ => {
                let (docs, total) =
                    self.searcher.search(&*query, &(top, Count))?;
                (docs.into_iter().map(|(_, addr)| addr).collect(), total)
            }
        };

        Ok(RankedHits {
            hits,
            total_matches,
        })
    }

    fn count(&self, predicate: &Predicate) -> Result<usize> {
        let query = self.compile(predicate)?;
        Ok(self.searcher.search(&*query, &Count)?)
    }

    fn resolve(&self, hit: &DocAddress) -> Result<Document> {
        let stored: TantivyDocument = self.searcher.doc(*hit)?;
        let mut doc = Document::new();
        for (def, field) in self.layout.fields.iter().filter(|(d, _)| d.stored)
        {
            match def.kind {
                FieldKind::U64 => {
                    if let Some(v) = stored.get_first(*field).and_then(|v| v.as_u64())
                    {
                        doc.push(&def.name, v);
                    }
                }
                FieldKind::Exact | FieldKind::Text => {
                    if let Some(s) = stored.get_first(*field).and_then(|v| v.as_str())
                    {
                        doc.push(&def.name, s);
                    }
                }
            }
        }
        Ok(doc)
    }

    fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }
}
