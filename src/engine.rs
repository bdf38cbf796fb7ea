//! The capabilities the coordination layer needs from a search engine.
//!
//! The gateway, snapshot provider and executor only talk to the engine
//! through these two traits; [`crate::tantivy_index`] provides the
//! implementation used in practice.

use crate::{
    document::Document,
    error::Result,
    query::{
        Predicate,
        SortSpec,
    },
};

/// The single write handle of an index.
///
/// Writes are buffered until [`commit`](Self::commit) and are invisible
/// to snapshots opened before it. [`rollback`](Self::rollback) drops
/// everything since the last commit.
pub trait IndexWriteHandle: Send {
    type Snapshot: SnapshotView;

    /// Delete every document whose id field equals `id`.
    fn delete(&mut self, id: &str) -> Result<()>;

    /// Append a document. Does not remove earlier documents with the same
    /// id.
    fn add(&mut self, doc: &Document) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Open a read-only view of everything committed so far.
    fn open_snapshot(&self) -> Result<Self::Snapshot>;
}

/// Matching hits in rank order, plus how many documents matched in total.
#[derive(Debug, Clone)]
pub struct RankedHits<H> {
    pub hits: Vec<H>,
    pub total_matches: usize,
}

impl<H> RankedHits<H> {
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total_matches: 0,
        }
    }
}

/// An immutable point-in-time view of an index.
pub trait SnapshotView: Send + Sync + 'static {
    type Hit: Send;

    /// Return up to `limit` best hits for `predicate`, ordered by `sort`
    /// when given and by relevance otherwise.
    fn matches(
        &self,
        predicate: &Predicate,
        sort: Option<&SortSpec>,
        limit: usize,
    ) -> Result<RankedHits<Self::Hit>>;

    /// Number of documents matching `predicate`.
    fn count(&self, predicate: &Predicate) -> Result<usize>;

    /// Load the stored fields of a hit.
    fn resolve(&self, hit: &Self::Hit) -> Result<Document>;

    /// Number of live documents in the view.
    fn num_docs(&self) -> u64;
}
