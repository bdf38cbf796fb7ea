use serde::Serialize;
use tracing::debug;

use crate::{
    coordination::{
        SharedGuard,
        Turnstile,
    },
    document::Document,
    engine::SnapshotView,
    error::Result,
    query::{
        PageRequest,
        Predicate,
        Query,
    },
    snapshot::{
        Snapshot,
        SnapshotProvider,
    },
};

/// One page of resolved documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub documents: Vec<Document>,
    /// Matches in the whole snapshot, not just this page.
    pub total_matches: usize,
    /// Generation of the snapshot the page was read from.
    pub generation: u64,
}

/// Runs queries against whatever snapshot is current.
pub struct QueryExecutor<'a, S> {
    provider: &'a SnapshotProvider<S>,
    turnstile: &'a Turnstile,
}

impl<'a, S: SnapshotView> QueryExecutor<'a, S> {
    /// Reads are admitted through `turnstile`, the same one writers to
    /// `provider` go through.
    pub fn new(
        provider: &'a SnapshotProvider<S>,
        turnstile: &'a Turnstile,
    ) -> Self {
        Self {
            provider,
            turnstile,
        }
    }

    /// Requires shared admission, held until this returns.
    ///
    /// # Panics
    ///
    /// If `access` was issued by another turnstile.
    pub fn search(
        &self,
        access: &SharedGuard<'_>,
        query: &Query,
        page: PageRequest,
    ) -> Result<SearchPage> {
        self.check(access);
        search_snapshot(&self.provider.current(), query, page)
    }

    pub fn count(
        &self,
        access: &SharedGuard<'_>,
        predicate: &Predicate,
    ) -> Result<usize> {
        self.check(access);
        self.provider.current().count(predicate)
    }

    fn check(&self, access: &SharedGuard<'_>) {
        assert!(
            access.issued_by(self.turnstile),
            "shared guard was issued by a different turnstile"
        );
    }
}

/// Fetch the ranked hits needed to cover `page` and resolve the ones on
/// it.
///
/// Only the top `page * page_size` hits are retrieved, so that product
/// caps how deep pagination can reach.
pub fn search_snapshot<S: SnapshotView>(
    snapshot: &Snapshot<S>,
    query: &Query,
    page: PageRequest,
) -> Result<SearchPage> {
    let ranked = snapshot.matches(
        &query.predicate,
        query.sort.as_ref(),
        page.retrieval_limit(),
    )?;

    let bounds = page.bounds(ranked.total_matches.min(ranked.hits.len()));
    let mut documents = Vec::with_capacity(bounds.len());
    for hit in &ranked.hits[bounds] {
        documents.push(snapshot.resolve(hit)?);
    }

    debug!(
        page = page.page(),
        page_size = page.page_size(),
        total = ranked.total_matches,
        returned = documents.len(),
        generation = snapshot.generation(),
        "search"
    );
    Ok(SearchPage {
        documents,
        total_matches: ranked.total_matches,
        generation: snapshot.generation(),
    })
}
