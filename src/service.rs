//! The public face of the crate: one writer, one current snapshot, and the
//! turnstile that keeps them apart.

use std::{
    ops::Bound,
    path::Path,
    sync::Arc,
    time::Duration,
};

use tracing::info;

use crate::{
    config::ServiceConfig,
    coordination::{
        ExclusiveGuard,
        SharedGuard,
        Turnstile,
    },
    document::{
        Document,
        FieldValue,
    },
    engine::{
        IndexWriteHandle,
        SnapshotView,
    },
    error::{
        Error,
        Result,
    },
    executor::{
        QueryExecutor,
        SearchPage,
    },
    gateway::{
        BatchReceipt,
        MutationGateway,
        Operation,
    },
    query::{
        PageRequest,
        Predicate,
        Query,
        SortSpec,
    },
    schema::IndexSchema,
    snapshot::{
        Snapshot,
        SnapshotProvider,
    },
    tantivy_index::{
        TantivyIndex,
        TantivyWriter,
    },
};

/// Serves concurrent searches while applying writes.
///
/// Share it between threads with an `Arc`. A batch is visible to every
/// search that starts after [`apply_batch`](Self::apply_batch) returns; a
/// search running alongside a batch sees the index either wholly before
/// or wholly after it.
pub struct IndexService<W: IndexWriteHandle = TantivyWriter> {
    gateway: MutationGateway<W>,
    provider: SnapshotProvider<W::Snapshot>,
    schema: IndexSchema,
    lock_timeout: Option<Duration>,
}

impl<W: IndexWriteHandle> std::fmt::Debug for IndexService<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexService")
            .field("generation", &self.provider.generation())
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

impl IndexService<TantivyWriter> {
    /// Open or create the on-disk index in `dir`.
    pub fn open(dir: &Path, config: &ServiceConfig) -> Result<Self> {
        let index = TantivyIndex::open(dir, &config.schema)?;
        let writer = index
            .writer(config.writer_memory_budget)
            .map_err(|e| Error::StorageOpen {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::with_writer(writer, config)
    }

    /// An in-memory index (for testing).
    pub fn open_in_ram(config: &ServiceConfig) -> Result<Self> {
        let index = TantivyIndex::open_in_ram(&config.schema)?;
        let writer = index.writer(config.writer_memory_budget)?;
        Self::with_writer(writer, config)
    }
}

impl<W: IndexWriteHandle> IndexService<W> {
    pub fn with_writer(writer: W, config: &ServiceConfig) -> Result<Self> {
        config.schema.validate()?;
        let gateway = MutationGateway::new(writer, config.schema.clone());
        let provider = gateway.open_provider()?;
        info!(
            docs = provider.current().num_docs(),
            "index service ready"
        );

        Ok(Self {
            gateway,
            provider,
            schema: config.schema.clone(),
            lock_timeout: config.lock_timeout(),
        })
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Apply a batch of writes and publish them before returning.
    ///
    /// Fails as a whole: on error none of `ops` is visible and the current
    /// snapshot is unchanged. The one exception is a publish failure after
    /// a durable commit, described on [`MutationGateway::apply_batch`].
    pub fn apply_batch(&self, ops: &[Operation]) -> Result<BatchReceipt> {
        let access = self.exclusive()?;
        self.gateway.apply_batch(&access, ops, &self.provider)
    }

    /// Upsert every document in `docs` as one batch.
    pub fn upsert(&self, docs: Vec<Document>) -> Result<BatchReceipt> {
        let ops: Vec<_> = docs.into_iter().map(Operation::Upsert).collect();
        self.apply_batch(&ops)
    }

    pub fn search(&self, query: &Query, page: PageRequest) -> Result<SearchPage> {
        let access = self.shared()?;
        self.executor().search(&access, query, page)
    }

    /// Parse `text` against `field` and return one page of matches.
    pub fn search_text(
        &self,
        text: &str,
        field: &str,
        page: usize,
        page_size: usize,
        sort: Option<SortSpec>,
    ) -> Result<SearchPage> {
        let query = Query {
            predicate: Predicate::parse(text, field),
            sort,
        };
        self.search(&query, PageRequest::new(page, page_size)?)
    }

    /// Documents whose `field` holds any of `values`.
    pub fn search_any<S: AsRef<str>>(
        &self,
        values: &[S],
        field: &str,
        page: usize,
        page_size: usize,
        sort: Option<SortSpec>,
    ) -> Result<SearchPage> {
        let query = Query {
            predicate: Predicate::any_of(field, values),
            sort,
        };
        self.search(&query, PageRequest::new(page, page_size)?)
    }

    /// Documents whose `field` lies between `lower` and `upper`.
    pub fn search_range(
        &self,
        field: &str,
        lower: Bound<FieldValue>,
        upper: Bound<FieldValue>,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage> {
        let query = Query::new(Predicate::range(field, lower, upper));
        self.search(&query, PageRequest::new(page, page_size)?)
    }

    /// Number of documents matching `predicate`. Evaluates every candidate.
    pub fn count(&self, predicate: &Predicate) -> Result<usize> {
        let access = self.shared()?;
        self.executor().count(&access, predicate)
    }

    pub fn count_text(&self, field: &str, text: &str) -> Result<usize> {
        self.count(&Predicate::parse(text, field))
    }

    /// The current snapshot, for callers that want several reads against
    /// one consistent view.
    pub fn snapshot(&self) -> Arc<Snapshot<W::Snapshot>> {
        self.provider.current()
    }

    pub fn generation(&self) -> u64 {
        self.provider.generation()
    }

    fn turnstile(&self) -> &Turnstile {
        self.gateway.turnstile()
    }

    fn executor(&self) -> QueryExecutor<'_, W::Snapshot> {
        QueryExecutor::new(&self.provider, self.turnstile())
    }

    fn shared(&self) -> Result<SharedGuard<'_>> {
        match self.lock_timeout {
            Some(timeout) => self.turnstile().try_acquire_shared_for(timeout),
            None => Ok(self.turnstile().acquire_shared()),
        }
    }

    fn exclusive(&self) -> Result<ExclusiveGuard<'_>> {
        match self.lock_timeout {
            Some(timeout) => self.turnstile().try_acquire_exclusive_for(timeout),
            None => Ok(self.turnstile().acquire_exclusive()),
        }
    }
}
