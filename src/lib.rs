//! snapdex - paginated full-text search over a single-writer index.
//!
//! Writes go through one [`MutationGateway`] that upserts by id and
//! publishes a fresh immutable snapshot after every batch. Searches run
//! against whichever snapshot is current, so they never see a batch half
//! applied. A FIFO [`Turnstile`] orders writers against readers. Indexing
//! and query evaluation are done by
//! [Tantivy](https://github.com/quickwit-oss/tantivy).
//!
//! # Quick start
//!
//! ```no_run
//! use snapdex::{Document, IndexService, ServiceConfig, SortSpec};
//!
//! let service = IndexService::open_in_ram(&ServiceConfig::default()).unwrap();
//! service
//!     .upsert(vec![Document::new().with("id", "1").with("title", "Hello")])
//!     .unwrap();
//!
//! let page = service
//!     .search_text("hel*", "title", 1, 10, Some(SortSpec::asc("id")))
//!     .unwrap();
//! for doc in &page.documents {
//!     println!("{:?}", doc.text("title"));
//! }
//! println!("{} match(es)", page.total_matches);
//! ```

pub mod config;
pub mod coordination;
pub mod data_dir;
pub mod document;
pub mod engine;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod query;
pub mod schema;
pub mod seed;
pub mod service;
pub mod snapshot;
pub mod tantivy_index;

pub use config::ServiceConfig;
pub use coordination::Turnstile;
pub use data_dir::DataDir;
pub use document::{
    Document,
    FieldValue,
};
pub use error::{
    Error,
    Result,
};
pub use executor::SearchPage;
pub use gateway::{
    BatchReceipt,
    MutationGateway,
    Operation,
};
pub use query::{
    PageRequest,
    Predicate,
    Query,
    SortOrder,
    SortSpec,
};
pub use schema::{
    FieldDef,
    FieldKind,
    IndexSchema,
};
pub use service::IndexService;
pub use snapshot::SnapshotProvider;
pub use tantivy_index::TantivyIndex;
