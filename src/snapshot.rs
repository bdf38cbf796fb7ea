use std::{
    ops::Deref,
    sync::Arc,
};

use arc_swap::ArcSwap;
use tracing::debug;

use crate::{
    engine::{
        IndexWriteHandle,
        SnapshotView,
    },
    error::Result,
};

/// An engine view tagged with the generation it was published as.
#[derive(Debug)]
pub struct Snapshot<S> {
    view: S,
    generation: u64,
}

impl<S> Snapshot<S> {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<S> Deref for Snapshot<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.view
    }
}

/// Holds the one snapshot that is current.
///
/// Readers take an `Arc` to it without locking; a superseded snapshot is
/// freed once the last reader holding it lets go. Refreshes must be
/// serialized by the caller.
pub struct SnapshotProvider<S> {
    current: ArcSwap<Snapshot<S>>,
}

impl<S: SnapshotView> SnapshotProvider<S> {
    /// Start at generation 0 with a view of what `writer` has committed.
    pub fn open<W>(writer: &W) -> Result<Self>
    where
        W: IndexWriteHandle<Snapshot = S>,
    {
        let view = writer.open_snapshot()?;
        Ok(Self {
            current: ArcSwap::from_pointee(Snapshot {
                view,
                generation: 0,
            }),
        })
    }

    /// The published snapshot. Never waits on a refresh in progress.
    pub fn current(&self) -> Arc<Snapshot<S>> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Open a view of everything `writer` has committed and publish it.
    pub fn refresh<W>(&self, writer: &W) -> Result<Arc<Snapshot<S>>>
    where
        W: IndexWriteHandle<Snapshot = S>,
    {
        let view = writer.open_snapshot()?;
        Ok(self.publish(view))
    }

    fn publish(&self, view: S) -> Arc<Snapshot<S>> {
        let generation = self.current.load().generation + 1;
        let snapshot = Arc::new(Snapshot { view, generation });
        self.current.store(Arc::clone(&snapshot));
        debug!(generation, docs = snapshot.num_docs(), "published snapshot");
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::Document,
        query::Predicate,
        schema::IndexSchema,
        tantivy_index::TantivyIndex,
    };

    #[test]
    fn refresh_publishes_a_new_generation() {
        let idx = TantivyIndex::open_in_ram(&IndexSchema::default()).unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();
        let provider = SnapshotProvider::open(&writer).unwrap();
        assert_eq!(provider.generation(), 0);
        assert_eq!(provider.current().num_docs(), 0);

        writer.add(&Document::new().with("id", "1")).unwrap();
        writer.commit().unwrap();
        // Committed but not yet published.
        assert_eq!(provider.current().num_docs(), 0);

        let published = provider.refresh(&writer).unwrap();
        assert_eq!(published.generation(), 1);
        assert_eq!(provider.generation(), 1);
        assert_eq!(provider.current().num_docs(), 1);
    }

    #[test]
    fn held_snapshot_survives_supersession() {
        let idx = TantivyIndex::open_in_ram(&IndexSchema::default()).unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();
        writer.add(&Document::new().with("id", "1")).unwrap();
        writer.commit().unwrap();
        let provider = SnapshotProvider::open(&writer).unwrap();

        let held = provider.current();

        writer.delete("1").unwrap();
        writer.commit().unwrap();
        provider.refresh(&writer).unwrap();

        assert_eq!(held.generation(), 0);
        assert_eq!(held.count(&Predicate::term("id", "1")).unwrap(), 1);
        assert_eq!(
            provider.current().count(&Predicate::term("id", "1")).unwrap(),
            0
        );
    }
}
