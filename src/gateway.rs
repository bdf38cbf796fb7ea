use parking_lot::Mutex;
use tracing::{
    debug,
    warn,
};

use crate::{
    coordination::{
        ExclusiveGuard,
        Turnstile,
    },
    document::Document,
    engine::IndexWriteHandle,
    error::{
        Error,
        Result,
    },
    schema::IndexSchema,
    snapshot::SnapshotProvider,
};

/// A single change to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Replace whatever document has this id, or insert it if none does.
    Upsert(Document),
    /// Remove the document with this id, if any.
    Delete { id: String },
}

/// What a successful batch published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReceipt {
    pub applied: usize,
    /// Generation of the snapshot that first shows the batch.
    pub generation: u64,
}

/// Owns the index's only write handle and the turnstile that admits
/// writers and readers to it.
pub struct MutationGateway<W> {
    writer: Mutex<W>,
    schema: IndexSchema,
    turnstile: Turnstile,
}

impl<W: IndexWriteHandle> MutationGateway<W> {
    pub fn new(writer: W, schema: IndexSchema) -> Self {
        Self {
            writer: Mutex::new(writer),
            schema,
            turnstile: Turnstile::new(),
        }
    }

    /// Guards passed to [`apply_batch`](Self::apply_batch) must come from
    /// here.
    pub fn turnstile(&self) -> &Turnstile {
        &self.turnstile
    }

    /// Open the starting snapshot from the writer's committed state.
    pub fn open_provider(&self) -> Result<SnapshotProvider<W::Snapshot>> {
        SnapshotProvider::open(&*self.writer.lock())
    }

    /// Apply `ops` in order, commit, and publish a fresh snapshot.
    ///
    /// Each upsert deletes by id before adding, so ids stay unique. When
    /// any write fails the batch is rolled back and the current snapshot
    /// is left as it was.
    ///
    /// If the commit succeeds but opening the new snapshot fails, the
    /// error is still [`Error::IndexWrite`], yet the batch is durable: it
    /// becomes visible with the next successful publish, and retrying it
    /// is harmless since upserts and deletes are idempotent.
    ///
    /// # Panics
    ///
    /// If `access` was not issued by this gateway's [`turnstile`].
    ///
    /// [`turnstile`]: Self::turnstile
    pub fn apply_batch(
        &self,
        access: &ExclusiveGuard<'_>,
        ops: &[Operation],
        provider: &SnapshotProvider<W::Snapshot>,
    ) -> Result<BatchReceipt> {
        assert!(
            access.issued_by(&self.turnstile),
            "exclusive guard was issued by a different turnstile"
        );
        if ops.is_empty() {
            return Ok(BatchReceipt {
                applied: 0,
                generation: provider.generation(),
            });
        }
        self.validate(ops)?;

        let mut writer = self.writer.lock();
        let written = write_all(&mut *writer, &self.schema, ops)
            .and_then(|()| writer.commit());
        if let Err(err) = written {
            warn!(error = %err, ops = ops.len(), "batch failed, rolling back");
            if let Err(rollback_err) = writer.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            return Err(into_write_error(err));
        }

        let snapshot = provider.refresh(&*writer).map_err(into_write_error)?;
        debug!(
            ops = ops.len(),
            generation = snapshot.generation(),
            "applied batch"
        );
        Ok(BatchReceipt {
            applied: ops.len(),
            generation: snapshot.generation(),
        })
    }

    fn validate(&self, ops: &[Operation]) -> Result<()> {
        for op in ops {
            match op {
                Operation::Upsert(doc) => {
                    doc.validate(&self.schema)?;
                }
                Operation::Delete { id } if id.is_empty() => {
                    return Err(Error::InvalidDocument(
                        "delete with empty id".into(),
                    ));
                }
                Operation::Delete { .. } => {}
            }
        }
        Ok(())
    }
}

fn write_all<W: IndexWriteHandle>(
    writer: &mut W,
    schema: &IndexSchema,
    ops: &[Operation],
) -> Result<()> {
    for op in ops {
        match op {
            Operation::Upsert(doc) => {
                let id = doc.validate(schema)?;
                writer.delete(id)?;
                writer.add(doc)?;
            }
            Operation::Delete { id } => writer.delete(id)?,
        }
    }
    Ok(())
}

/// Storage failures during a batch all surface as [`Error::IndexWrite`].
fn into_write_error(err: Error) -> Error {
    match err {
        Error::Tantivy(e) => Error::IndexWrite(e.to_string()),
        Error::Io(e) => Error::IndexWrite(e.to_string()),
        other => other,
    }
}
