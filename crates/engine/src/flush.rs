//! Background flush pipeline: turns a memtable snapshot into a new SSTable.
//!
//! A write path that crosses the column family's flush threshold enqueues a
//! [`FlushJob`] and immediately continues with a fresh, empty memtable — the
//! actual serialization happens off the caller's thread, on the single
//! background worker spawned by [`FlushHandle::spawn`].
//!
//! Dropping the handle closes the channel and joins the worker, which drains
//! whatever is left in the queue (best-effort) before exiting, matching the
//! shutdown discipline `close` requires.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use memtable::Memtable;
use sstable::{SSTableReader, SSTableWriter};
use wal::WalWriter;

use crate::catalog::ColumnFamily;

/// One memtable's worth of work for the flush worker: a snapshot to
/// serialize and the WAL page count to truncate back to once it lands.
pub(crate) struct FlushJob {
    pub cf: Arc<ColumnFamily>,
    pub snapshot: Memtable,
    pub checkpoint: u64,
}

/// Owns the flush queue's sending half and the worker thread's handle.
pub(crate) struct FlushHandle {
    sender: Option<Sender<FlushJob>>,
    worker: Option<JoinHandle<()>>,
}

impl FlushHandle {
    /// Spawns the single background flush worker.
    pub fn spawn(wal: Arc<WalWriter>) -> Self {
        let (sender, receiver) = mpsc::channel::<FlushJob>();
        let worker = std::thread::Builder::new()
            .name("engine-flush".to_string())
            .spawn(move || Self::run(receiver, &wal))
            .expect("failed to spawn flush worker thread");

        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Pushes a job onto the flush queue. Silently dropped if the worker has
    /// already shut down (only possible during `close`, after which no new
    /// writes should be arriving).
    pub fn enqueue(&self, job: FlushJob) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(job);
        }
    }

    fn run(receiver: Receiver<FlushJob>, wal: &WalWriter) {
        // `recv` returns Err once every Sender (including the handle's own,
        // plus any cloned for in-flight sends) has been dropped, at which
        // point every already-enqueued job has already been delivered — this
        // loop IS the "drain remaining queue on stop" step, for free.
        while let Ok(job) = receiver.recv() {
            run_now(job, wal);
        }
    }
}

/// Writes one snapshot to a new SSTable, publishes it, and truncates the WAL
/// to the job's checkpoint.
///
/// Any failure aborts this job: a half-written SSTable is never published
/// (the writer's own temp-file-then-rename discipline guarantees that), and
/// the WAL is left un-truncated so the lost data replays back into the
/// memtable on the next open.
///
/// Shared by the background worker (enqueued jobs, off the caller's thread)
/// and [`crate::Database::force_flush`] (run inline, so the caller can rely
/// on the data being in an SSTable once it returns).
pub(crate) fn run_now(job: FlushJob, wal: &WalWriter) {
    let FlushJob { cf, snapshot, checkpoint } = job;
    if snapshot.is_empty() {
        return;
    }

    let sst_name = format!("sstable_{:020}.sst", cf.next_sstable_id());
    let sst_path = cf.dir_path().join(&sst_name);
    let compressed = cf.config().compressed();

    if let Err(error) = SSTableWriter::write_from_memtable(&sst_path, &snapshot, compressed) {
        tracing::error!(cf = cf.name(), %error, "flush failed, wal left un-truncated");
        return;
    }

    let reader = match SSTableReader::open(&sst_path) {
        Ok(reader) => reader,
        Err(error) => {
            tracing::error!(cf = cf.name(), %error, "failed to reopen freshly flushed sstable");
            return;
        }
    };

    cf.sstables
        .write()
        .expect("sstables lock poisoned")
        .push(reader);

    if let Err(error) = wal.truncate(checkpoint) {
        tracing::error!(cf = cf.name(), %error, "failed to truncate wal after flush");
    }
}

impl Drop for FlushHandle {
    fn drop(&mut self) {
        let _ = self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
