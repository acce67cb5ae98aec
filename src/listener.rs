//! Buffer of completed builds between two scrapes.
//!
//! See [`CompletionEventBuffer`] for details.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::model::Run;

/// Collects builds as they complete so the next scrape can count them.
///
/// The host calls [`CompletionEventBuffer::on_build_completed`] whenever a
/// build finishes. The scrape takes every buffered build with
/// [`CompletionEventBuffer::drain`]; the buffer is cleared when the drain is
/// dropped, whether or not it was iterated to the end. Builds completing
/// while a drain is alive wait for the drain to end and are seen by the next
/// scrape, so every build is counted exactly once.
///
/// While unregistered, no build is buffered.
///
/// ```
/// # use build_exporter::listener::CompletionEventBuffer;
/// # use build_exporter::model::{BuildResult, Run};
/// # use build_exporter::model::snapshot::{JobInfo, JobSnapshot, RunInfo};
/// let job = JobSnapshot::new(JobInfo::new("a"), vec![RunInfo::completed(1, BuildResult::Success)]);
/// let buffer = CompletionEventBuffer::new();
///
/// buffer.on_build_completed(job.build(1).unwrap());
/// assert_eq!(1, buffer.drain().count());
/// assert_eq!(0, buffer.drain().count());
/// ```
pub struct CompletionEventBuffer {
    events: Mutex<Vec<Arc<dyn Run>>>,
    registered: AtomicBool,
}

impl CompletionEventBuffer {
    /// An empty, registered buffer.
    pub fn new() -> Self {
        CompletionEventBuffer {
            events: Mutex::new(Vec::new()),
            registered: AtomicBool::new(true),
        }
    }

    /// Record that `run` completed. Dropped while unregistered.
    pub fn on_build_completed(&self, run: Arc<dyn Run>) {
        if !self.is_registered() {
            trace!(build = run.number(), "listener unregistered, dropping completed build");
            return;
        }
        self.push(run);
    }

    fn push(&self, run: Arc<dyn Run>) {
        self.events.lock().push(run);
    }

    /// Take every buffered build. The buffer is locked until the returned
    /// [`Drain`] is dropped and empty afterwards.
    pub fn drain(&self) -> Drain<'_> {
        Drain {
            events: self.events.lock(),
            next: 0,
        }
    }

    /// Start buffering completed builds.
    pub fn register(&self) {
        self.registered.store(true, Ordering::Release);
    }

    /// Stop buffering completed builds and forget the buffered ones.
    pub fn unregister(&self) {
        self.registered.store(false, Ordering::Release);
        self.events.lock().clear();
    }

    /// Whether completed builds are buffered.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Number of buffered builds.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no build is buffered.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for CompletionEventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionEventBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionEventBuffer")
            .field("registered", &self.is_registered())
            .field("buffered", &self.len())
            .finish()
    }
}

/// Iterator over the builds buffered when it was created. Clears the buffer
/// on drop.
pub struct Drain<'a> {
    events: MutexGuard<'a, Vec<Arc<dyn Run>>>,
    next: usize,
}

impl Iterator for Drain<'_> {
    type Item = Arc<dyn Run>;

    fn next(&mut self) -> Option<Self::Item> {
        let run = self.events.get(self.next).cloned()?;
        self.next += 1;
        Some(run)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.events.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        self.events.clear();
    }
}

impl fmt::Debug for Drain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drain")
            .field("buffered", &self.events.len())
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::snapshot::{JobInfo, JobSnapshot, RunInfo};
    use crate::model::BuildResult;
    use std::thread;
    use std::time::Duration;

    fn job(builds: u64) -> Arc<JobSnapshot> {
        JobSnapshot::new(
            JobInfo::new("a"),
            (1..=builds)
                .map(|n| RunInfo::completed(n, BuildResult::Success))
                .collect(),
        )
    }

    #[test]
    fn partially_consumed_drain_still_clears() {
        let job = job(3);
        let buffer = CompletionEventBuffer::new();
        for run in job.builds() {
            buffer.on_build_completed(run.clone());
        }

        let first = buffer.drain().next().map(|run| run.number());
        assert_eq!(Some(1), first);
        assert!(buffer.is_empty());
    }

    #[test]
    fn unregistered_buffer_drops_events() {
        let job = job(2);
        let buffer = CompletionEventBuffer::new();
        buffer.on_build_completed(job.build(1).unwrap());

        buffer.unregister();
        assert!(buffer.is_empty());
        buffer.on_build_completed(job.build(2).unwrap());
        assert!(buffer.is_empty());

        buffer.register();
        buffer.on_build_completed(job.build(2).unwrap());
        assert_eq!(vec![2], buffer.drain().map(|r| r.number()).collect::<Vec<_>>());
    }

    #[test]
    fn builds_completing_during_drain_wait_for_next_one() {
        let job = job(2);
        let buffer = Arc::new(CompletionEventBuffer::new());
        buffer.on_build_completed(job.build(1).unwrap());

        let drain = buffer.drain();
        let producer = {
            let buffer = buffer.clone();
            let run = job.build(2).unwrap();
            thread::spawn(move || buffer.on_build_completed(run))
        };
        thread::sleep(Duration::from_millis(20));
        let drained: Vec<_> = drain.map(|r| r.number()).collect();
        producer.join().unwrap();

        assert_eq!(vec![1], drained);
        assert_eq!(vec![2], buffer.drain().map(|r| r.number()).collect::<Vec<_>>());
    }
}
