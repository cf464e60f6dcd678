use crate::id::Id;

/// Deferred work queued on the runtime.
///
/// Work is deduplicated by [`PendingWork::id`]: scheduling the same id twice
/// before the queue is drained runs it once.
pub trait PendingWork {
    fn id(&self) -> Id;
    fn run(&self);
}
