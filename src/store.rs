//! Central state container.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use pathstore_reactive::{ConsumerId, Id, PendingWork, Runtime};
use tracing::{debug, warn};

use crate::{
    config::{FlushMode, StoreConfig},
    container::Container,
    deps::{DependencyList, DependencyStore},
    error::{Result, StoreError},
    mutate::{self, ReplaceSummary},
    notify::{ListenerKey, Notifier},
    path::{Key, Path},
    tracker::{Session, Tracked},
    value::Value,
};

/// Unique identifier for a Store instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StoreId(Id);

impl StoreId {
    pub(crate) fn from_id(id: Id) -> Self {
        StoreId(id)
    }

    pub fn id(&self) -> Id {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store{}", self.0)
    }
}

thread_local! {
    static GLOBAL: Store = Store::new(Container::record());
}

/// Internal state shared between a Store and its pending flush.
struct StoreInner {
    id: StoreId,
    config: StoreConfig,
    /// The current root. Replaced, never mutated in place, by writes.
    root: RefCell<Container>,
    deps: RefCell<DependencyStore>,
    notifier: Notifier,
    flush: Rc<FlushWork>,
    disposed: Cell<bool>,
}

/// The store's slot in the runtime's pending work queue.
struct FlushWork {
    id: Id,
    store: Weak<StoreInner>,
}

impl PendingWork for FlushWork {
    fn id(&self) -> Id {
        self.id
    }

    fn run(&self) {
        if let Some(inner) = self.store.upgrade() {
            Store { inner }.flush();
        }
    }
}

/// A root container plus everything needed to track reads of it and to
/// tell consumers when those reads went stale.
///
/// `Store` is a cheap `Clone` handle; clones share the same state. Writes go
/// through the copy-on-write mutator, so every write publishes a new root in
/// which only the containers on the written path are new.
///
/// # Example
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
///
/// use pathstore::{ConsumerId, Path, Runtime, Store};
/// use serde_json::json;
///
/// let store = Store::from_json(json!({ "count": 1, "title": "hi" })).unwrap();
/// let consumer = ConsumerId::new();
///
/// let changed = Rc::new(RefCell::new(Vec::new()));
/// store.on_store_changed({
///     let changed = changed.clone();
///     move |c| changed.borrow_mut().push(c)
/// });
///
/// let count = store
///     .collect(consumer, |root| Ok(root.get("count")?.and_then(|v| v.as_i64())))
///     .unwrap();
/// assert_eq!(count, Some(1));
///
/// store.set(&Path::parse("title"), "hello").unwrap();
/// store.set(&Path::parse("count"), 2).unwrap();
/// store.set(&Path::parse("count"), 3).unwrap();
/// Runtime::drain_pending_work();
///
/// assert_eq!(changed.borrow().as_slice(), [consumer]);
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    pub fn new(root: Container) -> Self {
        Self::with_config(root, StoreConfig::default())
    }

    pub fn with_config(root: Container, config: StoreConfig) -> Self {
        let inner = Rc::new_cyclic(|weak| StoreInner {
            id: StoreId(Id::next()),
            config,
            root: RefCell::new(root),
            deps: RefCell::new(DependencyStore::default()),
            notifier: Notifier::default(),
            flush: Rc::new(FlushWork {
                id: Id::next(),
                store: weak.clone(),
            }),
            disposed: Cell::new(false),
        });
        debug!(store = %inner.id, name = ?inner.config.name, "store created");
        Store { inner }
    }

    /// Build a store from JSON. The top level must be an object or array.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let root = Value::from_json(json);
        Ok(Self::new(root.as_container()?.clone()))
    }

    /// The thread's default store, created empty on first use.
    pub fn global() -> Store {
        GLOBAL.with(Store::clone)
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    fn ensure_live(&self) -> Result<()> {
        if self.inner.disposed.get() {
            warn!(store = %self.inner.id, "operation on a disposed store");
            return Err(StoreError::Disposed(self.inner.id));
        }
        Ok(())
    }

    /// The current root, untracked.
    pub fn snapshot(&self) -> Container {
        self.inner.root.borrow().clone()
    }

    /// Read the value at `path` directly, without tracking.
    ///
    /// With strict reads enabled this fails with
    /// [`StoreError::CrossStoreReadViolation`] while a tracked evaluation is
    /// open on the thread: reads in there must go through the tracked root.
    /// Wrap the read in [`Runtime::untrack`] to do it anyway.
    pub fn get(&self, path: &Path) -> Result<Option<Value>> {
        if self.inner.config.strict_reads {
            if let Some(frame) = Runtime::current_session() {
                return Err(StoreError::CrossStoreReadViolation {
                    bound: StoreId(frame.owner),
                    found: self.inner.id,
                });
            }
        }
        let mut current = Value::Container(self.snapshot());
        for key in path {
            let next = current.as_container()?.get(key);
            match next {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn write(
        &self,
        target: &Path,
        changed: &Path,
        mutate: impl FnOnce(Option<&Container>) -> Result<()>,
    ) -> Result<()> {
        self.ensure_live()?;
        let root = self.snapshot();
        let next = mutate::apply(&root, target, mutate)?;
        *self.inner.root.borrow_mut() = next;
        self.notify(changed);
        Ok(())
    }

    /// Run `mutate` on a copy of the container at `path` and publish the
    /// result. Consumers that read anything related to `path` are queued.
    pub fn update(
        &self,
        path: &Path,
        mutate: impl FnOnce(Option<&Container>) -> Result<()>,
    ) -> Result<()> {
        self.write(path, path, mutate)
    }

    /// Write `value` at `path`. The parent of `path` must exist.
    pub fn set(&self, path: &Path, value: impl Into<Value>) -> Result<()> {
        let (parent, key) = split(path)?;
        let value = value.into();
        self.write(&parent, path, move |target| absent(target)?.set(key, value))
    }

    /// Remove the entry at `path`, returning it.
    pub fn remove(&self, path: &Path) -> Result<Option<Value>> {
        let (parent, key) = split(path)?;
        let mut removed = None;
        self.write(&parent, path, |target| {
            removed = absent(target)?.remove(&key);
            Ok(())
        })?;
        Ok(removed)
    }

    /// Append to the sequence at `path`.
    pub fn push(&self, path: &Path, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.update(path, move |target| absent(target)?.push(value))
    }

    /// Replace the whole store with the top-level entries of `next` (`None`
    /// empties it).
    ///
    /// Entries whose value is unchanged keep their identity. The previous root
    /// is updated in place and marked stale, so code still holding it can
    /// tell it was superseded; a fresh root is published and every consumer
    /// is queued.
    pub fn replace(&self, next: Option<Container>) -> Result<ReplaceSummary> {
        self.ensure_live()?;
        let previous = self.snapshot();
        let summary = mutate::replace_top_level(&previous, next.as_ref())?;
        *self.inner.root.borrow_mut() = previous.shallow_clone();
        debug!(
            store = %self.inner.id,
            written = summary.written,
            removed = summary.removed,
            "store replaced"
        );
        self.notify(&Path::root());
        Ok(summary)
    }

    /// Start over with `root`: registrations and queued notifications are
    /// dropped and the previous root is marked stale. Listeners stay.
    pub fn reset(&self, root: Container) {
        let previous = self.inner.root.replace(root);
        previous.mark_stale();
        self.inner.deps.borrow_mut().clear();
        self.inner.notifier.flush(|_| false);
        self.inner.disposed.set(false);
        debug!(store = %self.inner.id, "store reset");
    }

    /// Drop all state. Later writes and tracked evaluations fail with
    /// [`StoreError::Disposed`] until [`Store::reset`].
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.deps.borrow_mut().clear();
        self.inner.notifier.clear();
        let previous = self.inner.root.replace(Container::record());
        previous.mark_stale();
        debug!(store = %self.inner.id, "store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Open a tracked evaluation for `consumer`. Reads through
    /// [`Evaluation::root`] are recorded until the evaluation is ended with
    /// [`Store::end_tracked_evaluation`]. Dropping it instead closes the
    /// session without recording.
    pub fn begin_tracked_evaluation(&self, consumer: ConsumerId) -> Result<Evaluation> {
        self.begin(Some(consumer))
    }

    fn begin(&self, consumer: Option<ConsumerId>) -> Result<Evaluation> {
        self.ensure_live()?;
        let session = Session::open(self.inner.id);
        let root = session.wrap(self.snapshot(), Path::root());
        Ok(Evaluation {
            store: self.inner.id,
            consumer,
            session,
            root,
        })
    }

    /// Close `evaluation` and make its list the consumer's registration.
    ///
    /// Ending an evaluation while one nested inside it is still open records
    /// anyway and reports [`StoreError::UnbalancedSession`].
    pub fn end_tracked_evaluation(&self, evaluation: Evaluation) -> Result<DependencyList> {
        if evaluation.store != self.inner.id {
            return Err(StoreError::CrossStoreReadViolation {
                bound: evaluation.store,
                found: self.inner.id,
            });
        }
        let (deps, innermost) = evaluation.session.close();
        if let Some(consumer) = evaluation.consumer {
            self.record(consumer, deps.clone());
        }
        if !innermost {
            warn!(store = %self.inner.id, "tracked evaluation ended out of order");
            return Err(StoreError::UnbalancedSession);
        }
        Ok(deps)
    }

    /// Run `evaluate` as a tracked evaluation of `consumer` and record what it
    /// read. If `evaluate` fails, the error is returned unchanged and the
    /// previous registration is kept.
    pub fn collect<R>(
        &self,
        consumer: ConsumerId,
        evaluate: impl FnOnce(&Tracked) -> Result<R>,
    ) -> Result<R> {
        let evaluation = self.begin_tracked_evaluation(consumer)?;
        let value = evaluate(evaluation.root())?;
        self.end_tracked_evaluation(evaluation)?;
        Ok(value)
    }

    /// Run `evaluate` against the tracked root and return what it read,
    /// without registering anything.
    pub fn track<R>(
        &self,
        evaluate: impl FnOnce(&Tracked) -> Result<R>,
    ) -> Result<(R, DependencyList)> {
        let evaluation = self.begin(None)?;
        let value = evaluate(evaluation.root())?;
        let deps = self.end_tracked_evaluation(evaluation)?;
        Ok((value, deps))
    }

    /// Make `list` the registration of `consumer`, replacing any previous one.
    pub fn record(&self, consumer: ConsumerId, list: DependencyList) {
        debug!(store = %self.inner.id, %consumer, deps = %list, "dependencies recorded");
        self.inner.deps.borrow_mut().record(consumer, list);
    }

    /// The latest registration of `consumer`.
    pub fn dependencies(&self, consumer: ConsumerId) -> Option<Rc<DependencyList>> {
        self.inner.deps.borrow().get(consumer)
    }

    pub fn consumer_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Remove `consumer`'s registration and any queued notification for it.
    pub fn forget(&self, consumer: ConsumerId) -> bool {
        self.inner.notifier.unqueue(consumer);
        self.inner.deps.borrow_mut().forget(consumer)
    }

    /// Called by the framework when a consumer is disposed.
    pub fn teardown_consumer(&self, consumer: ConsumerId) {
        if self.forget(consumer) {
            debug!(store = %self.inner.id, %consumer, "consumer torn down");
        }
    }

    /// Register `callback` to be told which consumers need re-evaluation.
    /// Each affected consumer is passed once per flush.
    pub fn on_store_changed(&self, callback: impl Fn(ConsumerId) + 'static) -> ListenerKey {
        self.inner.notifier.add_listener(Rc::new(callback))
    }

    pub fn remove_listener(&self, key: ListenerKey) -> bool {
        self.inner.notifier.remove_listener(key)
    }

    /// Queue every consumer whose registration is related to `path`.
    ///
    /// Writes through the store call this themselves. It is public for
    /// adapters that publish roots produced by [`apply`](crate::apply).
    pub fn notify(&self, path: &Path) {
        let path = &path.canonical_in(&self.snapshot());
        let affected = self.inner.deps.borrow().affected_by(path);
        let queued = self.inner.notifier.queue(affected);
        debug!(store = %self.inner.id, %path, queued, "store mutated");

        if !self.inner.notifier.has_pending() {
            return;
        }
        match self.inner.config.flush_mode {
            FlushMode::Immediate if !Runtime::is_batching() => self.flush(),
            _ => Runtime::schedule(self.inner.flush.clone()),
        }
    }

    /// Publish a root produced outside the store, then notify `path`.
    pub fn publish(&self, root: Container, path: &Path) -> Result<()> {
        self.ensure_live()?;
        *self.inner.root.borrow_mut() = root;
        self.notify(path);
        Ok(())
    }

    /// Deliver queued consumers now instead of waiting for the runtime drain.
    pub fn flush(&self) {
        let inner = &self.inner;
        let delivered = inner
            .notifier
            .flush(|consumer| inner.deps.borrow().contains(consumer));
        if delivered > 0 {
            debug!(store = %inner.id, delivered, "consumers notified");
        }
    }

    pub fn has_pending(&self) -> bool {
        self.inner.notifier.has_pending()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Store");
        s.field("id", &self.inner.id);
        s.field("name", &self.inner.config.name);
        s.field("consumers", &self.consumer_count());
        s.field("disposed", &self.inner.disposed.get());
        s.finish()
    }
}

/// Writes need the container they write into to exist.
fn absent(target: Option<&Container>) -> Result<&Container> {
    target.ok_or(StoreError::UnsupportedContainerKind { found: "absent" })
}

/// Split a value path into its parent container path and final key.
fn split(path: &Path) -> Result<(Path, Key)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(key)) => Ok((parent, key.clone())),
        _ => Err(StoreError::RootPath),
    }
}

/// An open tracked evaluation, from [`Store::begin_tracked_evaluation`].
pub struct Evaluation {
    store: StoreId,
    consumer: Option<ConsumerId>,
    session: Rc<Session>,
    root: Tracked,
}

impl Evaluation {
    /// The tracked root the consumer should read from.
    pub fn root(&self) -> &Tracked {
        &self.root
    }

    pub fn consumer(&self) -> Option<ConsumerId> {
        self.consumer
    }
}

impl Drop for Evaluation {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluation")
            .field("store", &self.store)
            .field("consumer", &self.consumer)
            .field("open", &self.session.is_open())
            .finish()
    }
}
