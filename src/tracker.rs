//! Read tracking.
//!
//! A tracked evaluation sees the store through [`Tracked`] handles instead of
//! raw containers. Each handle knows the container it wraps, the path that
//! led to it, and the session it belongs to; every read through it appends
//! the full path of the read to the session's dependency list.
//!
//! Handles for nested containers are created lazily and memoized per
//! container and path for the lifetime of the session. The memo is dropped
//! when the session closes. Handles stay readable after that but no longer
//! record anything.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use pathstore_reactive::{Runtime, SessionToken};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::{
    container::{Container, ContainerKind},
    deps::DependencyList,
    error::{Result, StoreError},
    path::{Key, Path},
    store::StoreId,
    value::Value,
};

pub(crate) struct Session {
    token: SessionToken,
    store: StoreId,
    open: Cell<bool>,
    deps: RefCell<Vec<Path>>,
    seen: RefCell<FxHashSet<Path>>,
    wrappers: RefCell<FxHashMap<(usize, Path), Tracked>>,
}

impl Session {
    /// Open a session bound to `store` on top of the runtime's frame stack.
    pub(crate) fn open(store: StoreId) -> Rc<Self> {
        let token = Runtime::enter_session(store.id());
        trace!(%store, session = %token.id(), "tracking session opened");
        Rc::new(Session {
            token,
            store,
            open: Cell::new(true),
            deps: RefCell::new(Vec::new()),
            seen: RefCell::new(FxHashSet::default()),
            wrappers: RefCell::new(FxHashMap::default()),
        })
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.get()
    }

    pub(crate) fn wrap(self: &Rc<Self>, container: Container, path: Path) -> Tracked {
        let key = (container.addr(), path);
        if let Some(tracked) = self.wrappers.borrow().get(&key) {
            return tracked.clone();
        }
        let tracked = Tracked {
            node: Rc::new(TrackedNode {
                session: self.clone(),
                container,
                path: key.1.clone(),
            }),
        };
        // A closed session no longer memoizes, so nothing keeps it alive.
        if self.is_open() {
            self.wrappers.borrow_mut().insert(key, tracked.clone());
        }
        tracked
    }

    fn wrap_value(self: &Rc<Self>, value: Value, path: Path) -> TrackedValue {
        match value {
            Value::Container(container) => TrackedValue::Tracked(self.wrap(container, path)),
            scalar => TrackedValue::Value(scalar),
        }
    }

    /// Append `path` unless it is already recorded. A read that only names
    /// the root records nothing.
    fn record(&self, path: &Path) {
        if !self.is_open() || path.is_root() || Runtime::is_untracked() {
            return;
        }
        if self.seen.borrow_mut().insert(path.clone()) {
            trace!(store = %self.store, %path, "recorded read");
            self.deps.borrow_mut().push(path.clone());
        }
    }

    /// Reads must go to the store the innermost open session is bound to.
    fn check_store(&self) -> Result<()> {
        match Runtime::current_session() {
            Some(frame) if frame.owner != self.store.id() => {
                Err(StoreError::CrossStoreReadViolation {
                    bound: StoreId::from_id(frame.owner),
                    found: self.store,
                })
            }
            _ => Ok(()),
        }
    }

    /// Close the session and hand back what it recorded, plus whether it was
    /// the innermost open session. Closing twice yields an empty list.
    pub(crate) fn close(&self) -> (DependencyList, bool) {
        if !self.open.replace(false) {
            return (DependencyList::default(), false);
        }
        let innermost = Runtime::exit_session(self.token);
        let wrappers = self.wrappers.take();
        drop(wrappers);
        self.seen.borrow_mut().clear();
        let deps = DependencyList::from_unique(self.deps.take());
        trace!(
            store = %self.store,
            session = %self.token.id(),
            recorded = deps.len(),
            innermost,
            "tracking session closed"
        );
        (deps, innermost)
    }
}

#[derive(educe::Educe)]
#[educe(Debug)]
struct TrackedNode {
    #[educe(Debug(ignore))]
    session: Rc<Session>,
    container: Container,
    path: Path,
}

/// A container seen through a tracking session.
#[derive(Clone, Debug)]
pub struct Tracked {
    node: Rc<TrackedNode>,
}

impl Tracked {
    /// Path from the store root to this container.
    pub fn path(&self) -> &Path {
        &self.node.path
    }

    /// The container kind. Not recorded.
    pub fn kind(&self) -> ContainerKind {
        self.node.container.kind()
    }

    /// Whether the wrapped container was superseded by a whole-store
    /// replacement. Not recorded.
    pub fn is_stale(&self) -> bool {
        self.node.container.is_stale()
    }

    /// The raw container, bypassing tracking.
    pub fn untracked(&self) -> &Container {
        &self.node.container
    }

    /// Whether the session this handle records into is still open.
    pub fn is_tracking(&self) -> bool {
        self.node.session.is_open()
    }

    /// Read the child at `key`, recording its path. Missing keys are
    /// recorded too. For a set this is a membership probe returning the
    /// member itself.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<TrackedValue>> {
        let session = &self.node.session;
        session.check_store()?;
        let key = key.into().canonical_for(self.node.container.kind());
        let path = self.node.path.child(key.clone());
        session.record(&path);
        Ok(self
            .node
            .container
            .get(&key)
            .map(|value| session.wrap_value(value, path)))
    }

    /// Walk `path` from here, recording every step. Stops with `None` at the
    /// first missing value; a scalar in the middle of the path is an error.
    pub fn get_in(&self, path: &Path) -> Result<Option<TrackedValue>> {
        let mut current = TrackedValue::Tracked(self.clone());
        for key in path {
            let tracked = match &current {
                TrackedValue::Tracked(t) => t.clone(),
                TrackedValue::Value(v) => {
                    return Err(StoreError::UnsupportedContainerKind {
                        found: v.kind_name(),
                    });
                }
            };
            match tracked.get(key)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Membership test for the key or member, recorded like a read of it.
    pub fn contains(&self, key: impl Into<Key>) -> Result<bool> {
        let session = &self.node.session;
        session.check_store()?;
        let key = key.into().canonical_for(self.node.container.kind());
        session.record(&self.node.path.child(key.clone()));
        Ok(self.node.container.contains(&key))
    }

    /// Structural reads record this container's own path.
    fn record_structure(&self) -> Result<()> {
        let session = &self.node.session;
        session.check_store()?;
        session.record(&self.node.path);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        self.record_structure()?;
        Ok(self.node.container.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn keys(&self) -> Result<Vec<Key>> {
        self.record_structure()?;
        Ok(self.node.container.keys())
    }

    /// Read every child in iteration order.
    pub fn values(&self) -> Result<Vec<TrackedValue>> {
        self.keys()?
            .into_iter()
            .filter_map(|key| self.get(key).transpose())
            .collect()
    }
}

/// Result of a tracked read: a scalar, or a nested container wrapped in the
/// same session.
#[derive(Clone, Debug)]
pub enum TrackedValue {
    Value(Value),
    Tracked(Tracked),
}

impl TrackedValue {
    pub fn as_tracked(&self) -> Option<&Tracked> {
        match self {
            TrackedValue::Tracked(t) => Some(t),
            TrackedValue::Value(_) => None,
        }
    }

    pub fn into_tracked(self) -> Option<Tracked> {
        match self {
            TrackedValue::Tracked(t) => Some(t),
            TrackedValue::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            TrackedValue::Value(v) => Some(v),
            TrackedValue::Tracked(_) => None,
        }
    }

    /// The plain value; containers are unwrapped without tracking.
    pub fn into_value(self) -> Value {
        match self {
            TrackedValue::Value(v) => v,
            TrackedValue::Tracked(t) => Value::Container(t.untracked().clone()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }
}
