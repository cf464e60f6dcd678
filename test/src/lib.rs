//! Testing utilities for code built on `pathstore`.
//!
//! This crate provides a small render loop standing in for a UI framework:
//! components are closures that read the store through the tracked root and
//! produce a string, and the harness re-renders them whenever the store says
//! they went stale.
//!
//! # Example
//!
//! ```rust
//! use pathstore::{Container, Path, Store};
//! use pathstore_test::RenderHarness;
//!
//! let store = Store::new(Container::record_from([("count", 1)]));
//! let harness = RenderHarness::new(store.clone());
//!
//! let counter = harness
//!     .mount(|root| {
//!         let count = root.get("count")?.and_then(|v| v.as_i64()).unwrap_or(0);
//!         Ok(format!("count: {count}"))
//!     })
//!     .unwrap();
//!
//! store.set(&Path::parse("count"), 2).unwrap();
//! harness.settle();
//!
//! assert_eq!(counter.output(), "count: 2");
//! assert_eq!(counter.render_count(), 2);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pathstore::{ConsumerId, ListenerKey, Result, Runtime, Store, StoreError, Tracked};

type View = Box<dyn Fn(&Tracked) -> Result<String>>;

struct Component {
    id: ConsumerId,
    view: View,
    renders: Cell<usize>,
    output: RefCell<String>,
}

impl Component {
    fn render(&self, store: &Store) -> Result<()> {
        let output = store.collect(self.id, |root| (self.view)(root))?;
        self.renders.set(self.renders.get() + 1);
        *self.output.borrow_mut() = output;
        Ok(())
    }
}

/// A mounted component.
#[derive(Clone)]
pub struct Mounted(Rc<Component>);

impl Mounted {
    pub fn id(&self) -> ConsumerId {
        self.0.id
    }

    /// Returns how many times the component rendered, including the first
    /// render on mount.
    pub fn render_count(&self) -> usize {
        self.0.renders.get()
    }

    /// Returns what the latest render produced.
    pub fn output(&self) -> String {
        self.0.output.borrow().clone()
    }
}

/// Mounts components against one store and re-renders them when notified.
///
/// Dropping the harness unregisters its listener. Mounted components stay
/// registered as consumers until [`RenderHarness::unmount`].
pub struct RenderHarness {
    store: Store,
    mounted: Rc<RefCell<Vec<Mounted>>>,
    notified: Rc<RefCell<Vec<ConsumerId>>>,
    errors: Rc<RefCell<Vec<StoreError>>>,
    listener: ListenerKey,
}

impl RenderHarness {
    /// Create a harness listening to `store`.
    pub fn new(store: Store) -> Self {
        let mounted: Rc<RefCell<Vec<Mounted>>> = Rc::default();
        let notified: Rc<RefCell<Vec<ConsumerId>>> = Rc::default();
        let errors: Rc<RefCell<Vec<StoreError>>> = Rc::default();

        let listener = store.on_store_changed({
            let store = store.clone();
            let mounted = mounted.clone();
            let notified = notified.clone();
            let errors = errors.clone();
            move |consumer| {
                notified.borrow_mut().push(consumer);
                let component = mounted
                    .borrow()
                    .iter()
                    .find(|m| m.id() == consumer)
                    .cloned();
                if let Some(component) = component {
                    if let Err(err) = component.0.render(&store) {
                        errors.borrow_mut().push(err);
                    }
                }
            }
        });

        Self {
            store,
            mounted,
            notified,
            errors,
            listener,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Mount a component and render it once.
    ///
    /// If the first render fails the component is not mounted.
    pub fn mount(&self, view: impl Fn(&Tracked) -> Result<String> + 'static) -> Result<Mounted> {
        let component = Mounted(Rc::new(Component {
            id: ConsumerId::new(),
            view: Box::new(view),
            renders: Cell::new(0),
            output: RefCell::new(String::new()),
        }));
        component.0.render(&self.store)?;
        self.mounted.borrow_mut().push(component.clone());
        Ok(component)
    }

    /// Unmount a component and tear its consumer down.
    pub fn unmount(&self, component: &Mounted) {
        self.mounted.borrow_mut().retain(|m| m.id() != component.id());
        self.store.teardown_consumer(component.id());
    }

    /// Deliver everything queued during the current tick.
    pub fn settle(&self) {
        Runtime::drain_pending_work();
    }

    /// Returns every consumer the store notified, in delivery order.
    pub fn notified(&self) -> Vec<ConsumerId> {
        self.notified.borrow().clone()
    }

    /// Returns errors raised by re-renders triggered from notifications.
    pub fn errors(&self) -> Vec<StoreError> {
        self.errors.borrow().clone()
    }

    /// The dotted paths `component` is currently registered under.
    pub fn dependencies(&self, component: &Mounted) -> Vec<String> {
        self.store
            .dependencies(component.id())
            .map(|deps| deps.to_strings())
            .unwrap_or_default()
    }

    /// Reset the recorded notifications and errors.
    pub fn reset(&self) {
        self.notified.borrow_mut().clear();
        self.errors.borrow_mut().clear();
    }
}

impl Drop for RenderHarness {
    fn drop(&mut self) {
        self.store.remove_listener(self.listener);
    }
}

/// Install a `tracing` subscriber writing to the test output, filtered by
/// `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
