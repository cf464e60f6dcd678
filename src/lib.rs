//! # Pathstore
//!
//! An observable state store for UI frameworks. Consumers read state through
//! a tracked view of the store; every read records the path it took. Writes
//! produce a new root by copy-on-write along the written path, and every
//! consumer whose recorded paths are related to the written path is told to
//! re-evaluate, once per flush however many writes hit it.
//!
//! ## Pieces
//!
//! - [`Container`]: records, sequences, maps and sets behind one interface.
//! - [`apply`]: the path-scoped copy-on-write mutator. Only containers on the
//!   written path are cloned, so identity comparisons can skip everything
//!   else.
//! - [`Tracked`]: the read tracker's view of a container. Reads through it
//!   are recorded into the open tracking session.
//! - [`DependencyList`]: what one tracked evaluation read. A [`Store`] keeps
//!   the latest list of each consumer.
//! - [`Store::on_store_changed`]: where affected consumers are delivered.
//!
//! ## Lifecycle of a consumer
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use pathstore::{ConsumerId, Path, Runtime, Store};
//! use serde_json::json;
//!
//! let store = Store::from_json(json!({ "todos": [{ "done": false }] })).unwrap();
//! let render = ConsumerId::new();
//!
//! let stale = Rc::new(RefCell::new(0));
//! store.on_store_changed({
//!     let stale = stale.clone();
//!     move |_| *stale.borrow_mut() += 1
//! });
//!
//! // A render reads through the tracked root.
//! let evaluation = store.begin_tracked_evaluation(render).unwrap();
//! let done = evaluation
//!     .root()
//!     .get_in(&Path::parse("todos.0.done"))
//!     .unwrap()
//!     .and_then(|v| v.as_bool());
//! assert_eq!(done, Some(false));
//! let deps = store.end_tracked_evaluation(evaluation).unwrap();
//! assert_eq!(deps.to_strings(), ["todos", "todos.0", "todos.0.done"]);
//!
//! // Writing a related path marks the render stale.
//! store.set(&Path::parse("todos.0.done"), true).unwrap();
//! Runtime::drain_pending_work();
//! assert_eq!(*stale.borrow(), 1);
//!
//! // Once the consumer is gone nothing is delivered for it.
//! store.teardown_consumer(render);
//! store.set(&Path::parse("todos.0.done"), false).unwrap();
//! Runtime::drain_pending_work();
//! assert_eq!(*stale.borrow(), 1);
//! ```
//!
//! Everything is single threaded. Stores, containers and tracked handles are
//! `!Send`, and the tracking and scheduling state lives in the thread-local
//! [`Runtime`].

mod config;
pub mod container;
mod deps;
mod error;
mod mutate;
mod notify;
mod path;
mod store;
mod tracker;
mod value;

pub use config::{FlushMode, StoreConfig};
pub use container::{Container, ContainerData, ContainerKind};
pub use deps::DependencyList;
pub use error::{Result, StoreError};
pub use mutate::{ReplaceSummary, apply, replace_top_level};
pub use notify::ListenerKey;
pub use path::{Key, Path};
pub use pathstore_reactive::{ConsumerId, Id, PendingWork, Runtime};
pub use store::{Evaluation, Store, StoreId};
pub use tracker::{Tracked, TrackedValue};
pub use value::Value;
