//! Runtime shared by every `pathstore` store on a thread.
//!
//! The runtime knows nothing about values or paths. It keeps three pieces of
//! thread-local state:
//!
//! - a stack of tracking frames, so nested evaluations each record into their
//!   own session and reads can be checked against the store the innermost
//!   session is bound to;
//! - the batch depth;
//! - a queue of [`PendingWork`], deduplicated by id and drained once per tick
//!   by [`Runtime::drain_pending_work`] (or at the end of the outermost
//!   [`Runtime::batch`]).

mod id;
mod runtime;
mod work;

pub use id::{ConsumerId, Id};
pub use runtime::{Runtime, SessionFrame, SessionToken};
pub use work::PendingWork;
