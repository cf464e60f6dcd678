use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use smallvec::SmallVec;

use crate::{id::Id, work::PendingWork};

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::new();
}

/// Handle for one open tracking session, returned by [`Runtime::enter_session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionToken(Id);

impl SessionToken {
    pub fn id(&self) -> Id {
        self.0
    }
}

/// The innermost open tracking session and the owner (store) it is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionFrame {
    pub token: SessionToken,
    pub owner: Id,
}

#[derive(Clone, Copy, Debug)]
enum Frame {
    Session(SessionFrame),
    Untracked,
}

/// The runtime which stores the tracking and scheduling state in a thread
/// local.
///
/// All functions are associated functions operating on the current thread's
/// runtime. Nothing here is shared across threads.
pub struct Runtime {
    frames: RefCell<SmallVec<[Frame; 4]>>,
    batch_depth: Cell<usize>,
    draining: Cell<bool>,
    pending_work: RefCell<SmallVec<[Rc<dyn PendingWork>; 4]>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            frames: RefCell::new(SmallVec::new()),
            batch_depth: Cell::new(0),
            draining: Cell::new(false),
            pending_work: RefCell::new(SmallVec::new()),
        }
    }

    fn add_pending_work(&self, work: Rc<dyn PendingWork>) {
        let has_work = self
            .pending_work
            .borrow()
            .iter()
            .any(|w| w.id() == work.id());
        if !has_work {
            self.pending_work.borrow_mut().push(work);
        }
    }

    /// Queue work to run at the next [`Runtime::drain_pending_work`].
    pub fn schedule(work: Rc<dyn PendingWork>) {
        RUNTIME.with(|runtime| runtime.add_pending_work(work));
    }

    pub fn has_pending_work() -> bool {
        RUNTIME.with(|runtime| !runtime.pending_work.borrow().is_empty())
    }

    /// Run everything queued during the current tick.
    ///
    /// Work scheduled while draining is picked up by the same call, in a
    /// follow-up round. A drain requested from inside a drain returns
    /// immediately.
    pub fn drain_pending_work() {
        if RUNTIME.with(|runtime| runtime.draining.replace(true)) {
            return;
        }
        let _guard = DrainGuard;

        loop {
            let work = RUNTIME.with(|runtime| runtime.pending_work.take());
            if work.is_empty() {
                break;
            }
            for w in work {
                w.run();
            }
        }
    }

    /// Run `f` as one batch. Work scheduled inside is held back until the
    /// outermost batch returns, then drained.
    pub fn batch<T>(f: impl FnOnce() -> T) -> T {
        let outermost = RUNTIME.with(|runtime| {
            let depth = runtime.batch_depth.get();
            runtime.batch_depth.set(depth + 1);
            depth == 0
        });

        let result = {
            let _guard = BatchGuard;
            f()
        };

        if outermost {
            Self::drain_pending_work();
        }
        result
    }

    pub fn is_batching() -> bool {
        RUNTIME.with(|runtime| runtime.batch_depth.get() > 0)
    }

    /// Open a tracking session bound to `owner` on top of the frame stack.
    pub fn enter_session(owner: Id) -> SessionToken {
        let token = SessionToken(Id::next());
        RUNTIME.with(|runtime| {
            runtime
                .frames
                .borrow_mut()
                .push(Frame::Session(SessionFrame { token, owner }))
        });
        token
    }

    /// Close the session named by `token`.
    ///
    /// Returns `false` if the session was not the innermost frame (it is
    /// removed anyway) or was already closed.
    pub fn exit_session(token: SessionToken) -> bool {
        RUNTIME.with(|runtime| {
            let mut frames = runtime.frames.borrow_mut();
            let Some(pos) = frames
                .iter()
                .rposition(|f| matches!(f, Frame::Session(s) if s.token == token))
            else {
                return false;
            };
            let innermost = pos + 1 == frames.len();
            frames.remove(pos);
            innermost
        })
    }

    pub fn is_session_open(token: SessionToken) -> bool {
        RUNTIME.with(|runtime| {
            runtime
                .frames
                .borrow()
                .iter()
                .any(|f| matches!(f, Frame::Session(s) if s.token == token))
        })
    }

    /// The innermost open session, or `None` if nothing is being tracked or
    /// the innermost frame is an [`Runtime::untrack`] section.
    pub fn current_session() -> Option<SessionFrame> {
        RUNTIME.with(|runtime| match runtime.frames.borrow().last() {
            Some(Frame::Session(s)) => Some(*s),
            _ => None,
        })
    }

    pub fn session_depth() -> usize {
        RUNTIME.with(|runtime| {
            runtime
                .frames
                .borrow()
                .iter()
                .filter(|f| matches!(f, Frame::Session(_)))
                .count()
        })
    }

    /// Reads performed inside `f` are not recorded by any session.
    pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
        RUNTIME.with(|runtime| runtime.frames.borrow_mut().push(Frame::Untracked));
        let _guard = UntrackGuard;
        f()
    }

    pub fn is_untracked() -> bool {
        RUNTIME.with(|runtime| matches!(runtime.frames.borrow().last(), Some(Frame::Untracked)))
    }
}

struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        RUNTIME.with(|runtime| runtime.draining.set(false));
    }
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        RUNTIME.with(|runtime| {
            let depth = runtime.batch_depth.get();
            runtime.batch_depth.set(depth.saturating_sub(1));
        });
    }
}

struct UntrackGuard;

impl Drop for UntrackGuard {
    fn drop(&mut self) {
        RUNTIME.with(|runtime| {
            let mut frames = runtime.frames.borrow_mut();
            if let Some(pos) = frames.iter().rposition(|f| matches!(f, Frame::Untracked)) {
                frames.remove(pos);
            }
        });
    }
}
