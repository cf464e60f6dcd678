use std::{fmt, sync::atomic::AtomicU64};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A stable identifier handed out by the runtime.
///
/// Stores, tracking sessions and units of pending work are all named by an
/// `Id`. Ids are never reused within a process.
pub struct Id(u64);

impl Id {
    pub fn next() -> Id {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Id(COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle naming a consumer (for example a component render) whose
/// reads are tracked and which gets told when those reads go stale.
///
/// The runtime never interprets the handle; the framework that owns the
/// consumer decides what re-evaluating it means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsumerId(Id);

impl ConsumerId {
    pub fn new() -> Self {
        Self(Id::next())
    }

    pub fn id(&self) -> Id {
        self.0
    }
}

impl Default for ConsumerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer{}", self.0)
    }
}
