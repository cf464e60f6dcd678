//! Per-store configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// When queued consumers are handed to the `on_store_changed` listeners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlushMode {
    /// Coalesce every mutation of the current tick and deliver once, when the
    /// runtime drains its pending work.
    #[default]
    Deferred,
    /// Deliver right after each mutation unless a batch is open.
    Immediate,
}

/// Configuration for a [`Store`](crate::Store).
///
/// ```rust
/// use pathstore::{FlushMode, StoreConfig};
///
/// let config = StoreConfig::default()
///     .name("todos")
///     .flush_mode(FlushMode::Immediate)
///     .strict_reads(false);
/// assert_eq!(config.get_flush_mode(), FlushMode::Immediate);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    pub(crate) name: Option<String>,
    pub(crate) flush_mode: FlushMode,
    pub(crate) strict_reads: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: None,
            flush_mode: FlushMode::Deferred,
            strict_reads: true,
        }
    }
}

impl StoreConfig {
    /// Label attached to this store's log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn flush_mode(mut self, mode: FlushMode) -> Self {
        self.flush_mode = mode;
        self
    }

    /// When enabled, direct reads through [`Store::get`](crate::Store::get)
    /// fail while a tracked evaluation is open on the thread.
    pub fn strict_reads(mut self, strict: bool) -> Self {
        self.strict_reads = strict;
        self
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    pub fn get_strict_reads(&self) -> bool {
        self.strict_reads
    }
}
