//! Copy-on-write updates along a path.
//!
//! [`apply`] never touches the containers it is given. It clones the root and
//! every container on the way down to the target, writes each clone into its
//! (already cloned) parent, and hands the cloned target to the caller. Every
//! container off that path keeps its identity in the new tree, so anything
//! comparing old and new trees by identity can skip unchanged branches.

use tracing::trace;

use crate::{
    container::{Container, ContainerData, ContainerKind},
    error::{Result, StoreError},
    path::{Key, Path},
    value::Value,
};

/// Produce a new root in which `path` has been updated by `mutate`.
///
/// Exactly `path.len() + 1` containers are cloned. An empty path clones only
/// the root and passes it to `mutate`.
///
/// Missing (or `Null`) values along the path are passed through as absent:
/// nothing is written back for them, the walk continues, and `mutate` is
/// called with `None` if the target itself is absent. A scalar on the path
/// fails with [`StoreError::UnsupportedContainerKind`].
pub fn apply(
    root: &Container,
    path: &Path,
    mutate: impl FnOnce(Option<&Container>) -> Result<()>,
) -> Result<Container> {
    let next_root = root.shallow_clone();
    if path.is_empty() {
        mutate(Some(&next_root))?;
        return Ok(next_root);
    }

    let mut current = Some(next_root.clone());
    for key in path {
        let child = current.as_ref().and_then(|c| c.get(key));
        let clone = clone_child(child)?;
        if let (Some(parent), Some(clone)) = (&current, &clone) {
            parent.set(key.clone(), Value::Container(clone.clone()))?;
        }
        current = clone;
    }

    trace!(%path, found = current.is_some(), "applying mutation");
    mutate(current.as_ref())?;
    Ok(next_root)
}

fn clone_child(child: Option<Value>) -> Result<Option<Container>> {
    match child {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(value.as_container()?.shallow_clone())),
    }
}

/// What [`replace_top_level`] changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Entries overwritten or added because they differed from the snapshot.
    pub written: usize,
    /// Entries removed because the snapshot doesn't have them.
    pub removed: usize,
}

/// Make `target` hold the top-level entries of `next` without replacing the
/// `target` cell itself.
///
/// Entries are compared by identity: an entry holding the same value (the
/// same container, or an equal scalar) is left alone. Entries missing from
/// `next` are removed; `None` empties the target. Afterwards `target` is
/// marked stale so holders of the old reference can tell it was superseded.
pub fn replace_top_level(target: &Container, next: Option<&Container>) -> Result<ReplaceSummary> {
    let mut summary = ReplaceSummary::default();

    match next {
        None => {
            summary.removed = target.len();
            target.clear();
        }
        Some(next) => {
            if next.kind() != target.kind() {
                return Err(StoreError::KindMismatch {
                    expected: target.kind(),
                    found: next.kind(),
                });
            }
            let entries: Vec<(Key, Value)> = next.with_data(|data| match data {
                ContainerData::Record(fields) => fields
                    .iter()
                    .map(|(k, v)| (Key::Name(k.clone()), v.clone()))
                    .collect(),
                ContainerData::Sequence(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (Key::Index(i), v.clone()))
                    .collect(),
                ContainerData::Map(entries) => entries
                    .iter()
                    .map(|(k, v)| (Key::from_value(k.clone()), v.clone()))
                    .collect(),
                ContainerData::Set(members) => members
                    .iter()
                    .map(|m| (Key::from_value(m.clone()), m.clone()))
                    .collect(),
            });

            for (key, value) in &entries {
                if target.get(key).as_ref() != Some(value) {
                    target.set(key.clone(), value.clone())?;
                    summary.written += 1;
                }
            }

            if target.kind() == ContainerKind::Sequence {
                summary.removed = target.len().saturating_sub(entries.len());
                target.truncate(entries.len());
            } else {
                for key in target.keys() {
                    if !next.contains(&key) {
                        target.remove(&key);
                        summary.removed += 1;
                    }
                }
            }
        }
    }

    target.mark_stale();
    Ok(summary)
}
