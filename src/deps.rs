//! Dependency lists and the per-consumer registry.

use std::{fmt, rc::Rc};

use pathstore_reactive::ConsumerId;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::{container::FxIndexMap, path::Path};

/// The paths one tracked evaluation read, in read order, without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyList(Vec<Path>);

impl DependencyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> &[Path] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.0.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    /// Whether a mutation at `mutated` makes this list stale: some recorded
    /// path is an ancestor of it, a descendant of it, or equal to it.
    pub fn is_affected_by(&self, mutated: &Path) -> bool {
        self.0.iter().any(|path| path.is_related(mutated))
    }

    /// The recorded paths in their dotted form.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl DependencyList {
    /// Wrap paths that are already free of duplicates.
    pub(crate) fn from_unique(paths: Vec<Path>) -> Self {
        DependencyList(paths)
    }
}

impl From<Vec<Path>> for DependencyList {
    fn from(paths: Vec<Path>) -> Self {
        let mut seen = FxHashSet::default();
        DependencyList(
            paths
                .into_iter()
                .filter(|path| seen.insert(path.clone()))
                .collect(),
        )
    }
}

impl FromIterator<Path> for DependencyList {
    fn from_iter<I: IntoIterator<Item = Path>>(iter: I) -> Self {
        DependencyList::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a DependencyList {
    type Item = &'a Path;
    type IntoIter = std::slice::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for DependencyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{path}")?;
        }
        f.write_str("]")
    }
}

/// Maps each consumer to the list recorded by its latest tracked evaluation.
///
/// Lists are shared immutably and replaced wholesale, so a notification pass
/// only ever sees a complete list.
#[derive(Default)]
pub(crate) struct DependencyStore {
    registrations: FxIndexMap<ConsumerId, Rc<DependencyList>>,
}

impl DependencyStore {
    pub(crate) fn record(&mut self, consumer: ConsumerId, list: DependencyList) {
        self.registrations.insert(consumer, Rc::new(list));
    }

    pub(crate) fn forget(&mut self, consumer: ConsumerId) -> bool {
        self.registrations.shift_remove(&consumer).is_some()
    }

    pub(crate) fn get(&self, consumer: ConsumerId) -> Option<Rc<DependencyList>> {
        self.registrations.get(&consumer).cloned()
    }

    pub(crate) fn contains(&self, consumer: ConsumerId) -> bool {
        self.registrations.contains_key(&consumer)
    }

    /// Consumers whose list is affected by a mutation at `mutated`, in
    /// registration order.
    pub(crate) fn affected_by(&self, mutated: &Path) -> SmallVec<[ConsumerId; 8]> {
        self.registrations
            .iter()
            .filter(|(_, list)| list.is_affected_by(mutated))
            .map(|(consumer, _)| *consumer)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    pub(crate) fn clear(&mut self) {
        self.registrations.clear();
    }
}
