//! Paths into the state tree.
//!
//! A [`Path`] is the list of keys walked from the root to reach a value. Paths
//! are what the tracker records and what the notifier matches mutations
//! against: two paths are related when one is a prefix of the other.

use std::{fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{
    container::{Container, ContainerKind},
    value::Value,
};

/// One step of a path: a record field, a sequence index, or any other map key
/// or set member.
///
/// String and non-negative integer values are normalized to `Name` and
/// `Index`. A key that addresses a record field or a sequence slot is further
/// spelled the way that container stores it (see [`Path::canonical_in`]), so
/// `Name("0")` and `Index(0)` name the same slot of a sequence and compare
/// equal once canonical.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Name(Rc<str>),
    Index(usize),
    Value(Value),
}

impl Key {
    pub fn from_value(value: Value) -> Key {
        match value {
            Value::Str(s) => Key::Name(s),
            Value::Int(i) if i >= 0 => match usize::try_from(i) {
                Ok(i) => Key::Index(i),
                Err(_) => Key::Value(Value::Int(i)),
            },
            other => Key::Value(other),
        }
    }

    /// The key as a value, for map lookups and set membership.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Name(s) => Value::Str(s.clone()),
            Key::Index(i) => match i64::try_from(*i) {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Str(i.to_string().into()),
            },
            Key::Value(v) => v.clone(),
        }
    }

    /// The key spelled the way a container of `kind` addresses it: field
    /// names for records, indices for sequences. Map keys and set members are
    /// left alone since `Name("1")` and `Index(1)` are different entries there.
    pub(crate) fn canonical_for(self, kind: ContainerKind) -> Key {
        match kind {
            ContainerKind::Record => match self {
                Key::Name(_) => self,
                other => Key::Name(other.to_name()),
            },
            ContainerKind::Sequence => match self.to_index() {
                Some(i) => Key::Index(i),
                None => self,
            },
            ContainerKind::Map | ContainerKind::Set => self,
        }
    }

    /// The key as a record field name.
    pub(crate) fn to_name(&self) -> Rc<str> {
        match self {
            Key::Name(s) => s.clone(),
            other => other.to_string().into(),
        }
    }

    /// The key as a sequence index, if it is one.
    pub(crate) fn to_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(s) => s.parse().ok(),
            Key::Value(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(s) => f.write_str(s),
            Key::Index(i) => write!(f, "{i}"),
            Key::Value(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.into())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s.into())
    }
}

impl From<Rc<str>> for Key {
    fn from(s: Rc<str>) -> Self {
        Key::Name(s)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<Value> for Key {
    fn from(v: Value) -> Self {
        Key::from_value(v)
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

/// Location of a value relative to the root of a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(SmallVec<[Key; 4]>);

impl Path {
    pub fn root() -> Self {
        Path(SmallVec::new())
    }

    /// Parse the dotted form produced by `Display`. Numeric segments become
    /// indices; the empty string is the root.
    ///
    /// Record fields and sequence slots are found either way, but a map entry
    /// keyed by a numeric *string* is not: `Index(1)` looks up `Int(1)`. Build
    /// such paths from keys instead, e.g. `Path::root().child("1")`.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Path::root();
        }
        s.split('.')
            .map(|segment| match segment.parse::<usize>() {
                Ok(i) => Key::Index(i),
                Err(_) => Key::Name(segment.into()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }

    /// The path one level down.
    pub fn child(&self, key: impl Into<Key>) -> Path {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Path(keys)
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            return None;
        }
        Some(Path(self.0[..self.0.len() - 1].iter().cloned().collect()))
    }

    /// This path with every key spelled the way the container it walks
    /// through stores it. Keys below the first missing container are kept as
    /// given.
    pub fn canonical_in(&self, root: &Container) -> Path {
        let mut current = Some(root.clone());
        self.iter()
            .map(|key| match current.take() {
                Some(container) => {
                    let key = key.clone().canonical_for(container.kind());
                    current = container.get(&key).and_then(|v| v.container().cloned());
                    key
                }
                None => key.clone(),
            })
            .collect()
    }

    /// Whether `prefix` is an ancestor of this path or equal to it.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Whether the two paths are equal or one is an ancestor of the other.
    pub fn is_related(&self, other: &Path) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}
