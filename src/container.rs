//! The four container kinds behind one interface.
//!
//! A [`Container`] is a shared mutable cell. Its identity is the identity of
//! the cell, so two containers with equal contents are still different
//! containers. Cloning the handle shares the cell; [`Container::shallow_clone`]
//! makes a new cell holding the same children.

use std::{
    cell::{Cell, RefCell},
    fmt,
    hash::BuildHasherDefault,
    rc::Rc,
};

use rustc_hash::FxHasher;

use crate::{
    error::{Result, StoreError},
    path::Key,
    value::Value,
};

pub(crate) type FxIndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<FxHasher>>;
pub(crate) type FxIndexSet<T> = indexmap::IndexSet<T, BuildHasherDefault<FxHasher>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Record,
    Sequence,
    Map,
    Set,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerKind::Record => "record",
            ContainerKind::Sequence => "sequence",
            ContainerKind::Map => "map",
            ContainerKind::Set => "set",
        })
    }
}

/// Contents of a container, tagged by kind.
#[derive(Clone, Debug)]
pub enum ContainerData {
    /// Keyed record with string fields, in insertion order.
    Record(FxIndexMap<Rc<str>, Value>),
    Sequence(Vec<Value>),
    /// Hash map with arbitrary value keys, in insertion order.
    Map(FxIndexMap<Value, Value>),
    Set(FxIndexSet<Value>),
}

impl ContainerData {
    pub fn kind(&self) -> ContainerKind {
        match self {
            ContainerData::Record(_) => ContainerKind::Record,
            ContainerData::Sequence(_) => ContainerKind::Sequence,
            ContainerData::Map(_) => ContainerKind::Map,
            ContainerData::Set(_) => ContainerKind::Set,
        }
    }

    fn len(&self) -> usize {
        match self {
            ContainerData::Record(fields) => fields.len(),
            ContainerData::Sequence(items) => items.len(),
            ContainerData::Map(entries) => entries.len(),
            ContainerData::Set(members) => members.len(),
        }
    }
}

struct ContainerCell {
    data: RefCell<ContainerData>,
    stale: Cell<bool>,
}

#[derive(Clone)]
pub struct Container(Rc<ContainerCell>);

impl Container {
    pub fn new(data: ContainerData) -> Self {
        Container(Rc::new(ContainerCell {
            data: RefCell::new(data),
            stale: Cell::new(false),
        }))
    }

    pub fn record() -> Self {
        Self::new(ContainerData::Record(FxIndexMap::default()))
    }

    pub fn sequence() -> Self {
        Self::new(ContainerData::Sequence(Vec::new()))
    }

    pub fn map() -> Self {
        Self::new(ContainerData::Map(FxIndexMap::default()))
    }

    pub fn empty_set() -> Self {
        Self::new(ContainerData::Set(FxIndexSet::default()))
    }

    pub fn record_from<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        Self::new(ContainerData::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn sequence_from<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::new(ContainerData::Sequence(
            items.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn map_from<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::new(ContainerData::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn set_from<V: Into<Value>>(members: impl IntoIterator<Item = V>) -> Self {
        Self::new(ContainerData::Set(
            members.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn kind(&self) -> ContainerKind {
        self.0.data.borrow().kind()
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn len(&self) -> usize {
        self.0.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in iteration order. For a set the keys are its members.
    pub fn keys(&self) -> Vec<Key> {
        match &*self.0.data.borrow() {
            ContainerData::Record(fields) => fields.keys().map(|k| Key::Name(k.clone())).collect(),
            ContainerData::Sequence(items) => (0..items.len()).map(Key::Index).collect(),
            ContainerData::Map(entries) => entries.keys().cloned().map(Key::from_value).collect(),
            ContainerData::Set(members) => members.iter().cloned().map(Key::from_value).collect(),
        }
    }

    /// The child at `key`. For a set this is the member itself when present.
    pub fn get(&self, key: &Key) -> Option<Value> {
        match &*self.0.data.borrow() {
            ContainerData::Record(fields) => fields.get(&key.to_name()).cloned(),
            ContainerData::Sequence(items) => key.to_index().and_then(|i| items.get(i).cloned()),
            ContainerData::Map(entries) => entries.get(&key.to_value()).cloned(),
            ContainerData::Set(members) => members.get(&key.to_value()).cloned(),
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        match &*self.0.data.borrow() {
            ContainerData::Record(fields) => fields.contains_key(&key.to_name()),
            ContainerData::Sequence(items) => key.to_index().is_some_and(|i| i < items.len()),
            ContainerData::Map(entries) => entries.contains_key(&key.to_value()),
            ContainerData::Set(members) => members.contains(&key.to_value()),
        }
    }

    /// Upsert for records and maps, index assignment for sequences (padding
    /// with `Null` past the end), add-member for sets (`value` is ignored).
    pub fn set(&self, key: Key, value: Value) -> Result<()> {
        match &mut *self.0.data.borrow_mut() {
            ContainerData::Record(fields) => {
                fields.insert(key.to_name(), value);
            }
            ContainerData::Sequence(items) => {
                let Some(i) = key.to_index() else {
                    return Err(StoreError::InvalidKey {
                        kind: ContainerKind::Sequence,
                        key: key.to_string(),
                    });
                };
                if i >= items.len() {
                    items.resize(i + 1, Value::Null);
                }
                items[i] = value;
            }
            ContainerData::Map(entries) => {
                entries.insert(key.to_value(), value);
            }
            ContainerData::Set(members) => {
                members.insert(key.to_value());
            }
        }
        Ok(())
    }

    /// Remove the entry at `key`, returning it.
    ///
    /// Removing from a sequence leaves a `Null` hole so the indices of later
    /// items, and any paths through them, stay valid.
    pub fn remove(&self, key: &Key) -> Option<Value> {
        match &mut *self.0.data.borrow_mut() {
            ContainerData::Record(fields) => fields.shift_remove(&key.to_name()),
            ContainerData::Sequence(items) => key
                .to_index()
                .and_then(|i| items.get_mut(i))
                .map(|slot| std::mem::replace(slot, Value::Null)),
            ContainerData::Map(entries) => entries.shift_remove(&key.to_value()),
            ContainerData::Set(members) => members.shift_take(&key.to_value()),
        }
    }

    /// Append to a sequence; other kinds reject it.
    pub fn push(&self, value: Value) -> Result<()> {
        match &mut *self.0.data.borrow_mut() {
            ContainerData::Sequence(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(StoreError::InvalidKey {
                kind: other.kind(),
                key: "push".into(),
            }),
        }
    }

    pub fn clear(&self) {
        match &mut *self.0.data.borrow_mut() {
            ContainerData::Record(fields) => fields.clear(),
            ContainerData::Sequence(items) => items.clear(),
            ContainerData::Map(entries) => entries.clear(),
            ContainerData::Set(members) => members.clear(),
        }
    }

    pub(crate) fn truncate(&self, len: usize) {
        if let ContainerData::Sequence(items) = &mut *self.0.data.borrow_mut() {
            items.truncate(len);
        }
    }

    /// A new container of the same kind holding the same children. Nested
    /// containers are shared, not copied. The stale marker is not carried over.
    pub fn shallow_clone(&self) -> Container {
        Container::new(self.0.data.borrow().clone())
    }

    /// Whether this container was superseded by a whole-store replacement.
    pub fn is_stale(&self) -> bool {
        self.0.stale.get()
    }

    pub(crate) fn mark_stale(&self) {
        self.0.stale.set(true);
    }

    /// Read the raw contents.
    pub fn with_data<R>(&self, f: impl FnOnce(&ContainerData) -> R) -> R {
        f(&self.0.data.borrow())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Container");
        s.field("addr", &format_args!("{:#x}", self.addr()));
        s.field("stale", &self.is_stale());
        match self.0.data.try_borrow() {
            Ok(data) => s.field("data", &*data),
            Err(_) => s.field("data", &"<borrowed>"),
        };
        s.finish()
    }
}

/// Kind of a value that should be a container.
pub fn kind(value: &Value) -> Result<ContainerKind> {
    Ok(value.as_container()?.kind())
}

/// [`Container::get`] on a value that should be a container.
pub fn get(value: &Value, key: &Key) -> Result<Option<Value>> {
    Ok(value.as_container()?.get(key))
}

/// [`Container::set`] on a value that should be a container.
pub fn set(value: &Value, key: Key, child: Value) -> Result<()> {
    value.as_container()?.set(key, child)
}

/// [`Container::shallow_clone`] on a value that should be a container.
pub fn clone(value: &Value) -> Result<Value> {
    Ok(Value::Container(value.as_container()?.shallow_clone()))
}
