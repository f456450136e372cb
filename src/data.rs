use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A plain key/value record, the shape of a component's local data.
pub type Record = serde_json::Map<String, Value>;

/// The local data of a component instance.
///
/// All clones refer to the same underlying [`Record`], so a clone held by
/// the [`SelfStore`](crate::store::SelfStore) will observe any mutation
/// made through the instance afterwards.  Replacing the instance's data
/// outright (see [`Instance::replace_data`](crate::host::Instance::replace_data))
/// breaks that link.
#[derive(Clone, Default)]
pub struct LocalData {
    inner: Arc<RwLock<Record>>,
}

impl LocalData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: Record) -> Self {
        Self {
            inner: Arc::new(RwLock::new(record)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Record> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Record> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Set a single field, returning the previous value if any.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.write().insert(key.into(), value.into())
    }

    /// Copy every field of `record` onto this data, overwriting fields
    /// that already exist.
    pub fn assign(&self, record: &Record) {
        let mut data = self.write();
        for (key, value) in record {
            data.insert(key.clone(), value.clone());
        }
    }

    /// Mutate the record in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut Record) -> R) -> R {
        f(&mut self.write())
    }

    /// A shallow copy of the record as it currently is.
    pub fn snapshot(&self) -> Record {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Record> for LocalData {
    fn from(record: Record) -> Self {
        Self::from_record(record)
    }
}

impl Serialize for LocalData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LocalData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Record::deserialize(deserializer).map(Self::from_record)
    }
}

impl fmt::Debug for LocalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalData").field(&*self.read()).finish()
    }
}
