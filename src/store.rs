//! The root-scoped store carrying local data from server to client.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    data::{LocalData, Record},
    error::StoreError,
    identity::Identity,
};

/// The reserved name under which the self store is transported, used as
/// the `id` of the script element produced by [`SelfStore::to_script_tag`].
pub const SELF_STORE_KEY: &str = "__PREFETCH_SELF_STORE__";

/// A mapping from instance identity to that instance's local data.
///
/// On the server, each instance inserts its [`LocalData`] as it is
/// constructed; the entry is the same shared record the instance keeps
/// writing to, so data that arrives later (e.g. from a tracked fetch)
/// is still captured as long as it is written in place.  Once rendering
/// completes the store is serialized and shipped to the client, where
/// it is attached to the [`Root`](crate::host::Root) before any instance
/// is constructed.
///
/// Clones share the same entries.
#[derive(Clone, Default)]
pub struct SelfStore {
    entries: Arc<RwLock<BTreeMap<Identity, LocalData>>>,
}

impl SelfStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Identity, LocalData>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Identity, LocalData>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert the data for `identity`, sharing the record with the caller.
    pub fn insert(&self, identity: Identity, data: LocalData) -> Option<LocalData> {
        tracing::debug!(%identity, "writing self store entry");
        self.write().insert(identity, data)
    }

    /// The shared data stored under `identity`.
    pub fn get(&self, identity: Identity) -> Option<LocalData> {
        self.read().get(&identity).cloned()
    }

    /// A shallow copy of the record stored under `identity`.
    pub fn snapshot(&self, identity: Identity) -> Option<Record> {
        self.read().get(&identity).map(LocalData::snapshot)
    }

    pub fn contains(&self, identity: Identity) -> bool {
        self.read().contains_key(&identity)
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Serialize the store to JSON.
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(StoreError::Encode)
    }

    /// Deserialize a store previously produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(StoreError::Decode)
    }

    /// Render the store as a JSON script element for embedding in the
    /// server-rendered page.
    ///
    /// Every `<` is escaped so string values can't terminate the element
    /// early; the escape is still valid JSON, so the text content of the
    /// element may be handed straight to [`from_json`](Self::from_json).
    pub fn to_script_tag(&self) -> Result<String, StoreError> {
        let json = self.to_json()?.replace('<', "\\u003c");
        Ok(format!(
            r#"<script id="{SELF_STORE_KEY}" type="application/json">{json}</script>"#
        ))
    }
}

// Keys go through plain integers so the JSON object keys are the bare
// identity numbers.
impl Serialize for SelfStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.read();
        serializer.collect_map(entries.iter().map(|(identity, data)| (identity.get(), data)))
    }
}

impl<'de> Deserialize<'de> for SelfStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<u64, Record>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, record)| (Identity::new(key), LocalData::from_record(record)))
            .collect();
        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
        })
    }
}

impl fmt::Debug for SelfStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.read().iter()).finish()
    }
}

