use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::Error;

/// A small map from byte-string keys to byte-string values.
///
/// Keys are unique and compared as raw bytes. Entries keep the order in
/// which their key was first inserted; replacing a value keeps its slot.
/// Request maps hold a handful of entries, so lookups are linear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl FieldMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&[u8]> {
        let key = key.as_ref();
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Value stored under `key` as UTF-8, if present and valid.
    pub fn get_str(&self, key: impl AsRef<[u8]>) -> Option<&str> {
        self.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Like [`get`](Self::get), but a miss is an [`Error::NotFound`].
    pub fn require(&self, key: impl AsRef<[u8]>) -> Result<&[u8], Error> {
        let key = key.as_ref();
        self.get(key)
            .ok_or_else(|| Error::NotFound(String::from_utf8_lossy(key).into_owned()))
    }

    /// Returns `true` if `key` has a value.
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace the value under `key`.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        if let Some((_, v)) = self.entries.iter_mut().find(|(k, _)| k.as_slice() == key) {
            v.clear();
            v.try_reserve(value.len()).map_err(|_| Error::Allocation)?;
            v.extend_from_slice(value);
            return Ok(());
        }
        self.entries.try_reserve(1).map_err(|_| Error::Allocation)?;
        self.entries.push((owned(key)?, owned(value)?));
        Ok(())
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

fn owned(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut v = Vec::new();
    v.try_reserve_exact(bytes.len()).map_err(|_| Error::Allocation)?;
    v.extend_from_slice(bytes);
    Ok(v)
}

/// Serialized as a JSON-style object with lossy UTF-8 keys and values.
impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(&String::from_utf8_lossy(k), &String::from_utf8_lossy(v))?;
        }
        map.end()
    }
}
