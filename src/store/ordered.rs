//! Insertion-ordered string-keyed map
//!
//! JSON objects written by the bot are read back in document order, so
//! leaderboard ties resolve the same way before and after a restart.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Map that iterates in first-insertion order and serializes as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    positions: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.positions.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.positions.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        if let Some(&i) = self.positions.get(&key) {
            return Some(std::mem::replace(&mut self.entries[i].1, value));
        }
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Value for `key`, appending `make()` at the end when absent.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let i = match self.positions.get(key) {
            Some(&i) => i,
            None => {
                self.positions.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object with string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterates_in_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("zed".to_string(), 1);
        map.insert("alpha".to_string(), 2);
        map.insert("mid".to_string(), 3);

        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["zed", "alpha", "mid"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut map = OrderedMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);
        assert_eq!(map.insert("a".to_string(), 10), Some(1));

        let pairs: Vec<_> = map.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        assert_eq!(pairs, vec![("a".to_string(), 10), ("b".to_string(), 2)]);
    }

    #[test]
    fn test_deserialize_preserves_document_order() {
        let map: OrderedMap<Vec<String>> =
            serde_json::from_str(r#"{"9": ["1"], "3": [], "5": ["2", "4"]}"#).unwrap();

        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["9", "3", "5"]);
        assert_eq!(map.get("5").unwrap().len(), 2);
    }

    #[test]
    fn test_serialize_as_object() {
        let mut map = OrderedMap::new();
        map.get_or_insert_with("b", Vec::new).push("x".to_string());
        map.get_or_insert_with("a", Vec::new);
        map.get_or_insert_with("b", Vec::new).push("y".to_string());

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"b":["x","y"],"a":[]}"#);
    }

    #[test]
    fn test_rejects_non_object() {
        let parsed: Result<OrderedMap<String>, _> = serde_json::from_str("[1, 2]");
        assert!(parsed.is_err());
    }
}
