//! Hash-backed set over small scalar keys.
//!
//! `union`, `intersection` and `difference` take any number of sets.
//! `intersection` and `difference` of zero sets are empty, and `difference`
//! is a left fold: the first set minus every key found in the rest.

use std::collections::hash_set;
use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Key types a [`Set`] can hold: integer ids and string-like newtypes.
pub trait SetKey: Eq + Hash + Clone {}

impl<T: Eq + Hash + Clone> SetKey for T {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Set<K: SetKey> {
    keys: HashSet<K>,
}

impl<K: SetKey> Default for Set<K> {
    fn default() -> Self {
        Self {
            keys: HashSet::new(),
        }
    }
}

impl<K: SetKey> Set<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K) {
        self.keys.insert(key);
    }

    pub fn remove(&mut self, key: &K) {
        self.keys.remove(key);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Every key once, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.keys.iter().cloned().collect()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, K> {
        self.keys.iter()
    }

    /// Keys in ascending order, for stable output.
    pub fn sorted_keys(&self) -> Vec<K>
    where
        K: Ord,
    {
        let mut keys = self.keys();
        keys.sort();
        keys
    }
}

/// Keys present in at least one of `sets`.
pub fn union<K: SetKey>(sets: &[&Set<K>]) -> Set<K> {
    let mut union = Set::new();
    for set in sets {
        for key in set.iter() {
            union.add(key.clone());
        }
    }
    union
}

/// Keys present in every one of `sets`.
pub fn intersection<K: SetKey>(sets: &[&Set<K>]) -> Set<K> {
    let Some((first, rest)) = sets.split_first() else {
        return Set::new();
    };
    let mut intersection = (*first).clone();
    for set in rest {
        intersection.keys.retain(|key| set.contains(key));
    }
    intersection
}

/// Keys of the first set that appear in none of the others.
pub fn difference<K: SetKey>(sets: &[&Set<K>]) -> Set<K> {
    let Some((first, rest)) = sets.split_first() else {
        return Set::new();
    };
    let mut difference = (*first).clone();
    for set in rest {
        for key in set.iter() {
            difference.remove(key);
        }
    }
    difference
}

/// Build a set from a slice, dropping duplicates.
pub fn to_set<K: SetKey>(keys: &[K]) -> Set<K> {
    keys.iter().cloned().collect()
}

impl<K: SetKey> FromIterator<K> for Set<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl<K: SetKey> Extend<K> for Set<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}

impl<K: SetKey> IntoIterator for Set<K> {
    type Item = K;
    type IntoIter = hash_set::IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a, K: SetKey> IntoIterator for &'a Set<K> {
    type Item = &'a K;
    type IntoIter = hash_set::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[u32]) -> Set<u32> {
        to_set(keys)
    }

    #[test]
    fn add_remove_contains() {
        let mut s = Set::new();
        assert!(s.is_empty());
        s.add(3u32);
        s.add(3);
        assert_eq!(s.len(), 1);
        assert!(s.contains(&3));
        s.remove(&3);
        assert!(!s.contains(&3));
        assert!(s.is_empty());
    }

    #[test]
    fn remove_missing_key_is_noop() {
        let mut s = set(&[1, 2]);
        s.remove(&9);
        assert_eq!(s, set(&[1, 2]));
    }

    #[test]
    fn to_set_deduplicates() {
        let s = set(&[1, 2, 2, 3, 1]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.sorted_keys(), vec![1, 2, 3]);
    }

    #[test]
    fn keys_enumerates_each_key_once() {
        let s = set(&[5, 4, 5, 6]);
        let mut keys = s.keys();
        keys.sort();
        assert_eq!(keys, vec![4, 5, 6]);
    }

    #[test]
    fn copy_is_independent() {
        let original = set(&[1, 2]);
        let mut copy = original.clone();
        copy.add(3);
        copy.remove(&1);
        assert_eq!(original.sorted_keys(), vec![1, 2]);
        assert_eq!(copy.sorted_keys(), vec![2, 3]);
    }

    #[test]
    fn union_of_many() {
        let u = union(&[&set(&[1]), &set(&[2, 3]), &set(&[3, 4])]);
        assert_eq!(u.sorted_keys(), vec![1, 2, 3, 4]);
        assert!(union::<u32>(&[]).is_empty());
    }

    #[test]
    fn intersection_of_many() {
        let i = intersection(&[&set(&[1, 2, 3]), &set(&[2, 3, 4]), &set(&[3, 2, 9])]);
        assert_eq!(i.sorted_keys(), vec![2, 3]);
    }

    #[test]
    fn intersection_of_nothing_is_empty() {
        assert!(intersection::<u32>(&[]).is_empty());
    }

    #[test]
    fn intersection_does_not_touch_inputs() {
        let a = set(&[1, 2]);
        let b = set(&[2]);
        let _ = intersection(&[&a, &b]);
        assert_eq!(a.sorted_keys(), vec![1, 2]);
    }

    #[test]
    fn difference_is_first_minus_union_of_rest() {
        let d = difference(&[&set(&[1, 2, 3]), &set(&[2]), &set(&[3])]);
        assert_eq!(d.sorted_keys(), vec![1]);
    }

    #[test]
    fn difference_is_not_symmetric() {
        let d = difference(&[&set(&[1]), &set(&[1, 2])]);
        assert!(d.is_empty());
    }

    #[test]
    fn difference_of_nothing_is_empty() {
        assert!(difference::<u32>(&[]).is_empty());
    }

    #[test]
    fn string_keys() {
        let a: Set<String> = ["prod", "edge"].iter().map(|s| s.to_string()).collect();
        let b: Set<String> = ["edge".to_string()].into_iter().collect();
        let d = difference(&[&a, &b]);
        assert_eq!(d.keys(), vec!["prod".to_string()]);
    }

    #[test]
    fn serializes_as_sequence() {
        let s = set(&[7]);
        assert_eq!(serde_json::to_string(&s).unwrap(), "[7]");
        let parsed: Set<u32> = serde_json::from_str("[1,1,2]").unwrap();
        assert_eq!(parsed.sorted_keys(), vec![1, 2]);
    }
}
