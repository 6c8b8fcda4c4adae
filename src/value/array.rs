//! Insertion-ordered array with a monotonic next-integer-key (spec §3).

use alloc::vec::Vec;
use hashbrown::HashMap;

use super::{ArrayKey, Value};

/// An ordered `{i64, string} -> Value` map that remembers, across every
/// insertion (not just the current entries), the smallest integer key not
/// yet used — spec §3: "they maintain a monotonic 'next integer key' that
/// advances past any integer key ever inserted."
#[derive(Debug, Clone, Default)]
pub struct VesperArray {
    entries: Vec<(ArrayKey, Value)>,
    index: HashMap<ArrayKey, usize>,
    next_int_key: i64,
}

impl VesperArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ArrayKey, Value)> {
        self.entries.iter()
    }

    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Append at the next integer key (`$a[] = v`), advancing the counter.
    pub fn push(&mut self, value: Value) {
        let key = ArrayKey::Int(self.next_int_key);
        self.insert(key, value);
    }

    /// Insert (or overwrite, in place) at an explicit key, advancing the
    /// next-integer-key counter if the key is an integer at or past it.
    pub fn insert(&mut self, key: ArrayKey, value: Value) {
        if let ArrayKey::Int(i) = key {
            if i >= self.next_int_key {
                self.next_int_key = i.saturating_add(1);
            }
        }
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                let i = self.entries.len();
                self.entries.push((key.clone(), value));
                self.index.insert(key, i);
            }
        }
    }

    /// Union per spec §4.1: "`+` on two arrays is the union (left wins on
    /// collisions, preserves left's order, appends right's missing keys)".
    pub fn union(&self, other: &VesperArray) -> VesperArray {
        let mut result = self.clone();
        for (key, value) in other.iter() {
            if !result.index.contains_key(key) {
                result.insert(key.clone(), value.clone());
            }
        }
        result
    }
}

impl PartialEq for VesperArray {
    fn eq(&self, other: &Self) -> bool {
        // Structural equality per spec §4.1: "array-vs-array -> same length
        // and recursive `==` on same-keyed entries" (order is not compared,
        // only the key set and per-key equality).
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(key, value)| {
            other
                .get(key)
                .is_some_and(|other_value| super::equal(value, other_value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_advances_next_int_key() {
        let mut a = VesperArray::new();
        a.push(Value::Int(10));
        a.push(Value::Int(20));
        assert_eq!(a.get(&ArrayKey::Int(0)), Some(&Value::Int(10)));
        assert_eq!(a.get(&ArrayKey::Int(1)), Some(&Value::Int(20)));
    }

    #[test]
    fn explicit_int_key_advances_counter_past_it() {
        let mut a = VesperArray::new();
        a.insert(ArrayKey::Int(5), Value::Int(1));
        a.push(Value::Int(2));
        assert_eq!(a.get(&ArrayKey::Int(6)), Some(&Value::Int(2)));
    }

    #[test]
    fn union_left_wins_and_appends_missing_keys() {
        let mut left = VesperArray::new();
        left.insert(ArrayKey::Int(0), Value::Int(1));
        left.insert(ArrayKey::Str("a".into()), Value::Int(2));

        let mut right = VesperArray::new();
        right.insert(ArrayKey::Int(0), Value::Int(99));
        right.insert(ArrayKey::Str("b".into()), Value::Int(3));

        let union = left.union(&right);
        assert_eq!(union.len(), 3);
        assert_eq!(union.get(&ArrayKey::Int(0)), Some(&Value::Int(1)));
        assert_eq!(union.get(&ArrayKey::Str("b".into())), Some(&Value::Int(3)));
    }

    #[test]
    fn equality_ignores_order() {
        let mut a = VesperArray::new();
        a.insert(ArrayKey::Int(0), Value::Int(1));
        a.insert(ArrayKey::Int(1), Value::Int(2));

        let mut b = VesperArray::new();
        b.insert(ArrayKey::Int(1), Value::Int(2));
        b.insert(ArrayKey::Int(0), Value::Int(1));

        assert_eq!(a, b);
    }
}
