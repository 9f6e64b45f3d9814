//! Composite pattern table
//!
//! Concrete tuples go into a hash map for O(1) probes. Tuples carrying a
//! wildcard sit in a short side list that is only scanned on a miss, so the
//! fallback costs O(wildcard entries) and never O(table size).

use super::{CompositeKey, Slot};
use crate::error::{MidasError, Result};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Composite key to payload table with a fixed arity
#[derive(Debug, Clone)]
pub struct PatternTable<P> {
    arity: usize,
    entries: Vec<(CompositeKey, P)>,
    exact: HashMap<Vec<i64>, usize>,
    wildcard: Vec<(Vec<Slot>, usize)>,
}

impl<P> PatternTable<P> {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            entries: Vec::new(),
            exact: HashMap::new(),
            wildcard: Vec::new(),
        }
    }

    /// Build a table from entries, failing on the first conflict
    pub fn build(arity: usize, entries: impl IntoIterator<Item = (CompositeKey, P)>) -> Result<Self> {
        let mut table = Self::new(arity);
        for (key, payload) in entries {
            table.insert(key, payload)?;
        }
        Ok(table)
    }

    /// Insert `key`; all of its expanded tuples are committed or none are
    pub fn insert(&mut self, key: CompositeKey, payload: P) -> Result<()> {
        if key.arity() != self.arity {
            return Err(MidasError::ArityMismatch {
                expected: self.arity,
                actual: key.arity(),
            });
        }

        let catch_all = key.is_catch_all();
        if catch_all && !self.entries.is_empty() {
            return Err(MidasError::DuplicateKey(format!(
                "catch-all key {} must be the only entry",
                key
            )));
        }
        if self.has_catch_all() {
            return Err(MidasError::DuplicateKey(format!(
                "{} conflicts with the catch-all entry",
                key
            )));
        }

        let tuples = key.expand();
        if tuples.is_empty() {
            return Err(MidasError::Validation(format!("key {} covers no values", key)));
        }

        let mut concrete = Vec::new();
        let mut tagged = Vec::new();
        let mut pending_concrete = HashSet::new();
        let mut pending_tagged = HashSet::new();
        for tuple in tuples {
            match concrete_values(&tuple) {
                Some(values) => {
                    if self.exact.contains_key(&values) || !pending_concrete.insert(values.clone()) {
                        return Err(MidasError::DuplicateKey(format!(
                            "{} overlaps an existing entry at {:?}",
                            key, values
                        )));
                    }
                    concrete.push(values);
                }
                None => {
                    if self.wildcard.iter().any(|(slots, _)| *slots == tuple)
                        || !pending_tagged.insert(tuple.clone())
                    {
                        return Err(MidasError::DuplicateKey(format!(
                            "{} repeats an existing wildcard pattern",
                            key
                        )));
                    }
                    tagged.push(tuple);
                }
            }
        }

        let index = self.entries.len();
        for values in concrete {
            self.exact.insert(values, index);
        }
        for slots in tagged {
            self.wildcard.push((slots, index));
        }
        self.entries.push((key, payload));
        Ok(())
    }

    /// Find the entry covering `values`
    ///
    /// Concrete entries win over wildcard ones; among wildcard entries the
    /// first inserted wins.
    pub fn lookup(&self, values: &[i64]) -> Result<Option<(&CompositeKey, &P)>> {
        if values.len() != self.arity {
            return Err(MidasError::ArityMismatch {
                expected: self.arity,
                actual: values.len(),
            });
        }

        if let Some(&index) = self.exact.get(values) {
            return Ok(self.entry(index));
        }

        let hit = self.wildcard.iter().find(|(slots, _)| {
            slots.iter().zip(values).all(|(slot, value)| slot.accepts(*value))
        });
        if hit.is_none() {
            trace!("Pattern miss for {:?}", values);
        }
        Ok(hit.and_then(|&(_, index)| self.entry(index)))
    }

    /// Payload for `values`, treating a miss or a wrong length as absent
    pub fn get(&self, values: &[i64]) -> Option<&P> {
        self.lookup(values).ok().flatten().map(|(_, payload)| payload)
    }

    fn entry(&self, index: usize) -> Option<(&CompositeKey, &P)> {
        self.entries.get(index).map(|(key, payload)| (key, payload))
    }

    fn has_catch_all(&self) -> bool {
        self.entries.first().is_some_and(|(key, _)| key.is_catch_all())
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of wildcard-tagged tuples scanned on a miss
    pub fn wildcard_len(&self) -> usize {
        self.wildcard.len()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&CompositeKey, &P)> {
        self.entries.iter().map(|(key, payload)| (key, payload))
    }
}

fn concrete_values(tuple: &[Slot]) -> Option<Vec<i64>> {
    tuple
        .iter()
        .map(|slot| match slot {
            Slot::Value(v) => Some(*v),
            Slot::Any => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use proptest::prelude::*;

    fn key2(a: Key, b: Key) -> CompositeKey {
        CompositeKey::from([a, b])
    }

    #[test]
    fn test_exact_lookup() {
        let table = PatternTable::build(
            2,
            vec![
                (key2(Key::Exact(1), Key::Range(0, 9)), "low"),
                (key2(Key::Exact(1), Key::Range(10, 19)), "high"),
            ],
        )
        .unwrap();

        assert_eq!(table.get(&[1, 4]), Some(&"low"));
        assert_eq!(table.get(&[1, 19]), Some(&"high"));
        assert_eq!(table.get(&[2, 4]), None);
        assert_eq!(table.wildcard_len(), 0);
    }

    #[test]
    fn test_overlapping_keys_rejected() {
        let err = PatternTable::build(
            2,
            vec![
                (key2(Key::Range(0, 3), Key::Exact(5)), 1),
                (key2(Key::OptionSet(vec![3, 8]), Key::Exact(5)), 2),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MidasError::DuplicateKey(_)));
    }

    #[test]
    fn test_failed_insert_commits_nothing() {
        let mut table = PatternTable::new(1);
        table.insert(CompositeKey::from([Key::Exact(3)]), 'a').unwrap();
        assert!(table.insert(CompositeKey::from([Key::Range(0, 5)]), 'b').is_err());

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&[0]), None);
        assert_eq!(table.get(&[3]), Some(&'a'));
    }

    #[test]
    fn test_wildcard_fallback() {
        let table = PatternTable::build(
            2,
            vec![
                (key2(Key::Exact(0x90), Key::Exact(53)), "pad"),
                (key2(Key::Exact(0x90), Key::Wildcard), "any note"),
                (key2(Key::Wildcard, Key::Exact(53)), "any status"),
            ],
        )
        .unwrap();

        assert_eq!(table.get(&[0x90, 53]), Some(&"pad"));
        assert_eq!(table.get(&[0x90, 12]), Some(&"any note"));
        assert_eq!(table.get(&[0xB0, 53]), Some(&"any status"));
        assert_eq!(table.get(&[0xB0, 12]), None);
        assert_eq!(table.wildcard_len(), 2);
    }

    #[test]
    fn test_catch_all_must_be_alone() {
        let catch_all = key2(Key::Wildcard, Key::Wildcard);

        let mut table = PatternTable::new(2);
        table.insert(key2(Key::Exact(1), Key::Exact(1)), 0).unwrap();
        assert!(matches!(
            table.insert(catch_all.clone(), 1),
            Err(MidasError::DuplicateKey(_))
        ));

        let mut table = PatternTable::new(2);
        table.insert(catch_all, 1).unwrap();
        assert!(table.insert(key2(Key::Exact(1), Key::Exact(1)), 0).is_err());
        assert_eq!(table.get(&[42, 7]), Some(&1));
    }

    #[test]
    fn test_repeated_wildcard_pattern_rejected() {
        let mut table = PatternTable::new(2);
        table.insert(key2(Key::Exact(1), Key::Wildcard), 'a').unwrap();
        assert!(table.insert(key2(Key::OptionSet(vec![2, 1]), Key::Wildcard), 'b').is_err());
    }

    #[test]
    fn test_arity_checks() {
        let mut table: PatternTable<()> = PatternTable::new(2);
        assert_eq!(
            table.insert(CompositeKey::from([Key::Exact(1)]), ()),
            Err(MidasError::ArityMismatch { expected: 2, actual: 1 })
        );
        assert!(matches!(
            table.lookup(&[1, 2, 3]),
            Err(MidasError::ArityMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut table = PatternTable::new(1);
        assert!(matches!(
            table.insert(CompositeKey::from([Key::OptionSet(vec![])]), ()),
            Err(MidasError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_shared_tuple_always_conflicts(
            a in 0i64..50,
            b in 0i64..50,
            width_a in 0i64..5,
            width_b in 0i64..5,
        ) {
            // Both keys cover (a, b) so the second insert must fail
            let first = key2(Key::Range(a - width_a, a), Key::Exact(b));
            let second = key2(Key::Exact(a), Key::Range(b, b + width_b));
            let result = PatternTable::build(2, vec![(first, 1), (second, 2)]);
            prop_assert!(matches!(result, Err(MidasError::DuplicateKey(_))));
        }

        #[test]
        fn prop_every_expanded_tuple_resolves(lo in 0i64..20, span in 0i64..10, other in 0i64..127) {
            let key = key2(Key::Range(lo, lo + span), Key::Exact(other));
            let table = PatternTable::build(2, vec![(key.clone(), ())]).unwrap();
            for v in lo..=lo + span {
                let (found, _) = table.lookup(&[v, other]).unwrap().unwrap();
                prop_assert_eq!(found, &key);
            }
        }
    }
}
