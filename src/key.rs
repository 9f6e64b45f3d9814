//! Pattern keys for declarative matching
//!
//! A [`Key`] covers a set of integer values; a [`CompositeKey`] is a tuple of
//! keys whose coverage is the cartesian product of its members. Tables built
//! from composite keys live in [`table`].

pub mod table;

pub use table::PatternTable;

use std::collections::HashSet;
use std::fmt;

/// One expanded position of a composite key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Value(i64),
    /// Matches any value at this position
    Any,
}

impl Slot {
    pub fn accepts(&self, value: i64) -> bool {
        match *self {
            Slot::Value(v) => v == value,
            Slot::Any => true,
        }
    }
}

/// A set of values accepted at one position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Exact(i64),
    /// Inclusive on both ends
    Range(i64, i64),
    OptionSet(Vec<i64>),
    /// Union of inclusive ranges
    RangeSet(Vec<(i64, i64)>),
    Wildcard,
}

impl Key {
    /// Every concrete value covered, in declaration order without repeats
    ///
    /// `Wildcard` expands to a single [`Slot::Any`]. An empty range or option
    /// set expands to nothing.
    pub fn expand(&self) -> Vec<Slot> {
        match self {
            Key::Exact(v) => vec![Slot::Value(*v)],
            Key::Range(min, max) => (*min..=*max).map(Slot::Value).collect(),
            Key::OptionSet(values) => dedup(values.iter().copied()),
            Key::RangeSet(ranges) => dedup(ranges.iter().flat_map(|&(min, max)| min..=max)),
            Key::Wildcard => vec![Slot::Any],
        }
    }

    pub fn matches(&self, value: i64) -> bool {
        match self {
            Key::Exact(v) => *v == value,
            Key::Range(min, max) => (*min..=*max).contains(&value),
            Key::OptionSet(values) => values.contains(&value),
            Key::RangeSet(ranges) => ranges.iter().any(|&(min, max)| (min..=max).contains(&value)),
            Key::Wildcard => true,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Key::Wildcard)
    }
}

fn dedup(values: impl Iterator<Item = i64>) -> Vec<Slot> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).map(Slot::Value).collect()
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Exact(value)
    }
}

impl From<Option<i64>> for Key {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Key::Wildcard, Key::Exact)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Exact(v) => write!(f, "{}", v),
            Key::Range(min, max) => write!(f, "{}..={}", min, max),
            Key::OptionSet(values) => write!(f, "{:?}", values),
            Key::RangeSet(ranges) => {
                let parts: Vec<String> = ranges.iter().map(|(a, b)| format!("{}..={}", a, b)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Key::Wildcard => write!(f, "*"),
        }
    }
}

/// A tuple of keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey(Vec<Key>);

impl CompositeKey {
    pub fn new(keys: Vec<Key>) -> Self {
        Self(keys)
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// Cartesian product of the member expansions
    pub fn expand(&self) -> Vec<Vec<Slot>> {
        let mut tuples: Vec<Vec<Slot>> = vec![Vec::with_capacity(self.0.len())];
        for key in &self.0 {
            let slots = key.expand();
            let mut next = Vec::with_capacity(tuples.len() * slots.len());
            for prefix in &tuples {
                for slot in &slots {
                    let mut tuple = prefix.clone();
                    tuple.push(*slot);
                    next.push(tuple);
                }
            }
            tuples = next;
        }
        tuples
    }

    /// True when every position is a wildcard
    pub fn is_catch_all(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(Key::is_wildcard)
    }

    pub fn matches(&self, values: &[i64]) -> bool {
        self.0.len() == values.len() && self.0.iter().zip(values).all(|(k, v)| k.matches(*v))
    }
}

impl<const N: usize> From<[Key; N]> for CompositeKey {
    fn from(keys: [Key; N]) -> Self {
        Self(keys.into())
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_inclusive() {
        assert_eq!(
            Key::Range(3, 5).expand(),
            vec![Slot::Value(3), Slot::Value(4), Slot::Value(5)]
        );
        assert!(Key::Range(5, 3).expand().is_empty());
    }

    #[test]
    fn test_option_and_range_sets_drop_repeats() {
        assert_eq!(Key::OptionSet(vec![1, 2, 1]).expand().len(), 2);
        assert_eq!(Key::RangeSet(vec![(0, 3), (2, 5)]).expand().len(), 6);
        assert!(Key::RangeSet(vec![(0, 1), (8, 9)]).matches(9));
        assert!(!Key::RangeSet(vec![(0, 1), (8, 9)]).matches(5));
    }

    #[test]
    fn test_wildcard_expands_to_sentinel() {
        assert_eq!(Key::Wildcard.expand(), vec![Slot::Any]);
        assert!(Key::Wildcard.matches(-40));
    }

    #[test]
    fn test_composite_cartesian_product() {
        let key = CompositeKey::from([Key::Range(0, 1), Key::OptionSet(vec![7, 9]), Key::Wildcard]);
        let tuples = key.expand();
        assert_eq!(tuples.len(), 4);
        assert_eq!(tuples[0], vec![Slot::Value(0), Slot::Value(7), Slot::Any]);
        assert_eq!(tuples[3], vec![Slot::Value(1), Slot::Value(9), Slot::Any]);
    }

    #[test]
    fn test_catch_all_detection() {
        assert!(CompositeKey::from([Key::Wildcard, Key::Wildcard]).is_catch_all());
        assert!(!CompositeKey::from([Key::Wildcard, Key::Exact(1)]).is_catch_all());
        assert!(!CompositeKey::new(vec![]).is_catch_all());
    }

    #[test]
    fn test_option_into_key() {
        assert_eq!(Key::from(Some(4)), Key::Exact(4));
        assert_eq!(Key::from(None), Key::Wildcard);
    }
}
