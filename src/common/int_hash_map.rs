//! Open-addressed `i32 -> i32` hash map
//!
//! Linear probing over a power-of-two table. Key `0` marks an empty slot, so a
//! present zero key lives in a dedicated extra slot at index `n` and is tracked
//! by `contains_zero_key`.

use crate::common::error::PrismResult;
use crate::common::helper::next_power_of_two;
use crate::invalid_arg_err;

/// 2^32 / golden ratio
const INT_PHI: u32 = 0x9E37_79B9;

/// Default load factor
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Default expected number of entries
pub const DEFAULT_INITIAL_SIZE: usize = 16;

/// Fibonacci hash of `x` with the high half folded into the low half
#[inline]
pub fn mix(x: i32) -> u32 {
    let h = (x as u32).wrapping_mul(INT_PHI);
    h ^ (h >> 16)
}

/// Table size for `expected` entries at load factor `f`
fn array_size(expected: usize, f: f32) -> usize {
    let wanted = (expected as f64 / f as f64).ceil() as usize;
    next_power_of_two(wanted).max(2)
}

/// Number of entries that triggers a rehash of a table of size `n`
fn max_fill(n: usize, f: f32) -> usize {
    ((n as f64 * f as f64).ceil() as usize).min(n - 1)
}

enum Slot {
    Found(usize),
    Vacant(usize),
}

#[derive(Debug, Clone)]
pub struct Int2IntOpenHashMap {
    /// `n + 1` slots; slot `n` belongs to the zero key
    keys: Vec<i32>,
    values: Vec<i32>,
    n: usize,
    mask: usize,
    contains_zero_key: bool,
    size: usize,
    max_fill: usize,
    load_factor: f32,
    default_return_value: i32,
}

impl Int2IntOpenHashMap {
    /// Create a map sized for `expected` entries at load factor `load_factor`
    pub fn new(expected: usize, load_factor: f32) -> PrismResult<Self> {
        if !(load_factor > 0.0 && load_factor <= 1.0) {
            return Err(invalid_arg_err!(
                "Load factor must be greater than 0 and smaller than or equal to 1: {}",
                load_factor
            ));
        }
        let n = array_size(expected, load_factor);
        Ok(Self {
            keys: vec![0; n + 1],
            values: vec![0; n + 1],
            n,
            mask: n - 1,
            contains_zero_key: false,
            size: 0,
            max_fill: max_fill(n, load_factor),
            load_factor,
            default_return_value: 0,
        })
    }

    /// Create a map sized for `expected` entries at the default load factor
    pub fn with_expected_size(expected: usize) -> Self {
        let n = array_size(expected, DEFAULT_LOAD_FACTOR);
        Self {
            keys: vec![0; n + 1],
            values: vec![0; n + 1],
            n,
            mask: n - 1,
            contains_zero_key: false,
            size: 0,
            max_fill: max_fill(n, DEFAULT_LOAD_FACTOR),
            load_factor: DEFAULT_LOAD_FACTOR,
            default_return_value: 0,
        }
    }

    /// Value reported by [`Self::get_or_default`] for absent keys
    pub fn set_default_return_value(&mut self, value: i32) {
        self.default_return_value = value;
    }

    pub fn default_return_value(&self) -> i32 {
        self.default_return_value
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Current table size (always a power of two)
    pub fn capacity(&self) -> usize {
        self.n
    }

    fn find(&self, key: i32) -> Slot {
        if key == 0 {
            return if self.contains_zero_key {
                Slot::Found(self.n)
            } else {
                Slot::Vacant(self.n)
            };
        }

        let mut pos = mix(key) as usize & self.mask;
        loop {
            let current = self.keys[pos];
            if current == 0 {
                return Slot::Vacant(pos);
            }
            if current == key {
                return Slot::Found(pos);
            }
            pos = (pos + 1) & self.mask;
        }
    }

    fn insert_at(&mut self, pos: usize, key: i32, value: i32) {
        if pos == self.n {
            self.contains_zero_key = true;
        }
        self.keys[pos] = key;
        self.values[pos] = value;
        self.size += 1;
        if self.size >= self.max_fill {
            self.rehash(array_size(self.size + 1, self.load_factor));
        }
    }

    pub fn get(&self, key: i32) -> Option<i32> {
        match self.find(key) {
            Slot::Found(pos) => Some(self.values[pos]),
            Slot::Vacant(_) => None,
        }
    }

    pub fn get_or_default(&self, key: i32) -> i32 {
        self.get(key).unwrap_or(self.default_return_value)
    }

    pub fn contains_key(&self, key: i32) -> bool {
        matches!(self.find(key), Slot::Found(_))
    }

    /// Insert or overwrite, returning the previous value
    pub fn put(&mut self, key: i32, value: i32) -> Option<i32> {
        match self.find(key) {
            Slot::Found(pos) => Some(std::mem::replace(&mut self.values[pos], value)),
            Slot::Vacant(pos) => {
                self.insert_at(pos, key, value);
                None
            }
        }
    }

    /// Insert only if absent; returns the value already present otherwise
    pub fn put_if_absent(&mut self, key: i32, value: i32) -> Option<i32> {
        match self.find(key) {
            Slot::Found(pos) => Some(self.values[pos]),
            Slot::Vacant(pos) => {
                self.insert_at(pos, key, value);
                None
            }
        }
    }

    fn rehash(&mut self, new_n: usize) {
        let mask = new_n - 1;
        let mut keys = vec![0; new_n + 1];
        let mut values = vec![0; new_n + 1];

        for i in 0..self.n {
            let key = self.keys[i];
            if key == 0 {
                continue;
            }
            let mut pos = mix(key) as usize & mask;
            while keys[pos] != 0 {
                pos = (pos + 1) & mask;
            }
            keys[pos] = key;
            values[pos] = self.values[i];
        }
        values[new_n] = self.values[self.n];

        tracing::trace!(from = self.n, to = new_n, "rehashing int map");
        self.keys = keys;
        self.values = values;
        self.n = new_n;
        self.mask = mask;
        self.max_fill = max_fill(new_n, self.load_factor);
    }
}

impl Default for Int2IntOpenHashMap {
    fn default() -> Self {
        Self::with_expected_size(DEFAULT_INITIAL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    #[test]
    fn test_put_if_absent_keeps_first_value() {
        let mut map = Int2IntOpenHashMap::default();
        assert_eq!(map.put_if_absent(7, 1), None);
        assert_eq!(map.put_if_absent(7, 2), Some(1));
        assert_eq!(map.get(7), Some(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_zero_key() {
        let mut map = Int2IntOpenHashMap::default();
        assert!(!map.contains_key(0));
        assert_eq!(map.put_if_absent(0, 42), None);
        assert!(map.contains_key(0));
        assert_eq!(map.get(0), Some(42));
        assert_eq!(map.put_if_absent(0, 43), Some(42));
        assert_eq!(map.put(0, 44), Some(42));
        assert_eq!(map.get(0), Some(44));
    }

    #[test]
    fn test_missing_keys() {
        let mut map = Int2IntOpenHashMap::default();
        map.set_default_return_value(-1);
        map.put(1, 10);
        assert!(!map.contains_key(2));
        assert_eq!(map.get(2), None);
        assert_eq!(map.get_or_default(2), -1);
        assert_eq!(map.get_or_default(1), 10);
    }

    #[test]
    fn test_rehash_keeps_entries() {
        let mut map = Int2IntOpenHashMap::new(4, 0.5).unwrap();
        let initial_capacity = map.capacity();
        for key in 0..1000 {
            assert_eq!(map.put_if_absent(key, key * 3), None);
        }
        assert!(map.capacity() > initial_capacity);
        assert!(map.capacity().is_power_of_two());
        assert_eq!(map.len(), 1000);
        for key in 0..1000 {
            assert_eq!(map.get(key), Some(key * 3));
        }
        assert!(!map.contains_key(1000));
        assert!(!map.contains_key(-1));
    }

    #[test]
    fn test_random_keys_against_std_map() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut map = Int2IntOpenHashMap::with_expected_size(8);
        let mut expected = HashMap::new();

        for _ in 0..5000 {
            let key: i32 = rng.random_range(-2000..2000);
            let value: i32 = rng.random();
            let previous = map.put_if_absent(key, value);
            assert_eq!(previous, expected.get(&key).copied());
            expected.entry(key).or_insert(value);
        }

        assert_eq!(map.len(), expected.len());
        for (key, value) in &expected {
            assert_eq!(map.get(*key), Some(*value));
        }
        for key in 2000..2100 {
            assert!(!map.contains_key(key));
        }
    }

    #[test]
    fn test_invalid_load_factor() {
        assert!(Int2IntOpenHashMap::new(16, 0.0).is_err());
        assert!(Int2IntOpenHashMap::new(16, 1.5).is_err());
        assert!(Int2IntOpenHashMap::new(16, 1.0).is_ok());
    }
}
