//! Per-entry key lookup tables of map blocks
//!
//! All tables live back to back in one `i32` array. The table of a map entry
//! whose keys occupy positions `[start, end)` of the key block spans
//! `[start * MHT_HASH_MULTIPLIER, end * MHT_HASH_MULTIPLIER)`, so entries
//! never share buckets and a table is at most half full. A bucket holds the
//! key's index relative to `start`, or [`EMPTY_SLOT`].

use crate::block::Block;
use crate::common::constants::{EMPTY_SLOT, MHT_HASH_MULTIPLIER};
use crate::common::error::{PrismError, PrismResult};
use crate::common::helper::{calculate_new_array_size, fold_hash, size_of_vec};
use crate::invalid_arg_err;
use crate::types::ComparableType;
use std::sync::Arc;

/// Duplicate-key policy used while building a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashBuildMode {
    /// A repeated key replaces the earlier one
    #[default]
    LastValueWins,
    /// A repeated key fails the entry with [`PrismError::DuplicateKey`]
    Strict,
}

/// Bucket of `hash` in a table of `hash_table_size` buckets
#[inline]
pub fn compute_position(hash: u64, hash_table_size: usize) -> usize {
    ((fold_hash(hash) as u64 * hash_table_size as u64) >> 32) as usize
}

/// Growable hash tables of a map block builder
#[derive(Debug, Clone)]
pub struct MapHashTables {
    mode: HashBuildMode,
    hash_tables: Vec<i32>,
}

impl MapHashTables {
    pub fn new(mode: HashBuildMode, expected_keys: usize) -> Self {
        Self {
            mode,
            hash_tables: Vec::with_capacity(expected_keys * MHT_HASH_MULTIPLIER),
        }
    }

    pub fn mode(&self) -> HashBuildMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: HashBuildMode) {
        self.mode = mode;
    }

    /// Number of buckets currently in use
    pub fn len(&self) -> usize {
        self.hash_tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hash_tables.is_empty()
    }

    /// Current backing array. Re-fetch after every entry: the array may be
    /// reallocated when it grows.
    pub fn hash_tables(&self) -> &[i32] {
        &self.hash_tables
    }

    pub fn retained_size_in_bytes(&self) -> usize {
        size_of_vec(&self.hash_tables)
    }

    /// Immutable copy handed to a built block
    pub fn snapshot(&self) -> Arc<[i32]> {
        Arc::from(self.hash_tables.as_slice())
    }

    fn ensure_len(&mut self, required: usize) -> PrismResult<()> {
        if required > self.hash_tables.capacity() {
            let mut new_capacity = self.hash_tables.capacity();
            while new_capacity < required {
                new_capacity = calculate_new_array_size(new_capacity)?;
            }
            tracing::debug!(
                from = self.hash_tables.capacity(),
                to = new_capacity,
                "growing map hash tables"
            );
            self.hash_tables
                .reserve_exact(new_capacity - self.hash_tables.len());
        }
        if required > self.hash_tables.len() {
            self.hash_tables.resize(required, EMPTY_SLOT);
        }
        Ok(())
    }

    /// Builds the table of the entry whose keys are `keys[key_offset..key_offset + key_count]`
    pub fn build_entry(
        &mut self,
        key_type: &dyn ComparableType,
        keys: &dyn Block,
        key_offset: usize,
        key_count: usize,
    ) -> PrismResult<()> {
        let table_offset = key_offset * MHT_HASH_MULTIPLIER;
        let table_size = key_count * MHT_HASH_MULTIPLIER;
        self.ensure_len(table_offset + table_size)?;

        let table = &mut self.hash_tables[table_offset..table_offset + table_size];
        table.fill(EMPTY_SLOT);
        let result = build_table(table, self.mode, key_type, keys, key_offset, key_count);
        if result.is_err() {
            table.fill(EMPTY_SLOT);
        }
        result
    }

    /// Builds tables for every entry of a complete map layout
    pub fn build_all(
        &mut self,
        key_type: &dyn ComparableType,
        keys: &dyn Block,
        offsets: &[i32],
        entry_is_null: Option<&[bool]>,
    ) -> PrismResult<()> {
        let entry_count = offsets.len().saturating_sub(1);
        for entry in 0..entry_count {
            if entry_is_null.is_some_and(|nulls| nulls[entry]) {
                continue;
            }
            let start = offsets[entry] as usize;
            let end = offsets[entry + 1] as usize;
            self.build_entry(key_type, keys, start, end - start)?;
        }
        Ok(())
    }
}

fn build_table(
    table: &mut [i32],
    mode: HashBuildMode,
    key_type: &dyn ComparableType,
    keys: &dyn Block,
    key_offset: usize,
    key_count: usize,
) -> PrismResult<()> {
    let table_size = table.len();
    for index in 0..key_count {
        let key_position = key_offset + index;
        if keys.is_null(key_position)? {
            return Err(invalid_arg_err!("map key cannot be null"));
        }

        let hash = key_type.hash(keys, key_position)?;
        let mut slot = compute_position(hash, table_size);
        loop {
            let existing = table[slot];
            if existing == EMPTY_SLOT {
                table[slot] = index as i32;
                break;
            }
            let existing_position = key_offset + existing as usize;
            if key_type.equal_to(keys, existing_position, keys, key_position)? {
                match mode {
                    HashBuildMode::Strict => {
                        return Err(PrismError::DuplicateKey(
                            key_type.format_value(keys, key_position)?,
                        ));
                    }
                    HashBuildMode::LastValueWins => {
                        table[slot] = index as i32;
                        break;
                    }
                }
            }
            slot += 1;
            if slot == table_size {
                slot = 0;
            }
        }
    }
    Ok(())
}

/// Finds `target[target_position]` among the keys of one entry, returning
/// its index relative to `key_offset`
#[allow(clippy::too_many_arguments)]
pub fn seek_key(
    hash_tables: &[i32],
    key_type: &dyn ComparableType,
    keys: &dyn Block,
    key_offset: usize,
    key_count: usize,
    target: &dyn Block,
    target_position: usize,
) -> PrismResult<Option<usize>> {
    if key_count == 0 {
        return Ok(None);
    }
    let table_offset = key_offset * MHT_HASH_MULTIPLIER;
    let table_size = key_count * MHT_HASH_MULTIPLIER;
    let table = &hash_tables[table_offset..table_offset + table_size];

    let hash = key_type.hash(target, target_position)?;
    let mut slot = compute_position(hash, table_size);
    for _ in 0..table_size {
        let existing = table[slot];
        if existing == EMPTY_SLOT {
            return Ok(None);
        }
        let index = existing as usize;
        if key_type.equal_to(keys, key_offset + index, target, target_position)? {
            return Ok(Some(index));
        }
        slot += 1;
        if slot == table_size {
            slot = 0;
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockBuilder, FixedWidthBlockBuilder};
    use crate::types::BigintType;

    fn keys(values: &[i64]) -> FixedWidthBlockBuilder {
        let mut builder = FixedWidthBlockBuilder::new(8, None, values.len()).unwrap();
        for &value in values {
            builder.write_long(value).unwrap();
            builder.close_entry().unwrap();
        }
        builder
    }

    #[test]
    fn test_compute_position_in_range() {
        for size in [1usize, 2, 7, 64] {
            for hash in [0u64, 1, u64::MAX, 0xDEAD_BEEF_0000_0001] {
                assert!(compute_position(hash, size) < size);
            }
        }
    }

    #[test]
    fn test_build_and_seek() -> PrismResult<()> {
        let bigint = BigintType::new();
        let keys = keys(&[5, 7, 9, 11, 13]);
        let mut tables = MapHashTables::new(HashBuildMode::Strict, 5);
        // two entries: [5, 7] and [9, 11, 13]
        tables.build_all(&bigint, &keys, &[0, 2, 5], None)?;
        assert_eq!(tables.len(), 10);

        let target = self::keys(&[11, 5, 8]);
        let table = tables.hash_tables();
        assert_eq!(seek_key(table, &bigint, &keys, 2, 3, &target, 0)?, Some(1));
        assert_eq!(seek_key(table, &bigint, &keys, 0, 2, &target, 1)?, Some(0));
        assert_eq!(seek_key(table, &bigint, &keys, 2, 3, &target, 1)?, None);
        assert_eq!(seek_key(table, &bigint, &keys, 0, 2, &target, 2)?, None);
        assert_eq!(seek_key(table, &bigint, &keys, 0, 0, &target, 0)?, None);
        Ok(())
    }

    #[test]
    fn test_duplicate_keys() -> PrismResult<()> {
        let bigint = BigintType::new();
        let keys = keys(&[1, 1]);
        let mut strict = MapHashTables::new(HashBuildMode::Strict, 2);
        let err = strict.build_entry(&bigint, &keys, 0, 2).unwrap_err();
        assert!(matches!(err, PrismError::DuplicateKey(ref key) if key == "1"));
        assert!(strict.hash_tables().iter().all(|&slot| slot == EMPTY_SLOT));

        let mut lenient = MapHashTables::new(HashBuildMode::LastValueWins, 2);
        lenient.build_entry(&bigint, &keys, 0, 2)?;
        let found = seek_key(lenient.hash_tables(), &bigint, &keys, 0, 2, &keys, 0)?;
        assert_eq!(found, Some(1));
        Ok(())
    }

    #[test]
    fn test_null_key_rejected() -> PrismResult<()> {
        let bigint = BigintType::new();
        let mut keys = keys(&[1]);
        keys.append_null()?;
        let mut tables = MapHashTables::new(HashBuildMode::LastValueWins, 2);
        assert!(matches!(
            tables.build_entry(&bigint, &keys, 0, 2),
            Err(PrismError::InvalidArgument(_))
        ));
        Ok(())
    }
}
