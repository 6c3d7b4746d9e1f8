//! Map block
//!
//! Keys and values live in two parallel child blocks. Map `i` owns the pairs
//! at positions `[offsets[i], offsets[i + 1])` of both, and a lookup table in
//! the shared [`MapHashTables`](crate::block::MapHashTables) layout.

use crate::block::map_hash_tables::{HashBuildMode, MapHashTables};
use crate::block::single_map_block::SingleMapBlock;
use crate::block::{Block, BlockBuilder, BlockRef, SIZE_IN_BYTES_PER_POSITION};
use crate::common::constants::{MHT_HASH_MULTIPLIER, SIZE_OF_INT};
use crate::common::error::{PrismError, PrismResult};
use crate::common::helper::{
    check_selection_length, check_valid_position, check_valid_positions, check_valid_region,
    compact_offsets, size_of_optional, size_of_slice, to_offset,
};
use crate::types::{ComparableType, TypeRef};
use crate::{invalid_arg_err, unsupported_err};
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Comparison capability of a map key type
pub(crate) fn comparable_key(key_type: &TypeRef) -> PrismResult<&dyn ComparableType> {
    key_type
        .as_comparable()
        .ok_or_else(|| PrismError::NotComparable(key_type.display_name()))
}

/// Borrowed view over map storage, shared by the block and its builder
#[derive(Debug, Clone, Copy)]
pub(crate) struct MapData<'a> {
    pub offsets: &'a [i32],
    pub value_is_null: Option<&'a [bool]>,
    pub keys: &'a dyn Block,
    pub values: &'a dyn Block,
    pub hash_tables: &'a [i32],
    pub key_type: &'a TypeRef,
}

impl<'a> MapData<'a> {
    pub fn position_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_null(&self, position: usize) -> PrismResult<bool> {
        check_valid_position(position, self.position_count())?;
        Ok(self.value_is_null.is_some_and(|nulls| nulls[position]))
    }

    /// First pair and pair count of map `position`
    pub fn entry(&self, position: usize) -> PrismResult<(usize, usize)> {
        check_valid_position(position, self.position_count())?;
        let start = self.offsets[position] as usize;
        let end = self.offsets[position + 1] as usize;
        Ok((start, end - start))
    }

    fn pairs_size(&self, start: usize, count: usize) -> PrismResult<usize> {
        Ok(self.keys.region_size_in_bytes(start, count)?
            + self.values.region_size_in_bytes(start, count)?
            + SIZE_OF_INT * MHT_HASH_MULTIPLIER * count)
    }

    pub fn size_in_bytes(&self) -> PrismResult<usize> {
        self.region_size_in_bytes(0, self.position_count())
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.position_count(), offset, length)?;
        let start = self.offsets[offset] as usize;
        let end = self.offsets[offset + length] as usize;
        Ok(self.pairs_size(start, end - start)? + SIZE_IN_BYTES_PER_POSITION * length)
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.position_count())?;
        let mut used = vec![false; self.keys.position_count()];
        let mut used_pairs = 0;
        let mut used_count = 0;
        for (position, _) in selected.iter().enumerate().filter(|(_, &keep)| keep) {
            let start = self.offsets[position] as usize;
            let end = self.offsets[position + 1] as usize;
            used[start..end].iter_mut().for_each(|flag| *flag = true);
            used_pairs += end - start;
            used_count += 1;
        }
        Ok(self.keys.positions_size_in_bytes(&used)?
            + self.values.positions_size_in_bytes(&used)?
            + SIZE_OF_INT * MHT_HASH_MULTIPLIER * used_pairs
            + SIZE_IN_BYTES_PER_POSITION * used_count)
    }

    pub fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        if self.is_null(position)? {
            return builder.append_null();
        }
        let (start, count) = self.entry(position)?;
        let entry = builder.begin_block_entry()?;
        for pair in start..start + count {
            self.keys.write_position_to(pair, entry)?;
            self.values.write_position_to(pair, entry)?;
        }
        builder.close_entry()
    }

    fn table_of(&self, start: usize, count: usize) -> &'a [i32] {
        &self.hash_tables[start * MHT_HASH_MULTIPLIER..(start + count) * MHT_HASH_MULTIPLIER]
    }

    pub fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<MapBlock> {
        check_valid_positions(positions, offset, length, self.position_count())?;
        let selected = &positions[offset..offset + length];

        let mut new_offsets = Vec::with_capacity(length + 1);
        let mut new_nulls = self.value_is_null.map(|_| Vec::with_capacity(length));
        let mut pair_positions = Vec::new();
        let mut new_tables = Vec::new();
        new_offsets.push(0);

        for &position in selected {
            let start = self.offsets[position] as usize;
            let end = self.offsets[position + 1] as usize;
            pair_positions.extend(start..end);
            // tables hold entry-relative indices, so they copy verbatim
            new_tables.extend_from_slice(self.table_of(start, end - start));
            new_offsets.push(to_offset(pair_positions.len())?);
            if let (Some(target), Some(source)) = (new_nulls.as_mut(), self.value_is_null) {
                target.push(source[position]);
            }
        }

        let pair_count = pair_positions.len();
        Ok(MapBlock::from_parts(
            0,
            length,
            new_nulls.map(Into::into),
            new_offsets.into(),
            self.keys.copy_positions(&pair_positions, 0, pair_count)?,
            self.values.copy_positions(&pair_positions, 0, pair_count)?,
            new_tables.into(),
            Arc::clone(self.key_type),
        ))
    }

    pub fn copy_region(&self, offset: usize, length: usize) -> PrismResult<MapBlock> {
        check_valid_region(self.position_count(), offset, length)?;
        let start = self.offsets[offset] as usize;
        let count = self.offsets[offset + length] as usize - start;

        Ok(MapBlock::from_parts(
            0,
            length,
            self.value_is_null
                .map(|nulls| Arc::<[bool]>::from(&nulls[offset..offset + length])),
            compact_offsets(self.offsets, offset, length).into(),
            self.keys.copy_region(start, count)?,
            self.values.copy_region(start, count)?,
            Arc::from(self.table_of(start, count)),
            Arc::clone(self.key_type),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct MapBlock {
    array_offset: usize,
    position_count: usize,
    value_is_null: Option<Arc<[bool]>>,
    offsets: Arc<[i32]>,
    keys: BlockRef,
    values: BlockRef,
    hash_tables: Arc<[i32]>,
    key_type: TypeRef,
}

impl MapBlock {
    /// Create a map block over parallel key and value blocks, building the
    /// lookup tables of every map
    pub fn from_key_value_block(
        position_count: usize,
        map_is_null: Option<Vec<bool>>,
        offsets: Vec<i32>,
        keys: BlockRef,
        values: BlockRef,
        key_type: TypeRef,
        mode: HashBuildMode,
    ) -> PrismResult<Self> {
        let comparable = comparable_key(&key_type)?;
        if keys.position_count() != values.position_count() {
            return Err(invalid_arg_err!(
                "keys ({}) and values ({}) must have the same position count",
                keys.position_count(),
                values.position_count()
            ));
        }
        if offsets.len() < position_count + 1 {
            return Err(invalid_arg_err!(
                "offsets length {} is less than positionCount {} + 1",
                offsets.len(),
                position_count
            ));
        }
        if let Some(nulls) = &map_is_null {
            if nulls.len() < position_count {
                return Err(invalid_arg_err!(
                    "mapIsNull length {} is less than positionCount {}",
                    nulls.len(),
                    position_count
                ));
            }
        }
        let offsets = &offsets[..=position_count];
        if offsets[0] < 0 || offsets.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(invalid_arg_err!("offsets must be non-negative and non-decreasing"));
        }
        if offsets[position_count] as usize > keys.position_count() {
            return Err(invalid_arg_err!(
                "last offset {} exceeds key position count {}",
                offsets[position_count],
                keys.position_count()
            ));
        }

        let mut hash_tables = MapHashTables::new(mode, keys.position_count());
        hash_tables.build_all(
            comparable,
            keys.as_ref(),
            offsets,
            map_is_null.as_deref(),
        )?;
        let mut tables = hash_tables.hash_tables().to_vec();
        tables.resize(keys.position_count() * MHT_HASH_MULTIPLIER, crate::common::EMPTY_SLOT);

        Ok(Self::from_parts(
            0,
            position_count,
            map_is_null.map(Into::into),
            offsets.into(),
            keys,
            values,
            tables.into(),
            key_type,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        array_offset: usize,
        position_count: usize,
        value_is_null: Option<Arc<[bool]>>,
        offsets: Arc<[i32]>,
        keys: BlockRef,
        values: BlockRef,
        hash_tables: Arc<[i32]>,
        key_type: TypeRef,
    ) -> Self {
        Self {
            array_offset,
            position_count,
            value_is_null,
            offsets,
            keys,
            values,
            hash_tables,
            key_type,
        }
    }

    fn data(&self) -> MapData<'_> {
        let end = self.array_offset + self.position_count;
        MapData {
            offsets: &self.offsets[self.array_offset..=end],
            value_is_null: self
                .value_is_null
                .as_deref()
                .map(|nulls| &nulls[self.array_offset..end]),
            keys: self.keys.as_ref(),
            values: self.values.as_ref(),
            hash_tables: &self.hash_tables,
            key_type: &self.key_type,
        }
    }

    pub fn keys(&self) -> &BlockRef {
        &self.keys
    }

    pub fn values(&self) -> &BlockRef {
        &self.values
    }

    pub fn key_type(&self) -> &TypeRef {
        &self.key_type
    }

    pub fn hash_tables(&self) -> &[i32] {
        &self.hash_tables
    }
}

impl Block for MapBlock {
    fn position_count(&self) -> usize {
        self.position_count
    }

    fn get_slice_length(&self, _position: usize) -> PrismResult<usize> {
        Err(unsupported_err!("{}: get_slice_length", self.encoding_name()))
    }

    /// Single map view sharing keys, values and hash tables
    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        let (start, count) = self.data().entry(position)?;
        Ok(Arc::new(SingleMapBlock::new(
            start,
            count,
            Arc::clone(&self.keys),
            Arc::clone(&self.values),
            Arc::clone(&self.hash_tables),
            Arc::clone(&self.key_type),
        )))
    }

    fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        self.data().write_position_to(position, builder)
    }

    fn is_null(&self, position: usize) -> PrismResult<bool> {
        self.data().is_null(position)
    }

    fn may_have_null(&self) -> bool {
        self.value_is_null.is_some()
    }

    fn size_in_bytes(&self) -> PrismResult<usize> {
        self.data().size_in_bytes()
    }

    fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        self.data().region_size_in_bytes(offset, length)
    }

    fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        self.data().positions_size_in_bytes(selected)
    }

    fn retained_size_in_bytes(&self) -> usize {
        size_of::<Self>()
            + size_of_slice(&self.offsets)
            + size_of_optional(self.value_is_null.as_deref())
            + size_of_slice(&self.hash_tables)
            + self.keys.retained_size_in_bytes()
            + self.values.retained_size_in_bytes()
    }

    fn encoding_name(&self) -> &'static str {
        "MAP"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        let mut region = self.clone();
        region.array_offset += offset;
        region.position_count = length;
        Ok(Arc::new(region))
    }

    fn is_compact_region(&self, offset: usize, length: usize) -> bool {
        offset == 0
            && length == self.position_count
            && self.array_offset == 0
            && self.offsets.len() == length + 1
            && self.offsets[0] == 0
            && self.offsets[length] as usize == self.keys.position_count()
            && self
                .value_is_null
                .as_ref()
                .is_none_or(|nulls| nulls.len() == length)
    }

    fn copy_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        if self.is_compact_region(offset, length) {
            return Ok(Arc::new(self.clone()));
        }
        Ok(Arc::new(self.data().copy_region(offset, length)?))
    }

    fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<BlockRef> {
        Ok(Arc::new(self.data().copy_positions(positions, offset, length)?))
    }

    fn get_single_value_block(&self, position: usize) -> PrismResult<BlockRef> {
        check_valid_position(position, self.position_count)?;
        Ok(Arc::new(self.data().copy_region(position, 1)?))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{FixedWidthBlock, VariableWidthBlock};
    use crate::types::BigintType;
    use bytes::Bytes;

    fn longs(values: &[i64]) -> BlockRef {
        let slice: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Arc::new(FixedWidthBlock::new(8, values.len(), Bytes::from(slice), None).unwrap())
    }

    fn strings(values: &[&str]) -> BlockRef {
        let mut offsets = vec![0];
        let mut slice = Vec::new();
        for value in values {
            slice.extend_from_slice(value.as_bytes());
            offsets.push(slice.len() as i32);
        }
        Arc::new(VariableWidthBlock::new(values.len(), Bytes::from(slice), offsets, None).unwrap())
    }

    fn sample() -> PrismResult<MapBlock> {
        // {1: a, 2: bb}, null, {}, {3: ccc}
        MapBlock::from_key_value_block(
            4,
            Some(vec![false, true, false, false]),
            vec![0, 2, 2, 2, 3],
            longs(&[1, 2, 3]),
            strings(&["a", "bb", "ccc"]),
            Arc::new(BigintType::new()),
            HashBuildMode::Strict,
        )
    }

    fn lookup(map: &BlockRef, key: i64) -> PrismResult<Option<String>> {
        let map = map.as_any().downcast_ref::<SingleMapBlock>().unwrap();
        let target = longs(&[key]);
        Ok(match map.seek_key(target.as_ref(), 0)? {
            Some(position) => {
                let length = map.get_slice_length(position)?;
                Some(String::from_utf8(map.get_slice(position, 0, length)?.to_vec()).unwrap())
            }
            None => None,
        })
    }

    #[test]
    fn test_lookup() -> PrismResult<()> {
        let block = sample()?;
        let first = block.get_object(0)?;
        assert_eq!(first.position_count(), 4);
        assert_eq!(lookup(&first, 2)?, Some("bb".to_string()));
        assert_eq!(lookup(&first, 3)?, None);

        assert!(block.is_null(1)?);
        assert_eq!(block.get_object(2)?.position_count(), 0);
        assert_eq!(lookup(&block.get_object(3)?, 3)?, Some("ccc".to_string()));
        Ok(())
    }

    #[test]
    fn test_construction_checks() {
        let bigint: TypeRef = Arc::new(BigintType::new());
        assert!(MapBlock::from_key_value_block(
            1,
            None,
            vec![0, 2],
            longs(&[1, 2]),
            strings(&["a"]),
            Arc::clone(&bigint),
            HashBuildMode::LastValueWins,
        )
        .is_err());
        assert!(MapBlock::from_key_value_block(
            1,
            None,
            vec![0, 2],
            longs(&[1, 1]),
            strings(&["a", "b"]),
            Arc::clone(&bigint),
            HashBuildMode::Strict,
        )
        .is_err());
        assert!(MapBlock::from_key_value_block(
            1,
            None,
            vec![0, 2],
            longs(&[1, 1]),
            strings(&["a", "b"]),
            bigint,
            HashBuildMode::LastValueWins,
        )
        .is_ok());
    }

    #[test]
    fn test_copy_positions_keeps_lookups() -> PrismResult<()> {
        let block = sample()?;
        let copy = block.copy_positions(&[3, 1, 0], 0, 3)?;
        assert_eq!(lookup(&copy.get_object(0)?, 3)?, Some("ccc".to_string()));
        assert!(copy.is_null(1)?);
        assert_eq!(lookup(&copy.get_object(2)?, 1)?, Some("a".to_string()));

        let copy = copy.as_any().downcast_ref::<MapBlock>().unwrap();
        assert_eq!(copy.keys().position_count(), 3);
        assert_eq!(copy.hash_tables().len(), 3 * MHT_HASH_MULTIPLIER);
        Ok(())
    }

    #[test]
    fn test_region_and_copy_region() -> PrismResult<()> {
        let block = sample()?;
        let region = block.get_region(2, 2)?;
        assert_eq!(lookup(&region.get_object(1)?, 3)?, Some("ccc".to_string()));

        let copy = region.copy_region(1, 1)?;
        let copy = copy.as_any().downcast_ref::<MapBlock>().unwrap();
        assert_eq!(copy.keys().position_count(), 1);
        assert_eq!(lookup(&copy.get_object(0)?, 3)?, Some("ccc".to_string()));

        let same = block.copy_region(0, 4)?;
        let same = same.as_any().downcast_ref::<MapBlock>().unwrap();
        assert!(Arc::ptr_eq(same.keys(), block.keys()));
        Ok(())
    }

    #[test]
    fn test_sizes() -> PrismResult<()> {
        let block = sample()?;
        // keys 3 * 9, values 6 + 3 * 5, tables 3 * 8, maps 4 * 5
        assert_eq!(block.size_in_bytes()?, 27 + 21 + 24 + 20);
        assert_eq!(block.region_size_in_bytes(3, 1)?, 9 + 8 + 8 + 5);
        assert!(block.retained_size_in_bytes() > block.size_in_bytes()?);
        Ok(())
    }
}
