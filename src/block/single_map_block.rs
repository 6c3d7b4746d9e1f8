//! Single map view
//!
//! One map of a map container seen as a block of `2 * entry_count`
//! positions: keys at even positions, their values at the following odd ones.

use crate::block::map_block::comparable_key;
use crate::block::map_hash_tables::seek_key;
use crate::block::{Block, BlockBuilder, BlockRef};
use crate::common::constants::{MHT_HASH_MULTIPLIER, SIZE_OF_INT};
use crate::common::error::PrismResult;
use crate::common::helper::{check_selection_length, check_valid_position, check_valid_region};
use crate::types::TypeRef;
use crate::unsupported_err;
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Borrowed view over the interleaved pairs of one map
#[derive(Debug, Clone, Copy)]
pub(crate) struct SingleMapData<'a> {
    pub keys: &'a dyn Block,
    pub values: &'a dyn Block,
    pub offset: usize,
    pub position_count: usize,
}

impl<'a> SingleMapData<'a> {
    /// Child block and child position backing `position`
    pub fn locate(&self, position: usize) -> PrismResult<(&'a dyn Block, usize)> {
        check_valid_position(position, self.position_count)?;
        let child = if position % 2 == 0 { self.keys } else { self.values };
        Ok((child, self.offset + position / 2))
    }

    pub fn size_in_bytes(&self) -> PrismResult<usize> {
        let key_count = self.position_count.div_ceil(2);
        let value_count = self.position_count / 2;
        Ok(self.keys.region_size_in_bytes(self.offset, key_count)?
            + self.values.region_size_in_bytes(self.offset, value_count)?)
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.position_count, offset, length)?;
        let mut size = 0;
        for position in offset..offset + length {
            let (child, child_position) = self.locate(position)?;
            size += child.region_size_in_bytes(child_position, 1)?;
        }
        Ok(size)
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.position_count)?;
        let mut size = 0;
        for (position, _) in selected.iter().enumerate().filter(|(_, &keep)| keep) {
            let (child, child_position) = self.locate(position)?;
            size += child.region_size_in_bytes(child_position, 1)?;
        }
        Ok(size)
    }
}

/// Read accessors shared by the single map block and the map entry writer
macro_rules! delegate_single_map_reads {
    () => {
        fn get_slice_length(&self, position: usize) -> PrismResult<usize> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_slice_length(child_position)
        }

        fn get_byte(&self, position: usize, offset: usize) -> PrismResult<u8> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_byte(child_position, offset)
        }

        fn get_short(&self, position: usize, offset: usize) -> PrismResult<i16> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_short(child_position, offset)
        }

        fn get_int(&self, position: usize, offset: usize) -> PrismResult<i32> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_int(child_position, offset)
        }

        fn get_long(&self, position: usize, offset: usize) -> PrismResult<i64> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_long(child_position, offset)
        }

        fn get_slice(&self, position: usize, offset: usize, length: usize) -> PrismResult<Bytes> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_slice(child_position, offset, length)
        }

        fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_object(child_position)
        }

        fn write_position_to(
            &self,
            position: usize,
            builder: &mut dyn BlockBuilder,
        ) -> PrismResult<()> {
            let (child, child_position) = self.data().locate(position)?;
            child.write_position_to(child_position, builder)
        }

        fn is_null(&self, position: usize) -> PrismResult<bool> {
            let (child, child_position) = self.data().locate(position)?;
            child.is_null(child_position)
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

        fn get_region(&self, _offset: usize, _length: usize) -> PrismResult<BlockRef> {
            Err(unsupported_err!("{}: get_region", self.encoding_name()))
        }

        fn copy_region(&self, _offset: usize, _length: usize) -> PrismResult<BlockRef> {
            Err(unsupported_err!("{}: copy_region", self.encoding_name()))
        }

        fn copy_positions(
            &self,
            _positions: &[usize],
            _offset: usize,
            _length: usize,
        ) -> PrismResult<BlockRef> {
            Err(unsupported_err!("{}: copy_positions", self.encoding_name()))
        }

        fn get_single_value_block(&self, position: usize) -> PrismResult<BlockRef> {
            let (child, child_position) = self.data().locate(position)?;
            child.get_single_value_block(child_position)
        }
    };
}

pub(crate) use delegate_single_map_reads;

/// One map of a [`crate::block::MapBlock`]
#[derive(Debug, Clone)]
pub struct SingleMapBlock {
    offset: usize,
    entry_count: usize,
    keys: BlockRef,
    values: BlockRef,
    hash_tables: Arc<[i32]>,
    key_type: TypeRef,
}

impl SingleMapBlock {
    /// Map of the `entry_count` pairs starting at `offset` of `keys` and `values`
    pub fn new(
        offset: usize,
        entry_count: usize,
        keys: BlockRef,
        values: BlockRef,
        hash_tables: Arc<[i32]>,
        key_type: TypeRef,
    ) -> Self {
        Self {
            offset,
            entry_count,
            keys,
            values,
            hash_tables,
            key_type,
        }
    }

    fn data(&self) -> SingleMapData<'_> {
        SingleMapData {
            keys: self.keys.as_ref(),
            values: self.values.as_ref(),
            offset: self.offset,
            position_count: self.entry_count * 2,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// First pair of this map inside the key and value blocks
    pub fn offset(&self) -> usize {
        self.offset
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

    /// Position in this block of the value whose key equals
    /// `target[target_position]`
    pub fn seek_key(&self, target: &dyn Block, target_position: usize) -> PrismResult<Option<usize>> {
        let key_type = comparable_key(&self.key_type)?;
        let index = seek_key(
            &self.hash_tables,
            key_type,
            self.keys.as_ref(),
            self.offset,
            self.entry_count,
            target,
            target_position,
        )?;
        Ok(index.map(|index| index * 2 + 1))
    }
}

impl Block for SingleMapBlock {
    fn position_count(&self) -> usize {
        self.entry_count * 2
    }

    delegate_single_map_reads!();

    fn may_have_null(&self) -> bool {
        self.values.may_have_null()
    }

    fn retained_size_in_bytes(&self) -> usize {
        size_of::<Self>()
            + self.keys.retained_size_in_bytes()
            + self.values.retained_size_in_bytes()
            + SIZE_OF_INT * MHT_HASH_MULTIPLIER * self.entry_count
    }

    fn encoding_name(&self) -> &'static str {
        "MAP_ELEMENT"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{HashBuildMode, MapBlock, VariableWidthBlock};
    use crate::types::{Type, VarcharType};

    fn words(values: &[&str]) -> BlockRef {
        let mut offsets = vec![0];
        let mut slice = Vec::new();
        for value in values {
            slice.extend_from_slice(value.as_bytes());
            offsets.push(slice.len() as i32);
        }
        Arc::new(VariableWidthBlock::new(values.len(), Bytes::from(slice), offsets, None).unwrap())
    }

    fn map() -> PrismResult<BlockRef> {
        let block = MapBlock::from_key_value_block(
            2,
            None,
            vec![0, 1, 3],
            words(&["x", "k1", "k2"]),
            words(&["0", "v1", "v2"]),
            Arc::new(VarcharType::unbounded()),
            HashBuildMode::Strict,
        )?;
        block.get_object(1)
    }

    #[test]
    fn test_interleaved_positions() -> PrismResult<()> {
        let map = map()?;
        assert_eq!(map.position_count(), 4);
        assert_eq!(map.encoding_name(), "MAP_ELEMENT");
        assert_eq!(map.get_slice(0, 0, 2)?.as_ref(), b"k1");
        assert_eq!(map.get_slice(1, 0, 2)?.as_ref(), b"v1");
        assert_eq!(map.get_slice(3, 0, 2)?.as_ref(), b"v2");
        assert!(map.get_slice(4, 0, 1).is_err());
        // 2 keys + 2 values, 2 bytes each plus per-position overhead
        assert_eq!(map.size_in_bytes()?, 4 * 7);
        Ok(())
    }

    #[test]
    fn test_seek_key() -> PrismResult<()> {
        let map = map()?;
        let map = map.as_any().downcast_ref::<SingleMapBlock>().unwrap();
        let targets = words(&["k2", "x", "k1"]);
        assert_eq!(map.seek_key(targets.as_ref(), 0)?, Some(3));
        assert_eq!(map.seek_key(targets.as_ref(), 1)?, None);
        assert_eq!(map.seek_key(targets.as_ref(), 2)?, Some(1));

        let varchar = VarcharType::unbounded();
        assert_eq!(varchar.get_slice(map, 3)?.as_ref(), b"v2");
        Ok(())
    }

    #[test]
    fn test_copies_unsupported() -> PrismResult<()> {
        let map = map()?;
        assert!(map.get_region(0, 2).is_err());
        assert!(map.copy_positions(&[0], 0, 1).is_err());
        assert_eq!(map.get_single_value_block(1)?.position_count(), 1);
        Ok(())
    }
}
