//! Dictionary block
//!
//! Positions are ids into a shared dictionary block. Copies remap the ids so
//! that only the dictionary entries still referenced are carried along.

use crate::block::{Block, BlockBuilder, BlockRef};
use crate::common::constants::SIZE_OF_INT;
use crate::common::error::PrismResult;
use crate::common::helper::{
    check_selection_length, check_valid_position, check_valid_positions, check_valid_region,
    size_of_slice, to_offset,
};
use crate::common::int_hash_map::Int2IntOpenHashMap;
use crate::invalid_arg_err;
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DictionaryBlock {
    ids_offset: usize,
    position_count: usize,
    dictionary: BlockRef,
    ids: Arc<[i32]>,
}

impl DictionaryBlock {
    /// Block of `position_count` ids into `dictionary`
    pub fn new(position_count: usize, dictionary: BlockRef, ids: Vec<i32>) -> PrismResult<Self> {
        Self::with_ids_offset(0, position_count, dictionary, ids.into())
    }

    pub fn with_ids_offset(
        ids_offset: usize,
        position_count: usize,
        dictionary: BlockRef,
        ids: Arc<[i32]>,
    ) -> PrismResult<Self> {
        if ids.len() < ids_offset + position_count {
            return Err(invalid_arg_err!(
                "ids length {} is less than idsOffset {} + positionCount {}",
                ids.len(),
                ids_offset,
                position_count
            ));
        }
        let dictionary_size = dictionary.position_count();
        if let Some(id) = ids[ids_offset..ids_offset + position_count]
            .iter()
            .find(|&&id| id < 0 || id as usize >= dictionary_size)
        {
            return Err(invalid_arg_err!(
                "dictionary id {} is outside of a dictionary with {} positions",
                id,
                dictionary_size
            ));
        }
        Ok(Self {
            ids_offset,
            position_count,
            dictionary,
            ids,
        })
    }

    pub fn dictionary(&self) -> &BlockRef {
        &self.dictionary
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids[self.ids_offset..self.ids_offset + self.position_count]
    }

    /// Dictionary position referenced by `position`
    pub fn id(&self, position: usize) -> PrismResult<usize> {
        check_valid_position(position, self.position_count)?;
        Ok(self.ids[self.ids_offset + position] as usize)
    }

    /// Number of distinct dictionary positions referenced
    pub fn unique_ids(&self) -> usize {
        let mut seen = vec![false; self.dictionary.position_count()];
        self.ids()
            .iter()
            .filter(|&&id| !std::mem::replace(&mut seen[id as usize], true))
            .count()
    }

    /// True when every dictionary entry is referenced
    pub fn is_compact(&self) -> bool {
        self.unique_ids() == self.dictionary.position_count()
    }

    /// Dictionary block whose dictionary only holds referenced entries
    pub fn compact(&self) -> PrismResult<Self> {
        if self.is_compact() {
            return Ok(self.clone());
        }
        let positions: Vec<usize> = (0..self.position_count).collect();
        self.remap(&positions)
    }

    fn used_dictionary_positions<'a>(
        &self,
        positions: impl Iterator<Item = &'a i32>,
    ) -> Vec<bool> {
        let mut used = vec![false; self.dictionary.position_count()];
        for &id in positions {
            used[id as usize] = true;
        }
        used
    }

    /// New block over `positions`, with a dictionary of only the entries they use
    fn remap(&self, positions: &[usize]) -> PrismResult<Self> {
        let mut old_to_new = Int2IntOpenHashMap::with_expected_size(positions.len());
        let mut positions_to_copy: Vec<usize> = Vec::new();
        let mut new_ids = Vec::with_capacity(positions.len());

        for &position in positions {
            let old_id = self.id(position)?;
            let candidate = to_offset(positions_to_copy.len())?;
            match old_to_new.put_if_absent(to_offset(old_id)?, candidate) {
                Some(new_id) => new_ids.push(new_id),
                None => {
                    positions_to_copy.push(old_id);
                    new_ids.push(candidate);
                }
            }
        }

        let dictionary =
            self.dictionary
                .copy_positions(&positions_to_copy, 0, positions_to_copy.len())?;
        Self::new(positions.len(), dictionary, new_ids)
    }
}

impl Block for DictionaryBlock {
    fn position_count(&self) -> usize {
        self.position_count
    }

    fn get_slice_length(&self, position: usize) -> PrismResult<usize> {
        self.dictionary.get_slice_length(self.id(position)?)
    }

    fn get_byte(&self, position: usize, offset: usize) -> PrismResult<u8> {
        self.dictionary.get_byte(self.id(position)?, offset)
    }

    fn get_short(&self, position: usize, offset: usize) -> PrismResult<i16> {
        self.dictionary.get_short(self.id(position)?, offset)
    }

    fn get_int(&self, position: usize, offset: usize) -> PrismResult<i32> {
        self.dictionary.get_int(self.id(position)?, offset)
    }

    fn get_long(&self, position: usize, offset: usize) -> PrismResult<i64> {
        self.dictionary.get_long(self.id(position)?, offset)
    }

    fn get_slice(&self, position: usize, offset: usize, length: usize) -> PrismResult<Bytes> {
        self.dictionary.get_slice(self.id(position)?, offset, length)
    }

    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        self.dictionary.get_object(self.id(position)?)
    }

    fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        self.dictionary.write_position_to(self.id(position)?, builder)
    }

    fn is_null(&self, position: usize) -> PrismResult<bool> {
        self.dictionary.is_null(self.id(position)?)
    }

    fn may_have_null(&self) -> bool {
        self.dictionary.may_have_null()
    }

    /// Referenced dictionary entries plus one id per position
    fn size_in_bytes(&self) -> PrismResult<usize> {
        self.region_size_in_bytes(0, self.position_count)
    }

    fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.position_count, offset, length)?;
        let used = self.used_dictionary_positions(self.ids()[offset..offset + length].iter());
        Ok(self.dictionary.positions_size_in_bytes(&used)? + SIZE_OF_INT * length)
    }

    fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.position_count)?;
        let ids = self
            .ids()
            .iter()
            .zip(selected)
            .filter_map(|(id, &keep)| keep.then_some(id));
        let used = self.used_dictionary_positions(ids);
        let used_count = selected.iter().filter(|&&keep| keep).count();
        Ok(self.dictionary.positions_size_in_bytes(&used)? + SIZE_OF_INT * used_count)
    }

    fn retained_size_in_bytes(&self) -> usize {
        size_of::<Self>() + size_of_slice(&self.ids) + self.dictionary.retained_size_in_bytes()
    }

    fn encoding_name(&self) -> &'static str {
        "DICTIONARY"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        Ok(Arc::new(Self {
            ids_offset: self.ids_offset + offset,
            position_count: length,
            dictionary: Arc::clone(&self.dictionary),
            ids: Arc::clone(&self.ids),
        }))
    }

    fn is_compact_region(&self, offset: usize, length: usize) -> bool {
        offset == 0
            && length == self.position_count
            && self.ids_offset == 0
            && self.ids.len() == length
            && self.is_compact()
    }

    fn copy_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        if self.is_compact_region(offset, length) {
            return Ok(Arc::new(self.clone()));
        }
        let positions: Vec<usize> = (offset..offset + length).collect();
        Ok(Arc::new(self.remap(&positions)?))
    }

    fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<BlockRef> {
        check_valid_positions(positions, offset, length, self.position_count)?;
        Ok(Arc::new(self.remap(&positions[offset..offset + length])?))
    }

    fn get_single_value_block(&self, position: usize) -> PrismResult<BlockRef> {
        self.dictionary.get_single_value_block(self.id(position)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
