//! Variable-width block builder
//!
//! Backing storage is allocated on the first write, so builders that stay
//! empty cost nothing. Everything read out of the builder is copied out of
//! its growable buffers.

use crate::block::status::BlockBuilderStatus;
use crate::block::variable_width_block::{VariableWidthBlock, VariableWidthData};
use crate::block::{Block, BlockBuilder, BlockRef, SIZE_IN_BYTES_PER_POSITION};
use crate::common::constants::MAX_ARRAY_SIZE;
use crate::common::error::PrismResult;
use crate::common::helper::{
    calculate_block_reset_bytes, calculate_block_reset_size, calculate_new_array_size,
    size_of_vec, to_offset,
};
use crate::illegal_state_err;
use byteorder::{LittleEndian, WriteBytesExt};
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Offsets of a builder that has not been written to yet
const EMPTY_OFFSETS: &[i32] = &[0];

#[derive(Debug)]
pub struct VariableWidthBlockBuilder {
    status: Option<BlockBuilderStatus>,

    initialized: bool,
    initial_entry_count: usize,
    initial_slice_output_size: usize,

    slice_output: Vec<u8>,
    has_null_value: bool,
    value_is_null: Vec<bool>,
    offsets: Vec<i32>,

    positions: usize,
    current_entry_size: usize,
}

impl VariableWidthBlockBuilder {
    pub fn new(
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
        expected_bytes: usize,
    ) -> Self {
        let max_bytes = status
            .as_ref()
            .map_or(MAX_ARRAY_SIZE, BlockBuilderStatus::max_page_size_in_bytes);

        Self {
            status,
            initialized: false,
            initial_entry_count: expected_entries,
            initial_slice_output_size: expected_bytes.min(max_bytes),
            slice_output: Vec::new(),
            has_null_value: false,
            value_is_null: Vec::new(),
            offsets: Vec::new(),
            positions: 0,
            current_entry_size: 0,
        }
    }

    fn data(&self) -> VariableWidthData<'_> {
        let offsets = if self.initialized {
            &self.offsets[..=self.positions]
        } else {
            EMPTY_OFFSETS
        };
        VariableWidthData {
            slice: &self.slice_output,
            offsets,
            value_is_null: self
                .has_null_value
                .then(|| &self.value_is_null[..self.positions]),
        }
    }

    /// Bytes written so far for the entry that is not closed yet
    pub fn current_entry_size(&self) -> usize {
        self.current_entry_size
    }

    fn initialize_capacity(&mut self) {
        self.slice_output = Vec::with_capacity(self.initial_slice_output_size);
        self.value_is_null = Vec::with_capacity(self.initial_entry_count);
        self.offsets = Vec::with_capacity(self.initial_entry_count + 1);
        self.offsets.push(0);
        self.initialized = true;
    }

    fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.initialize_capacity();
        }
    }

    fn grow_capacity(&mut self) -> PrismResult<()> {
        let new_size = calculate_new_array_size(self.value_is_null.capacity())?;
        tracing::trace!(
            from = self.value_is_null.capacity(),
            to = new_size,
            "growing variable width builder arrays"
        );
        self.value_is_null
            .reserve_exact(new_size - self.value_is_null.len());
        self.offsets.reserve_exact(new_size + 1 - self.offsets.len());
        Ok(())
    }

    fn entry_added(&mut self, bytes_written: usize, is_null: bool) -> PrismResult<()> {
        self.ensure_initialized();
        if self.value_is_null.len() == self.value_is_null.capacity() {
            self.grow_capacity()?;
        }

        let end = to_offset(self.slice_output.len())?;
        self.value_is_null.push(is_null);
        self.offsets.push(end);
        self.positions += 1;
        self.has_null_value |= is_null;

        if let Some(status) = &self.status {
            status.add_bytes(SIZE_IN_BYTES_PER_POSITION + bytes_written);
        }
        Ok(())
    }

    fn check_entry_closed(&self, operation: &str) -> PrismResult<()> {
        if self.current_entry_size > 0 {
            return Err(illegal_state_err!(
                "Current entry must be closed before {}",
                operation
            ));
        }
        Ok(())
    }
}

impl Block for VariableWidthBlockBuilder {
    fn position_count(&self) -> usize {
        self.positions
    }

    fn get_slice_length(&self, position: usize) -> PrismResult<usize> {
        self.data().slice_length(position)
    }

    fn get_byte(&self, position: usize, offset: usize) -> PrismResult<u8> {
        self.data().get_byte(position, offset)
    }

    fn get_short(&self, position: usize, offset: usize) -> PrismResult<i16> {
        self.data().get_short(position, offset)
    }

    fn get_int(&self, position: usize, offset: usize) -> PrismResult<i32> {
        self.data().get_int(position, offset)
    }

    fn get_long(&self, position: usize, offset: usize) -> PrismResult<i64> {
        self.data().get_long(position, offset)
    }

    fn get_slice(&self, position: usize, offset: usize, length: usize) -> PrismResult<Bytes> {
        Ok(Bytes::copy_from_slice(self.data().read(position, offset, length)?))
    }

    fn bytes_equal(
        &self,
        position: usize,
        offset: usize,
        other: &[u8],
        length: usize,
    ) -> PrismResult<bool> {
        let value = self.data().read(position, offset, length)?;
        Ok(other.len() >= length && value == &other[..length])
    }

    fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        self.data().write_position_to(position, builder)
    }

    fn is_null(&self, position: usize) -> PrismResult<bool> {
        self.data().is_null(position)
    }

    fn may_have_null(&self) -> bool {
        self.has_null_value
    }

    fn size_in_bytes(&self) -> PrismResult<usize> {
        Ok(self.data().size_in_bytes())
    }

    fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        self.data().region_size_in_bytes(offset, length)
    }

    fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        self.data().positions_size_in_bytes(selected)
    }

    fn retained_size_in_bytes(&self) -> usize {
        let mut size = size_of::<Self>()
            + size_of_vec(&self.slice_output)
            + size_of_vec(&self.value_is_null)
            + size_of_vec(&self.offsets);
        if self.status.is_some() {
            size += size_of::<BlockBuilderStatus>();
        }
        size
    }

    fn encoding_name(&self) -> &'static str {
        "VARIABLE_WIDTH"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        Ok(Arc::new(self.data().copy_region(offset, length)?))
    }

    fn copy_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
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
        Ok(Arc::new(self.data().single_value_block(position)?))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BlockBuilder for VariableWidthBlockBuilder {
    fn write_byte(&mut self, value: u8) -> PrismResult<()> {
        self.ensure_initialized();
        self.slice_output.write_u8(value)?;
        self.current_entry_size += 1;
        Ok(())
    }

    fn write_short(&mut self, value: i16) -> PrismResult<()> {
        self.ensure_initialized();
        self.slice_output.write_i16::<LittleEndian>(value)?;
        self.current_entry_size += 2;
        Ok(())
    }

    fn write_int(&mut self, value: i32) -> PrismResult<()> {
        self.ensure_initialized();
        self.slice_output.write_i32::<LittleEndian>(value)?;
        self.current_entry_size += 4;
        Ok(())
    }

    fn write_long(&mut self, value: i64) -> PrismResult<()> {
        self.ensure_initialized();
        self.slice_output.write_i64::<LittleEndian>(value)?;
        self.current_entry_size += 8;
        Ok(())
    }

    fn write_bytes(&mut self, source: &[u8]) -> PrismResult<()> {
        self.ensure_initialized();
        self.slice_output.extend_from_slice(source);
        self.current_entry_size += source.len();
        Ok(())
    }

    fn close_entry(&mut self) -> PrismResult<()> {
        self.entry_added(self.current_entry_size, false)?;
        self.current_entry_size = 0;
        Ok(())
    }

    fn append_null(&mut self) -> PrismResult<()> {
        self.check_entry_closed("appending null")?;
        self.entry_added(0, true)
    }

    fn build(&self) -> PrismResult<BlockRef> {
        self.check_entry_closed("building the block")?;
        let data = self.data();
        Ok(Arc::new(VariableWidthBlock::from_parts(
            0,
            self.positions,
            Bytes::copy_from_slice(data.slice),
            Arc::from(data.offsets),
            data.value_is_null.map(Arc::from),
        )))
    }

    fn new_block_builder_like(
        &self,
        status: Option<BlockBuilderStatus>,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        let offsets = self.data().offsets;
        let current_size_in_bytes = (offsets[self.positions] - offsets[0]) as usize;
        Ok(Box::new(Self::new(
            status,
            calculate_block_reset_size(self.positions),
            calculate_block_reset_bytes(current_size_in_bytes),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::status::PageBuilderStatus;
    use crate::common::constants::DEFAULT_CAPACITY;
    use crate::common::error::PrismError;

    fn builder_of(values: &[Option<&str>]) -> VariableWidthBlockBuilder {
        let mut builder = VariableWidthBlockBuilder::new(None, 2, 8);
        for value in values {
            match value {
                Some(value) => {
                    builder.write_bytes(value.as_bytes()).unwrap();
                    builder.close_entry().unwrap();
                }
                None => builder.append_null().unwrap(),
            }
        }
        builder
    }

    fn strings(block: &dyn Block) -> Vec<Option<String>> {
        (0..block.position_count())
            .map(|position| {
                if block.is_null(position).unwrap() {
                    return None;
                }
                let length = block.get_slice_length(position).unwrap();
                let value = block.get_slice(position, 0, length).unwrap();
                Some(String::from_utf8(value.to_vec()).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_lazy_initialization() {
        let builder = VariableWidthBlockBuilder::new(None, 1024, 1 << 20);
        assert_eq!(builder.slice_output.capacity(), 0);
        assert_eq!(builder.position_count(), 0);
        assert_eq!(builder.size_in_bytes().unwrap(), 0);
        assert!(builder.retained_size_in_bytes() < 1024);

        let block = builder.build().unwrap();
        assert_eq!(block.position_count(), 0);
        assert!(!block.may_have_null());
    }

    #[test]
    fn test_primitive_writes() -> PrismResult<()> {
        let mut builder = VariableWidthBlockBuilder::new(None, 1, 16);
        builder.write_byte(1)?;
        builder.write_short(-2)?;
        builder.write_int(3)?;
        builder.write_long(-4)?;
        assert_eq!(builder.current_entry_size(), 15);
        builder.close_entry()?;
        assert_eq!(builder.current_entry_size(), 0);

        assert_eq!(builder.get_slice_length(0)?, 15);
        assert_eq!(builder.get_byte(0, 0)?, 1);
        assert_eq!(builder.get_short(0, 1)?, -2);
        assert_eq!(builder.get_int(0, 3)?, 3);
        assert_eq!(builder.get_long(0, 7)?, -4);
        Ok(())
    }

    #[test]
    fn test_null_while_entry_open_fails() {
        let mut builder = VariableWidthBlockBuilder::new(None, 1, 16);
        builder.write_bytes(b"partial").unwrap();
        assert!(matches!(
            builder.append_null(),
            Err(PrismError::IllegalState(_))
        ));
        assert!(matches!(builder.build(), Err(PrismError::IllegalState(_))));

        builder.close_entry().unwrap();
        builder.append_null().unwrap();
        assert_eq!(builder.position_count(), 2);
    }

    #[test]
    fn test_empty_entries_and_nulls() {
        let builder = builder_of(&[Some(""), None, Some("x")]);
        assert_eq!(builder.get_slice_length(0).unwrap(), 0);
        assert!(!builder.is_null(0).unwrap());
        assert!(builder.is_null(1).unwrap());
        assert!(builder.may_have_null());

        let block = builder.build().unwrap();
        assert_eq!(strings(block.as_ref()), vec![Some(String::new()), None, Some("x".to_string())]);
        assert!(block.may_have_null());
    }

    #[test]
    fn test_build_is_repeatable() -> PrismResult<()> {
        let mut builder = builder_of(&[Some("aa"), Some("b")]);
        let first = builder.build()?;

        builder.write_bytes(b"ccc")?;
        builder.close_entry()?;
        let second = builder.build()?;

        assert_eq!(first.position_count(), 2);
        assert!(!first.may_have_null());
        assert_eq!(
            strings(second.as_ref()),
            vec![Some("aa".to_string()), Some("b".to_string()), Some("ccc".to_string())]
        );
        Ok(())
    }

    #[test]
    fn test_growth_past_initial_capacity() -> PrismResult<()> {
        let mut builder = VariableWidthBlockBuilder::new(None, 1, 1);
        for i in 0..(DEFAULT_CAPACITY * 3) {
            builder.write_bytes(i.to_string().as_bytes())?;
            builder.close_entry()?;
        }
        assert_eq!(builder.position_count(), DEFAULT_CAPACITY * 3);
        assert_eq!(builder.get_slice(150, 0, 3)?.as_ref(), b"150");
        assert!(builder.retained_size_in_bytes() >= builder.size_in_bytes()?);
        Ok(())
    }

    #[test]
    fn test_region_and_copies_are_detached() -> PrismResult<()> {
        let builder = builder_of(&[Some("aa"), None, Some("ccc")]);
        let region = builder.get_region(1, 2)?;
        assert_eq!(strings(region.as_ref()), vec![None, Some("ccc".to_string())]);

        let copy = builder.copy_positions(&[2, 0, 2], 0, 3)?;
        assert_eq!(
            strings(copy.as_ref()),
            vec![Some("ccc".to_string()), Some("aa".to_string()), Some("ccc".to_string())]
        );
        let copy = copy.as_any().downcast_ref::<VariableWidthBlock>().unwrap();
        assert_ne!(copy.raw_slice().as_ptr(), builder.slice_output.as_ptr());

        let single = builder.get_single_value_block(1)?;
        assert!(single.is_null(0)?);
        Ok(())
    }

    #[test]
    fn test_status_accounting() -> PrismResult<()> {
        let page = PageBuilderStatus::new(1024);
        let mut builder = VariableWidthBlockBuilder::new(Some(page.create_block_builder_status()), 4, 64);
        builder.write_bytes(b"abc")?;
        builder.close_entry()?;
        builder.append_null()?;
        assert_eq!(page.size_in_bytes(), 3 + 2 * SIZE_IN_BYTES_PER_POSITION);
        Ok(())
    }

    #[test]
    fn test_expected_bytes_capped_by_page_size() {
        let page = PageBuilderStatus::new(100);
        let builder = VariableWidthBlockBuilder::new(Some(page.create_block_builder_status()), 4, 4096);
        assert_eq!(builder.initial_slice_output_size, 100);
    }

    #[test]
    fn test_new_block_builder_like() -> PrismResult<()> {
        let builder = builder_of(&[Some("abcd"); 100]);
        let like = builder.new_block_builder_like(None)?;
        assert_eq!(like.position_count(), 0);

        let like = like.as_any().downcast_ref::<VariableWidthBlockBuilder>().unwrap();
        assert_eq!(like.initial_entry_count, 125);
        assert_eq!(like.initial_slice_output_size, 500);
        Ok(())
    }

    #[test]
    fn test_retained_covers_size() {
        let builder = builder_of(&[Some("hello"), None, Some("world!")]);
        assert!(builder.retained_size_in_bytes() >= builder.size_in_bytes().unwrap());
        let block = builder.build().unwrap();
        assert!(block.retained_size_in_bytes() >= block.size_in_bytes().unwrap());
    }
}
