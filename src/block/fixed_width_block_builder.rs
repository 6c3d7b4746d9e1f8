//! Fixed-width block builder

use crate::block::fixed_width_block::{FixedWidthBlock, FixedWidthData};
use crate::block::status::BlockBuilderStatus;
use crate::block::{Block, BlockBuilder, BlockRef};
use crate::common::error::PrismResult;
use crate::common::helper::{calculate_block_reset_size, calculate_new_array_size, size_of_vec};
use crate::{illegal_state_err, invalid_arg_err};
use byteorder::{LittleEndian, WriteBytesExt};
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

#[derive(Debug)]
pub struct FixedWidthBlockBuilder {
    fixed_size: usize,
    status: Option<BlockBuilderStatus>,
    initialized: bool,
    initial_entry_count: usize,

    slice_output: Vec<u8>,
    has_null_value: bool,
    value_is_null: Vec<bool>,

    positions: usize,
    current_entry_size: usize,
}

impl FixedWidthBlockBuilder {
    pub fn new(
        fixed_size: usize,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<Self> {
        if fixed_size == 0 {
            return Err(invalid_arg_err!("fixed size must be positive"));
        }
        Ok(Self {
            fixed_size,
            status,
            initialized: false,
            initial_entry_count: expected_entries,
            slice_output: Vec::new(),
            has_null_value: false,
            value_is_null: Vec::new(),
            positions: 0,
            current_entry_size: 0,
        })
    }

    pub fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    fn data(&self) -> FixedWidthData<'_> {
        FixedWidthData {
            fixed_size: self.fixed_size,
            position_count: self.positions,
            slice: &self.slice_output[..self.positions * self.fixed_size],
            value_is_null: self
                .has_null_value
                .then(|| &self.value_is_null[..self.positions]),
        }
    }

    fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.slice_output = Vec::with_capacity(self.initial_entry_count * self.fixed_size);
            self.value_is_null = Vec::with_capacity(self.initial_entry_count);
            self.initialized = true;
        }
    }

    fn check_room(&mut self, bytes: usize) -> PrismResult<()> {
        self.ensure_initialized();
        if self.current_entry_size + bytes > self.fixed_size {
            return Err(illegal_state_err!(
                "Entry of {} bytes cannot take {} more bytes",
                self.fixed_size,
                bytes
            ));
        }
        Ok(())
    }

    fn entry_added(&mut self, is_null: bool) -> PrismResult<()> {
        if self.value_is_null.len() == self.value_is_null.capacity() {
            let new_size = calculate_new_array_size(self.value_is_null.capacity())?;
            tracing::trace!(
                from = self.value_is_null.capacity(),
                to = new_size,
                "growing fixed width builder arrays"
            );
            self.value_is_null
                .reserve_exact(new_size - self.value_is_null.len());
            self.slice_output
                .reserve_exact(new_size * self.fixed_size - self.slice_output.len());
        }
        self.value_is_null.push(is_null);
        self.has_null_value |= is_null;
        self.positions += 1;
        self.current_entry_size = 0;

        if let Some(status) = &self.status {
            status.add_bytes(self.fixed_size + 1);
        }
        Ok(())
    }
}

impl Block for FixedWidthBlockBuilder {
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
        size_of::<Self>() + size_of_vec(&self.slice_output) + size_of_vec(&self.value_is_null)
    }

    fn encoding_name(&self) -> &'static str {
        "FIXED_WIDTH"
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

impl BlockBuilder for FixedWidthBlockBuilder {
    fn write_byte(&mut self, value: u8) -> PrismResult<()> {
        self.check_room(1)?;
        self.slice_output.write_u8(value)?;
        self.current_entry_size += 1;
        Ok(())
    }

    fn write_short(&mut self, value: i16) -> PrismResult<()> {
        self.check_room(2)?;
        self.slice_output.write_i16::<LittleEndian>(value)?;
        self.current_entry_size += 2;
        Ok(())
    }

    fn write_int(&mut self, value: i32) -> PrismResult<()> {
        self.check_room(4)?;
        self.slice_output.write_i32::<LittleEndian>(value)?;
        self.current_entry_size += 4;
        Ok(())
    }

    fn write_long(&mut self, value: i64) -> PrismResult<()> {
        self.check_room(8)?;
        self.slice_output.write_i64::<LittleEndian>(value)?;
        self.current_entry_size += 8;
        Ok(())
    }

    fn write_bytes(&mut self, source: &[u8]) -> PrismResult<()> {
        self.check_room(source.len())?;
        self.slice_output.extend_from_slice(source);
        self.current_entry_size += source.len();
        Ok(())
    }

    fn close_entry(&mut self) -> PrismResult<()> {
        if self.current_entry_size != self.fixed_size {
            return Err(illegal_state_err!(
                "Expected entry size to be exactly {} but was {}",
                self.fixed_size,
                self.current_entry_size
            ));
        }
        self.entry_added(false)
    }

    fn append_null(&mut self) -> PrismResult<()> {
        if self.current_entry_size > 0 {
            return Err(illegal_state_err!(
                "Current entry must be closed before a null can be written"
            ));
        }
        self.ensure_initialized();
        self.slice_output
            .resize(self.slice_output.len() + self.fixed_size, 0);
        self.entry_added(true)
    }

    fn build(&self) -> PrismResult<BlockRef> {
        if self.current_entry_size > 0 {
            return Err(illegal_state_err!(
                "Current entry must be closed before the block can be built"
            ));
        }
        let data = self.data();
        Ok(Arc::new(FixedWidthBlock::from_parts(
            self.fixed_size,
            0,
            self.positions,
            Bytes::copy_from_slice(data.slice),
            data.value_is_null.map(Arc::from),
        )))
    }

    fn new_block_builder_like(
        &self,
        status: Option<BlockBuilderStatus>,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        Ok(Box::new(Self::new(
            self.fixed_size,
            status,
            calculate_block_reset_size(self.positions),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::PrismError;

    #[test]
    fn test_entries_must_fill_stride() -> PrismResult<()> {
        let mut builder = FixedWidthBlockBuilder::new(8, None, 4)?;
        builder.write_int(1)?;
        assert!(matches!(builder.close_entry(), Err(PrismError::IllegalState(_))));
        builder.write_int(2)?;
        assert!(builder.write_byte(3).is_err());
        builder.close_entry()?;
        assert_eq!(builder.get_int(0, 4)?, 2);
        Ok(())
    }

    #[test]
    fn test_nulls_keep_stride() -> PrismResult<()> {
        let mut builder = FixedWidthBlockBuilder::new(8, None, 1)?;
        builder.write_long(11)?;
        builder.close_entry()?;
        builder.append_null()?;
        builder.write_long(33)?;
        builder.close_entry()?;

        let block = builder.build()?;
        assert_eq!(block.position_count(), 3);
        assert!(block.is_null(1)?);
        assert_eq!(block.get_long(2, 0)?, 33);
        assert_eq!(block.size_in_bytes()?, 27);
        Ok(())
    }

    #[test]
    fn test_null_rejected_mid_entry() -> PrismResult<()> {
        let mut builder = FixedWidthBlockBuilder::new(4, None, 1)?;
        builder.write_short(1)?;
        assert!(builder.append_null().is_err());
        assert!(builder.build().is_err());
        Ok(())
    }

    #[test]
    fn test_growth_and_like() -> PrismResult<()> {
        let mut builder = FixedWidthBlockBuilder::new(8, None, 0)?;
        for value in 0..200 {
            builder.write_long(value)?;
            builder.close_entry()?;
        }
        assert_eq!(builder.get_long(199, 0)?, 199);
        assert!(builder.retained_size_in_bytes() >= builder.size_in_bytes()?);

        let like = builder.new_block_builder_like(None)?;
        assert_eq!(like.position_count(), 0);
        Ok(())
    }
}
