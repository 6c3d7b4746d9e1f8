//! Row block builder
//!
//! `begin_block_entry` hands out the builder's single [`SingleRowBlockWriter`],
//! repositioned at the next row. Every value written through it lands in the
//! current field builder; closing a value (or appending a null) moves the
//! writer on to the next field.

use crate::block::row_block::{RowBlock, RowData};
use crate::block::single_row_block::SingleRowData;
use crate::block::status::BlockBuilderStatus;
use crate::block::{Block, BlockBuilder, BlockRef, SIZE_IN_BYTES_PER_POSITION};
use crate::common::error::{PrismError, PrismResult};
use crate::common::helper::{
    calculate_block_reset_size, check_valid_position, check_valid_positions, check_valid_region,
    size_of_vec, to_offset,
};
use crate::{illegal_state_err, invalid_arg_err, unsupported_err};
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Writer for the fields of one row
#[derive(Debug)]
pub struct SingleRowBlockWriter {
    field_builders: Vec<Box<dyn BlockBuilder>>,
    row_index: usize,
    current_field: usize,
}

impl SingleRowBlockWriter {
    fn new(field_builders: Vec<Box<dyn BlockBuilder>>) -> Self {
        Self {
            field_builders,
            row_index: 0,
            current_field: 0,
        }
    }

    /// Reposition the writer at the first field of the row stored at `row_index`
    fn set_row_index(&mut self, row_index: usize) {
        self.row_index = row_index;
        self.current_field = 0;
    }

    fn current_field_builder(&mut self) -> PrismResult<&mut Box<dyn BlockBuilder>> {
        let field_count = self.field_builders.len();
        self.field_builders.get_mut(self.current_field).ok_or_else(|| {
            illegal_state_err!("All {} fields of the row have been written", field_count)
        })
    }

    fn data(&self) -> SingleRowData<'_, [Box<dyn BlockBuilder>]> {
        SingleRowData {
            fields: &self.field_builders,
            field_count: self.current_field,
            row_index: self.row_index,
        }
    }

    pub fn field_count(&self) -> usize {
        self.field_builders.len()
    }
}

impl Block for SingleRowBlockWriter {
    /// Fields written so far for the current row
    fn position_count(&self) -> usize {
        self.current_field
    }

    fn get_slice_length(&self, position: usize) -> PrismResult<usize> {
        self.data().slice_length(position)
    }

    fn get_byte(&self, position: usize, offset: usize) -> PrismResult<u8> {
        self.data().field(position)?.get_byte(self.row_index, offset)
    }

    fn get_short(&self, position: usize, offset: usize) -> PrismResult<i16> {
        self.data().field(position)?.get_short(self.row_index, offset)
    }

    fn get_int(&self, position: usize, offset: usize) -> PrismResult<i32> {
        self.data().field(position)?.get_int(self.row_index, offset)
    }

    fn get_long(&self, position: usize, offset: usize) -> PrismResult<i64> {
        self.data().field(position)?.get_long(self.row_index, offset)
    }

    fn get_slice(&self, position: usize, offset: usize, length: usize) -> PrismResult<Bytes> {
        self.data()
            .field(position)?
            .get_slice(self.row_index, offset, length)
    }

    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        self.data().field(position)?.get_object(self.row_index)
    }

    fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        self.data()
            .field(position)?
            .write_position_to(self.row_index, builder)
    }

    fn is_null(&self, position: usize) -> PrismResult<bool> {
        self.data().is_null(position)
    }

    fn may_have_null(&self) -> bool {
        self.field_builders[..self.current_field]
            .iter()
            .any(|field| field.may_have_null())
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
            + self
                .field_builders
                .iter()
                .map(|field| field.retained_size_in_bytes())
                .sum::<usize>()
    }

    fn encoding_name(&self) -> &'static str {
        "ROW_ELEMENT"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        self.copy_region(offset, length)
    }

    fn copy_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.current_field, offset, length)?;
        let positions: Vec<usize> = (offset..offset + length).collect();
        Ok(Arc::new(self.data().copy_fields(&positions)?))
    }

    fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<BlockRef> {
        check_valid_positions(positions, offset, length, self.current_field)?;
        Ok(Arc::new(
            self.data().copy_fields(&positions[offset..offset + length])?,
        ))
    }

    fn get_single_value_block(&self, position: usize) -> PrismResult<BlockRef> {
        self.data()
            .field(position)?
            .get_single_value_block(self.row_index)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BlockBuilder for SingleRowBlockWriter {
    fn write_byte(&mut self, value: u8) -> PrismResult<()> {
        self.current_field_builder()?.write_byte(value)
    }

    fn write_short(&mut self, value: i16) -> PrismResult<()> {
        self.current_field_builder()?.write_short(value)
    }

    fn write_int(&mut self, value: i32) -> PrismResult<()> {
        self.current_field_builder()?.write_int(value)
    }

    fn write_long(&mut self, value: i64) -> PrismResult<()> {
        self.current_field_builder()?.write_long(value)
    }

    fn write_bytes(&mut self, source: &[u8]) -> PrismResult<()> {
        self.current_field_builder()?.write_bytes(source)
    }

    fn begin_block_entry(&mut self) -> PrismResult<&mut dyn BlockBuilder> {
        self.current_field_builder()?.begin_block_entry()
    }

    fn close_entry(&mut self) -> PrismResult<()> {
        self.current_field_builder()?.close_entry()?;
        self.current_field += 1;
        Ok(())
    }

    fn append_null(&mut self) -> PrismResult<()> {
        self.current_field_builder()?.append_null()?;
        self.current_field += 1;
        Ok(())
    }

    fn build(&self) -> PrismResult<BlockRef> {
        Err(unsupported_err!("{}: build", self.encoding_name()))
    }

    fn new_block_builder_like(
        &self,
        _status: Option<BlockBuilderStatus>,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        Err(unsupported_err!("{}: new_block_builder_like", self.encoding_name()))
    }
}

#[derive(Debug)]
pub struct RowBlockBuilder {
    status: Option<BlockBuilderStatus>,
    writer: SingleRowBlockWriter,

    positions: usize,
    field_position_count: usize,
    field_block_offsets: Vec<i32>,
    row_is_null: Vec<bool>,
    has_null_row: bool,
    current_entry_opened: bool,
}

impl RowBlockBuilder {
    pub fn new(
        field_builders: Vec<Box<dyn BlockBuilder>>,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<Self> {
        if field_builders.is_empty() {
            return Err(invalid_arg_err!("Row block builder must have at least one field"));
        }
        let mut field_block_offsets = Vec::with_capacity(expected_entries + 1);
        field_block_offsets.push(0);

        Ok(Self {
            status,
            writer: SingleRowBlockWriter::new(field_builders),
            positions: 0,
            field_position_count: 0,
            field_block_offsets,
            row_is_null: Vec::with_capacity(expected_entries),
            has_null_row: false,
            current_entry_opened: false,
        })
    }

    pub fn field_count(&self) -> usize {
        self.writer.field_count()
    }

    fn data(&self) -> RowData<'_, [Box<dyn BlockBuilder>]> {
        RowData {
            base: 0,
            position_count: self.positions,
            field_offsets: self
                .has_null_row
                .then_some(self.field_block_offsets.as_slice()),
            value_is_null: self.has_null_row.then_some(self.row_is_null.as_slice()),
            fields: &self.writer.field_builders,
        }
    }

    fn entry_added(&mut self, is_null: bool) -> PrismResult<()> {
        if !is_null {
            self.field_position_count += 1;
        }
        self.field_block_offsets
            .push(to_offset(self.field_position_count)?);
        self.row_is_null.push(is_null);
        self.has_null_row |= is_null;
        self.positions += 1;
        if let Some(status) = &self.status {
            status.add_bytes(SIZE_IN_BYTES_PER_POSITION);
        }
        Ok(())
    }
}

impl Block for RowBlockBuilder {
    fn position_count(&self) -> usize {
        self.positions
    }

    fn get_slice_length(&self, _position: usize) -> PrismResult<usize> {
        Err(unsupported_err!("{}: get_slice_length", self.encoding_name()))
    }

    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        Ok(Arc::new(self.data().single_row(position)?))
    }

    fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        self.data().write_position_to(position, builder)
    }

    fn is_null(&self, position: usize) -> PrismResult<bool> {
        self.data().is_null(position)
    }

    fn may_have_null(&self) -> bool {
        self.has_null_row
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
            + size_of_vec(&self.field_block_offsets)
            + size_of_vec(&self.row_is_null)
            + self.writer.retained_size_in_bytes()
    }

    fn encoding_name(&self) -> &'static str {
        "ROW"
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
        check_valid_position(position, self.positions)?;
        Ok(Arc::new(self.data().copy_region(position, 1)?))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BlockBuilder for RowBlockBuilder {
    fn begin_block_entry(&mut self) -> PrismResult<&mut dyn BlockBuilder> {
        if self.current_entry_opened {
            return Err(illegal_state_err!(
                "Expected current entry to be closed but was opened"
            ));
        }
        self.current_entry_opened = true;
        self.writer.set_row_index(self.field_position_count);
        Ok(&mut self.writer)
    }

    fn close_entry(&mut self) -> PrismResult<()> {
        if !self.current_entry_opened {
            return Err(illegal_state_err!(
                "Expected entry to be opened but was closed"
            ));
        }
        let expected = self.field_position_count + 1;
        for (field, builder) in self.writer.field_builders.iter().enumerate() {
            let actual = builder.position_count();
            if actual != expected {
                return Err(PrismError::FieldCountMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        self.current_entry_opened = false;
        self.entry_added(false)
    }

    fn append_null(&mut self) -> PrismResult<()> {
        if self.current_entry_opened {
            return Err(illegal_state_err!(
                "Current entry must be closed before a null can be written"
            ));
        }
        self.entry_added(true)
    }

    fn build(&self) -> PrismResult<BlockRef> {
        if self.current_entry_opened {
            return Err(illegal_state_err!(
                "Current entry must be closed before the block can be built"
            ));
        }
        let fields = self
            .writer
            .field_builders
            .iter()
            .map(|builder| builder.build())
            .collect::<PrismResult<Vec<_>>>()?;

        let (field_offsets, row_is_null) = if self.has_null_row {
            (
                Some(Arc::from(self.field_block_offsets.as_slice())),
                Some(Arc::from(self.row_is_null.as_slice())),
            )
        } else {
            (None, None)
        };
        Ok(Arc::new(RowBlock::from_parts(
            0,
            self.positions,
            field_offsets,
            row_is_null,
            fields.into(),
        )))
    }

    fn new_block_builder_like(
        &self,
        status: Option<BlockBuilderStatus>,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        let field_builders = self
            .writer
            .field_builders
            .iter()
            .map(|builder| builder.new_block_builder_like(status.clone()))
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(Box::new(Self::new(
            field_builders,
            status,
            calculate_block_reset_size(self.positions),
        )?))
    }
}
