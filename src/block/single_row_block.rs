//! Single row view
//!
//! Exposes one row of a row container as a block whose positions are the
//! row's fields.

use crate::block::row_block::RowFields;
use crate::block::{Block, BlockBuilder, BlockRef};
use crate::common::error::PrismResult;
use crate::common::helper::{
    check_selection_length, check_valid_position, check_valid_positions, check_valid_region,
};
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Borrowed view of one row: field `i` at `row_index` is position `i`
pub(crate) struct SingleRowData<'a, F: RowFields + ?Sized> {
    pub fields: &'a F,
    pub field_count: usize,
    pub row_index: usize,
}

impl<'a, F: RowFields + ?Sized> SingleRowData<'a, F> {
    pub fn field(&self, position: usize) -> PrismResult<&'a dyn Block> {
        check_valid_position(position, self.field_count)?;
        Ok(self.fields.field(position))
    }

    pub fn slice_length(&self, position: usize) -> PrismResult<usize> {
        self.field(position)?.get_slice_length(self.row_index)
    }

    pub fn is_null(&self, position: usize) -> PrismResult<bool> {
        self.field(position)?.is_null(self.row_index)
    }

    pub fn size_in_bytes(&self) -> PrismResult<usize> {
        self.region_size_in_bytes(0, self.field_count)
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.field_count, offset, length)?;
        let mut size = 0;
        for position in offset..offset + length {
            size += self.fields.field(position).region_size_in_bytes(self.row_index, 1)?;
        }
        Ok(size)
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.field_count)?;
        let mut size = 0;
        for (position, _) in selected.iter().enumerate().filter(|(_, &keep)| keep) {
            size += self.fields.field(position).region_size_in_bytes(self.row_index, 1)?;
        }
        Ok(size)
    }

    pub fn retained_fields_size(&self) -> usize {
        (0..self.field_count)
            .map(|position| self.fields.field(position).retained_size_in_bytes())
            .sum()
    }

    /// Independently owned copy of the selected fields of this row
    pub fn copy_fields(&self, positions: &[usize]) -> PrismResult<SingleRowBlock> {
        let fields = positions
            .iter()
            .map(|&position| self.field(position)?.copy_region(self.row_index, 1))
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(SingleRowBlock::new(fields.into(), 0))
    }
}

/// One row of a [`crate::block::RowBlock`]
#[derive(Debug, Clone)]
pub struct SingleRowBlock {
    fields: Arc<[BlockRef]>,
    row_index: usize,
}

impl SingleRowBlock {
    pub fn new(fields: Arc<[BlockRef]>, row_index: usize) -> Self {
        Self { fields, row_index }
    }

    /// Position of this row inside the field blocks
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn fields(&self) -> &[BlockRef] {
        &self.fields
    }

    fn data(&self) -> SingleRowData<'_, [BlockRef]> {
        SingleRowData {
            fields: &self.fields,
            field_count: self.fields.len(),
            row_index: self.row_index,
        }
    }
}

impl Block for SingleRowBlock {
    fn position_count(&self) -> usize {
        self.fields.len()
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
        self.fields.iter().any(|field| field.may_have_null())
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
        size_of::<Self>() + self.data().retained_fields_size()
    }

    fn encoding_name(&self) -> &'static str {
        "ROW_ELEMENT"
    }

    /// View over a subset of the fields of this row
    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.fields.len(), offset, length)?;
        Ok(Arc::new(Self::new(
            self.fields[offset..offset + length].to_vec().into(),
            self.row_index,
        )))
    }

    fn copy_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.fields.len(), offset, length)?;
        let positions: Vec<usize> = (offset..offset + length).collect();
        Ok(Arc::new(self.data().copy_fields(&positions)?))
    }

    fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<BlockRef> {
        check_valid_positions(positions, offset, length, self.fields.len())?;
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
