//! Fixed-width block
//!
//! Every position occupies exactly `fixed_size` bytes, so position `i` starts
//! at `(array_offset + i) * fixed_size`. Null positions still occupy their
//! stride (zero-filled).

use crate::block::{Block, BlockBuilder, BlockRef};
use crate::common::error::PrismResult;
use crate::common::helper::{
    check_selection_length, check_valid_position, check_valid_positions, check_valid_region,
    size_of_optional,
};
use crate::{invalid_arg_err, out_of_bounds_err};
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Borrowed view over fixed-width storage, shared by the block and its builder
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedWidthData<'a> {
    pub fixed_size: usize,
    pub position_count: usize,
    /// Storage of the addressed positions, `position_count * fixed_size` bytes
    pub slice: &'a [u8],
    pub value_is_null: Option<&'a [bool]>,
}

impl<'a> FixedWidthData<'a> {
    pub fn size_per_position(&self) -> usize {
        self.fixed_size + 1
    }

    pub fn is_null(&self, position: usize) -> PrismResult<bool> {
        check_valid_position(position, self.position_count)?;
        Ok(self.value_is_null.is_some_and(|nulls| nulls[position]))
    }

    pub fn slice_length(&self, position: usize) -> PrismResult<usize> {
        check_valid_position(position, self.position_count)?;
        Ok(self.fixed_size)
    }

    pub fn read_range(
        &self,
        position: usize,
        offset: usize,
        length: usize,
    ) -> PrismResult<std::ops::Range<usize>> {
        check_valid_position(position, self.position_count)?;
        if offset > self.fixed_size || length > self.fixed_size - offset {
            return Err(out_of_bounds_err!(
                "Read of {} bytes at offset {} exceeds entry size {}",
                length,
                offset,
                self.fixed_size
            ));
        }
        let start = position * self.fixed_size + offset;
        Ok(start..start + length)
    }

    pub fn read(&self, position: usize, offset: usize, length: usize) -> PrismResult<&'a [u8]> {
        let range = self.read_range(position, offset, length)?;
        Ok(&self.slice[range])
    }

    pub fn value(&self, position: usize) -> PrismResult<&'a [u8]> {
        self.read(position, 0, self.fixed_size)
    }

    pub fn get_byte(&self, position: usize, offset: usize) -> PrismResult<u8> {
        Ok(self.read(position, offset, 1)?[0])
    }

    pub fn get_short(&self, position: usize, offset: usize) -> PrismResult<i16> {
        Ok(LittleEndian::read_i16(self.read(position, offset, 2)?))
    }

    pub fn get_int(&self, position: usize, offset: usize) -> PrismResult<i32> {
        Ok(LittleEndian::read_i32(self.read(position, offset, 4)?))
    }

    pub fn get_long(&self, position: usize, offset: usize) -> PrismResult<i64> {
        Ok(LittleEndian::read_i64(self.read(position, offset, 8)?))
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_per_position() * self.position_count
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.position_count, offset, length)?;
        Ok(self.size_per_position() * length)
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.position_count)?;
        Ok(self.size_per_position() * selected.iter().filter(|&&keep| keep).count())
    }

    pub fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        if self.is_null(position)? {
            return builder.append_null();
        }
        builder.write_bytes(self.value(position)?)?;
        builder.close_entry()
    }

    pub fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<FixedWidthBlock> {
        check_valid_positions(positions, offset, length, self.position_count)?;
        let selected = &positions[offset..offset + length];

        let mut new_slice = Vec::with_capacity(length * self.fixed_size);
        let mut new_nulls = self.value_is_null.map(|_| Vec::with_capacity(length));
        for &position in selected {
            let start = position * self.fixed_size;
            new_slice.extend_from_slice(&self.slice[start..start + self.fixed_size]);
            if let (Some(target), Some(source)) = (new_nulls.as_mut(), self.value_is_null) {
                target.push(source[position]);
            }
        }

        Ok(FixedWidthBlock::from_parts(
            self.fixed_size,
            0,
            length,
            Bytes::from(new_slice),
            new_nulls.map(Into::into),
        ))
    }

    pub fn copy_region(&self, offset: usize, length: usize) -> PrismResult<FixedWidthBlock> {
        check_valid_region(self.position_count, offset, length)?;
        let start = offset * self.fixed_size;
        let end = start + length * self.fixed_size;
        let new_nulls = self
            .value_is_null
            .map(|nulls| Arc::<[bool]>::from(&nulls[offset..offset + length]));

        Ok(FixedWidthBlock::from_parts(
            self.fixed_size,
            0,
            length,
            Bytes::copy_from_slice(&self.slice[start..end]),
            new_nulls,
        ))
    }

    pub fn single_value_block(&self, position: usize) -> PrismResult<FixedWidthBlock> {
        let is_null = self.is_null(position)?;
        Ok(FixedWidthBlock::from_parts(
            self.fixed_size,
            0,
            1,
            Bytes::copy_from_slice(self.value(position)?),
            is_null.then(|| Arc::from([true])),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct FixedWidthBlock {
    fixed_size: usize,
    array_offset: usize,
    position_count: usize,
    slice: Bytes,
    value_is_null: Option<Arc<[bool]>>,
    retained_size_in_bytes: usize,
}

impl FixedWidthBlock {
    pub fn new(
        fixed_size: usize,
        position_count: usize,
        slice: Bytes,
        value_is_null: Option<Vec<bool>>,
    ) -> PrismResult<Self> {
        Self::with_array_offset(
            fixed_size,
            0,
            position_count,
            slice,
            value_is_null.map(Into::into),
        )
    }

    pub fn with_array_offset(
        fixed_size: usize,
        array_offset: usize,
        position_count: usize,
        slice: Bytes,
        value_is_null: Option<Arc<[bool]>>,
    ) -> PrismResult<Self> {
        if fixed_size == 0 {
            return Err(invalid_arg_err!("fixed size must be positive"));
        }
        let required = (array_offset + position_count) * fixed_size;
        if slice.len() < required {
            return Err(invalid_arg_err!(
                "slice length {} is less than {} positions of {} bytes after arrayOffset {}",
                slice.len(),
                position_count,
                fixed_size,
                array_offset
            ));
        }
        if let Some(nulls) = &value_is_null {
            if nulls.len() < array_offset + position_count {
                return Err(invalid_arg_err!(
                    "isNull length {} is less than positionCount {} after arrayOffset {}",
                    nulls.len(),
                    position_count,
                    array_offset
                ));
            }
        }
        Ok(Self::from_parts(
            fixed_size,
            array_offset,
            position_count,
            slice,
            value_is_null,
        ))
    }

    pub(crate) fn from_parts(
        fixed_size: usize,
        array_offset: usize,
        position_count: usize,
        slice: Bytes,
        value_is_null: Option<Arc<[bool]>>,
    ) -> Self {
        let retained_size_in_bytes =
            size_of::<Self>() + slice.len() + size_of_optional(value_is_null.as_deref());
        Self {
            fixed_size,
            array_offset,
            position_count,
            slice,
            value_is_null,
            retained_size_in_bytes,
        }
    }

    pub(crate) fn data(&self) -> FixedWidthData<'_> {
        let start = self.array_offset * self.fixed_size;
        let end = start + self.position_count * self.fixed_size;
        FixedWidthData {
            fixed_size: self.fixed_size,
            position_count: self.position_count,
            slice: &self.slice[start..end],
            value_is_null: self
                .value_is_null
                .as_deref()
                .map(|nulls| &nulls[self.array_offset..self.array_offset + self.position_count]),
        }
    }

    pub fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    pub fn array_offset(&self) -> usize {
        self.array_offset
    }

    pub fn shares_storage_with(&self, other: &FixedWidthBlock) -> bool {
        self.slice.as_ptr() == other.slice.as_ptr()
            && match (&self.value_is_null, &other.value_is_null) {
                (Some(left), Some(right)) => Arc::ptr_eq(left, right),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Block for FixedWidthBlock {
    fn position_count(&self) -> usize {
        self.position_count
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
        let range = self.data().read_range(position, offset, length)?;
        let base = self.array_offset * self.fixed_size;
        Ok(self.slice.slice(base + range.start..base + range.end))
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
        Ok(self.data().size_in_bytes())
    }

    fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        self.data().region_size_in_bytes(offset, length)
    }

    fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        self.data().positions_size_in_bytes(selected)
    }

    fn retained_size_in_bytes(&self) -> usize {
        self.retained_size_in_bytes
    }

    fn encoding_name(&self) -> &'static str {
        "FIXED_WIDTH"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        Ok(Arc::new(Self::from_parts(
            self.fixed_size,
            self.array_offset + offset,
            length,
            self.slice.clone(),
            self.value_is_null.clone(),
        )))
    }

    fn is_compact_region(&self, offset: usize, length: usize) -> bool {
        offset == 0
            && length == self.position_count
            && self.array_offset == 0
            && self.slice.len() == length * self.fixed_size
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
        Ok(Arc::new(self.data().single_value_block(position)?))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
