//! Array block and builder
//!
//! Each position is a run of elements in one child `values` block; position
//! `i` covers `values[offsets[i]..offsets[i + 1]]`. A null array covers an
//! empty run.

use crate::block::status::BlockBuilderStatus;
use crate::block::{Block, BlockBuilder, BlockRef, SIZE_IN_BYTES_PER_POSITION};
use crate::common::error::PrismResult;
use crate::common::helper::{
    calculate_block_reset_size, check_selection_length, check_valid_position,
    check_valid_positions, check_valid_region, compact_offsets, size_of_optional, size_of_slice,
    size_of_vec, to_offset,
};
use crate::{illegal_state_err, invalid_arg_err, unsupported_err};
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Borrowed view over array storage, shared by the block and its builder
#[derive(Debug, Clone, Copy)]
struct ArrayData<'a> {
    offsets: &'a [i32],
    value_is_null: Option<&'a [bool]>,
    values: &'a dyn Block,
}

impl<'a> ArrayData<'a> {
    fn position_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn is_null(&self, position: usize) -> PrismResult<bool> {
        check_valid_position(position, self.position_count())?;
        Ok(self.value_is_null.is_some_and(|nulls| nulls[position]))
    }

    /// Start and length of the element run of `position`
    fn entry(&self, position: usize) -> PrismResult<(usize, usize)> {
        check_valid_position(position, self.position_count())?;
        let start = self.offsets[position] as usize;
        let end = self.offsets[position + 1] as usize;
        Ok((start, end - start))
    }

    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        let (start, length) = self.entry(position)?;
        self.values.get_region(start, length)
    }

    fn size_in_bytes(&self) -> PrismResult<usize> {
        self.region_size_in_bytes(0, self.position_count())
    }

    fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.position_count(), offset, length)?;
        let start = self.offsets[offset] as usize;
        let end = self.offsets[offset + length] as usize;
        Ok(self.values.region_size_in_bytes(start, end - start)? + SIZE_IN_BYTES_PER_POSITION * length)
    }

    fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.position_count())?;
        let mut used = vec![false; self.values.position_count()];
        let mut used_count = 0;
        for (position, _) in selected.iter().enumerate().filter(|(_, &keep)| keep) {
            let start = self.offsets[position] as usize;
            let end = self.offsets[position + 1] as usize;
            used[start..end].iter_mut().for_each(|flag| *flag = true);
            used_count += 1;
        }
        Ok(self.values.positions_size_in_bytes(&used)? + SIZE_IN_BYTES_PER_POSITION * used_count)
    }

    fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        if self.is_null(position)? {
            return builder.append_null();
        }
        let (start, length) = self.entry(position)?;
        let entry = builder.begin_block_entry()?;
        for element in start..start + length {
            self.values.write_position_to(element, entry)?;
        }
        builder.close_entry()
    }

    fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> PrismResult<ArrayBlock> {
        check_valid_positions(positions, offset, length, self.position_count())?;
        let selected = &positions[offset..offset + length];

        let mut new_offsets = Vec::with_capacity(length + 1);
        let mut new_nulls = self.value_is_null.map(|_| Vec::with_capacity(length));
        let mut element_positions = Vec::new();
        new_offsets.push(0);

        for &position in selected {
            let start = self.offsets[position] as usize;
            let end = self.offsets[position + 1] as usize;
            element_positions.extend(start..end);
            new_offsets.push(to_offset(element_positions.len())?);
            if let (Some(target), Some(source)) = (new_nulls.as_mut(), self.value_is_null) {
                target.push(source[position]);
            }
        }

        let values = self
            .values
            .copy_positions(&element_positions, 0, element_positions.len())?;
        Ok(ArrayBlock::from_parts(
            0,
            length,
            new_nulls.map(Into::into),
            new_offsets.into(),
            values,
        ))
    }

    fn copy_region(&self, offset: usize, length: usize) -> PrismResult<ArrayBlock> {
        check_valid_region(self.position_count(), offset, length)?;
        let start = self.offsets[offset] as usize;
        let end = self.offsets[offset + length] as usize;
        let values = self.values.copy_region(start, end - start)?;
        let new_nulls = self
            .value_is_null
            .map(|nulls| Arc::<[bool]>::from(&nulls[offset..offset + length]));

        Ok(ArrayBlock::from_parts(
            0,
            length,
            new_nulls,
            compact_offsets(self.offsets, offset, length).into(),
            values,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct ArrayBlock {
    array_offset: usize,
    position_count: usize,
    value_is_null: Option<Arc<[bool]>>,
    offsets: Arc<[i32]>,
    values: BlockRef,
}

impl ArrayBlock {
    /// Create an array block over `values`, validating the offsets
    pub fn from_array_block(
        position_count: usize,
        value_is_null: Option<Vec<bool>>,
        offsets: Vec<i32>,
        values: BlockRef,
    ) -> PrismResult<Self> {
        if offsets.len() < position_count + 1 {
            return Err(invalid_arg_err!(
                "offsets length {} is less than positionCount {} + 1",
                offsets.len(),
                position_count
            ));
        }
        if let Some(nulls) = &value_is_null {
            if nulls.len() < position_count {
                return Err(invalid_arg_err!(
                    "isNull length {} is less than positionCount {}",
                    nulls.len(),
                    position_count
                ));
            }
        }
        let window = &offsets[..=position_count];
        if window[0] < 0 || window.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(invalid_arg_err!("offsets must be non-negative and non-decreasing"));
        }
        if window[position_count] as usize > values.position_count() {
            return Err(invalid_arg_err!(
                "last offset {} exceeds values position count {}",
                window[position_count],
                values.position_count()
            ));
        }
        if let Some(nulls) = &value_is_null {
            for (position, _) in nulls[..position_count].iter().enumerate().filter(|(_, &null)| null) {
                if window[position] != window[position + 1] {
                    return Err(invalid_arg_err!(
                        "null array at position {} must not have elements",
                        position
                    ));
                }
            }
        }

        Ok(Self::from_parts(
            0,
            position_count,
            value_is_null.map(Into::into),
            offsets.into(),
            values,
        ))
    }

    pub(crate) fn from_parts(
        array_offset: usize,
        position_count: usize,
        value_is_null: Option<Arc<[bool]>>,
        offsets: Arc<[i32]>,
        values: BlockRef,
    ) -> Self {
        Self {
            array_offset,
            position_count,
            value_is_null,
            offsets,
            values,
        }
    }

    fn data(&self) -> ArrayData<'_> {
        let end = self.array_offset + self.position_count;
        ArrayData {
            offsets: &self.offsets[self.array_offset..=end],
            value_is_null: self
                .value_is_null
                .as_deref()
                .map(|nulls| &nulls[self.array_offset..end]),
            values: self.values.as_ref(),
        }
    }

    /// Child block holding the elements of every array
    pub fn values(&self) -> &BlockRef {
        &self.values
    }
}

impl Block for ArrayBlock {
    fn position_count(&self) -> usize {
        self.position_count
    }

    fn get_slice_length(&self, _position: usize) -> PrismResult<usize> {
        Err(unsupported_err!("{}: get_slice_length", self.encoding_name()))
    }

    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        self.data().get_object(position)
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
            + self.values.retained_size_in_bytes()
    }

    fn encoding_name(&self) -> &'static str {
        "ARRAY"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        Ok(Arc::new(Self::from_parts(
            self.array_offset + offset,
            length,
            self.value_is_null.clone(),
            Arc::clone(&self.offsets),
            Arc::clone(&self.values),
        )))
    }

    fn is_compact_region(&self, offset: usize, length: usize) -> bool {
        offset == 0
            && length == self.position_count
            && self.array_offset == 0
            && self.offsets.len() == length + 1
            && self.offsets[0] == 0
            && self.offsets[length] as usize == self.values.position_count()
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

#[derive(Debug)]
pub struct ArrayBlockBuilder {
    status: Option<BlockBuilderStatus>,
    values: Box<dyn BlockBuilder>,
    offsets: Vec<i32>,
    value_is_null: Vec<bool>,
    has_null_value: bool,
    positions: usize,
    current_entry_opened: bool,
}

impl ArrayBlockBuilder {
    pub fn new(
        values: Box<dyn BlockBuilder>,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> Self {
        let mut offsets = Vec::with_capacity(expected_entries + 1);
        offsets.push(0);
        Self {
            status,
            values,
            offsets,
            value_is_null: Vec::with_capacity(expected_entries),
            has_null_value: false,
            positions: 0,
            current_entry_opened: false,
        }
    }

    fn data(&self) -> ArrayData<'_> {
        ArrayData {
            offsets: &self.offsets,
            value_is_null: self.has_null_value.then_some(self.value_is_null.as_slice()),
            values: self.values.as_ref(),
        }
    }

    fn entry_added(&mut self, is_null: bool) -> PrismResult<()> {
        self.offsets.push(to_offset(self.values.position_count())?);
        self.value_is_null.push(is_null);
        self.has_null_value |= is_null;
        self.positions += 1;
        if let Some(status) = &self.status {
            status.add_bytes(SIZE_IN_BYTES_PER_POSITION);
        }
        Ok(())
    }
}

impl Block for ArrayBlockBuilder {
    fn position_count(&self) -> usize {
        self.positions
    }

    fn get_slice_length(&self, _position: usize) -> PrismResult<usize> {
        Err(unsupported_err!("{}: get_slice_length", self.encoding_name()))
    }

    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        self.data().get_object(position)
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
        Ok(self.values.size_in_bytes()? + SIZE_IN_BYTES_PER_POSITION * self.positions)
    }

    fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        self.data().region_size_in_bytes(offset, length)
    }

    fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        self.data().positions_size_in_bytes(selected)
    }

    fn retained_size_in_bytes(&self) -> usize {
        size_of::<Self>()
            + size_of_vec(&self.offsets)
            + size_of_vec(&self.value_is_null)
            + self.values.retained_size_in_bytes()
    }

    fn encoding_name(&self) -> &'static str {
        "ARRAY"
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

impl BlockBuilder for ArrayBlockBuilder {
    fn begin_block_entry(&mut self) -> PrismResult<&mut dyn BlockBuilder> {
        if self.current_entry_opened {
            return Err(illegal_state_err!(
                "Expected current entry to be closed but was opened"
            ));
        }
        self.current_entry_opened = true;
        Ok(self.values.as_mut())
    }

    fn close_entry(&mut self) -> PrismResult<()> {
        if !self.current_entry_opened {
            return Err(illegal_state_err!(
                "Expected entry to be opened but was closed"
            ));
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
        Ok(Arc::new(ArrayBlock::from_parts(
            0,
            self.positions,
            self.has_null_value
                .then(|| Arc::from(self.value_is_null.as_slice())),
            Arc::from(self.offsets.as_slice()),
            self.values.build()?,
        )))
    }

    fn new_block_builder_like(
        &self,
        status: Option<BlockBuilderStatus>,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        let values = self.values.new_block_builder_like(status.clone())?;
        Ok(Box::new(Self::new(
            values,
            status,
            calculate_block_reset_size(self.positions),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::FixedWidthBlockBuilder;

    fn long_arrays(arrays: &[Option<&[i64]>]) -> PrismResult<ArrayBlockBuilder> {
        let mut builder = ArrayBlockBuilder::new(
            Box::new(FixedWidthBlockBuilder::new(8, None, 8)?),
            None,
            arrays.len(),
        );
        for array in arrays {
            match array {
                Some(elements) => {
                    let entry = builder.begin_block_entry()?;
                    for &element in elements.iter() {
                        entry.write_long(element)?;
                        entry.close_entry()?;
                    }
                    builder.close_entry()?;
                }
                None => builder.append_null()?,
            }
        }
        Ok(builder)
    }

    fn elements(block: &dyn Block, position: usize) -> PrismResult<Vec<i64>> {
        let array = block.get_object(position)?;
        (0..array.position_count())
            .map(|i| array.get_long(i, 0))
            .collect()
    }

    #[test]
    fn test_build_and_read() -> PrismResult<()> {
        let builder = long_arrays(&[Some(&[1, 2][..]), None, Some(&[][..]), Some(&[3][..])])?;
        let block = builder.build()?;

        assert_eq!(block.position_count(), 4);
        assert_eq!(elements(block.as_ref(), 0)?, vec![1, 2]);
        assert!(block.is_null(1)?);
        assert!(elements(block.as_ref(), 2)?.is_empty());
        assert_eq!(elements(block.as_ref(), 3)?, vec![3]);
        assert_eq!(block.size_in_bytes()?, 3 * 9 + 4 * SIZE_IN_BYTES_PER_POSITION);
        Ok(())
    }

    #[test]
    fn test_entry_protocol() -> PrismResult<()> {
        let mut builder = long_arrays(&[])?;
        assert!(builder.close_entry().is_err());
        builder.begin_block_entry()?;
        assert!(builder.begin_block_entry().is_err());
        assert!(builder.append_null().is_err());
        assert!(builder.build().is_err());
        builder.close_entry()?;
        assert_eq!(builder.position_count(), 1);
        Ok(())
    }

    #[test]
    fn test_copy_positions_and_region() -> PrismResult<()> {
        let block = long_arrays(&[Some(&[1][..]), Some(&[2, 3][..]), None])?.build()?;

        let picked = block.copy_positions(&[1, 2, 1], 0, 3)?;
        assert_eq!(elements(picked.as_ref(), 0)?, vec![2, 3]);
        assert!(picked.is_null(1)?);
        assert_eq!(elements(picked.as_ref(), 2)?, vec![2, 3]);

        let region = block.get_region(1, 2)?;
        assert_eq!(elements(region.as_ref(), 0)?, vec![2, 3]);
        let copy = region.copy_region(0, 1)?;
        let copy = copy.as_any().downcast_ref::<ArrayBlock>().unwrap();
        assert_eq!(copy.values().position_count(), 2);
        Ok(())
    }

    #[test]
    fn test_write_position_to() -> PrismResult<()> {
        let source = long_arrays(&[Some(&[7, 8][..]), None])?;
        let mut target = long_arrays(&[])?;
        source.write_position_to(0, &mut target)?;
        source.write_position_to(1, &mut target)?;

        assert_eq!(elements(&target, 0)?, vec![7, 8]);
        assert!(target.is_null(1)?);
        Ok(())
    }

    #[test]
    fn test_invalid_construction() -> PrismResult<()> {
        let values = long_arrays(&[])?.values.build()?;
        assert!(ArrayBlock::from_array_block(1, None, vec![0, 1], Arc::clone(&values)).is_err());
        assert!(ArrayBlock::from_array_block(2, None, vec![0, 0], Arc::clone(&values)).is_err());
        assert!(ArrayBlock::from_array_block(1, None, vec![0, 0], values).is_ok());
        Ok(())
    }
}
