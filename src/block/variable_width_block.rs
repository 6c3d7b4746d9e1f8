//! Variable-width block
//!
//! Values are stored back to back in one byte buffer; `offsets[i]..offsets[i + 1]`
//! delimits position `i` (relative to `array_offset`). The null flags are
//! optional: without them no position is null.

use crate::block::{Block, BlockBuilder, BlockRef, SIZE_IN_BYTES_PER_POSITION};
use crate::common::error::PrismResult;
use crate::common::helper::{
    check_selection_length, check_valid_position, check_valid_positions, check_valid_region,
    compact_offsets, size_of_optional, size_of_slice, to_offset,
};
use crate::{invalid_arg_err, out_of_bounds_err};
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Borrowed view over variable-width storage, used by both the block and its builder
#[derive(Debug, Clone, Copy)]
pub(crate) struct VariableWidthData<'a> {
    pub slice: &'a [u8],
    /// Offsets of the addressed positions, `position_count + 1` entries
    pub offsets: &'a [i32],
    /// Null flags of the addressed positions
    pub value_is_null: Option<&'a [bool]>,
}

impl<'a> VariableWidthData<'a> {
    pub fn position_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn position_offset(&self, position: usize) -> usize {
        self.offsets[position] as usize
    }

    pub fn slice_length(&self, position: usize) -> PrismResult<usize> {
        check_valid_position(position, self.position_count())?;
        Ok((self.offsets[position + 1] - self.offsets[position]) as usize)
    }

    pub fn is_null(&self, position: usize) -> PrismResult<bool> {
        check_valid_position(position, self.position_count())?;
        Ok(self.value_is_null.is_some_and(|nulls| nulls[position]))
    }

    /// Absolute `[start, start + length)` range of the buffer for a read inside `position`
    pub fn read_range(
        &self,
        position: usize,
        offset: usize,
        length: usize,
    ) -> PrismResult<std::ops::Range<usize>> {
        check_valid_position(position, self.position_count())?;
        let range = self
            .position_offset(position)
            .checked_add(offset)
            .and_then(|start| Some((start, start.checked_add(length)?)))
            .filter(|&(_, end)| end <= self.slice.len());
        let Some((start, end)) = range else {
            return Err(out_of_bounds_err!(
                "Read of {} bytes at offset {} of position {} exceeds buffer of {} bytes",
                length,
                offset,
                position,
                self.slice.len()
            ));
        };
        Ok(start..end)
    }

    pub fn read(&self, position: usize, offset: usize, length: usize) -> PrismResult<&'a [u8]> {
        let range = self.read_range(position, offset, length)?;
        Ok(&self.slice[range])
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

    /// Whole value at `position`
    pub fn value(&self, position: usize) -> PrismResult<&'a [u8]> {
        let length = self.slice_length(position)?;
        self.read(position, 0, length)
    }

    pub fn size_in_bytes(&self) -> usize {
        let count = self.position_count();
        (self.offsets[count] - self.offsets[0]) as usize + SIZE_IN_BYTES_PER_POSITION * count
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.position_count(), offset, length)?;
        let payload = (self.offsets[offset + length] - self.offsets[offset]) as usize;
        Ok(payload + SIZE_IN_BYTES_PER_POSITION * length)
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.position_count())?;
        let mut size = 0;
        for (position, _) in selected.iter().enumerate().filter(|(_, &keep)| keep) {
            size += (self.offsets[position + 1] - self.offsets[position]) as usize;
            size += SIZE_IN_BYTES_PER_POSITION;
        }
        Ok(size)
    }

    pub fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        if self.is_null(position)? {
            return builder.append_null();
        }
        builder.write_bytes(self.value(position)?)?;
        builder.close_entry()
    }

    /// Copies the selected positions, coalescing runs of consecutive positions
    /// into single buffer copies
    pub fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<VariableWidthBlock> {
        check_valid_positions(positions, offset, length, self.position_count())?;
        let selected = &positions[offset..offset + length];

        let mut total_bytes = 0;
        for &position in selected {
            total_bytes += (self.offsets[position + 1] - self.offsets[position]) as usize;
        }

        let mut new_offsets = Vec::with_capacity(length + 1);
        let mut new_slice = Vec::with_capacity(total_bytes);
        let mut new_nulls = self.value_is_null.map(|_| Vec::with_capacity(length));
        new_offsets.push(0);

        let mut written = 0;
        let mut run: Option<(usize, usize)> = None;
        for &position in selected {
            if let (Some(target), Some(source)) = (new_nulls.as_mut(), self.value_is_null) {
                target.push(source[position]);
            }
            written += (self.offsets[position + 1] - self.offsets[position]) as usize;
            new_offsets.push(to_offset(written)?);

            run = match run {
                Some((first, last)) if position == last + 1 => Some((first, position)),
                Some((first, last)) => {
                    self.copy_run(first, last, &mut new_slice);
                    Some((position, position))
                }
                None => Some((position, position)),
            };
        }
        if let Some((first, last)) = run {
            self.copy_run(first, last, &mut new_slice);
        }

        Ok(VariableWidthBlock::from_parts(
            0,
            length,
            Bytes::from(new_slice),
            new_offsets.into(),
            new_nulls.map(Into::into),
        ))
    }

    fn copy_run(&self, first: usize, last: usize, target: &mut Vec<u8>) {
        let start = self.position_offset(first);
        let end = self.position_offset(last + 1);
        target.extend_from_slice(&self.slice[start..end]);
    }

    /// Compacted, independently owned copy of a region
    pub fn copy_region(&self, offset: usize, length: usize) -> PrismResult<VariableWidthBlock> {
        check_valid_region(self.position_count(), offset, length)?;
        let new_offsets = compact_offsets(self.offsets, offset, length);
        let start = self.position_offset(offset);
        let end = self.position_offset(offset + length);
        let new_nulls = self
            .value_is_null
            .map(|nulls| Arc::<[bool]>::from(&nulls[offset..offset + length]));

        Ok(VariableWidthBlock::from_parts(
            0,
            length,
            Bytes::copy_from_slice(&self.slice[start..end]),
            new_offsets.into(),
            new_nulls,
        ))
    }

    pub fn single_value_block(&self, position: usize) -> PrismResult<VariableWidthBlock> {
        if self.is_null(position)? {
            return Ok(VariableWidthBlock::null_block());
        }
        let value = self.value(position)?;
        Ok(VariableWidthBlock::from_parts(
            0,
            1,
            Bytes::copy_from_slice(value),
            Arc::from([0, to_offset(value.len())?]),
            None,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct VariableWidthBlock {
    array_offset: usize,
    position_count: usize,
    slice: Bytes,
    offsets: Arc<[i32]>,
    value_is_null: Option<Arc<[bool]>>,
    size_in_bytes: usize,
    retained_size_in_bytes: usize,
}

impl VariableWidthBlock {
    /// Create a block from owned parts starting at position zero
    pub fn new(
        position_count: usize,
        slice: Bytes,
        offsets: Vec<i32>,
        value_is_null: Option<Vec<bool>>,
    ) -> PrismResult<Self> {
        Self::with_array_offset(
            0,
            position_count,
            slice,
            offsets.into(),
            value_is_null.map(Into::into),
        )
    }

    /// Create a block over shared storage, addressing positions from `array_offset`
    pub fn with_array_offset(
        array_offset: usize,
        position_count: usize,
        slice: Bytes,
        offsets: Arc<[i32]>,
        value_is_null: Option<Arc<[bool]>>,
    ) -> PrismResult<Self> {
        if offsets.len() < array_offset || offsets.len() - array_offset < position_count + 1 {
            return Err(invalid_arg_err!(
                "offsets length {} is less than positionCount {} + 1 after arrayOffset {}",
                offsets.len(),
                position_count,
                array_offset
            ));
        }
        if let Some(nulls) = &value_is_null {
            if nulls.len() < array_offset || nulls.len() - array_offset < position_count {
                return Err(invalid_arg_err!(
                    "isNull length {} is less than positionCount {} after arrayOffset {}",
                    nulls.len(),
                    position_count,
                    array_offset
                ));
            }
        }

        let window = &offsets[array_offset..=array_offset + position_count];
        if window[0] < 0 {
            return Err(invalid_arg_err!("first offset is negative: {}", window[0]));
        }
        if let Some(index) = window.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(invalid_arg_err!(
                "offsets decrease at position {}: {} > {}",
                index,
                window[index],
                window[index + 1]
            ));
        }
        if window[position_count] as usize > slice.len() {
            return Err(invalid_arg_err!(
                "last offset {} exceeds slice length {}",
                window[position_count],
                slice.len()
            ));
        }

        Ok(Self::from_parts(
            array_offset,
            position_count,
            slice,
            offsets,
            value_is_null,
        ))
    }

    /// Assemble a block from parts that are already known to be consistent
    pub(crate) fn from_parts(
        array_offset: usize,
        position_count: usize,
        slice: Bytes,
        offsets: Arc<[i32]>,
        value_is_null: Option<Arc<[bool]>>,
    ) -> Self {
        let payload = (offsets[array_offset + position_count] - offsets[array_offset]) as usize;
        let size_in_bytes = payload + SIZE_IN_BYTES_PER_POSITION * position_count;
        let retained_size_in_bytes = size_of::<Self>()
            + slice.len()
            + size_of_slice(&offsets)
            + size_of_optional(value_is_null.as_deref());

        Self {
            array_offset,
            position_count,
            slice,
            offsets,
            value_is_null,
            size_in_bytes,
            retained_size_in_bytes,
        }
    }

    /// Canonical one-position null block
    pub fn null_block() -> Self {
        Self::from_parts(0, 1, Bytes::new(), Arc::from([0, 0]), Some(Arc::from([true])))
    }

    /// Block without positions
    pub fn empty() -> Self {
        Self::from_parts(0, 0, Bytes::new(), Arc::from([0]), None)
    }

    pub(crate) fn data(&self) -> VariableWidthData<'_> {
        let end = self.array_offset + self.position_count;
        VariableWidthData {
            slice: &self.slice,
            offsets: &self.offsets[self.array_offset..=end],
            value_is_null: self
                .value_is_null
                .as_deref()
                .map(|nulls| &nulls[self.array_offset..end]),
        }
    }

    pub fn array_offset(&self) -> usize {
        self.array_offset
    }

    /// Backing buffer, shared with every view of this block
    pub fn raw_slice(&self) -> &Bytes {
        &self.slice
    }

    /// Start of `position`'s value inside [`Self::raw_slice`]
    pub fn position_offset(&self, position: usize) -> PrismResult<usize> {
        check_valid_position(position, self.position_count)?;
        Ok(self.offsets[self.array_offset + position] as usize)
    }

    /// True when both blocks are backed by the same buffers
    pub fn shares_storage_with(&self, other: &VariableWidthBlock) -> bool {
        self.slice.as_ptr() == other.slice.as_ptr()
            && Arc::ptr_eq(&self.offsets, &other.offsets)
            && match (&self.value_is_null, &other.value_is_null) {
                (Some(left), Some(right)) => Arc::ptr_eq(left, right),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Block for VariableWidthBlock {
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
        Ok(self.slice.slice(range))
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
        self.value_is_null.is_some()
    }

    fn size_in_bytes(&self) -> PrismResult<usize> {
        Ok(self.size_in_bytes)
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
        "VARIABLE_WIDTH"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        Ok(Arc::new(Self::from_parts(
            self.array_offset + offset,
            length,
            self.slice.clone(),
            Arc::clone(&self.offsets),
            self.value_is_null.clone(),
        )))
    }

    fn is_compact_region(&self, offset: usize, length: usize) -> bool {
        offset == 0
            && length == self.position_count
            && self.array_offset == 0
            && self.offsets.len() == length + 1
            && self.offsets[0] == 0
            && self.offsets[length] as usize == self.slice.len()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn block_of(values: &[Option<&str>]) -> VariableWidthBlock {
        let mut slice = Vec::new();
        let mut offsets = vec![0];
        let mut nulls = Vec::new();
        for value in values {
            if let Some(value) = value {
                slice.extend_from_slice(value.as_bytes());
            }
            offsets.push(slice.len() as i32);
            nulls.push(value.is_none());
        }
        let nulls = nulls.iter().any(|&n| n).then_some(nulls);
        VariableWidthBlock::new(values.len(), Bytes::from(slice), offsets, nulls).unwrap()
    }

    fn values(block: &dyn Block) -> Vec<Option<String>> {
        (0..block.position_count())
            .map(|position| {
                if block.is_null(position).unwrap() {
                    None
                } else {
                    let length = block.get_slice_length(position).unwrap();
                    let bytes = block.get_slice(position, 0, length).unwrap();
                    Some(String::from_utf8(bytes.to_vec()).unwrap())
                }
            })
            .collect()
    }

    #[test]
    fn test_construction_checks() {
        let slice = Bytes::from_static(b"abc");
        assert!(VariableWidthBlock::new(2, slice.clone(), vec![0, 1], None).is_err());
        assert!(VariableWidthBlock::new(2, slice.clone(), vec![0, 1, 3], Some(vec![false])).is_err());
        assert!(VariableWidthBlock::new(2, slice.clone(), vec![0, 2, 1], None).is_err());
        assert!(VariableWidthBlock::new(2, slice.clone(), vec![0, 1, 4], None).is_err());
        assert!(VariableWidthBlock::with_array_offset(3, 1, slice.clone(), Arc::from([0, 1, 3]), None).is_err());
        assert!(VariableWidthBlock::with_array_offset(1, 1, slice, Arc::from([0, 1, 3]), None).is_ok());
    }

    #[test]
    fn test_offsets_bound_slice_lengths() {
        let block = block_of(&[Some("aa"), None, Some("ccc"), Some("")]);
        for position in 0..block.position_count() {
            let start = block.position_offset(position).unwrap();
            let end = if position + 1 < block.position_count() {
                block.position_offset(position + 1).unwrap()
            } else {
                block.raw_slice().len()
            };
            assert_eq!(block.get_slice_length(position).unwrap(), end - start);
        }
        assert!(block.get_slice_length(4).is_err());
        assert!(block.is_null(1).unwrap());
        assert!(!block.is_null(0).unwrap());
    }

    #[test]
    fn test_byte_accessors() {
        let mut slice = Vec::new();
        slice.extend_from_slice(&7i64.to_le_bytes());
        slice.extend_from_slice(&(-3i32).to_le_bytes());
        slice.extend_from_slice(&512i16.to_le_bytes());
        let block = VariableWidthBlock::new(2, Bytes::from(slice), vec![0, 8, 14], None).unwrap();

        assert_eq!(block.get_long(0, 0).unwrap(), 7);
        assert_eq!(block.get_byte(0, 0).unwrap(), 7);
        assert_eq!(block.get_int(1, 0).unwrap(), -3);
        assert_eq!(block.get_short(1, 4).unwrap(), 512);
        // reads past the end of the buffer fail
        assert!(block.get_long(1, 0).is_err());
        assert!(block.get_int(1, 4).is_err());
    }

    #[test]
    fn test_sizes() {
        let block = block_of(&[Some("aa"), None, Some("ccc")]);
        assert_eq!(block.size_in_bytes().unwrap(), 5 + 3 * SIZE_IN_BYTES_PER_POSITION);
        assert_eq!(block.region_size_in_bytes(1, 2).unwrap(), 3 + 2 * SIZE_IN_BYTES_PER_POSITION);
        assert_eq!(
            block.positions_size_in_bytes(&[true, false, true]).unwrap(),
            5 + 2 * SIZE_IN_BYTES_PER_POSITION
        );
        assert!(block.positions_size_in_bytes(&[true]).is_err());
        assert!(block.retained_size_in_bytes() >= block.size_in_bytes().unwrap());
    }

    #[test]
    fn test_copy_positions() {
        let block = block_of(&[Some("aa"), Some("b"), Some("ccc")]);
        let copy = block.copy_positions(&[2, 0, 2], 0, 3).unwrap();
        assert_eq!(
            values(copy.as_ref()),
            vec![Some("ccc".to_string()), Some("aa".to_string()), Some("ccc".to_string())]
        );

        let copy = copy.as_any().downcast_ref::<VariableWidthBlock>().unwrap();
        assert_ne!(copy.raw_slice().as_ptr(), block.raw_slice().as_ptr());

        let empty = block.copy_positions(&[1, 2], 1, 0).unwrap();
        assert_eq!(empty.position_count(), 0);
        assert_eq!(empty.size_in_bytes().unwrap(), 0);
        assert!(block.copy_positions(&[0, 3], 0, 2).is_err());
    }

    #[test]
    fn test_copy_positions_coalesces_runs_and_keeps_nulls() {
        let block = block_of(&[Some("a"), None, Some("cc"), Some("ddd")]);
        let copy = block.copy_positions(&[9, 1, 2, 3, 0], 1, 4).unwrap();
        assert_eq!(
            values(copy.as_ref()),
            vec![None, Some("cc".to_string()), Some("ddd".to_string()), Some("a".to_string())]
        );
    }

    #[test]
    fn test_region_is_a_view() {
        let block = block_of(&[Some("aa"), Some("b"), Some("ccc")]);
        let region = block.get_region(1, 2).unwrap();
        assert_eq!(values(region.as_ref()), vec![Some("b".to_string()), Some("ccc".to_string())]);
        let region = region.as_any().downcast_ref::<VariableWidthBlock>().unwrap();
        assert!(region.shares_storage_with(&block));
        assert_eq!(region.array_offset(), 1);
        assert!(block.get_region(2, 2).is_err());
    }

    #[test]
    fn test_copy_region() {
        let block = block_of(&[Some("aa"), None, Some("ccc")]);
        let whole = block.copy_region(0, 3).unwrap();
        let whole = whole.as_any().downcast_ref::<VariableWidthBlock>().unwrap();
        assert!(whole.shares_storage_with(&block));

        let part = block.copy_region(1, 2).unwrap();
        assert_eq!(values(part.as_ref()), vec![None, Some("ccc".to_string())]);
        let part = part.as_any().downcast_ref::<VariableWidthBlock>().unwrap();
        assert!(!part.shares_storage_with(&block));
        assert_eq!(part.raw_slice().len(), 3);

        // a view is compacted when copied
        let view = block.get_region(1, 2).unwrap();
        let compacted = view.copy_region(0, 2).unwrap();
        let compacted = compacted.as_any().downcast_ref::<VariableWidthBlock>().unwrap();
        assert_eq!(compacted.array_offset(), 0);
        assert!(!compacted.shares_storage_with(&block));
    }

    #[test]
    fn test_single_value_block() {
        let block = block_of(&[Some("aa"), None]);
        let single = block.get_single_value_block(0).unwrap();
        assert_eq!(values(single.as_ref()), vec![Some("aa".to_string())]);
        assert!(!single.may_have_null());

        let null = block.get_single_value_block(1).unwrap();
        assert_eq!(null.position_count(), 1);
        assert!(null.is_null(0).unwrap());
        assert!(block.get_single_value_block(2).is_err());
    }
}
