//! Row block
//!
//! One child block per field, all with the same position count. Rows map to
//! field positions through `field_offsets`; the table (and the null flags) is
//! only present when some row is null, since a null row occupies no field
//! position. Without it row `i` is field position `array_offset + i`.

use crate::block::single_row_block::SingleRowBlock;
use crate::block::{Block, BlockBuilder, BlockRef, SIZE_IN_BYTES_PER_POSITION};
use crate::common::error::PrismResult;
use crate::common::helper::{
    check_selection_length, check_valid_position, check_valid_positions, check_valid_region,
    compact_offsets, size_of_optional, to_offset,
};
use crate::{invalid_arg_err, unsupported_err};
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Field storage of a row container, either built blocks or live builders
pub(crate) trait RowFields {
    fn field_count(&self) -> usize;

    fn field(&self, index: usize) -> &dyn Block;
}

impl RowFields for [BlockRef] {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn field(&self, index: usize) -> &dyn Block {
        self[index].as_ref()
    }
}

impl RowFields for [Box<dyn BlockBuilder>] {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn field(&self, index: usize) -> &dyn Block {
        self[index].as_ref()
    }
}

/// Borrowed view over row storage, shared by the block and its builder
pub(crate) struct RowData<'a, F: RowFields + ?Sized> {
    /// First field position when there is no offsets table
    pub base: usize,
    pub position_count: usize,
    /// `position_count + 1` field offsets, present iff `value_is_null` is
    pub field_offsets: Option<&'a [i32]>,
    pub value_is_null: Option<&'a [bool]>,
    pub fields: &'a F,
}

impl<'a, F: RowFields + ?Sized> RowData<'a, F> {
    fn field_offset(&self, index: usize) -> usize {
        match self.field_offsets {
            Some(offsets) => offsets[index] as usize,
            None => self.base + index,
        }
    }

    pub fn is_null(&self, position: usize) -> PrismResult<bool> {
        check_valid_position(position, self.position_count)?;
        Ok(self.value_is_null.is_some_and(|nulls| nulls[position]))
    }

    /// Field position of a non-null row
    pub fn field_position(&self, position: usize) -> PrismResult<usize> {
        if self.is_null(position)? {
            return Err(invalid_arg_err!("Row at position {} is null", position));
        }
        Ok(self.field_offset(position))
    }

    fn fields_region_size(&self, start: usize, length: usize) -> PrismResult<usize> {
        let mut size = 0;
        for index in 0..self.fields.field_count() {
            size += self.fields.field(index).region_size_in_bytes(start, length)?;
        }
        Ok(size)
    }

    pub fn size_in_bytes(&self) -> PrismResult<usize> {
        self.region_size_in_bytes(0, self.position_count)
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize> {
        check_valid_region(self.position_count, offset, length)?;
        let start = self.field_offset(offset);
        let end = self.field_offset(offset + length);
        Ok(self.fields_region_size(start, end - start)? + SIZE_IN_BYTES_PER_POSITION * length)
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize> {
        check_selection_length(selected, self.position_count)?;
        let field_positions = self.fields.field(0).position_count();
        let mut used = vec![false; field_positions];
        let mut used_count = 0;
        for (position, _) in selected.iter().enumerate().filter(|(_, &keep)| keep) {
            if !self.is_null(position)? {
                used[self.field_offset(position)] = true;
            }
            used_count += 1;
        }

        let mut size = SIZE_IN_BYTES_PER_POSITION * used_count;
        for index in 0..self.fields.field_count() {
            size += self.fields.field(index).positions_size_in_bytes(&used)?;
        }
        Ok(size)
    }

    pub fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()> {
        if self.is_null(position)? {
            return builder.append_null();
        }
        let field_position = self.field_offset(position);
        let entry = builder.begin_block_entry()?;
        for index in 0..self.fields.field_count() {
            self.fields
                .field(index)
                .write_position_to(field_position, entry)?;
        }
        builder.close_entry()
    }

    /// Independently owned single row
    pub fn single_row(&self, position: usize) -> PrismResult<SingleRowBlock> {
        let field_position = self.field_position(position)?;
        let fields = (0..self.fields.field_count())
            .map(|index| self.fields.field(index).copy_region(field_position, 1))
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(SingleRowBlock::new(fields.into(), 0))
    }

    pub fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<RowBlock> {
        check_valid_positions(positions, offset, length, self.position_count)?;
        let selected = &positions[offset..offset + length];

        let mut field_positions = Vec::with_capacity(length);
        let mut new_offsets = self.value_is_null.map(|_| {
            let mut offsets = Vec::with_capacity(length + 1);
            offsets.push(0);
            offsets
        });
        let mut new_nulls = self.value_is_null.map(|_| Vec::with_capacity(length));

        for &position in selected {
            let is_null = self.value_is_null.is_some_and(|nulls| nulls[position]);
            if !is_null {
                field_positions.push(self.field_offset(position));
            }
            if let Some(offsets) = new_offsets.as_mut() {
                offsets.push(to_offset(field_positions.len())?);
            }
            if let Some(nulls) = new_nulls.as_mut() {
                nulls.push(is_null);
            }
        }

        let fields = (0..self.fields.field_count())
            .map(|index| {
                self.fields
                    .field(index)
                    .copy_positions(&field_positions, 0, field_positions.len())
            })
            .collect::<PrismResult<Vec<_>>>()?;

        Ok(RowBlock::from_parts(
            0,
            length,
            new_offsets.map(Into::into),
            new_nulls.map(Into::into),
            fields.into(),
        ))
    }

    pub fn copy_region(&self, offset: usize, length: usize) -> PrismResult<RowBlock> {
        check_valid_region(self.position_count, offset, length)?;
        let start = self.field_offset(offset);
        let end = self.field_offset(offset + length);
        let fields = (0..self.fields.field_count())
            .map(|index| self.fields.field(index).copy_region(start, end - start))
            .collect::<PrismResult<Vec<_>>>()?;

        Ok(RowBlock::from_parts(
            0,
            length,
            self.field_offsets
                .map(|offsets| compact_offsets(offsets, offset, length).into()),
            self.value_is_null
                .map(|nulls| Arc::<[bool]>::from(&nulls[offset..offset + length])),
            fields.into(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct RowBlock {
    array_offset: usize,
    position_count: usize,
    field_offsets: Option<Arc<[i32]>>,
    value_is_null: Option<Arc<[bool]>>,
    fields: Arc<[BlockRef]>,
}

impl RowBlock {
    /// Create a row block from one block per field. With null flags, the
    /// field blocks hold only the non-null rows.
    pub fn from_field_blocks(
        position_count: usize,
        row_is_null: Option<Vec<bool>>,
        fields: Vec<BlockRef>,
    ) -> PrismResult<Self> {
        if fields.is_empty() {
            return Err(invalid_arg_err!("Row block must have at least one field"));
        }

        let (field_offsets, field_position_count) = match &row_is_null {
            Some(nulls) => {
                if nulls.len() < position_count {
                    return Err(invalid_arg_err!(
                        "rowIsNull length {} is less than positionCount {}",
                        nulls.len(),
                        position_count
                    ));
                }
                let mut offsets = Vec::with_capacity(position_count + 1);
                let mut next = 0;
                offsets.push(0);
                for &is_null in &nulls[..position_count] {
                    if !is_null {
                        next += 1;
                    }
                    offsets.push(to_offset(next)?);
                }
                (Some(Arc::<[i32]>::from(offsets)), next)
            }
            None => (None, position_count),
        };

        for (index, field) in fields.iter().enumerate() {
            if field.position_count() != field_position_count {
                return Err(invalid_arg_err!(
                    "Field {} has {} positions, expected {}",
                    index,
                    field.position_count(),
                    field_position_count
                ));
            }
        }

        Ok(Self::from_parts(
            0,
            position_count,
            field_offsets,
            row_is_null.map(Into::into),
            fields.into(),
        ))
    }

    pub(crate) fn from_parts(
        array_offset: usize,
        position_count: usize,
        field_offsets: Option<Arc<[i32]>>,
        value_is_null: Option<Arc<[bool]>>,
        fields: Arc<[BlockRef]>,
    ) -> Self {
        Self {
            array_offset,
            position_count,
            field_offsets,
            value_is_null,
            fields,
        }
    }

    fn data(&self) -> RowData<'_, [BlockRef]> {
        let end = self.array_offset + self.position_count;
        RowData {
            base: self.array_offset,
            position_count: self.position_count,
            field_offsets: self
                .field_offsets
                .as_deref()
                .map(|offsets| &offsets[self.array_offset..=end]),
            value_is_null: self
                .value_is_null
                .as_deref()
                .map(|nulls| &nulls[self.array_offset..end]),
            fields: &self.fields,
        }
    }

    pub fn fields(&self) -> &[BlockRef] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl Block for RowBlock {
    fn position_count(&self) -> usize {
        self.position_count
    }

    fn get_slice_length(&self, _position: usize) -> PrismResult<usize> {
        Err(unsupported_err!("{}: get_slice_length", self.encoding_name()))
    }

    /// Single row view sharing the field blocks
    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        let field_position = self.data().field_position(position)?;
        Ok(Arc::new(SingleRowBlock::new(
            Arc::clone(&self.fields),
            field_position,
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
            + size_of_optional(self.field_offsets.as_deref())
            + size_of_optional(self.value_is_null.as_deref())
            + self
                .fields
                .iter()
                .map(|field| field.retained_size_in_bytes())
                .sum::<usize>()
    }

    fn encoding_name(&self) -> &'static str {
        "ROW"
    }

    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef> {
        check_valid_region(self.position_count, offset, length)?;
        Ok(Arc::new(Self::from_parts(
            self.array_offset + offset,
            length,
            self.field_offsets.clone(),
            self.value_is_null.clone(),
            Arc::clone(&self.fields),
        )))
    }

    fn is_compact_region(&self, offset: usize, length: usize) -> bool {
        let field_positions = match &self.field_offsets {
            Some(offsets) if offsets.len() == length + 1 && offsets[0] == 0 => {
                Some(offsets[length] as usize)
            }
            Some(_) => None,
            None => Some(length),
        };
        offset == 0
            && length == self.position_count
            && self.array_offset == 0
            && field_positions.is_some_and(|count| {
                self.fields
                    .iter()
                    .all(|field| field.position_count() == count)
            })
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
    use bytes::Bytes;

    fn ids(values: &[i64]) -> BlockRef {
        let slice: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Arc::new(FixedWidthBlock::new(8, values.len(), Bytes::from(slice), None).unwrap())
    }

    fn names(values: &[&str]) -> BlockRef {
        let mut offsets = vec![0];
        let mut slice = Vec::new();
        for value in values {
            slice.extend_from_slice(value.as_bytes());
            offsets.push(slice.len() as i32);
        }
        Arc::new(VariableWidthBlock::new(values.len(), Bytes::from(slice), offsets, None).unwrap())
    }

    #[test]
    fn test_from_field_blocks_with_null_rows() -> PrismResult<()> {
        let block = RowBlock::from_field_blocks(
            3,
            Some(vec![false, true, false]),
            vec![ids(&[1, 3]), names(&["a", "c"])],
        )?;
        assert!(block.may_have_null());
        assert!(block.is_null(1)?);

        let row = block.get_object(2)?;
        assert_eq!(row.position_count(), 2);
        assert_eq!(row.get_long(0, 0)?, 3);
        assert_eq!(row.get_slice(1, 0, 1)?.as_ref(), b"c");
        assert!(block.get_object(1).is_err());
        Ok(())
    }

    #[test]
    fn test_from_field_blocks_validates_counts() {
        assert!(RowBlock::from_field_blocks(2, None, vec![]).is_err());
        assert!(RowBlock::from_field_blocks(2, None, vec![ids(&[1, 2]), names(&["a"])]).is_err());
        assert!(RowBlock::from_field_blocks(2, Some(vec![true, false]), vec![ids(&[1, 2])]).is_err());
        assert!(RowBlock::from_field_blocks(2, Some(vec![true, false]), vec![ids(&[2])]).is_ok());
    }

    #[test]
    fn test_sizes() -> PrismResult<()> {
        let block = RowBlock::from_field_blocks(2, None, vec![ids(&[1, 2]), names(&["ab", "c"])])?;
        // 2 * 9 fixed-width + (3 + 2 * 5) variable-width + 2 * 5 row overhead
        assert_eq!(block.size_in_bytes()?, 18 + 13 + 10);
        assert_eq!(block.region_size_in_bytes(1, 1)?, 9 + 6 + 5);
        assert_eq!(block.positions_size_in_bytes(&[true, false])?, 9 + 7 + 5);
        Ok(())
    }

    #[test]
    fn test_copy_positions_keeps_null_rows() -> PrismResult<()> {
        let block = RowBlock::from_field_blocks(
            3,
            Some(vec![false, true, false]),
            vec![ids(&[10, 30])],
        )?;
        let copy = block.copy_positions(&[2, 1, 0, 2], 0, 4)?;
        assert_eq!(copy.position_count(), 4);
        assert!(copy.is_null(1)?);
        assert_eq!(copy.get_object(0)?.get_long(0, 0)?, 30);
        assert_eq!(copy.get_object(2)?.get_long(0, 0)?, 10);
        assert_eq!(copy.get_object(3)?.get_long(0, 0)?, 30);

        let copy = copy.as_any().downcast_ref::<RowBlock>().unwrap();
        assert_eq!(copy.fields()[0].position_count(), 3);
        Ok(())
    }

    #[test]
    fn test_region_view_and_copy() -> PrismResult<()> {
        let block = RowBlock::from_field_blocks(3, None, vec![ids(&[1, 2, 3])])?;

        let region = block.get_region(1, 2)?;
        assert_eq!(region.get_object(0)?.get_long(0, 0)?, 2);

        let same = block.copy_region(0, 3)?;
        let same = same.as_any().downcast_ref::<RowBlock>().unwrap();
        assert!(Arc::ptr_eq(&same.fields[0], &block.fields[0]));

        let copy = region.copy_region(1, 1)?;
        let copy = copy.as_any().downcast_ref::<RowBlock>().unwrap();
        assert_eq!(copy.fields()[0].position_count(), 1);
        assert_eq!(copy.get_object(0)?.get_long(0, 0)?, 3);
        Ok(())
    }
}
