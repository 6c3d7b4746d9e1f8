//! Block module
//!
//! Blocks are the immutable columnar containers of the engine; block builders
//! are their append-only, single-writer counterparts. Both expose the same
//! read contract ([`Block`]) so readers work against either:
//! - VariableWidthBlock: byte sequences delimited by an offset table
//! - FixedWidthBlock: values with an implicit fixed stride
//! - ArrayBlock / RowBlock / MapBlock: nested containers over child blocks
//! - DictionaryBlock: ids into a shared dictionary block
//!
//! Immutable blocks share their backing storage (`Bytes` and `Arc` slices), so
//! region views are cheap and can never be mutated. Builders own growable
//! buffers and never lend them out: everything a builder hands out is a copy.

pub mod array_block;
pub mod dictionary_block;
pub mod fixed_width_block;
pub mod fixed_width_block_builder;
pub mod map_block;
pub mod map_block_builder;
pub mod map_hash_tables;
pub mod row_block;
pub mod row_block_builder;
pub mod single_map_block;
pub mod single_row_block;
pub mod status;
pub mod variable_width_block;
pub mod variable_width_block_builder;

pub use array_block::{ArrayBlock, ArrayBlockBuilder};
pub use dictionary_block::DictionaryBlock;
pub use fixed_width_block::FixedWidthBlock;
pub use fixed_width_block_builder::FixedWidthBlockBuilder;
pub use map_block::MapBlock;
pub use map_block_builder::MapBlockBuilder;
pub use map_hash_tables::{HashBuildMode, MapHashTables};
pub use row_block::RowBlock;
pub use row_block_builder::RowBlockBuilder;
pub use single_map_block::SingleMapBlock;
pub use single_row_block::SingleRowBlock;
pub use status::{BlockBuilderStatus, PageBuilderStatus};
pub use variable_width_block::VariableWidthBlock;
pub use variable_width_block_builder::VariableWidthBlockBuilder;

use crate::common::error::PrismResult;
use crate::common::helper::{check_valid_region, hash_bytes};
use crate::unsupported_err;
use bytes::Bytes;
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an immutable block
pub type BlockRef = Arc<dyn Block>;

/// Per-position bookkeeping charged by variable-width layouts: offset + null flag
pub const SIZE_IN_BYTES_PER_POSITION: usize = 4 + 1;

/// Read contract shared by blocks and block builders
///
/// Byte-level accessors take a `position` and an `offset` within that
/// position's value. Composite blocks only implement the structural subset
/// and report [`crate::PrismError::Unsupported`] for the rest.
pub trait Block: fmt::Debug + Send + Sync {
    /// Number of logical values
    fn position_count(&self) -> usize;

    /// Encoded length of the value at `position`
    fn get_slice_length(&self, position: usize) -> PrismResult<usize>;

    fn get_byte(&self, _position: usize, _offset: usize) -> PrismResult<u8> {
        Err(unsupported_err!("{}: get_byte", self.encoding_name()))
    }

    fn get_short(&self, _position: usize, _offset: usize) -> PrismResult<i16> {
        Err(unsupported_err!("{}: get_short", self.encoding_name()))
    }

    fn get_int(&self, _position: usize, _offset: usize) -> PrismResult<i32> {
        Err(unsupported_err!("{}: get_int", self.encoding_name()))
    }

    fn get_long(&self, _position: usize, _offset: usize) -> PrismResult<i64> {
        Err(unsupported_err!("{}: get_long", self.encoding_name()))
    }

    fn get_slice(&self, _position: usize, _offset: usize, _length: usize) -> PrismResult<Bytes> {
        Err(unsupported_err!("{}: get_slice", self.encoding_name()))
    }

    /// Nested value at `position` (element block, single row or single map)
    fn get_object(&self, _position: usize) -> PrismResult<BlockRef> {
        Err(unsupported_err!("{}: get_object", self.encoding_name()))
    }

    /// Compares `length` bytes of the value at `position` with `other[..length]`
    fn bytes_equal(
        &self,
        position: usize,
        offset: usize,
        other: &[u8],
        length: usize,
    ) -> PrismResult<bool> {
        let value = self.get_slice(position, offset, length)?;
        Ok(other.len() >= length && value.as_ref() == &other[..length])
    }

    /// Compares `length` bytes of two values. False when either value is
    /// shorter than the compared range.
    fn equals(
        &self,
        position: usize,
        offset: usize,
        other: &dyn Block,
        other_position: usize,
        other_offset: usize,
        length: usize,
    ) -> PrismResult<bool> {
        let covers = |slice_length: usize, start: usize| {
            start.checked_add(length).is_some_and(|end| end <= slice_length)
        };
        if !covers(self.get_slice_length(position)?, offset)
            || !covers(other.get_slice_length(other_position)?, other_offset)
        {
            return Ok(false);
        }
        let value = self.get_slice(position, offset, length)?;
        other.bytes_equal(other_position, other_offset, &value, length)
    }

    /// XxHash64 of `length` bytes of the value at `position`
    fn hash(&self, position: usize, offset: usize, length: usize) -> PrismResult<u64> {
        let value = self.get_slice(position, offset, length)?;
        Ok(hash_bytes(&value))
    }

    /// Unsigned lexicographic comparison of two byte ranges
    #[allow(clippy::too_many_arguments)]
    fn compare_to(
        &self,
        left_position: usize,
        left_offset: usize,
        left_length: usize,
        right: &dyn Block,
        right_position: usize,
        right_offset: usize,
        right_length: usize,
    ) -> PrismResult<Ordering> {
        let right_value = right.get_slice(right_position, right_offset, right_length)?;
        self.bytes_compare(left_position, left_offset, left_length, &right_value)
    }

    /// Unsigned lexicographic comparison of a byte range against `other`
    fn bytes_compare(
        &self,
        position: usize,
        offset: usize,
        length: usize,
        other: &[u8],
    ) -> PrismResult<Ordering> {
        let value = self.get_slice(position, offset, length)?;
        Ok(value.as_ref().cmp(other))
    }

    /// Appends `length` bytes of the value at `position` to the open entry of `builder`
    fn write_bytes_to(
        &self,
        position: usize,
        offset: usize,
        length: usize,
        builder: &mut dyn BlockBuilder,
    ) -> PrismResult<()> {
        let value = self.get_slice(position, offset, length)?;
        builder.write_bytes(&value)
    }

    /// Appends the value at `position`, null included, as one entry of `builder`
    fn write_position_to(&self, position: usize, builder: &mut dyn BlockBuilder) -> PrismResult<()>;

    fn is_null(&self, position: usize) -> PrismResult<bool>;

    /// False only when no position can be null
    fn may_have_null(&self) -> bool;

    /// Logical encoded size
    fn size_in_bytes(&self) -> PrismResult<usize>;

    /// Logical encoded size of `[offset, offset + length)`
    fn region_size_in_bytes(&self, offset: usize, length: usize) -> PrismResult<usize>;

    /// Logical encoded size of the positions flagged in `selected`
    fn positions_size_in_bytes(&self, selected: &[bool]) -> PrismResult<usize>;

    /// Memory held by this block, including shared and over-allocated storage
    fn retained_size_in_bytes(&self) -> usize;

    fn encoding_name(&self) -> &'static str;

    /// View of `[offset, offset + length)`. Immutable blocks share storage with
    /// the view; builders return a compacted copy.
    fn get_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef>;

    /// Independently owned compacted copy of `[offset, offset + length)`.
    /// Returns this block's own storage when the region already is the whole
    /// block; [`copy_region`] returns the block itself in that case.
    fn copy_region(&self, offset: usize, length: usize) -> PrismResult<BlockRef>;

    /// True when `[offset, offset + length)` covers exactly the storage this
    /// block holds, so a compacted copy would duplicate it byte for byte
    fn is_compact_region(&self, _offset: usize, _length: usize) -> bool {
        false
    }

    /// New block holding `positions[offset..offset + length]` in order
    fn copy_positions(
        &self,
        positions: &[usize],
        offset: usize,
        length: usize,
    ) -> PrismResult<BlockRef>;

    /// Independently owned one-position block
    fn get_single_value_block(&self, position: usize) -> PrismResult<BlockRef>;

    fn as_any(&self) -> &dyn Any;
}

/// Compacted copy of `[offset, offset + length)` of a shared block
///
/// When the region already is the whole compact block, the block itself is
/// returned and nothing is allocated.
pub fn copy_region(block: &BlockRef, offset: usize, length: usize) -> PrismResult<BlockRef> {
    check_valid_region(block.position_count(), offset, length)?;
    if block.is_compact_region(offset, length) {
        return Ok(Arc::clone(block));
    }
    block.copy_region(offset, length)
}

/// Write contract of the append-only block builders
///
/// Primitive writes accumulate bytes of the current entry, `close_entry`
/// finalizes it as one position. Container builders hand out an entry writer
/// from `begin_block_entry`; every write between that call and
/// `close_entry` belongs to the same position.
pub trait BlockBuilder: Block {
    fn write_byte(&mut self, _value: u8) -> PrismResult<()> {
        Err(unsupported_err!("{}: write_byte", self.encoding_name()))
    }

    fn write_short(&mut self, _value: i16) -> PrismResult<()> {
        Err(unsupported_err!("{}: write_short", self.encoding_name()))
    }

    fn write_int(&mut self, _value: i32) -> PrismResult<()> {
        Err(unsupported_err!("{}: write_int", self.encoding_name()))
    }

    fn write_long(&mut self, _value: i64) -> PrismResult<()> {
        Err(unsupported_err!("{}: write_long", self.encoding_name()))
    }

    fn write_bytes(&mut self, _source: &[u8]) -> PrismResult<()> {
        Err(unsupported_err!("{}: write_bytes", self.encoding_name()))
    }

    /// Opens a nested entry and returns the writer for its contents
    fn begin_block_entry(&mut self) -> PrismResult<&mut dyn BlockBuilder> {
        Err(unsupported_err!("{}: begin_block_entry", self.encoding_name()))
    }

    /// Finalizes the current entry as one position
    fn close_entry(&mut self) -> PrismResult<()>;

    /// Appends a null position; illegal while an entry is open
    fn append_null(&mut self) -> PrismResult<()>;

    /// Snapshot of the current contents. May be called repeatedly; the builder
    /// stays usable afterwards.
    fn build(&self) -> PrismResult<BlockRef>;

    /// Fresh builder pre-sized from this builder's usage
    fn new_block_builder_like(
        &self,
        status: Option<BlockBuilderStatus>,
    ) -> PrismResult<Box<dyn BlockBuilder>>;
}
