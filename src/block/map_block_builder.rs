//! Map block builder
//!
//! Each map is written through a [`SingleMapBlockWriter`] that alternates
//! between the key and the value builder. Closing the map builds its lookup
//! table, so duplicate or null keys are reported at the entry that holds them.

use crate::block::map_block::{comparable_key, MapBlock, MapData};
use crate::block::map_hash_tables::{HashBuildMode, MapHashTables};
use crate::block::single_map_block::{delegate_single_map_reads, SingleMapData};
use crate::block::{Block, BlockBuilder, BlockBuilderStatus, BlockRef, SIZE_IN_BYTES_PER_POSITION};
use crate::common::constants::{EMPTY_SLOT, MHT_HASH_MULTIPLIER};
use crate::common::error::PrismResult;
use crate::common::helper::{
    calculate_block_reset_size, check_valid_position, size_of_vec, to_offset,
};
use crate::types::TypeRef;
use crate::{illegal_state_err, unsupported_err};
use bytes::Bytes;
use std::any::Any;
use std::mem::size_of;
use std::sync::Arc;

/// Entry writer of a [`MapBlockBuilder`]
///
/// Positions alternate key, value, key, value. Every write goes to whichever
/// side is next; `close_entry` and `append_null` move to the other side.
#[derive(Debug)]
pub struct SingleMapBlockWriter {
    key_builder: Box<dyn BlockBuilder>,
    value_builder: Box<dyn BlockBuilder>,
    offset: usize,
    write_to_value_next: bool,
}

impl SingleMapBlockWriter {
    fn new(key_builder: Box<dyn BlockBuilder>, value_builder: Box<dyn BlockBuilder>) -> Self {
        Self {
            key_builder,
            value_builder,
            offset: 0,
            write_to_value_next: false,
        }
    }

    /// Starts a new map at the current end of the child builders
    fn reset(&mut self) {
        self.offset = self.key_builder.position_count();
        self.write_to_value_next = false;
    }

    fn data(&self) -> SingleMapData<'_> {
        let keys = self.key_builder.position_count() - self.offset;
        let values = self.value_builder.position_count() - self.offset;
        SingleMapData {
            keys: self.key_builder.as_ref(),
            values: self.value_builder.as_ref(),
            offset: self.offset,
            position_count: keys + values,
        }
    }

    fn current(&mut self) -> &mut dyn BlockBuilder {
        if self.write_to_value_next {
            self.value_builder.as_mut()
        } else {
            self.key_builder.as_mut()
        }
    }
}

impl Block for SingleMapBlockWriter {
    fn position_count(&self) -> usize {
        self.data().position_count
    }

    delegate_single_map_reads!();

    fn may_have_null(&self) -> bool {
        self.value_builder.may_have_null()
    }

    fn retained_size_in_bytes(&self) -> usize {
        size_of::<Self>()
            + self.key_builder.retained_size_in_bytes()
            + self.value_builder.retained_size_in_bytes()
    }

    fn encoding_name(&self) -> &'static str {
        "MAP_ELEMENT"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BlockBuilder for SingleMapBlockWriter {
    fn write_byte(&mut self, value: u8) -> PrismResult<()> {
        self.current().write_byte(value)
    }

    fn write_short(&mut self, value: i16) -> PrismResult<()> {
        self.current().write_short(value)
    }

    fn write_int(&mut self, value: i32) -> PrismResult<()> {
        self.current().write_int(value)
    }

    fn write_long(&mut self, value: i64) -> PrismResult<()> {
        self.current().write_long(value)
    }

    fn write_bytes(&mut self, source: &[u8]) -> PrismResult<()> {
        self.current().write_bytes(source)
    }

    fn begin_block_entry(&mut self) -> PrismResult<&mut dyn BlockBuilder> {
        self.current().begin_block_entry()
    }

    fn close_entry(&mut self) -> PrismResult<()> {
        self.current().close_entry()?;
        self.write_to_value_next = !self.write_to_value_next;
        Ok(())
    }

    fn append_null(&mut self) -> PrismResult<()> {
        if !self.write_to_value_next {
            return Err(illegal_state_err!("Map keys must not be null"));
        }
        self.value_builder.append_null()?;
        self.write_to_value_next = false;
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
pub struct MapBlockBuilder {
    status: Option<BlockBuilderStatus>,
    key_type: TypeRef,
    writer: SingleMapBlockWriter,
    offsets: Vec<i32>,
    map_is_null: Vec<bool>,
    has_null_value: bool,
    positions: usize,
    hash_tables: MapHashTables,
    current_entry_opened: bool,
}

impl MapBlockBuilder {
    /// Fails when `key_type` has no equality semantics
    pub fn new(
        key_type: TypeRef,
        key_builder: Box<dyn BlockBuilder>,
        value_builder: Box<dyn BlockBuilder>,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<Self> {
        comparable_key(&key_type)?;
        let mut offsets = Vec::with_capacity(expected_entries + 1);
        offsets.push(0);
        Ok(Self {
            status,
            key_type,
            writer: SingleMapBlockWriter::new(key_builder, value_builder),
            offsets,
            map_is_null: Vec::with_capacity(expected_entries),
            has_null_value: false,
            positions: 0,
            hash_tables: MapHashTables::new(HashBuildMode::default(), expected_entries),
            current_entry_opened: false,
        })
    }

    /// Rejects duplicate keys from now on. Only allowed before the first entry.
    pub fn strict(&mut self) -> PrismResult<()> {
        if self.positions > 0 || self.current_entry_opened {
            return Err(illegal_state_err!(
                "Strict mode must be set before any entry is written"
            ));
        }
        tracing::debug!("map block builder switched to strict duplicate key checks");
        self.hash_tables.set_mode(HashBuildMode::Strict);
        Ok(())
    }

    pub fn hash_build_mode(&self) -> HashBuildMode {
        self.hash_tables.mode()
    }

    pub fn key_type(&self) -> &TypeRef {
        &self.key_type
    }

    fn data(&self) -> MapData<'_> {
        MapData {
            offsets: &self.offsets,
            value_is_null: self.has_null_value.then_some(self.map_is_null.as_slice()),
            keys: self.writer.key_builder.as_ref(),
            values: self.writer.value_builder.as_ref(),
            hash_tables: self.hash_tables.hash_tables(),
            key_type: &self.key_type,
        }
    }

    fn entry_added(&mut self, is_null: bool) -> PrismResult<()> {
        self.offsets
            .push(to_offset(self.writer.key_builder.position_count())?);
        self.map_is_null.push(is_null);
        self.has_null_value |= is_null;
        self.positions += 1;
        if let Some(status) = &self.status {
            status.add_bytes(SIZE_IN_BYTES_PER_POSITION);
        }
        Ok(())
    }

    /// Hash tables sized to every key written so far
    fn table_snapshot(&self) -> Arc<[i32]> {
        let required = self.writer.key_builder.position_count() * MHT_HASH_MULTIPLIER;
        let tables = self.hash_tables.hash_tables();
        if tables.len() >= required {
            return Arc::from(&tables[..required]);
        }
        let mut padded = tables.to_vec();
        padded.resize(required, EMPTY_SLOT);
        padded.into()
    }
}

impl Block for MapBlockBuilder {
    fn position_count(&self) -> usize {
        self.positions
    }

    fn get_slice_length(&self, _position: usize) -> PrismResult<usize> {
        Err(unsupported_err!("{}: get_slice_length", self.encoding_name()))
    }

    fn get_object(&self, position: usize) -> PrismResult<BlockRef> {
        check_valid_position(position, self.positions)?;
        self.data().copy_region(position, 1)?.get_object(0)
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
            + size_of_vec(&self.offsets)
            + size_of_vec(&self.map_is_null)
            + self.hash_tables.retained_size_in_bytes()
            + self.writer.key_builder.retained_size_in_bytes()
            + self.writer.value_builder.retained_size_in_bytes()
    }

    fn encoding_name(&self) -> &'static str {
        "MAP"
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

impl BlockBuilder for MapBlockBuilder {
    fn begin_block_entry(&mut self) -> PrismResult<&mut dyn BlockBuilder> {
        if self.current_entry_opened {
            return Err(illegal_state_err!(
                "Expected current entry to be closed but was opened"
            ));
        }
        self.current_entry_opened = true;
        self.writer.reset();
        Ok(&mut self.writer)
    }

    fn close_entry(&mut self) -> PrismResult<()> {
        if !self.current_entry_opened {
            return Err(illegal_state_err!(
                "Expected entry to be opened but was closed"
            ));
        }
        let key_count = self.writer.key_builder.position_count();
        let value_count = self.writer.value_builder.position_count();
        if key_count != value_count {
            return Err(illegal_state_err!(
                "Expected key and value count to match, but got {} keys and {} values",
                key_count,
                value_count
            ));
        }

        let start = self.writer.offset;
        let key_type = comparable_key(&self.key_type)?;
        self.hash_tables.build_entry(
            key_type,
            self.writer.key_builder.as_ref(),
            start,
            key_count - start,
        )?;

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
        Ok(Arc::new(MapBlock::from_parts(
            0,
            self.positions,
            self.has_null_value
                .then(|| Arc::from(self.map_is_null.as_slice())),
            Arc::from(self.offsets.as_slice()),
            self.writer.key_builder.build()?,
            self.writer.value_builder.build()?,
            self.table_snapshot(),
            Arc::clone(&self.key_type),
        )))
    }

    fn new_block_builder_like(
        &self,
        status: Option<BlockBuilderStatus>,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        let mut builder = Self::new(
            Arc::clone(&self.key_type),
            self.writer.key_builder.new_block_builder_like(status.clone())?,
            self.writer.value_builder.new_block_builder_like(status.clone())?,
            status,
            calculate_block_reset_size(self.positions),
        )?;
        builder.hash_tables.set_mode(self.hash_tables.mode());
        Ok(Box::new(builder))
    }
}
