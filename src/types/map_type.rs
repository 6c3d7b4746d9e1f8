use crate::block::{Block, BlockBuilder, BlockBuilderStatus, BlockRef, MapBlockBuilder, SingleMapBlock};
use crate::common::error::{PrismError, PrismResult};
use crate::types::logical_type::{
    delegate_base_type, null_aware_equal, null_aware_hash, require_comparable, unexpected_object,
    BaseType, ComparableType, NativeKind, ObjectValue, Type, TypeRef,
};
use crate::types::signature::{TypeSignature, TypeSignatureParameter};
use crate::unsupported_err;
use std::sync::Arc;

pub const MAP: &str = "map";

/// Maps from a comparable key type to a value type
///
/// Each value is a [`SingleMapBlock`] whose positions alternate key and value.
#[derive(Debug, Clone)]
pub struct MapType {
    base: BaseType,
    key_type: TypeRef,
    value_type: TypeRef,
}

impl MapType {
    pub fn new(key_type: TypeRef, value_type: TypeRef) -> PrismResult<Self> {
        if !key_type.is_comparable() {
            return Err(PrismError::NotComparable(format!(
                "key type {} of map must be comparable",
                key_type.display_name()
            )));
        }
        let signature = TypeSignature::new(
            MAP,
            vec![
                TypeSignatureParameter::Type(key_type.signature().clone()),
                TypeSignatureParameter::Type(value_type.signature().clone()),
            ],
        );
        let display_name = format!(
            "{}({}, {})",
            MAP,
            key_type.display_name(),
            value_type.display_name()
        );
        Ok(Self {
            base: BaseType::new(signature, NativeKind::Object).with_display_name(display_name),
            key_type,
            value_type,
        })
    }

    pub fn key_type(&self) -> &TypeRef {
        &self.key_type
    }

    pub fn value_type(&self) -> &TypeRef {
        &self.value_type
    }

    /// Concrete builder, for callers that need [`MapBlockBuilder::strict`]
    pub fn create_map_block_builder(
        &self,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<MapBlockBuilder> {
        let key_builder = self
            .key_type
            .create_block_builder(status.clone(), expected_entries)?;
        let value_builder = self
            .value_type
            .create_block_builder(status.clone(), expected_entries)?;
        MapBlockBuilder::new(
            Arc::clone(&self.key_type),
            key_builder,
            value_builder,
            status,
            expected_entries,
        )
    }
}

fn single_map(map: &BlockRef) -> PrismResult<&SingleMapBlock> {
    map.as_any()
        .downcast_ref::<SingleMapBlock>()
        .ok_or_else(|| unsupported_err!("Expected a single map but got {}", map.encoding_name()))
}

/// Entries that a lookup of their own key resolves to
///
/// A map built without strict checks may repeat a key; only the last value
/// written under it is visible.
fn visible_entries(map: &SingleMapBlock) -> PrismResult<Vec<usize>> {
    let mut visible = Vec::with_capacity(map.entry_count());
    for index in 0..map.entry_count() {
        if map.seek_key(map, index * 2)? == Some(index * 2 + 1) {
            visible.push(index);
        }
    }
    Ok(visible)
}

impl Type for MapType {
    delegate_base_type!();

    fn type_parameters(&self) -> Vec<TypeRef> {
        vec![Arc::clone(&self.key_type), Arc::clone(&self.value_type)]
    }

    fn as_comparable(&self) -> Option<&dyn ComparableType> {
        self.value_type.is_comparable().then_some(self as &dyn ComparableType)
    }

    fn create_block_builder(
        &self,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        Ok(Box::new(self.create_map_block_builder(status, expected_entries)?))
    }

    fn get_object(&self, block: &dyn Block, position: usize) -> PrismResult<ObjectValue> {
        Ok(ObjectValue::Block(block.get_object(position)?))
    }

    fn write_object(&self, builder: &mut dyn BlockBuilder, value: &ObjectValue) -> PrismResult<()> {
        let map = value
            .as_block()
            .ok_or_else(|| unexpected_object(self, value))?;
        let map = single_map(map)?;
        let entry = builder.begin_block_entry()?;
        for index in 0..map.entry_count() {
            self.key_type.append_to(map, index * 2, entry)?;
            self.value_type.append_to(map, index * 2 + 1, entry)?;
        }
        builder.close_entry()
    }

    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        let map = block.get_object(position)?;
        let entries = (0..map.position_count() / 2)
            .map(|index| {
                Ok(format!(
                    "{}={}",
                    self.key_type.format_value(map.as_ref(), index * 2)?,
                    self.value_type.format_value(map.as_ref(), index * 2 + 1)?
                ))
            })
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(format!("{{{}}}", entries.join(", ")))
    }
}

impl ComparableType for MapType {
    /// Same key set, and equal values under each key
    fn equal_to(
        &self,
        left: &dyn Block,
        left_position: usize,
        right: &dyn Block,
        right_position: usize,
    ) -> PrismResult<bool> {
        let value_type = require_comparable(&self.value_type)?;
        let left = left.get_object(left_position)?;
        let right = right.get_object(right_position)?;
        let left_map = single_map(&left)?;
        let right_map = single_map(&right)?;
        let left_entries = visible_entries(left_map)?;
        if left_entries.len() != visible_entries(right_map)?.len() {
            return Ok(false);
        }
        for index in left_entries {
            let Some(right_value) = right_map.seek_key(left_map, index * 2)? else {
                return Ok(false);
            };
            if !null_aware_equal(value_type, left_map, index * 2 + 1, right_map, right_value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Independent of entry order
    fn hash(&self, block: &dyn Block, position: usize) -> PrismResult<u64> {
        let key_type = require_comparable(&self.key_type)?;
        let value_type = require_comparable(&self.value_type)?;
        let map = block.get_object(position)?;
        let map = single_map(&map)?;
        let mut hash: u64 = 0;
        for index in visible_entries(map)? {
            let key_hash = key_type.hash(map, index * 2)?;
            let value_hash = null_aware_hash(value_type, map, index * 2 + 1)?;
            hash = hash.wrapping_add(key_hash ^ value_hash);
        }
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArrayType, BigintType, DoubleType, HyperLogLogType, VarcharType};

    fn map_type() -> PrismResult<MapType> {
        MapType::new(Arc::new(VarcharType::unbounded()), Arc::new(BigintType::new()))
    }

    fn maps(ty: &MapType, maps: &[Option<Vec<(&str, Option<i64>)>>]) -> PrismResult<BlockRef> {
        let varchar = VarcharType::unbounded();
        let bigint = BigintType::new();
        let mut builder = ty.create_block_builder(None, maps.len())?;
        for map in maps {
            let Some(entries) = map else {
                builder.append_null()?;
                continue;
            };
            let entry = builder.begin_block_entry()?;
            for (key, value) in entries {
                varchar.write_slice(entry, key.as_bytes())?;
                match value {
                    Some(value) => bigint.write_long(entry, *value)?,
                    None => entry.append_null()?,
                }
            }
            builder.close_entry()?;
        }
        builder.build()
    }

    #[test]
    fn test_key_must_be_comparable() {
        let result = MapType::new(Arc::new(HyperLogLogType::new()), Arc::new(BigintType::new()));
        assert!(matches!(result, Err(PrismError::NotComparable(_))));
    }

    #[test]
    fn test_comparable_iff_value_comparable() -> PrismResult<()> {
        assert!(map_type()?.is_comparable());
        assert!(!map_type()?.is_orderable());
        let sketches = MapType::new(Arc::new(BigintType::new()), Arc::new(HyperLogLogType::new()))?;
        assert!(!sketches.is_comparable());
        let nested = MapType::new(
            Arc::new(DoubleType::new()),
            Arc::new(ArrayType::new(Arc::new(BigintType::new()))),
        )?;
        assert_eq!(nested.display_name(), "map(double, array(bigint))");
        assert_eq!(nested.signature().to_string(), "map(double,array(bigint))");
        Ok(())
    }

    #[test]
    fn test_equality_ignores_entry_order() -> PrismResult<()> {
        let ty = map_type()?;
        let block = maps(
            &ty,
            &[
                Some(vec![("a", Some(1)), ("b", None)]),
                Some(vec![("b", None), ("a", Some(1))]),
                Some(vec![("a", Some(1)), ("c", None)]),
                Some(vec![("a", Some(1)), ("b", Some(2))]),
            ],
        )?;
        let block = block.as_ref();
        assert!(ty.equal_to(block, 0, block, 1)?);
        assert_eq!(ty.hash(block, 0)?, ty.hash(block, 1)?);
        assert!(!ty.equal_to(block, 0, block, 2)?);
        assert!(!ty.equal_to(block, 0, block, 3)?);
        Ok(())
    }

    #[test]
    fn test_repeated_keys_compare_by_last_value() -> PrismResult<()> {
        let ty = map_type()?;
        let block = maps(
            &ty,
            &[
                Some(vec![("a", Some(1)), ("a", Some(2))]),
                Some(vec![("a", Some(2))]),
                Some(vec![("a", Some(1))]),
                Some(vec![("a", Some(2)), ("b", Some(3)), ("a", Some(2))]),
            ],
        )?;
        let block = block.as_ref();
        assert!(ty.equal_to(block, 0, block, 0)?);
        assert!(ty.equal_to(block, 0, block, 1)?);
        assert!(ty.equal_to(block, 1, block, 0)?);
        assert_eq!(ty.hash(block, 0)?, ty.hash(block, 1)?);
        assert!(!ty.equal_to(block, 0, block, 2)?);
        assert!(!ty.equal_to(block, 1, block, 3)?);
        assert!(ty.equal_to(block, 3, block, 3)?);
        Ok(())
    }

    #[test]
    fn test_append_to_and_format() -> PrismResult<()> {
        let ty = map_type()?;
        let block = maps(&ty, &[Some(vec![("k", Some(7)), ("n", None)]), None])?;
        assert_eq!(ty.format_value(block.as_ref(), 0)?, "{k=7, n=NULL}");
        assert_eq!(ty.format_value(block.as_ref(), 1)?, "NULL");

        let mut builder = ty.create_block_builder(None, 2)?;
        ty.append_to(block.as_ref(), 0, builder.as_mut())?;
        ty.append_to(block.as_ref(), 1, builder.as_mut())?;
        let copy = builder.build()?;
        assert!(copy.is_null(1)?);
        assert!(ty.equal_to(block.as_ref(), 0, copy.as_ref(), 0)?);
        Ok(())
    }

    #[test]
    fn test_write_object_requires_single_map() -> PrismResult<()> {
        let ty = map_type()?;
        let bigint = BigintType::new();
        let mut longs = bigint.create_block_builder(None, 1)?;
        bigint.write_long(longs.as_mut(), 1)?;
        let not_a_map = ObjectValue::Block(longs.build()?);
        let mut builder = ty.create_block_builder(None, 1)?;
        assert!(ty.write_object(builder.as_mut(), &not_a_map).is_err());
        Ok(())
    }

    #[test]
    fn test_strict_builder() -> PrismResult<()> {
        let ty = MapType::new(Arc::new(BigintType::new()), Arc::new(BigintType::new()))?;
        let bigint = BigintType::new();
        let mut builder = ty.create_map_block_builder(None, 1)?;
        builder.strict()?;
        let entry = builder.begin_block_entry()?;
        for value in [1, 10, 1, 20] {
            bigint.write_long(entry, value)?;
        }
        assert!(matches!(builder.close_entry(), Err(PrismError::DuplicateKey(_))));
        Ok(())
    }
}
