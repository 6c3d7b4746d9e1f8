use crate::block::{ArrayBlockBuilder, Block, BlockBuilder, BlockBuilderStatus};
use crate::common::error::PrismResult;
use crate::types::logical_type::{
    delegate_base_type, null_aware_compare, null_aware_equal, null_aware_hash, require_comparable,
    require_orderable, unexpected_object, BaseType, ComparableType, NativeKind, ObjectValue,
    OrderableType, Type, TypeRef,
};
use crate::types::signature::{TypeSignature, TypeSignatureParameter};
use std::cmp::Ordering;
use std::sync::Arc;

pub const ARRAY: &str = "array";

/// Arrays of one element type; each value is a block of elements
#[derive(Debug, Clone)]
pub struct ArrayType {
    base: BaseType,
    element_type: TypeRef,
}

impl ArrayType {
    pub fn new(element_type: TypeRef) -> Self {
        let signature = TypeSignature::new(
            ARRAY,
            vec![TypeSignatureParameter::Type(element_type.signature().clone())],
        );
        let display_name = format!("{}({})", ARRAY, element_type.display_name());
        Self {
            base: BaseType::new(signature, NativeKind::Object).with_display_name(display_name),
            element_type,
        }
    }

    pub fn element_type(&self) -> &TypeRef {
        &self.element_type
    }
}

impl Type for ArrayType {
    delegate_base_type!();

    fn type_parameters(&self) -> Vec<TypeRef> {
        vec![Arc::clone(&self.element_type)]
    }

    fn as_comparable(&self) -> Option<&dyn ComparableType> {
        self.element_type.is_comparable().then_some(self as &dyn ComparableType)
    }

    fn as_orderable(&self) -> Option<&dyn OrderableType> {
        self.element_type.is_orderable().then_some(self as &dyn OrderableType)
    }

    fn create_block_builder(
        &self,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        let values = self
            .element_type
            .create_block_builder(status.clone(), expected_entries)?;
        Ok(Box::new(ArrayBlockBuilder::new(values, status, expected_entries)))
    }

    fn get_object(&self, block: &dyn Block, position: usize) -> PrismResult<ObjectValue> {
        Ok(ObjectValue::Block(block.get_object(position)?))
    }

    fn write_object(&self, builder: &mut dyn BlockBuilder, value: &ObjectValue) -> PrismResult<()> {
        let elements = value
            .as_block()
            .ok_or_else(|| unexpected_object(self, value))?;
        let entry = builder.begin_block_entry()?;
        for position in 0..elements.position_count() {
            self.element_type.append_to(elements.as_ref(), position, entry)?;
        }
        builder.close_entry()
    }

    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        let elements = block.get_object(position)?;
        let values = (0..elements.position_count())
            .map(|index| self.element_type.format_value(elements.as_ref(), index))
            .collect::<PrismResult<Vec<_>>>()?;
        Ok(format!("[{}]", values.join(", ")))
    }
}

impl ComparableType for ArrayType {
    fn equal_to(
        &self,
        left: &dyn Block,
        left_position: usize,
        right: &dyn Block,
        right_position: usize,
    ) -> PrismResult<bool> {
        let element_type = require_comparable(&self.element_type)?;
        let left = left.get_object(left_position)?;
        let right = right.get_object(right_position)?;
        if left.position_count() != right.position_count() {
            return Ok(false);
        }
        for index in 0..left.position_count() {
            if !null_aware_equal(element_type, left.as_ref(), index, right.as_ref(), index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn hash(&self, block: &dyn Block, position: usize) -> PrismResult<u64> {
        let element_type = require_comparable(&self.element_type)?;
        let elements = block.get_object(position)?;
        let mut hash: u64 = 0;
        for index in 0..elements.position_count() {
            hash = hash
                .wrapping_mul(31)
                .wrapping_add(null_aware_hash(element_type, elements.as_ref(), index)?);
        }
        Ok(hash)
    }
}

impl OrderableType for ArrayType {
    /// Element-wise; a proper prefix sorts first
    fn compare_to(
        &self,
        left: &dyn Block,
        left_position: usize,
        right: &dyn Block,
        right_position: usize,
    ) -> PrismResult<Ordering> {
        let element_type = require_orderable(&self.element_type)?;
        let left = left.get_object(left_position)?;
        let right = right.get_object(right_position)?;
        let common = left.position_count().min(right.position_count());
        for index in 0..common {
            let ordering =
                null_aware_compare(element_type, left.as_ref(), index, right.as_ref(), index)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(left.position_count().cmp(&right.position_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRef;
    use crate::types::{BigintType, HyperLogLogType, VarcharType};

    fn bigint_arrays(ty: &ArrayType, arrays: &[Option<Vec<Option<i64>>>]) -> PrismResult<BlockRef> {
        let element = BigintType::new();
        let mut builder = ty.create_block_builder(None, arrays.len())?;
        for array in arrays {
            match array {
                Some(values) => {
                    let entry = builder.begin_block_entry()?;
                    for value in values.iter() {
                        match value {
                            Some(value) => element.write_long(entry, *value)?,
                            None => entry.append_null()?,
                        }
                    }
                    builder.close_entry()?;
                }
                None => builder.append_null()?,
            }
        }
        builder.build()
    }

    #[test]
    fn test_signature_and_capabilities() {
        let array = ArrayType::new(Arc::new(VarcharType::bounded(3).unwrap()));
        assert_eq!(array.signature().to_string(), "array(varchar(3))");
        assert_eq!(array.display_name(), "array(varchar(3))");
        assert!(array.is_comparable() && array.is_orderable());
        assert_eq!(array.native_kind(), NativeKind::Object);

        let sketches = ArrayType::new(Arc::new(HyperLogLogType::new()));
        assert!(!sketches.is_comparable());
        assert!(!sketches.is_orderable());
    }

    #[test]
    fn test_append_to_and_format() -> PrismResult<()> {
        let array = ArrayType::new(Arc::new(BigintType::new()));
        let block = bigint_arrays(&array, &[Some(vec![Some(1), None, Some(3)]), None, Some(vec![])])?;
        assert_eq!(array.format_value(block.as_ref(), 0)?, "[1, NULL, 3]");
        assert_eq!(array.format_value(block.as_ref(), 1)?, "NULL");
        assert_eq!(array.format_value(block.as_ref(), 2)?, "[]");

        let mut builder = array.create_block_builder(None, 3)?;
        for position in 0..3 {
            array.append_to(block.as_ref(), position, builder.as_mut())?;
        }
        let copy = builder.build()?;
        assert!(copy.is_null(1)?);
        assert!(array.equal_to(block.as_ref(), 0, copy.as_ref(), 0)?);
        assert_eq!(array.hash(block.as_ref(), 0)?, array.hash(copy.as_ref(), 0)?);
        Ok(())
    }

    #[test]
    fn test_ordering() -> PrismResult<()> {
        let array = ArrayType::new(Arc::new(BigintType::new()));
        let block = bigint_arrays(
            &array,
            &[
                Some(vec![Some(1), Some(2)]),
                Some(vec![Some(1)]),
                Some(vec![Some(1), None]),
                Some(vec![Some(0), Some(9)]),
            ],
        )?;
        let block = block.as_ref();
        assert_eq!(array.compare_to(block, 1, block, 0)?, Ordering::Less);
        assert_eq!(array.compare_to(block, 2, block, 0)?, Ordering::Less);
        assert_eq!(array.compare_to(block, 3, block, 0)?, Ordering::Less);
        assert!(!array.equal_to(block, 0, block, 1)?);
        Ok(())
    }

    #[test]
    fn test_write_object_rejects_temporal_value() -> PrismResult<()> {
        let array = ArrayType::new(Arc::new(BigintType::new()));
        let mut builder = array.create_block_builder(None, 1)?;
        let value = ObjectValue::LongTimestamp(crate::types::LongTimestamp {
            epoch_micros: 0,
            picos_of_micro: 0,
        });
        assert!(array.write_object(builder.as_mut(), &value).is_err());
        Ok(())
    }
}
