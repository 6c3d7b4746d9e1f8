//! Fixed-width scalar types: BOOLEAN, BIGINT, INTEGER and DOUBLE

use crate::block::{Block, BlockBuilder, BlockBuilderStatus};
use crate::common::constants::{SIZE_OF_BYTE, SIZE_OF_DOUBLE, SIZE_OF_INT, SIZE_OF_LONG};
use crate::common::error::PrismResult;
use crate::common::helper::hash_long;
use crate::invalid_arg_err;
use crate::types::logical_type::{
    delegate_base_type, fixed_width_block_builder, BaseType, ComparableType, FixedWidthType,
    NativeKind, OrderableType, Type,
};
use crate::types::signature::TypeSignature;
use std::cmp::Ordering;

pub const BOOLEAN: &str = "boolean";
pub const BIGINT: &str = "bigint";
pub const INTEGER: &str = "integer";
pub const DOUBLE: &str = "double";

/// Implements the comparison traits for a type over one primitive read
macro_rules! comparable_by {
    ($ty:ty, $read:ident, $hash:expr, $compare:expr) => {
        impl ComparableType for $ty {
            fn equal_to(
                &self,
                left: &dyn Block,
                left_position: usize,
                right: &dyn Block,
                right_position: usize,
            ) -> PrismResult<bool> {
                let compare = $compare;
                Ok(compare(
                    self.$read(left, left_position)?,
                    self.$read(right, right_position)?,
                ) == Ordering::Equal)
            }

            fn hash(&self, block: &dyn Block, position: usize) -> PrismResult<u64> {
                let hash = $hash;
                Ok(hash(self.$read(block, position)?))
            }
        }

        impl OrderableType for $ty {
            fn compare_to(
                &self,
                left: &dyn Block,
                left_position: usize,
                right: &dyn Block,
                right_position: usize,
            ) -> PrismResult<Ordering> {
                let compare = $compare;
                Ok(compare(
                    self.$read(left, left_position)?,
                    self.$read(right, right_position)?,
                ))
            }
        }
    };
}

/// Capability accessors of a comparable, orderable fixed-width type
macro_rules! fixed_width_capabilities {
    () => {
        fn as_comparable(&self) -> Option<&dyn ComparableType> {
            Some(self)
        }

        fn as_orderable(&self) -> Option<&dyn OrderableType> {
            Some(self)
        }

        fn as_fixed_width(&self) -> Option<&dyn FixedWidthType> {
            Some(self)
        }

        fn create_block_builder(
            &self,
            status: Option<BlockBuilderStatus>,
            expected_entries: usize,
        ) -> PrismResult<Box<dyn BlockBuilder>> {
            fixed_width_block_builder(self.fixed_size(), status, expected_entries)
        }
    };
}

pub(crate) use comparable_by;
pub(crate) use fixed_width_capabilities;

#[derive(Debug, Clone)]
pub struct BooleanType {
    base: BaseType,
}

impl BooleanType {
    pub fn new() -> Self {
        Self {
            base: BaseType::new(TypeSignature::simple(BOOLEAN), NativeKind::Boolean),
        }
    }
}

impl Default for BooleanType {
    fn default() -> Self {
        Self::new()
    }
}

impl Type for BooleanType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_boolean(&self, block: &dyn Block, position: usize) -> PrismResult<bool> {
        Ok(block.get_byte(position, 0)? != 0)
    }

    fn write_boolean(&self, builder: &mut dyn BlockBuilder, value: bool) -> PrismResult<()> {
        builder.write_byte(value as u8)?;
        builder.close_entry()
    }
}

impl FixedWidthType for BooleanType {
    fn fixed_size(&self) -> usize {
        SIZE_OF_BYTE
    }
}

comparable_by!(
    BooleanType,
    get_boolean,
    |value: bool| hash_long(if value { 1231 } else { 1237 }),
    |left: bool, right: bool| left.cmp(&right)
);

#[derive(Debug, Clone)]
pub struct BigintType {
    base: BaseType,
}

impl BigintType {
    pub fn new() -> Self {
        Self {
            base: BaseType::new(TypeSignature::simple(BIGINT), NativeKind::Int64),
        }
    }
}

impl Default for BigintType {
    fn default() -> Self {
        Self::new()
    }
}

impl Type for BigintType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_long(&self, block: &dyn Block, position: usize) -> PrismResult<i64> {
        block.get_long(position, 0)
    }

    fn write_long(&self, builder: &mut dyn BlockBuilder, value: i64) -> PrismResult<()> {
        builder.write_long(value)?;
        builder.close_entry()
    }
}

impl FixedWidthType for BigintType {
    fn fixed_size(&self) -> usize {
        SIZE_OF_LONG
    }
}

comparable_by!(BigintType, get_long, hash_long, |left: i64, right: i64| left
    .cmp(&right));

/// 32-bit integers, exchanged through the long accessors
#[derive(Debug, Clone)]
pub struct IntegerType {
    base: BaseType,
}

impl IntegerType {
    pub fn new() -> Self {
        Self {
            base: BaseType::new(TypeSignature::simple(INTEGER), NativeKind::Int64),
        }
    }
}

impl Default for IntegerType {
    fn default() -> Self {
        Self::new()
    }
}

impl Type for IntegerType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_long(&self, block: &dyn Block, position: usize) -> PrismResult<i64> {
        Ok(block.get_int(position, 0)? as i64)
    }

    fn write_long(&self, builder: &mut dyn BlockBuilder, value: i64) -> PrismResult<()> {
        let value = i32::try_from(value)
            .map_err(|_| invalid_arg_err!("Value {} exceeds the range of integer", value))?;
        builder.write_int(value)?;
        builder.close_entry()
    }
}

impl FixedWidthType for IntegerType {
    fn fixed_size(&self) -> usize {
        SIZE_OF_INT
    }
}

comparable_by!(IntegerType, get_long, hash_long, |left: i64, right: i64| left
    .cmp(&right));

#[derive(Debug, Clone)]
pub struct DoubleType {
    base: BaseType,
}

impl DoubleType {
    pub fn new() -> Self {
        Self {
            base: BaseType::new(TypeSignature::simple(DOUBLE), NativeKind::Float64),
        }
    }
}

impl Default for DoubleType {
    fn default() -> Self {
        Self::new()
    }
}

impl Type for DoubleType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_double(&self, block: &dyn Block, position: usize) -> PrismResult<f64> {
        Ok(f64::from_bits(block.get_long(position, 0)? as u64))
    }

    fn write_double(&self, builder: &mut dyn BlockBuilder, value: f64) -> PrismResult<()> {
        builder.write_long(value.to_bits() as i64)?;
        builder.close_entry()
    }
}

impl FixedWidthType for DoubleType {
    fn fixed_size(&self) -> usize {
        SIZE_OF_DOUBLE
    }
}

/// Hash of a double with `-0.0 == 0.0` and all NaNs alike
fn double_hash(value: f64) -> u64 {
    let canonical = if value == 0.0 {
        0.0
    } else if value.is_nan() {
        f64::NAN
    } else {
        value
    };
    hash_long(canonical.to_bits() as i64)
}

/// Numeric order with NaN above every number and equal to itself
fn double_compare(left: f64, right: f64) -> Ordering {
    left.partial_cmp(&right)
        .unwrap_or_else(|| left.is_nan().cmp(&right.is_nan()))
}

comparable_by!(DoubleType, get_double, double_hash, double_compare);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRef;
    use crate::common::error::PrismError;

    fn built(
        ty: &dyn Type,
        write: impl Fn(&mut dyn BlockBuilder) -> PrismResult<()>,
    ) -> PrismResult<BlockRef> {
        let mut builder = ty.create_block_builder(None, 4)?;
        write(builder.as_mut())?;
        builder.build()
    }

    #[test]
    fn test_round_trips() -> PrismResult<()> {
        let boolean = BooleanType::new();
        let block = built(&boolean, |b| {
            boolean.write_boolean(b, true)?;
            boolean.write_boolean(b, false)
        })?;
        assert!(boolean.get_boolean(block.as_ref(), 0)?);
        assert!(!boolean.get_boolean(block.as_ref(), 1)?);

        let integer = IntegerType::new();
        let block = built(&integer, |b| integer.write_long(b, 12345))?;
        assert_eq!(integer.get_long(block.as_ref(), 0)?, 12345);
        assert_eq!(block.size_in_bytes()?, SIZE_OF_INT + 1);

        let double = DoubleType::new();
        let block = built(&double, |b| double.write_double(b, -1.5))?;
        assert_eq!(double.get_double(block.as_ref(), 0)?, -1.5);
        assert_eq!(double.format_value(block.as_ref(), 0)?, "-1.5");
        Ok(())
    }

    #[test]
    fn test_integer_range() -> PrismResult<()> {
        let integer = IntegerType::new();
        let mut builder = integer.create_block_builder(None, 1)?;
        assert!(matches!(
            integer.write_long(builder.as_mut(), i64::from(i32::MAX) + 1),
            Err(PrismError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unsupported_accessors() -> PrismResult<()> {
        let bigint = BigintType::new();
        let block = built(&bigint, |b| bigint.write_long(b, 7))?;
        let err = bigint.get_double(block.as_ref(), 0).unwrap_err();
        assert!(matches!(err, PrismError::Unsupported(ref message) if message.contains("get_double")));
        assert!(bigint.get_slice(block.as_ref(), 0).is_err());
        Ok(())
    }

    #[test]
    fn test_comparison() -> PrismResult<()> {
        let double = DoubleType::new();
        let block = built(&double, |b| {
            double.write_double(b, 0.0)?;
            double.write_double(b, -0.0)?;
            double.write_double(b, f64::NAN)?;
            double.write_double(b, 1.0)
        })?;
        let block = block.as_ref();
        assert!(double.equal_to(block, 0, block, 1)?);
        assert_eq!(double.hash(block, 0)?, double.hash(block, 1)?);
        assert!(double.equal_to(block, 2, block, 2)?);
        assert_eq!(double.compare_to(block, 2, block, 3)?, Ordering::Greater);

        let bigint = BigintType::new();
        let longs = built(&bigint, |b| {
            bigint.write_long(b, -3)?;
            bigint.write_long(b, 4)
        })?;
        assert_eq!(bigint.compare_to(longs.as_ref(), 0, longs.as_ref(), 1)?, Ordering::Less);
        assert!(bigint.is_comparable() && bigint.is_orderable());
        assert_eq!(bigint.as_fixed_width().map(|ty| ty.fixed_size()), Some(8));
        Ok(())
    }
}
