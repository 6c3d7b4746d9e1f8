//! Byte-sequence types: VARCHAR, CHAR and VARBINARY

use crate::block::{Block, BlockBuilder, BlockBuilderStatus};
use crate::common::constants::{DEFAULT_EXPECTED_BYTES_PER_ENTRY, MAX_CHAR_LENGTH, MAX_VARCHAR_LENGTH};
use crate::common::error::PrismResult;
use crate::invalid_arg_err;
use crate::types::logical_type::{
    delegate_base_type, read_slice, slice_compare, slice_hash, slices_equal, write_slice_entry,
    BaseType, ComparableType, NativeKind, OrderableType, Type, VariableWidthType,
};
use crate::types::signature::{TypeSignature, TypeSignatureParameter};
use bytes::Bytes;
use std::cmp::Ordering;

pub const VARCHAR: &str = "varchar";
pub const CHAR: &str = "char";
pub const VARBINARY: &str = "varbinary";

/// Read, write and compare a type as whole byte sequences
macro_rules! byte_sequence_type {
    ($ty:ty) => {
        impl ComparableType for $ty {
            fn equal_to(
                &self,
                left: &dyn Block,
                left_position: usize,
                right: &dyn Block,
                right_position: usize,
            ) -> PrismResult<bool> {
                slices_equal(left, left_position, right, right_position)
            }

            fn hash(&self, block: &dyn Block, position: usize) -> PrismResult<u64> {
                slice_hash(block, position)
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
                slice_compare(left, left_position, right, right_position)
            }
        }

        impl VariableWidthType for $ty {
            fn expected_bytes_per_entry(&self) -> usize {
                self.expected_bytes_per_entry
            }
        }
    };
}

/// Capability accessors and builder creation of a byte-sequence type
macro_rules! byte_sequence_capabilities {
    () => {
        fn as_comparable(&self) -> Option<&dyn ComparableType> {
            Some(self)
        }

        fn as_orderable(&self) -> Option<&dyn OrderableType> {
            Some(self)
        }

        fn as_variable_width(&self) -> Option<&dyn VariableWidthType> {
            Some(self)
        }

        fn create_block_builder(
            &self,
            status: Option<BlockBuilderStatus>,
            expected_entries: usize,
        ) -> PrismResult<Box<dyn BlockBuilder>> {
            self.create_block_builder_with_bytes(
                status,
                expected_entries,
                self.expected_bytes_per_entry,
            )
        }

        fn get_slice(&self, block: &dyn Block, position: usize) -> PrismResult<Bytes> {
            read_slice(block, position)
        }
    };
}

/// Bytes-per-entry guess of a type bounded to `length` characters
fn bounded_expected_bytes(length: u32, default_expected_bytes_per_entry: usize) -> usize {
    (length as usize).min(default_expected_bytes_per_entry)
}

/// Character strings, optionally bounded to a maximum length
#[derive(Debug, Clone)]
pub struct VarcharType {
    base: BaseType,
    length: Option<u32>,
    expected_bytes_per_entry: usize,
}

impl VarcharType {
    pub fn unbounded() -> Self {
        Self::with_expected_bytes(None, DEFAULT_EXPECTED_BYTES_PER_ENTRY)
    }

    pub fn bounded(length: u32) -> PrismResult<Self> {
        Self::create(Some(length), DEFAULT_EXPECTED_BYTES_PER_ENTRY)
    }

    /// Varchar whose builders assume `default_expected_bytes_per_entry`
    /// bytes per value, or the bound when smaller
    pub fn create(length: Option<u32>, default_expected_bytes_per_entry: usize) -> PrismResult<Self> {
        if let Some(length) = length {
            if length > MAX_VARCHAR_LENGTH {
                return Err(invalid_arg_err!(
                    "VARCHAR length must be in range [0, {}], got {}",
                    MAX_VARCHAR_LENGTH,
                    length
                ));
            }
        }
        Ok(Self::with_expected_bytes(length, default_expected_bytes_per_entry))
    }

    fn with_expected_bytes(length: Option<u32>, default_expected_bytes_per_entry: usize) -> Self {
        let (signature, expected_bytes_per_entry) = match length {
            Some(length) => (
                TypeSignature::new(VARCHAR, vec![TypeSignatureParameter::Long(length as i64)]),
                bounded_expected_bytes(length, default_expected_bytes_per_entry),
            ),
            None => (TypeSignature::simple(VARCHAR), default_expected_bytes_per_entry),
        };
        Self {
            base: BaseType::new(signature, NativeKind::Bytes),
            length,
            expected_bytes_per_entry,
        }
    }

    /// `None` when unbounded
    pub fn length(&self) -> Option<u32> {
        self.length
    }
}

impl Type for VarcharType {
    delegate_base_type!();
    byte_sequence_capabilities!();

    fn write_slice(&self, builder: &mut dyn BlockBuilder, value: &[u8]) -> PrismResult<()> {
        write_slice_entry(builder, value)
    }
}

byte_sequence_type!(VarcharType);

/// Fixed-length character strings; trailing spaces are not significant and
/// are not stored
#[derive(Debug, Clone)]
pub struct CharType {
    base: BaseType,
    length: u32,
    expected_bytes_per_entry: usize,
}

impl CharType {
    pub fn new(length: u32) -> PrismResult<Self> {
        Self::create(length, DEFAULT_EXPECTED_BYTES_PER_ENTRY)
    }

    pub fn create(length: u32, default_expected_bytes_per_entry: usize) -> PrismResult<Self> {
        if length > MAX_CHAR_LENGTH {
            return Err(invalid_arg_err!(
                "CHAR length must be in range [0, {}], got {}",
                MAX_CHAR_LENGTH,
                length
            ));
        }
        Ok(Self {
            base: BaseType::new(
                TypeSignature::new(CHAR, vec![TypeSignatureParameter::Long(length as i64)]),
                NativeKind::Bytes,
            ),
            length,
            expected_bytes_per_entry: bounded_expected_bytes(length, default_expected_bytes_per_entry),
        })
    }

    pub fn length(&self) -> u32 {
        self.length
    }
}

impl Type for CharType {
    delegate_base_type!();
    byte_sequence_capabilities!();

    fn write_slice(&self, builder: &mut dyn BlockBuilder, value: &[u8]) -> PrismResult<()> {
        let trimmed_length = value
            .iter()
            .rposition(|&byte| byte != b' ')
            .map_or(0, |last| last + 1);
        let value = &value[..trimmed_length];
        let characters = String::from_utf8_lossy(value).chars().count();
        if characters > self.length as usize {
            return Err(invalid_arg_err!(
                "Character count {} exceeds length limit {} of {}",
                characters,
                self.length,
                self.display_name()
            ));
        }
        write_slice_entry(builder, value)
    }
}

byte_sequence_type!(CharType);

#[derive(Debug, Clone)]
pub struct VarbinaryType {
    base: BaseType,
    expected_bytes_per_entry: usize,
}

impl VarbinaryType {
    pub fn new() -> Self {
        Self::create(DEFAULT_EXPECTED_BYTES_PER_ENTRY)
    }

    pub fn create(expected_bytes_per_entry: usize) -> Self {
        Self {
            base: BaseType::new(TypeSignature::simple(VARBINARY), NativeKind::Bytes),
            expected_bytes_per_entry,
        }
    }
}

impl Default for VarbinaryType {
    fn default() -> Self {
        Self::new()
    }
}

/// Space separated lowercase hex pairs
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Type for VarbinaryType {
    delegate_base_type!();
    byte_sequence_capabilities!();

    fn write_slice(&self, builder: &mut dyn BlockBuilder, value: &[u8]) -> PrismResult<()> {
        write_slice_entry(builder, value)
    }

    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        Ok(hex_string(&read_slice(block, position)?))
    }
}

byte_sequence_type!(VarbinaryType);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockRef, VariableWidthBlockBuilder};

    fn strings(ty: &dyn Type, values: &[Option<&str>]) -> PrismResult<BlockRef> {
        let mut builder = ty.create_block_builder(None, values.len())?;
        for value in values {
            match value {
                Some(value) => ty.write_slice(builder.as_mut(), value.as_bytes())?,
                None => builder.append_null()?,
            }
        }
        builder.build()
    }

    #[test]
    fn test_varchar_signatures() -> PrismResult<()> {
        assert_eq!(VarcharType::unbounded().display_name(), "varchar");
        let bounded = VarcharType::bounded(10)?;
        assert_eq!(bounded.display_name(), "varchar(10)");
        assert_eq!(bounded.length(), Some(10));
        assert_eq!(bounded.expected_bytes_per_entry(), 10);
        assert_eq!(VarcharType::bounded(100)?.expected_bytes_per_entry(), 32);
        assert_eq!(VarcharType::create(None, 8)?.expected_bytes_per_entry(), 8);
        Ok(())
    }

    #[test]
    fn test_varchar_round_trip_and_order() -> PrismResult<()> {
        let varchar = VarcharType::unbounded();
        let block = strings(&varchar, &[Some("abc"), None, Some("abd"), Some("abc")])?;
        let block = block.as_ref();
        assert_eq!(varchar.get_slice(block, 0)?.as_ref(), b"abc");
        assert!(block.is_null(1)?);
        assert_eq!(varchar.format_value(block, 1)?, "NULL");
        assert!(varchar.equal_to(block, 0, block, 3)?);
        assert!(!varchar.equal_to(block, 0, block, 2)?);
        assert_eq!(varchar.hash(block, 0)?, varchar.hash(block, 3)?);
        assert_eq!(varchar.compare_to(block, 0, block, 2)?, Ordering::Less);
        Ok(())
    }

    #[test]
    fn test_char_trims_and_bounds() -> PrismResult<()> {
        let char3 = CharType::new(3)?;
        assert_eq!(char3.display_name(), "char(3)");
        let block = strings(&char3, &[Some("ab  "), Some("ab")])?;
        assert_eq!(char3.get_slice(block.as_ref(), 0)?.as_ref(), b"ab");
        assert!(char3.equal_to(block.as_ref(), 0, block.as_ref(), 1)?);

        let mut builder = VariableWidthBlockBuilder::new(None, 1, 8);
        assert!(char3.write_slice(&mut builder, b"abcd").is_err());
        assert!(CharType::new(MAX_CHAR_LENGTH + 1).is_err());
        Ok(())
    }

    #[test]
    fn test_varbinary_format() -> PrismResult<()> {
        let varbinary = VarbinaryType::new();
        let mut builder = varbinary.create_block_builder(None, 1)?;
        varbinary.write_slice(builder.as_mut(), &[0x0a, 0xff])?;
        let block = builder.build()?;
        assert_eq!(varbinary.format_value(block.as_ref(), 0)?, "0a ff");
        assert!(varbinary.get_long(block.as_ref(), 0).is_err());
        Ok(())
    }
}
