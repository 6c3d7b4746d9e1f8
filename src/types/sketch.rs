//! Opaque serialized sketches. Values are raw bytes, never compared.

use crate::block::{Block, BlockBuilder, BlockBuilderStatus};
use crate::common::constants::DEFAULT_EXPECTED_BYTES_PER_ENTRY;
use crate::common::error::PrismResult;
use crate::types::logical_type::{
    delegate_base_type, read_slice, write_slice_entry, BaseType, NativeKind, Type, TypeRef,
    VariableWidthType,
};
use crate::types::signature::{TypeSignature, TypeSignatureParameter};
use crate::types::variable_width::hex_string;
use bytes::Bytes;
use std::sync::Arc;

pub const QDIGEST: &str = "qdigest";
pub const HYPER_LOG_LOG: &str = "HyperLogLog";

/// Accessors shared by the sketch types
macro_rules! sketch_type {
    () => {
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
                DEFAULT_EXPECTED_BYTES_PER_ENTRY,
            )
        }

        fn get_slice(&self, block: &dyn Block, position: usize) -> PrismResult<Bytes> {
            read_slice(block, position)
        }

        fn write_slice(&self, builder: &mut dyn BlockBuilder, value: &[u8]) -> PrismResult<()> {
            write_slice_entry(builder, value)
        }

        fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
            if block.is_null(position)? {
                return Ok("NULL".to_string());
            }
            Ok(hex_string(&read_slice(block, position)?))
        }
    };
}

/// Quantile digest over values of `value_type`
#[derive(Debug, Clone)]
pub struct QuantileDigestType {
    base: BaseType,
    value_type: TypeRef,
}

impl QuantileDigestType {
    pub fn new(value_type: TypeRef) -> Self {
        let signature = TypeSignature::new(
            QDIGEST,
            vec![TypeSignatureParameter::Type(value_type.signature().clone())],
        );
        Self {
            base: BaseType::new(signature, NativeKind::Bytes),
            value_type,
        }
    }

    pub fn value_type(&self) -> &TypeRef {
        &self.value_type
    }
}

impl Type for QuantileDigestType {
    delegate_base_type!();
    sketch_type!();

    fn type_parameters(&self) -> Vec<TypeRef> {
        vec![Arc::clone(&self.value_type)]
    }
}

impl VariableWidthType for QuantileDigestType {
    fn expected_bytes_per_entry(&self) -> usize {
        DEFAULT_EXPECTED_BYTES_PER_ENTRY
    }
}

#[derive(Debug, Clone)]
pub struct HyperLogLogType {
    base: BaseType,
}

impl HyperLogLogType {
    pub fn new() -> Self {
        Self {
            base: BaseType::new(TypeSignature::simple(HYPER_LOG_LOG), NativeKind::Bytes),
        }
    }
}

impl Default for HyperLogLogType {
    fn default() -> Self {
        Self::new()
    }
}

impl Type for HyperLogLogType {
    delegate_base_type!();
    sketch_type!();
}

impl VariableWidthType for HyperLogLogType {
    fn expected_bytes_per_entry(&self) -> usize {
        DEFAULT_EXPECTED_BYTES_PER_ENTRY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BigintType;

    #[test]
    fn test_qdigest() -> PrismResult<()> {
        let qdigest = QuantileDigestType::new(Arc::new(BigintType::new()));
        assert_eq!(qdigest.display_name(), "qdigest(bigint)");
        assert!(!qdigest.is_comparable());
        assert!(qdigest.as_variable_width().is_some());
        assert_eq!(qdigest.type_parameters().len(), 1);

        let mut builder = qdigest.create_block_builder(None, 2)?;
        qdigest.write_slice(builder.as_mut(), &[1, 2, 3])?;
        builder.append_null()?;
        let block = builder.build()?;
        assert_eq!(qdigest.get_slice(block.as_ref(), 0)?.as_ref(), &[1, 2, 3]);
        assert_eq!(qdigest.format_value(block.as_ref(), 0)?, "01 02 03");
        assert_eq!(qdigest.format_value(block.as_ref(), 1)?, "NULL");
        Ok(())
    }

    #[test]
    fn test_hyper_log_log() -> PrismResult<()> {
        let hll = HyperLogLogType::new();
        assert_eq!(hll.signature(), &TypeSignature::simple("hyperloglog"));
        assert!(!hll.is_orderable());
        let mut builder = hll.create_block_builder(None, 1)?;
        hll.write_slice(builder.as_mut(), b"sketch")?;
        let block = builder.build()?;
        let mut copy = hll.create_block_builder(None, 1)?;
        hll.append_to(block.as_ref(), 0, copy.as_mut())?;
        assert_eq!(copy.build()?.get_slice_length(0)?, 6);
        Ok(())
    }
}
