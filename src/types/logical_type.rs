//! The type contract
//!
//! A [`Type`] knows how to read its values from a block and write them to a
//! block builder. Which accessor pair is meaningful is fixed by the type's
//! [`NativeKind`]; every other accessor reports
//! [`PrismError::Unsupported`](crate::PrismError::Unsupported).
//!
//! Comparison and layout capabilities are separate traits reached through
//! `as_comparable`, `as_orderable`, `as_fixed_width` and `as_variable_width`,
//! so a type only implements what it supports.

use crate::block::{
    Block, BlockBuilder, BlockBuilderStatus, BlockRef, FixedWidthBlockBuilder,
    VariableWidthBlockBuilder,
};
use crate::common::error::{PrismError, PrismResult};
use crate::types::signature::TypeSignature;
use crate::types::temporal::{LongTimeWithTimeZone, LongTimestamp, LongTimestampWithTimeZone};
use crate::unsupported_err;
use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a type
pub type TypeRef = Arc<dyn Type>;

/// Native representation of a type's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Boolean,
    Int64,
    Float64,
    Bytes,
    Object,
}

/// Value of an [`NativeKind::Object`] type
#[derive(Debug, Clone)]
pub enum ObjectValue {
    /// Nested value of a container type: an element block, a single row or
    /// a single map
    Block(BlockRef),
    LongTimestamp(LongTimestamp),
    LongTimestampWithTimeZone(LongTimestampWithTimeZone),
    LongTimeWithTimeZone(LongTimeWithTimeZone),
}

impl ObjectValue {
    pub fn as_block(&self) -> Option<&BlockRef> {
        match self {
            ObjectValue::Block(block) => Some(block),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            ObjectValue::Block(_) => "block",
            ObjectValue::LongTimestamp(_) => "long timestamp",
            ObjectValue::LongTimestampWithTimeZone(_) => "long timestamp with time zone",
            ObjectValue::LongTimeWithTimeZone(_) => "long time with time zone",
        }
    }
}

/// Error for an accessor a type does not provide
pub(crate) fn unsupported<T: Type + ?Sized>(ty: &T, operation: &str) -> PrismError {
    unsupported_err!("{} does not support {}", ty.display_name(), operation)
}

/// Error for an object value of the wrong shape
pub(crate) fn unexpected_object<T: Type + ?Sized>(ty: &T, value: &ObjectValue) -> PrismError {
    unsupported_err!(
        "{} cannot write a {} value",
        ty.display_name(),
        value.kind_name()
    )
}

pub trait Type: fmt::Debug + Send + Sync {
    fn signature(&self) -> &TypeSignature;

    /// Human readable name, e.g. `varchar(10)` or `timestamp(3) with time zone`
    fn display_name(&self) -> String {
        self.signature().to_string()
    }

    fn native_kind(&self) -> NativeKind;

    /// Component types of composite and parametric types
    fn type_parameters(&self) -> Vec<TypeRef> {
        Vec::new()
    }

    fn as_comparable(&self) -> Option<&dyn ComparableType> {
        None
    }

    fn as_orderable(&self) -> Option<&dyn OrderableType> {
        None
    }

    fn as_fixed_width(&self) -> Option<&dyn FixedWidthType> {
        None
    }

    fn as_variable_width(&self) -> Option<&dyn VariableWidthType> {
        None
    }

    fn is_comparable(&self) -> bool {
        self.as_comparable().is_some()
    }

    fn is_orderable(&self) -> bool {
        self.as_orderable().is_some()
    }

    /// Builder able to hold values of this type
    fn create_block_builder(
        &self,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
    ) -> PrismResult<Box<dyn BlockBuilder>>;

    fn get_boolean(&self, _block: &dyn Block, _position: usize) -> PrismResult<bool> {
        Err(unsupported(self, "get_boolean"))
    }

    fn get_long(&self, _block: &dyn Block, _position: usize) -> PrismResult<i64> {
        Err(unsupported(self, "get_long"))
    }

    fn get_double(&self, _block: &dyn Block, _position: usize) -> PrismResult<f64> {
        Err(unsupported(self, "get_double"))
    }

    fn get_slice(&self, _block: &dyn Block, _position: usize) -> PrismResult<Bytes> {
        Err(unsupported(self, "get_slice"))
    }

    fn get_object(&self, _block: &dyn Block, _position: usize) -> PrismResult<ObjectValue> {
        Err(unsupported(self, "get_object"))
    }

    fn write_boolean(&self, _builder: &mut dyn BlockBuilder, _value: bool) -> PrismResult<()> {
        Err(unsupported(self, "write_boolean"))
    }

    fn write_long(&self, _builder: &mut dyn BlockBuilder, _value: i64) -> PrismResult<()> {
        Err(unsupported(self, "write_long"))
    }

    fn write_double(&self, _builder: &mut dyn BlockBuilder, _value: f64) -> PrismResult<()> {
        Err(unsupported(self, "write_double"))
    }

    fn write_slice(&self, _builder: &mut dyn BlockBuilder, _value: &[u8]) -> PrismResult<()> {
        Err(unsupported(self, "write_slice"))
    }

    fn write_object(&self, _builder: &mut dyn BlockBuilder, _value: &ObjectValue) -> PrismResult<()> {
        Err(unsupported(self, "write_object"))
    }

    /// Copies the value at `position`, null included, to `builder`
    fn append_to(
        &self,
        block: &dyn Block,
        position: usize,
        builder: &mut dyn BlockBuilder,
    ) -> PrismResult<()> {
        if block.is_null(position)? {
            return builder.append_null();
        }
        match self.native_kind() {
            NativeKind::Boolean => self.write_boolean(builder, self.get_boolean(block, position)?),
            NativeKind::Int64 => self.write_long(builder, self.get_long(block, position)?),
            NativeKind::Float64 => self.write_double(builder, self.get_double(block, position)?),
            NativeKind::Bytes => self.write_slice(builder, &self.get_slice(block, position)?),
            NativeKind::Object => self.write_object(builder, &self.get_object(block, position)?),
        }
    }

    /// Text rendering of the value at `position`, `NULL` for nulls
    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        Ok(match self.native_kind() {
            NativeKind::Boolean => self.get_boolean(block, position)?.to_string(),
            NativeKind::Int64 => self.get_long(block, position)?.to_string(),
            NativeKind::Float64 => self.get_double(block, position)?.to_string(),
            NativeKind::Bytes => String::from_utf8_lossy(&self.get_slice(block, position)?).into_owned(),
            NativeKind::Object => format!("<{}>", self.display_name()),
        })
    }
}

/// Types are equal when their signatures are
impl PartialEq for dyn Type {
    fn eq(&self, other: &Self) -> bool {
        self.signature() == other.signature()
    }
}

impl Eq for dyn Type {}

impl fmt::Display for dyn Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Types with equality and hashing
pub trait ComparableType: Type {
    /// Both positions must be non-null
    fn equal_to(
        &self,
        left: &dyn Block,
        left_position: usize,
        right: &dyn Block,
        right_position: usize,
    ) -> PrismResult<bool>;

    /// Consistent with [`ComparableType::equal_to`]
    fn hash(&self, block: &dyn Block, position: usize) -> PrismResult<u64>;
}

/// Types with a total order
pub trait OrderableType: Type {
    fn compare_to(
        &self,
        left: &dyn Block,
        left_position: usize,
        right: &dyn Block,
        right_position: usize,
    ) -> PrismResult<Ordering>;
}

/// Types whose values all occupy `fixed_size` bytes
pub trait FixedWidthType: Type {
    fn fixed_size(&self) -> usize;
}

/// Types whose values are byte sequences of varying length
pub trait VariableWidthType: Type {
    /// Bytes per entry assumed when pre-sizing a builder
    fn expected_bytes_per_entry(&self) -> usize;

    fn create_block_builder_with_bytes(
        &self,
        status: Option<BlockBuilderStatus>,
        expected_entries: usize,
        expected_bytes_per_entry: usize,
    ) -> PrismResult<Box<dyn BlockBuilder>> {
        Ok(Box::new(VariableWidthBlockBuilder::new(
            status,
            expected_entries,
            expected_entries.saturating_mul(expected_bytes_per_entry),
        )))
    }
}

/// Signature, native kind and display name shared by every concrete type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseType {
    signature: TypeSignature,
    native_kind: NativeKind,
    display_name: String,
}

impl BaseType {
    pub fn new(signature: TypeSignature, native_kind: NativeKind) -> Self {
        let display_name = signature.to_string();
        Self {
            signature,
            native_kind,
            display_name,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn signature(&self) -> &TypeSignature {
        &self.signature
    }

    pub fn native_kind(&self) -> NativeKind {
        self.native_kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Implements the identity part of [`Type`] by delegating to a `base` field
macro_rules! delegate_base_type {
    () => {
        fn signature(&self) -> &$crate::types::TypeSignature {
            self.base.signature()
        }

        fn display_name(&self) -> String {
            self.base.display_name().to_string()
        }

        fn native_kind(&self) -> $crate::types::NativeKind {
            self.base.native_kind()
        }
    };
}

pub(crate) use delegate_base_type;

/// Fixed-width builder for `fixed_size`-byte values
pub fn fixed_width_block_builder(
    fixed_size: usize,
    status: Option<BlockBuilderStatus>,
    expected_entries: usize,
) -> PrismResult<Box<dyn BlockBuilder>> {
    Ok(Box::new(FixedWidthBlockBuilder::new(
        fixed_size,
        status,
        expected_entries,
    )?))
}

/// Whole value at `position` of a byte-sequence block
pub fn read_slice(block: &dyn Block, position: usize) -> PrismResult<Bytes> {
    let length = block.get_slice_length(position)?;
    block.get_slice(position, 0, length)
}

/// Byte-wise equality of two whole values
pub fn slices_equal(
    left: &dyn Block,
    left_position: usize,
    right: &dyn Block,
    right_position: usize,
) -> PrismResult<bool> {
    let length = left.get_slice_length(left_position)?;
    if length != right.get_slice_length(right_position)? {
        return Ok(false);
    }
    left.equals(left_position, 0, right, right_position, 0, length)
}

/// Hash of a whole byte-sequence value
pub fn slice_hash(block: &dyn Block, position: usize) -> PrismResult<u64> {
    let length = block.get_slice_length(position)?;
    block.hash(position, 0, length)
}

/// Unsigned lexicographic order of two whole byte-sequence values
pub fn slice_compare(
    left: &dyn Block,
    left_position: usize,
    right: &dyn Block,
    right_position: usize,
) -> PrismResult<Ordering> {
    let left_length = left.get_slice_length(left_position)?;
    let right_length = right.get_slice_length(right_position)?;
    left.compare_to(
        left_position,
        0,
        left_length,
        right,
        right_position,
        0,
        right_length,
    )
}

/// Writes one byte-sequence entry
pub fn write_slice_entry(builder: &mut dyn BlockBuilder, value: &[u8]) -> PrismResult<()> {
    builder.write_bytes(value)?;
    builder.close_entry()
}

/// Compares two possibly-null positions; nulls are equal to each other only
pub(crate) fn null_aware_equal(
    ty: &dyn ComparableType,
    left: &dyn Block,
    left_position: usize,
    right: &dyn Block,
    right_position: usize,
) -> PrismResult<bool> {
    match (left.is_null(left_position)?, right.is_null(right_position)?) {
        (true, true) => Ok(true),
        (false, false) => ty.equal_to(left, left_position, right, right_position),
        _ => Ok(false),
    }
}

/// Orders two possibly-null positions; nulls sort first
pub(crate) fn null_aware_compare(
    ty: &dyn OrderableType,
    left: &dyn Block,
    left_position: usize,
    right: &dyn Block,
    right_position: usize,
) -> PrismResult<Ordering> {
    match (left.is_null(left_position)?, right.is_null(right_position)?) {
        (true, true) => Ok(Ordering::Equal),
        (true, false) => Ok(Ordering::Less),
        (false, true) => Ok(Ordering::Greater),
        (false, false) => ty.compare_to(left, left_position, right, right_position),
    }
}

/// Hash of a possibly-null position; nulls hash to zero
pub(crate) fn null_aware_hash(
    ty: &dyn ComparableType,
    block: &dyn Block,
    position: usize,
) -> PrismResult<u64> {
    if block.is_null(position)? {
        return Ok(0);
    }
    ty.hash(block, position)
}

/// Comparison capability of a component type, or the error naming it
pub(crate) fn require_comparable(ty: &TypeRef) -> PrismResult<&dyn ComparableType> {
    ty.as_comparable()
        .ok_or_else(|| PrismError::NotComparable(ty.display_name()))
}

/// Ordering capability of a component type, or the error naming it
pub(crate) fn require_orderable(ty: &TypeRef) -> PrismResult<&dyn OrderableType> {
    ty.as_orderable()
        .ok_or_else(|| unsupported_err!("{} is not orderable", ty.display_name()))
}
