//! Type system module
//!
//! This module contains the type layer over blocks:
//! - TypeSignature: structural type identity, parsed from and rendered to text
//! - Type: the read/write contract plus the comparison and layout capabilities
//! - Scalar, byte-sequence, temporal and sketch types
//! - Array, map and row composites
//! - Parametric factories and the TypeRegistry that resolves signatures

pub mod array_type;
pub mod logical_type;
pub mod map_type;
pub mod parametric;
pub mod registry;
pub mod row_type;
pub mod scalar;
pub mod signature;
pub mod sketch;
pub mod temporal;
pub mod variable_width;

pub use array_type::{ArrayType, ARRAY};
pub use logical_type::{
    fixed_width_block_builder, read_slice, slice_compare, slice_hash, slices_equal,
    write_slice_entry, BaseType, ComparableType, FixedWidthType, NativeKind, ObjectValue,
    OrderableType, Type, TypeRef, VariableWidthType,
};
pub use map_type::{MapType, MAP};
pub use parametric::{
    ArrayParametricType, CharParametricType, MapParametricType, ParametricType,
    QuantileDigestParametricType, RowParametricType, TemporalFamily, TemporalParametricType,
    VarcharParametricType,
};
pub use registry::{TypeManager, TypeRegistry};
pub use row_type::{RowField, RowType, ROW};
pub use scalar::{BigintType, BooleanType, DoubleType, IntegerType, BIGINT, BOOLEAN, DOUBLE, INTEGER};
pub use signature::{NamedTypeSignature, TypeSignature, TypeSignatureParameter};
pub use sketch::{HyperLogLogType, QuantileDigestType, HYPER_LOG_LOG, QDIGEST};
pub use temporal::{
    LongTimeWithTimeZone, LongTimestamp, LongTimestampWithTimeZone, TemporalTypeTables, TimeType,
    TimeWithTimeZoneType, TimestampType, TimestampWithTimeZoneType, TIME, TIMESTAMP,
    TIMESTAMP_WITH_TIME_ZONE, TIME_WITH_TIME_ZONE,
};
pub use variable_width::{CharType, VarbinaryType, VarcharType, CHAR, VARBINARY, VARCHAR};
