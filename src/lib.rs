//! PrismDB block layer
//!
//! Columnar in-memory value encoding for the PrismDB engine: immutable blocks,
//! their append-only builders, and the type system that reads and writes
//! values through them.
//!
pub mod block;
pub mod common;
pub mod types;

// Re-export common types for convenience
pub use common::{BlockConfig, Int2IntOpenHashMap, PrismError, PrismResult};

// Re-export the block layer for convenience
pub use block::{
    ArrayBlock, ArrayBlockBuilder, Block, BlockBuilder, BlockBuilderStatus, BlockRef,
    DictionaryBlock, FixedWidthBlock, FixedWidthBlockBuilder, HashBuildMode, MapBlock,
    MapBlockBuilder, MapHashTables, PageBuilderStatus, RowBlock, RowBlockBuilder, SingleMapBlock,
    SingleRowBlock, VariableWidthBlock, VariableWidthBlockBuilder,
};

// Re-export the type system for convenience
pub use types::{
    ComparableType, NativeKind, ObjectValue, OrderableType, Type, TypeManager, TypeRef,
    TypeRegistry, TypeSignature, TypeSignatureParameter,
};
