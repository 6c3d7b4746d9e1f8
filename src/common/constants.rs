//! Constants used throughout the block and type layer

/// Size of an encoded `i8`
pub const SIZE_OF_BYTE: usize = 1;

/// Size of an encoded `i16`
pub const SIZE_OF_SHORT: usize = 2;

/// Size of an encoded `i32`
pub const SIZE_OF_INT: usize = 4;

/// Size of an encoded `i64`
pub const SIZE_OF_LONG: usize = 8;

/// Size of an encoded `f64`
pub const SIZE_OF_DOUBLE: usize = 8;

/// Largest array a builder may grow to
pub const MAX_ARRAY_SIZE: usize = i32::MAX as usize - 8;

/// Smallest capacity a growing builder array jumps to
pub const DEFAULT_CAPACITY: usize = 64;

/// Over-provisioning applied when a builder is re-created from a previous one
pub const BLOCK_RESET_SKEW: f64 = 1.25;

/// Default guess of bytes per entry for variable-width builders
pub const DEFAULT_EXPECTED_BYTES_PER_ENTRY: usize = 32;

/// Default maximum size of one page
pub const DEFAULT_MAX_PAGE_SIZE_IN_BYTES: usize = 1024 * 1024;

/// Map hash tables use this many buckets per entry
pub const MHT_HASH_MULTIPLIER: usize = 2;

/// Sentinel for an empty map hash table bucket
pub const EMPTY_SLOT: i32 = -1;

/// Highest supported fractional-second precision of temporal types
pub const MAX_TEMPORAL_PRECISION: u32 = 12;

/// Longest CHAR type
pub const MAX_CHAR_LENGTH: u32 = 65_536;

/// Longest bounded VARCHAR type
pub const MAX_VARCHAR_LENGTH: u32 = i32::MAX as u32;
