//! Helper utilities shared by blocks and builders

use crate::common::constants::{BLOCK_RESET_SKEW, DEFAULT_CAPACITY, MAX_ARRAY_SIZE};
use crate::common::error::PrismResult;
use crate::{invalid_arg_err, out_of_bounds_err};
use std::mem::size_of;

/// Next capacity of a growing builder array (grows by half, at least to
/// [`DEFAULT_CAPACITY`]). Fails once the array cannot grow past [`MAX_ARRAY_SIZE`].
pub fn calculate_new_array_size(current_size: usize) -> PrismResult<usize> {
    let mut new_size = current_size + (current_size >> 1);

    if new_size < DEFAULT_CAPACITY {
        new_size = DEFAULT_CAPACITY;
    } else if new_size > MAX_ARRAY_SIZE {
        new_size = MAX_ARRAY_SIZE;
        if new_size <= current_size {
            return Err(invalid_arg_err!(
                "Cannot grow array beyond '{}'",
                MAX_ARRAY_SIZE
            ));
        }
    }
    Ok(new_size)
}

/// Entry count a successor builder is pre-sized for
pub fn calculate_block_reset_size(current_size: usize) -> usize {
    let new_size = (current_size as f64 * BLOCK_RESET_SKEW).ceil() as usize;

    if new_size == 0 {
        DEFAULT_CAPACITY
    } else {
        new_size.min(MAX_ARRAY_SIZE)
    }
}

/// Byte count a successor builder is pre-sized for
pub fn calculate_block_reset_bytes(current_bytes: usize) -> usize {
    let new_bytes = (current_bytes as f64 * BLOCK_RESET_SKEW).ceil() as usize;
    new_bytes.min(MAX_ARRAY_SIZE)
}

/// Checks that `[offset, offset + length)` lies inside `[0, position_count)`
pub fn check_valid_region(position_count: usize, offset: usize, length: usize) -> PrismResult<()> {
    if offset > position_count || length > position_count - offset {
        return Err(out_of_bounds_err!(
            "Invalid region: offset {}, length {} in block with {} positions",
            offset,
            length,
            position_count
        ));
    }
    Ok(())
}

/// Checks that `position` addresses a value of the block
pub fn check_valid_position(position: usize, position_count: usize) -> PrismResult<()> {
    if position >= position_count {
        return Err(out_of_bounds_err!(
            "Invalid position {} in block with {} positions",
            position,
            position_count
        ));
    }
    Ok(())
}

/// Checks every selected position, and that `[offset, offset + length)` lies inside `positions`
pub fn check_valid_positions(
    positions: &[usize],
    offset: usize,
    length: usize,
    position_count: usize,
) -> PrismResult<()> {
    check_array_range(positions.len(), offset, length)?;
    for &position in &positions[offset..offset + length] {
        check_valid_position(position, position_count)?;
    }
    Ok(())
}

/// Checks that `[offset, offset + length)` lies inside an array of `array_length`
pub fn check_array_range(array_length: usize, offset: usize, length: usize) -> PrismResult<()> {
    if offset > array_length || length > array_length - offset {
        return Err(out_of_bounds_err!(
            "Invalid range: offset {}, length {} in array of length {}",
            offset,
            length,
            array_length
        ));
    }
    Ok(())
}

/// Checks that a selection mask covers exactly the block's positions
pub fn check_selection_length(selected: &[bool], position_count: usize) -> PrismResult<()> {
    if selected.len() != position_count {
        return Err(invalid_arg_err!(
            "Selection of length {} does not match position count {}",
            selected.len(),
            position_count
        ));
    }
    Ok(())
}

/// Rebases `offsets[index..=index + length]` so that it starts at zero
pub fn compact_offsets(offsets: &[i32], index: usize, length: usize) -> Vec<i32> {
    let base = offsets[index];
    offsets[index..=index + length]
        .iter()
        .map(|offset| offset - base)
        .collect()
}

/// Retained size of a slice of `T`
pub fn size_of_slice<T>(values: &[T]) -> usize {
    values.len() * size_of::<T>()
}

/// Retained size of an optional slice of `T`
pub fn size_of_optional<T>(values: Option<&[T]>) -> usize {
    values.map(size_of_slice).unwrap_or(0)
}

/// Retained size of a growable buffer, counting unused capacity
#[allow(clippy::ptr_arg)]
pub fn size_of_vec<T>(values: &Vec<T>) -> usize {
    values.capacity() * size_of::<T>()
}

/// Converts a buffer offset into the `i32` stored in offset tables
pub fn to_offset(value: usize) -> PrismResult<i32> {
    i32::try_from(value).map_err(|_| invalid_arg_err!("Offset {} exceeds the maximum block size", value))
}

/// Helper function to get the next power of two
pub fn next_power_of_two(mut n: usize) -> usize {
    if n <= 1 {
        return 1;
    }

    n -= 1;
    n |= n >> 1;
    n |= n >> 2;
    n |= n >> 4;
    n |= n >> 8;
    n |= n >> 16;
    n |= n >> 32;
    n + 1
}

/// XxHash64 of a byte sequence
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    twox_hash::XxHash64::oneshot(0, bytes)
}

/// XxHash64 of a long value, used by fixed-width integral types
pub fn hash_long(value: i64) -> u64 {
    twox_hash::XxHash64::oneshot(0, &value.to_le_bytes())
}

/// Folds a 64-bit hash into 32 bits
pub fn fold_hash(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}
