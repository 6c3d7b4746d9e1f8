//! Integration tests for the block layer
//!
//! These tests drive blocks and builders only through the public `Block` and
//! `BlockBuilder` contracts, the way reader and writer code in the engine does.

use bytes::Bytes;
use pretty_assertions::assert_eq;
use prism_block::block::copy_region;
use prism_block::types::read_slice;
use prism_block::{
    Block, BlockBuilder, BlockRef, DictionaryBlock, FixedWidthBlockBuilder, PageBuilderStatus,
    PrismError, PrismResult, VariableWidthBlock, VariableWidthBlockBuilder,
};
use std::sync::Arc;

fn varchar_block(values: &[Option<&str>]) -> PrismResult<BlockRef> {
    let mut builder = VariableWidthBlockBuilder::new(None, values.len(), 16);
    for value in values {
        match value {
            Some(value) => {
                builder.write_bytes(value.as_bytes())?;
                builder.close_entry()?;
            }
            None => builder.append_null()?,
        }
    }
    builder.build()
}

fn strings(block: &dyn Block) -> PrismResult<Vec<Option<String>>> {
    (0..block.position_count())
        .map(|position| {
            if block.is_null(position)? {
                return Ok(None);
            }
            let value = read_slice(block, position)?;
            Ok(Some(String::from_utf8_lossy(&value).into_owned()))
        })
        .collect()
}

fn owned(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|value| Some(value.to_string())).collect()
}

/// Copying positions keeps their order and repeats
#[test]
fn test_copy_positions_with_repeats() -> PrismResult<()> {
    let block = varchar_block(&[Some("aa"), Some("b"), Some("ccc")])?;
    let copy = block.copy_positions(&[2, 0, 2], 0, 3)?;
    assert_eq!(copy.position_count(), 3);
    assert_eq!(strings(copy.as_ref())?, owned(&["ccc", "aa", "ccc"]));

    let empty = block.copy_positions(&[2, 0, 2], 1, 0)?;
    assert_eq!(empty.position_count(), 0);
    assert_eq!(empty.size_in_bytes()?, 0);
    Ok(())
}

/// Copying the whole of a compact block hands back the block itself
#[test]
fn test_copy_region_identity() -> PrismResult<()> {
    let block: BlockRef = Arc::new(VariableWidthBlock::new(
        3,
        Bytes::from_static(b"aabccc"),
        vec![0, 2, 3, 6],
        None,
    )?);
    let copy = copy_region(&block, 0, block.position_count())?;
    assert!(Arc::ptr_eq(&block, &copy));

    let partial = copy_region(&block, 1, 2)?;
    assert!(!Arc::ptr_eq(&block, &partial));
    let partial = partial
        .as_any()
        .downcast_ref::<VariableWidthBlock>()
        .ok_or_else(|| PrismError::IllegalState("expected a variable width block".to_string()))?;
    let source = block
        .as_any()
        .downcast_ref::<VariableWidthBlock>()
        .ok_or_else(|| PrismError::IllegalState("expected a variable width block".to_string()))?;
    assert!(!partial.shares_storage_with(source));
    assert_eq!(strings(partial)?, owned(&["b", "ccc"]));

    // a region view is not compact, so copying all of it allocates
    let region = block.get_region(1, 2)?;
    let copy = copy_region(&region, 0, 2)?;
    assert!(!Arc::ptr_eq(&region, &copy));
    assert_eq!(strings(copy.as_ref())?, owned(&["b", "ccc"]));
    let again = copy_region(&copy, 0, 2)?;
    assert!(Arc::ptr_eq(&copy, &again));

    assert!(matches!(
        copy_region(&block, 2, 2),
        Err(PrismError::OutOfBounds(_))
    ));
    Ok(())
}

/// Offsets large enough to overflow an index are reported, never wrapped
#[test]
fn test_huge_offsets_are_out_of_bounds() -> PrismResult<()> {
    let block = varchar_block(&[Some("a"), Some("xyz")])?;
    assert!(matches!(block.get_byte(1, usize::MAX), Err(PrismError::OutOfBounds(_))));
    assert!(matches!(block.get_long(1, usize::MAX - 2), Err(PrismError::OutOfBounds(_))));
    assert!(matches!(
        block.get_slice(1, 1, usize::MAX),
        Err(PrismError::OutOfBounds(_))
    ));
    assert!(!block.equals(1, usize::MAX, block.as_ref(), 1, 0, 2)?);
    assert!(!block.equals(1, 0, block.as_ref(), 1, 1, usize::MAX)?);

    let mut builder = VariableWidthBlockBuilder::new(None, 1, 4);
    builder.write_bytes(b"open")?;
    builder.close_entry()?;
    assert!(matches!(builder.get_byte(0, usize::MAX), Err(PrismError::OutOfBounds(_))));

    let mut longs = FixedWidthBlockBuilder::new(8, None, 1)?;
    longs.write_long(42)?;
    longs.close_entry()?;
    let longs = longs.build()?;
    assert_eq!(longs.get_long(0, 0)?, 42);
    assert!(matches!(longs.get_long(0, usize::MAX), Err(PrismError::OutOfBounds(_))));
    assert!(matches!(longs.get_int(0, 6), Err(PrismError::OutOfBounds(_))));
    Ok(())
}

#[test]
fn test_region_views_and_offsets() -> PrismResult<()> {
    let block = varchar_block(&[Some("a"), None, Some("xyz"), Some("")])?;
    let region = block.get_region(1, 3)?;
    assert_eq!(
        strings(region.as_ref())?,
        vec![None, Some("xyz".to_string()), Some(String::new())]
    );
    assert_eq!(region.get_slice_length(1)?, 3);
    assert_eq!(region.get_byte(1, 2)?, b'z');
    assert!(matches!(region.get_slice_length(3), Err(PrismError::OutOfBounds(_))));
    assert!(region.get_byte(1, 3).is_err());
    Ok(())
}

#[test]
fn test_nulls_and_single_values() -> PrismResult<()> {
    let block = varchar_block(&[None, Some("v")])?;
    assert!(block.may_have_null());
    assert!(block.is_null(0)?);

    let null = block.get_single_value_block(0)?;
    assert_eq!(null.position_count(), 1);
    assert!(null.is_null(0)?);

    let value = block.get_single_value_block(1)?;
    assert_eq!(strings(value.as_ref())?, owned(&["v"]));

    let mut target = VariableWidthBlockBuilder::new(None, 2, 4);
    block.write_position_to(0, &mut target)?;
    block.write_position_to(1, &mut target)?;
    assert_eq!(strings(&target)?, vec![None, Some("v".to_string())]);
    Ok(())
}

/// Retained size never undercounts the encoded size
#[test]
fn test_retained_size_covers_size() -> PrismResult<()> {
    let mut builder = VariableWidthBlockBuilder::new(None, 1, 1);
    assert!(builder.retained_size_in_bytes() >= builder.size_in_bytes()?);
    for index in 0..100 {
        builder.write_bytes(format!("value-{index}").as_bytes())?;
        builder.close_entry()?;
        assert!(builder.retained_size_in_bytes() >= builder.size_in_bytes()?);
    }
    let block = builder.build()?;
    assert!(block.retained_size_in_bytes() >= block.size_in_bytes()?);
    let region = block.get_region(10, 5)?;
    assert!(region.retained_size_in_bytes() >= region.size_in_bytes()?);
    Ok(())
}

#[test]
fn test_builder_protocol_errors() -> PrismResult<()> {
    let mut builder = VariableWidthBlockBuilder::new(None, 1, 4);
    builder.write_bytes(b"open")?;
    assert!(matches!(builder.append_null(), Err(PrismError::IllegalState(_))));
    builder.close_entry()?;
    builder.append_null()?;

    let first = builder.build()?;
    let second = builder.build()?;
    assert_eq!(strings(first.as_ref())?, strings(second.as_ref())?);
    Ok(())
}

#[test]
fn test_page_status_accounts_all_builders() -> PrismResult<()> {
    let page = PageBuilderStatus::new(64);
    let mut left = VariableWidthBlockBuilder::new(Some(page.create_block_builder_status()), 4, 8);
    let mut right = VariableWidthBlockBuilder::new(Some(page.create_block_builder_status()), 4, 8);
    assert!(page.is_empty());

    left.write_bytes(b"0123456789")?;
    left.close_entry()?;
    right.append_null()?;
    assert_eq!(page.size_in_bytes(), left.size_in_bytes()? + right.size_in_bytes()?);
    assert!(!page.is_full());

    for _ in 0..5 {
        left.write_bytes(b"0123456789")?;
        left.close_entry()?;
    }
    assert!(page.is_full());
    Ok(())
}

#[test]
fn test_dictionary_copy_keeps_only_used_entries() -> PrismResult<()> {
    let dictionary = varchar_block(&[Some("red"), Some("green"), Some("blue"), None])?;
    let block = DictionaryBlock::new(5, Arc::clone(&dictionary), vec![2, 2, 0, 3, 2])?;
    assert_eq!(
        strings(&block)?,
        vec![
            Some("blue".to_string()),
            Some("blue".to_string()),
            Some("red".to_string()),
            None,
            Some("blue".to_string()),
        ]
    );
    assert_eq!(block.unique_ids(), 3);
    assert!(!block.is_compact());

    let compact = block.compact()?;
    assert!(compact.is_compact());
    assert_eq!(compact.dictionary().position_count(), 3);
    assert_eq!(strings(&compact)?, strings(&block)?);

    let copy = block.copy_positions(&[4, 2], 0, 2)?;
    assert_eq!(strings(copy.as_ref())?, owned(&["blue", "red"]));
    Ok(())
}
