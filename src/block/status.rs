//! Builder status
//!
//! A [`PageBuilderStatus`] is shared by the block builders that fill one page
//! and accumulates the bytes they write, so the page owner can tell when the
//! page is full. Each builder holds a [`BlockBuilderStatus`] pointing at it.

use crate::common::config::BlockConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Byte accounting for all builders of one page
#[derive(Debug)]
pub struct PageBuilderStatus {
    max_page_size_in_bytes: usize,
    current_size: AtomicUsize,
}

impl PageBuilderStatus {
    pub fn new(max_page_size_in_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            max_page_size_in_bytes,
            current_size: AtomicUsize::new(0),
        })
    }

    pub fn from_config(config: &BlockConfig) -> Arc<Self> {
        Self::new(config.max_page_size_in_bytes)
    }

    /// Status handed to one block builder of this page
    pub fn create_block_builder_status(self: &Arc<Self>) -> BlockBuilderStatus {
        BlockBuilderStatus {
            page_builder_status: Arc::clone(self),
        }
    }

    pub fn max_page_size_in_bytes(&self) -> usize {
        self.max_page_size_in_bytes
    }

    pub fn size_in_bytes(&self) -> usize {
        self.current_size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.size_in_bytes() == 0
    }

    pub fn is_full(&self) -> bool {
        self.size_in_bytes() >= self.max_page_size_in_bytes
    }

    fn add_bytes(&self, bytes: usize) {
        self.current_size.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Per-builder handle onto the page accounting
#[derive(Debug, Clone)]
pub struct BlockBuilderStatus {
    page_builder_status: Arc<PageBuilderStatus>,
}

impl BlockBuilderStatus {
    pub fn max_page_size_in_bytes(&self) -> usize {
        self.page_builder_status.max_page_size_in_bytes()
    }

    /// Records `bytes` written by the owning builder
    pub fn add_bytes(&self, bytes: usize) {
        self.page_builder_status.add_bytes(bytes);
    }

    pub fn page_builder_status(&self) -> &Arc<PageBuilderStatus> {
        &self.page_builder_status
    }
}
