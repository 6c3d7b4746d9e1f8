//! Common utilities and shared components

pub mod config;
pub mod constants;
pub mod error;
pub mod helper;
pub mod int_hash_map;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use helper::*;
pub use int_hash_map::Int2IntOpenHashMap;
