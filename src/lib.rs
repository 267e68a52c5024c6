//! SVM inference and model management for LibSVM-format models
//!
//! Streams the sparse LibSVM text data format, evaluates trained models
//! through a normalized prediction pipeline, and moves models in and out of
//! byte buffers and attributed container stores. Training is left to
//! external tooling; this crate covers everything after it.

pub mod backend;
pub mod codec;
pub mod core;
pub mod data;
pub mod machine;
pub mod persistence;

// Re-export main types for convenience
pub use crate::codec::{ModelCodec, SystemTempProvider, TempPathProvider};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SvmError};
pub use crate::data::{SparseRecordFile, SparseRecordWriter};
pub use crate::machine::Machine;
pub use crate::persistence::{load_machine, save_machine, AttrStore, Container};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
