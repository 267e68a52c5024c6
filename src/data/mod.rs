//! Sparse data format I/O
//!
//! Streaming reader/writer for the LibSVM sparse text format used by both
//! prediction inputs and external training tools.

pub mod libsvm;

pub use self::libsvm::*;
