//! Error taxonomy shared by every fallible constructor in the crate.

use alloc::string::String;
use thiserror::Error;

/// Every way a `tinyframe` operation can fail.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("invalid archive: {reason}")]
    InvalidArchive { reason: String },

    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("invalid seek to position {pos}")]
    InvalidSeek { pos: i64 },

    #[error("invalid argument")]
    InvalidArgument,

    #[error("unsupported channel count: {found}")]
    UnsupportedChannels { found: u16 },

    #[error("{format} decode error: {detail}")]
    DecodeError {
        format: &'static str,
        detail: String,
    },

    #[error("resampler error: {detail}")]
    ResamplerError { detail: String },
}

pub type Result<T> = core::result::Result<T, EngineError>;
