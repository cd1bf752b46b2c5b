#![forbid(unsafe_code)]

//! Error types shared by every bridge component.

use core::fmt;

use crate::handle::HandleKind;

/// Failures of the guest linear-memory access primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The requested byte range lies outside the guest's memory.
    OutOfBounds { ptr: u32, len: u32, size: u32 },
    /// A typed view was requested at an offset not aligned to its element.
    Misaligned { ptr: u32, align: u32 },
    /// An import touched guest memory before the guest was instantiated.
    NotAttached,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { ptr, len, size } => write!(
                f,
                "guest memory access out of bounds: {len} bytes at {ptr} (memory is {size} bytes)"
            ),
            Self::Misaligned { ptr, align } => {
                write!(f, "guest pointer {ptr} is not {align}-byte aligned")
            }
            Self::NotAttached => write!(f, "guest memory not attached"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Errors raised while servicing guest imports or host callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Native shader compilation failed; carries the info log.
    ShaderCompile(String),
    /// Native program link failed; carries the info log.
    ProgramLink(String),
    /// The GL context refused to create an object (context lost).
    CreateFailed(HandleKind),
    /// The guest presented a handle that was never allocated.
    InvalidHandle { kind: HandleKind, handle: u32 },
    /// Guest memory access failed.
    Memory(MemoryError),
    /// Server chose a chunk size that does not cover whole rows.
    ChunkMisaligned { chunk_size: u32, width: u32 },
    /// A texture callback arrived for a texture with no load in flight.
    UnknownTexture(u32),
    /// The metadata endpoint answered with something unusable.
    Metadata(String),
    /// An import was called with a missing or non-numeric argument.
    BadArgument { import: &'static str, index: usize },
    /// The guest trapped or threw while the host was calling into it.
    Guest(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShaderCompile(log) => write!(f, "Error compiling shader: {log}"),
            Self::ProgramLink(log) => write!(f, "Error linking program: {log}"),
            Self::CreateFailed(kind) => write!(f, "failed to create {kind}"),
            Self::InvalidHandle { kind, handle } => {
                write!(f, "invalid {kind} handle {handle}")
            }
            Self::Memory(err) => write!(f, "{err}"),
            Self::ChunkMisaligned { chunk_size, width } => write!(
                f,
                "chunk size {chunk_size} is not a multiple of image width {width}"
            ),
            Self::UnknownTexture(handle) => {
                write!(f, "no texture load in flight for handle {handle}")
            }
            Self::Metadata(msg) => write!(f, "bad texture metadata: {msg}"),
            Self::BadArgument { import, index } => {
                write!(f, "{import}: missing or non-numeric argument {index}")
            }
            Self::Guest(msg) => write!(f, "guest error: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Memory(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemoryError> for BridgeError {
    fn from(err: MemoryError) -> Self {
        Self::Memory(err)
    }
}

/// Malformed configuration passed in from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The options object was not valid JSON for the expected shape.
    Json(String),
    /// A field had a value outside its allowed range.
    Invalid { field: &'static str, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "config parse error: {msg}"),
            Self::Invalid { field, reason } => write!(f, "invalid config field {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_errors_carry_native_log() {
        let err = BridgeError::ShaderCompile("0:1: syntax error".into());
        assert_eq!(err.to_string(), "Error compiling shader: 0:1: syntax error");
    }

    #[test]
    fn memory_error_is_source() {
        use std::error::Error as _;
        let err = BridgeError::from(MemoryError::NotAttached);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "guest memory not attached");
    }

    #[test]
    fn invalid_handle_names_kind() {
        let err = BridgeError::InvalidHandle {
            kind: HandleKind::Texture,
            handle: 7,
        };
        assert_eq!(err.to_string(), "invalid texture handle 7");
    }
}
