//! # Error Types
//!
//! General error handling for the decoder.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::layout::ObjectKind;
use crate::types::RemoteAddress;
use crate::version::Release;

/// Why a frame or thread chain was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFault
{
    /// A link pointed back at an address already visited during this walk.
    Cycle,
    /// The chain was still going when the configured depth limit was reached.
    DepthExceeded,
}

impl fmt::Display for ChainFault
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ChainFault::Cycle => write!(f, "cycle"),
            ChainFault::DepthExceeded => write!(f, "depth limit exceeded"),
        }
    }
}

/// Main error type for decoder operations
///
/// This enum represents all the ways decoding remote interpreter state can
/// fail. Memory errors always carry the address and a short description of
/// what was being read, so a truncated snapshot can be diagnosed later.
///
/// ## Error Categories
///
/// 1. **Version errors**: UnsupportedVersion, UnknownField
/// 2. **Memory errors**: UnreadableMemory, TruncatedRead
/// 3. **Structure errors**: CorruptedChain, NullObject, InvalidObject
/// 4. **I/O errors**: Io
///
/// A read failure is never reported as a zero value. A field that is
/// legitimately zero decodes to `0`; a field that could not be read is one of
/// the memory errors below.
#[derive(Error, Debug)]
pub enum DecodeError
{
    /// No layout exists for this interpreter release and pointer width
    ///
    /// This is fatal for a whole capture and is surfaced before any remote
    /// memory is touched.
    #[error("Unsupported interpreter version {release} ({pointer_width}-byte pointers): {reason}")]
    UnsupportedVersion
    {
        /// Release tuple as reported by the caller.
        release: Release,
        /// Pointer width in bytes as reported by the caller.
        pointer_width: usize,
        /// Why the combination was rejected.
        reason: String,
    },

    /// A layout was asked for a field it does not declare
    #[error("{kind} layout has no field named '{field}'")]
    UnknownField
    {
        /// Object kind whose layout was consulted.
        kind: ObjectKind,
        /// Requested field name.
        field: String,
    },

    /// The memory-read capability failed
    ///
    /// This happens when:
    /// - The address is not mapped in the target
    /// - The target exited between samples
    /// - The caller lacks permission to read the target
    #[error("Unreadable memory at {address} ({len} bytes) while reading {context}: {source}")]
    UnreadableMemory
    {
        /// Address of the failed read.
        address: RemoteAddress,
        /// Requested length in bytes.
        len: usize,
        /// Field or object being decoded.
        context: String,
        /// Error reported by the memory-read capability.
        #[source]
        source: io::Error,
    },

    /// A fixed-width scalar came back shorter than requested
    #[error("Truncated read at {address} while reading {context}: expected {expected} bytes, got {actual}")]
    TruncatedRead
    {
        /// Address of the short read.
        address: RemoteAddress,
        /// Requested length in bytes.
        expected: usize,
        /// Bytes actually returned.
        actual: usize,
        /// Field or object being decoded.
        context: String,
    },

    /// A frame or thread chain looped or exceeded the depth limit
    #[error("Corrupted chain at {address} after {depth} links: {fault}")]
    CorruptedChain
    {
        /// Address at which the walk stopped.
        address: RemoteAddress,
        /// Number of links successfully followed before stopping.
        depth: usize,
        /// What went wrong.
        fault: ChainFault,
    },

    /// A scalar field was requested from a null object address
    #[error("Null object while reading {context}")]
    NullObject
    {
        /// Field or object being decoded.
        context: String,
    },

    /// Remote bytes were read but do not form a plausible object
    #[error("Invalid object at {address}: {reason}")]
    InvalidObject
    {
        /// Address of the object.
        address: RemoteAddress,
        /// What failed the sanity check.
        reason: String,
    },

    /// I/O error (for opening process memory handles, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError
{
    /// Returns `true` for failures of a single remote read.
    ///
    /// These are the errors the frame walker turns into a partial stack
    /// instead of discarding the frames it already decoded.
    pub fn is_memory_error(&self) -> bool
    {
        matches!(self, DecodeError::UnreadableMemory { .. } | DecodeError::TruncatedRead { .. })
    }

    /// Returns `true` if this error aborts a capture before any frame is decoded.
    pub fn is_fatal(&self) -> bool
    {
        matches!(self, DecodeError::UnsupportedVersion { .. } | DecodeError::UnknownField { .. })
    }
}

/// Convenience type alias for `Result<T, DecodeError>`
///
/// ```rust
/// use pyscope_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DecodeError>;
