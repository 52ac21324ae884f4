//! # pyscope-core
//!
//! Decodes CPython interpreter state out of another process's memory.
//!
//! This crate provides the pieces a sampling profiler needs to turn a
//! thread-state address into a readable stack:
//! - Per-release object layouts for CPython 2.4 through 3.1
//! - Version selection from a detected `(major, minor, pointer width)` tuple
//! - Typed field reads through a pluggable memory capability
//! - Frame chain walking with cycle and depth guards
//! - Function, file and line resolution for each frame
//!
//! ## Platform Support
//!
//! - **Linux**: live processes through `process_vm_readv`
//! - **Anywhere**: captured memory images through [`memory::MemoryImage`]
//!
//! Targets are assumed little-endian. Windows (LLP64) layouts are described
//! and can be decoded from captured images.
//!
//! ## Why unsafe code is needed
//!
//! Reading another process's memory on Linux goes through a raw system call.
//! That one call is wrapped in a safe [`MemoryAccess`] implementation; the
//! decoder itself is safe code.

#![allow(unsafe_code)] // Required for process_vm_readv

pub mod config;
pub mod decoder;
pub mod error;
pub mod layout;
pub mod lnotab;
pub mod memory;
pub mod platform;
pub mod prelude;
pub mod reader;
pub mod resolver;
pub mod thread;
pub mod types;
pub mod version;
pub mod walker;

pub use config::DecoderConfig;
pub use decoder::StackDecoder;
// Re-export commonly used types
pub use error::{DecodeError, Result};
pub use memory::MemoryAccess;
pub use types::{FrameRecord, RemoteAddress, ThreadSnapshot};
pub use version::{select, InterpreterVersion};
