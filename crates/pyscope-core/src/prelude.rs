//! Common module for library exports

pub use crate::config::DecoderConfig;
pub use crate::decoder::StackDecoder;
pub use crate::error::{ChainFault, DecodeError, Result};
pub use crate::layout::{fields, layout_for, LayoutCatalog, ObjectKind, ObjectLayout};
pub use crate::lnotab::{LineTable, Lnotab};
pub use crate::memory::{MemoryAccess, MemoryImage};
#[cfg(target_os = "linux")]
pub use crate::platform::linux::ProcessMemory;
pub use crate::reader::{FieldValue, ObjectReader};
pub use crate::resolver::{CodeObject, CodeResolver, ResolvedFrame};
pub use crate::thread::{OverflowFlags, ThreadState};
pub use crate::types::{FrameRecord, LineSource, ProcessSnapshot, RemoteAddress, ThreadId, ThreadSnapshot, UNKNOWN};
pub use crate::version::{select, select_with_model, DataModel, InterpreterVersion, PointerWidth, Release, ReleaseFamily};
pub use crate::walker::{walk, FrameWalk};
