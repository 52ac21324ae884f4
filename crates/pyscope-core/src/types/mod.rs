//! # Types
//!
//! Values shared by every stage of the decoder.
//!
//! Addresses and identifiers refer to the target process; frame records and
//! snapshots are owned copies that outlive the reads that produced them.

pub mod address;
pub mod frame;
pub mod process;

// Re-export all public types
pub use address::RemoteAddress;
pub use frame::{FrameRecord, LineSource, ProcessSnapshot, SnapshotStatus, ThreadSnapshot, UNKNOWN};
pub use process::{ProcessId, ThreadId};
