//! Decoded frame and snapshot types.

use std::fmt;

use super::{RemoteAddress, ThreadId};
use crate::error::DecodeError;

/// Placeholder used when a name or file object is null.
pub const UNKNOWN: &str = "<unknown>";

/// Where a frame's line number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource
{
    /// A trace function was active, so the frame's cached `f_lineno` was used.
    Traced,
    /// Derived from the code object's line table at `f_lasti`.
    LineTable,
    /// No line table was available; the code object's first line was used.
    FirstLine,
    /// The frame had no code object; the cached `f_lineno` was used as-is.
    Unknown,
}

/// One decoded interpreter frame
///
/// A `FrameRecord` is a plain value: it owns its strings and keeps no link
/// to the target process besides the addresses it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord
{
    /// Position in the stack, 0 = innermost.
    pub index: usize,
    /// Address of the frame object this record was decoded from.
    pub address: RemoteAddress,
    /// Function name, or [`UNKNOWN`].
    pub function: String,
    /// Source file path, or [`UNKNOWN`].
    pub file: String,
    /// Current line number.
    pub line: u32,
    /// How `line` was obtained.
    pub line_source: LineSource,
    /// Calling frame, `None` for the outermost frame.
    pub previous: Option<RemoteAddress>,
}

impl FrameRecord
{
    /// Returns `true` if this is the outermost frame of its chain.
    pub fn is_outermost(&self) -> bool
    {
        self.previous.is_none()
    }
}

impl fmt::Display for FrameRecord
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

/// Completeness of a [`ThreadSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus
{
    /// The walk reached the outermost frame.
    Complete,
    /// The walk stopped early; see [`ThreadSnapshot::error`].
    Incomplete,
}

/// One best-effort capture of a thread's frame chain
///
/// Frames are ordered innermost to outermost. When the walk stopped early the
/// frames decoded before the failure are kept and the failure is stored in
/// `error`. Snapshots are independent of each other and share no state.
#[derive(Debug)]
pub struct ThreadSnapshot
{
    /// Interpreter thread id from the thread state.
    pub thread: ThreadId,
    /// Address of the thread state the capture started from.
    pub thread_state: RemoteAddress,
    /// Decoded frames, innermost first.
    pub frames: Vec<FrameRecord>,
    /// Why the capture stopped early, if it did.
    pub error: Option<DecodeError>,
}

impl ThreadSnapshot
{
    /// Whether the walk reached the outermost frame.
    pub fn status(&self) -> SnapshotStatus
    {
        if self.error.is_some() {
            SnapshotStatus::Incomplete
        } else {
            SnapshotStatus::Complete
        }
    }

    /// Convenience for `status() == SnapshotStatus::Complete`.
    pub fn is_complete(&self) -> bool
    {
        self.status() == SnapshotStatus::Complete
    }

    /// Innermost frame, if any was decoded.
    pub fn innermost(&self) -> Option<&FrameRecord>
    {
        self.frames.first()
    }
}

/// Snapshots of every thread reachable from one thread-list head.
///
/// When the list itself could not be followed to its end, the threads
/// captured before the failure are kept and the failure is stored in `error`.
#[derive(Debug, Default)]
pub struct ProcessSnapshot
{
    /// One snapshot per thread, in list order.
    pub threads: Vec<ThreadSnapshot>,
    /// Why the thread list was cut short, if it was.
    pub error: Option<DecodeError>,
}

impl ProcessSnapshot
{
    /// Returns `true` if the whole list and every thread's stack were decoded.
    pub fn is_complete(&self) -> bool
    {
        self.error.is_none() && self.threads.iter().all(ThreadSnapshot::is_complete)
    }

    /// Total number of frames across all threads.
    pub fn frame_count(&self) -> usize
    {
        self.threads.iter().map(|thread| thread.frames.len()).sum()
    }
}
