//! Thread state decoding.
//!
//! A `PyThreadState` links to the next thread of the same interpreter and
//! to the thread's innermost frame. 3.x adds two recursion flags after
//! `recursion_depth`; on 2.x they are reported as absent.

use crate::error::{DecodeError, Result};
use crate::layout::{fields, ObjectKind};
use crate::memory::MemoryAccess;
use crate::reader::ObjectReader;
use crate::types::{RemoteAddress, ThreadId};

/// Recursion flags present on 3.x thread states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowFlags
{
    /// The recursion limit was exceeded and is being unwound.
    pub overflowed: bool,
    /// The next recursion check must not fail.
    pub recursion_critical: bool,
}

/// Decoded interpreter thread state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadState
{
    /// Address this state was read from.
    pub address: RemoteAddress,
    /// Next thread state of the interpreter, null at the end of the list.
    pub next: RemoteAddress,
    /// Owning interpreter state.
    pub interpreter: RemoteAddress,
    /// Innermost frame, null when the thread runs no Python code.
    pub frame: RemoteAddress,
    /// Current recursion depth.
    pub recursion_depth: i64,
    /// OS thread id recorded by the interpreter.
    pub thread_id: ThreadId,
    /// A trace or profile hook is installed.
    pub use_tracing: bool,
    /// Present on 3.x only.
    pub overflow: Option<OverflowFlags>,
}

/// Read the thread state at `address`
///
/// ## Errors
///
/// `NullObject` for a null address; memory errors propagate.
pub fn read_thread_state<M>(reader: &ObjectReader<'_, M>, address: RemoteAddress) -> Result<ThreadState>
where
    M: MemoryAccess + ?Sized,
{
    if address.is_null() {
        return Err(DecodeError::NullObject {
            context: "thread state".to_string(),
        });
    }

    let layout = reader.layout(ObjectKind::ThreadState)?;
    let read_ptr = |field: &str| reader.read_address(address, ObjectKind::ThreadState, field);
    let read_int = |field: &str| reader.read_integer(address, ObjectKind::ThreadState, field);

    let overflow = if layout.has_field(fields::TS_OVERFLOWED) {
        Some(OverflowFlags {
            overflowed: read_int(fields::TS_OVERFLOWED)? != 0,
            recursion_critical: read_int(fields::TS_RECURSION_CRITICAL)? != 0,
        })
    } else {
        None
    };

    // thread_id is an unsigned value stored in a C long.
    let long_bits = reader.version().long_size() * 8;
    let raw_id = read_int(fields::TS_THREAD_ID)? as u64;
    let thread_id = if long_bits >= 64 {
        raw_id
    } else {
        raw_id & ((1u64 << long_bits) - 1)
    };

    Ok(ThreadState {
        address,
        next: read_ptr(fields::TS_NEXT)?,
        interpreter: read_ptr(fields::TS_INTERP)?,
        frame: read_ptr(fields::TS_FRAME)?,
        recursion_depth: read_int(fields::TS_RECURSION_DEPTH)?,
        thread_id: ThreadId(thread_id),
        use_tracing: read_int(fields::TS_USE_TRACING)? != 0,
        overflow,
    })
}
