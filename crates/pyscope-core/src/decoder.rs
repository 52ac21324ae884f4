//! # Stack Decoder
//!
//! Entry point for capturing interpreter stacks out of a target.
//!
//! A [`StackDecoder`] ties together one memory capability, one
//! [`InterpreterVersion`] and the limits in [`DecoderConfig`]. It holds no
//! remote state: every capture starts from scratch and produces independent
//! snapshots, so one decoder can serve any number of samples.
//!
//! ## Partial results
//!
//! Memory errors and corrupted chains never discard frames already decoded;
//! they end the snapshot and are recorded on it. Only errors that make every
//! read meaningless (no layout for the version, a layout missing a field the
//! decoder needs) are returned as `Err`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pyscope_core::decoder::StackDecoder;
//! use pyscope_core::memory::MemoryImage;
//! use pyscope_core::types::RemoteAddress;
//! use pyscope_core::version::select;
//!
//! let image = MemoryImage::new();
//! let decoder = StackDecoder::new(&image, select(3, 1, 8)?)?;
//!
//! let snapshot = decoder.capture(RemoteAddress::new(0x7f00_0000_2000))?;
//! for frame in &snapshot.frames {
//!     println!("{frame}");
//! }
//! if let Some(error) = &snapshot.error {
//!     eprintln!("stack truncated: {error}");
//! }
//! # Ok::<(), pyscope_core::error::DecodeError>(())
//! ```

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::DecoderConfig;
use crate::error::{ChainFault, DecodeError, Result};
use crate::layout::{LayoutCatalog, ObjectKind};
use crate::lnotab::{LineTable, Lnotab};
use crate::memory::MemoryAccess;
use crate::reader::ObjectReader;
use crate::resolver::CodeResolver;
use crate::thread::{read_thread_state, ThreadState};
use crate::types::{FrameRecord, ProcessSnapshot, RemoteAddress, ThreadSnapshot};
use crate::version::InterpreterVersion;
use crate::walker::FrameWalk;

/// Captures thread stacks from one target.
pub struct StackDecoder<M, L = Lnotab>
{
    memory: M,
    version: InterpreterVersion,
    config: DecoderConfig,
    line_table: L,
}

impl<M: MemoryAccess> StackDecoder<M>
{
    /// Create a decoder with default limits and the classic line table
    ///
    /// ## Errors
    ///
    /// `UnsupportedVersion` if any layout the decoder needs is missing for
    /// `version`. Nothing is read from the target.
    pub fn new(memory: M, version: InterpreterVersion) -> Result<Self>
    {
        let catalog = LayoutCatalog::builtin();
        for kind in [
            ObjectKind::ThreadState,
            ObjectKind::Frame,
            ObjectKind::Code,
            version.text_kind(),
            version.line_table_kind(),
        ] {
            catalog.layout_for(kind, &version)?;
        }

        debug!("stack decoder ready for {version}");
        Ok(Self {
            memory,
            version,
            config: DecoderConfig::default(),
            line_table: Lnotab,
        })
    }
}

impl<M: MemoryAccess, L: LineTable> StackDecoder<M, L>
{
    /// Replace the limits.
    pub fn with_config(mut self, config: DecoderConfig) -> Self
    {
        self.config = config;
        self
    }

    /// Replace the line table decoder.
    pub fn with_line_table<T: LineTable>(self, line_table: T) -> StackDecoder<M, T>
    {
        StackDecoder {
            memory: self.memory,
            version: self.version,
            config: self.config,
            line_table,
        }
    }

    /// Version the decoder was built for.
    pub fn version(&self) -> &InterpreterVersion
    {
        &self.version
    }

    /// Active limits.
    pub fn config(&self) -> &DecoderConfig
    {
        &self.config
    }

    /// Underlying memory capability.
    pub fn memory(&self) -> &M
    {
        &self.memory
    }

    /// Object reader over this decoder's memory.
    pub fn reader(&self) -> ObjectReader<'_, M>
    {
        ObjectReader::new(&self.memory, self.version, self.config)
    }

    /// Resolver over this decoder's memory and line table.
    pub fn resolver(&self) -> CodeResolver<'_, M, L>
    {
        CodeResolver::with_line_table(self.reader(), &self.line_table)
    }

    /// Lazy walk from `frame`, bounded by `max_depth`.
    pub fn walk(&self, frame: RemoteAddress) -> FrameWalk<'_, M, L>
    {
        FrameWalk::new(self.resolver(), frame, self.config.max_depth)
    }

    /// Decode the thread state at `address`.
    pub fn read_thread_state(&self, address: RemoteAddress) -> Result<ThreadState>
    {
        read_thread_state(&self.reader(), address)
    }

    /// Capture the stack of the thread whose state lives at `thread_state`
    ///
    /// ## Errors
    ///
    /// Fails only if the thread state itself cannot be read or a fatal
    /// error occurs; failures inside the frame chain end up on the snapshot.
    pub fn capture(&self, thread_state: RemoteAddress) -> Result<ThreadSnapshot>
    {
        let state = self.read_thread_state(thread_state)?;
        self.snapshot(&state)
    }

    /// Capture every thread reachable through `next` from `head`
    ///
    /// The list is bounded by `max_threads` and guarded against cycles. A
    /// thread state that cannot be read ends the list; the snapshots gathered
    /// so far are kept and the failure is recorded.
    pub fn capture_all(&self, head: RemoteAddress) -> Result<ProcessSnapshot>
    {
        let mut result = ProcessSnapshot::default();
        let mut visited = HashSet::new();
        let mut next = head;

        while !next.is_null() {
            let depth = result.threads.len();
            let fault = if depth >= self.config.max_threads {
                Some(ChainFault::DepthExceeded)
            } else if !visited.insert(next) {
                Some(ChainFault::Cycle)
            } else {
                None
            };
            if let Some(fault) = fault {
                result.error = Some(DecodeError::CorruptedChain {
                    address: next,
                    depth,
                    fault,
                });
                break;
            }

            let state = match self.read_thread_state(next) {
                Ok(state) => state,
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    result.error = Some(error);
                    break;
                }
            };

            result.threads.push(self.snapshot(&state)?);
            next = state.next;
        }

        if let Some(error) = &result.error {
            warn!("thread list truncated after {} threads: {error}", result.threads.len());
        }
        Ok(result)
    }

    fn snapshot(&self, state: &ThreadState) -> Result<ThreadSnapshot>
    {
        let mut frames: Vec<FrameRecord> = Vec::new();
        let mut error = None;

        for frame in self.walk(state.frame) {
            match frame {
                Ok(record) => frames.push(record),
                Err(fault) if fault.is_fatal() => return Err(fault),
                Err(fault) => {
                    warn!(
                        "stack of thread {} truncated after {} frames: {fault}",
                        state.thread_id,
                        frames.len()
                    );
                    error = Some(fault);
                }
            }
        }

        debug!("captured {} frames for thread {}", frames.len(), state.thread_id);
        Ok(ThreadSnapshot {
            thread: state.thread_id,
            thread_state: state.address,
            frames,
            error,
        })
    }
}
