//! # Frame Walker
//!
//! Follows `f_back` from a thread's current frame to the outermost one.
//!
//! [`FrameWalk`] is a lazy iterator: each [`FrameRecord`] is decoded and
//! yielded before the next link is followed, so a caller can stop early and
//! nothing past that point is read. The walk ends with `None` after the frame
//! whose `f_back` is null. It never reads from a null address.
//!
//! ## Failure
//!
//! The iterator yields at most one `Err`, after which it is exhausted:
//!
//! - a memory error while decoding a frame
//! - `CorruptedChain { fault: Cycle }` when `f_back` points at a frame
//!   already visited in this walk
//! - `CorruptedChain { fault: DepthExceeded }` when the chain is still going
//!   after `max_depth` frames
//!
//! Frames yielded before the error are valid and stay with the caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pyscope_core::config::DecoderConfig;
//! use pyscope_core::memory::MemoryImage;
//! use pyscope_core::reader::ObjectReader;
//! use pyscope_core::resolver::CodeResolver;
//! use pyscope_core::types::RemoteAddress;
//! use pyscope_core::version::select;
//! use pyscope_core::walker::walk;
//!
//! let image = MemoryImage::new();
//! let version = select(2, 7, 8)?;
//! let reader = ObjectReader::new(&image, version, DecoderConfig::default());
//!
//! for frame in walk(CodeResolver::new(reader), RemoteAddress::new(0x7f00_0000_1000), 64) {
//!     let frame = frame?;
//!     println!("{frame}");
//! }
//! # Ok::<(), pyscope_core::error::DecodeError>(())
//! ```

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ChainFault, DecodeError, Result};
use crate::layout::{fields, ObjectKind};
use crate::lnotab::LineTable;
use crate::memory::MemoryAccess;
use crate::resolver::CodeResolver;
use crate::types::{FrameRecord, RemoteAddress};

/// Walk the frame chain starting at `start`.
pub fn walk<'a, M, L>(resolver: CodeResolver<'a, M, L>, start: RemoteAddress, max_depth: usize) -> FrameWalk<'a, M, L>
where
    M: MemoryAccess + ?Sized,
    L: LineTable + ?Sized,
{
    FrameWalk::new(resolver, start, max_depth)
}

/// Single-pass iterator over one thread's frames, innermost first.
pub struct FrameWalk<'a, M: ?Sized, L: ?Sized>
{
    resolver: CodeResolver<'a, M, L>,
    next: RemoteAddress,
    visited: HashSet<RemoteAddress>,
    depth: usize,
    max_depth: usize,
    finished: bool,
}

impl<'a, M: MemoryAccess + ?Sized, L: LineTable + ?Sized> FrameWalk<'a, M, L>
{
    /// Start a walk at `start`. A null `start` yields nothing.
    pub fn new(resolver: CodeResolver<'a, M, L>, start: RemoteAddress, max_depth: usize) -> Self
    {
        Self {
            resolver,
            next: start,
            visited: HashSet::new(),
            depth: 0,
            max_depth,
            finished: false,
        }
    }

    /// Frames yielded so far.
    pub fn depth(&self) -> usize
    {
        self.depth
    }

    fn fail(&mut self, error: DecodeError) -> Option<Result<FrameRecord>>
    {
        debug!("frame walk stopped after {} frames: {error}", self.depth);
        self.finished = true;
        Some(Err(error))
    }

    fn decode(&self, address: RemoteAddress) -> Result<FrameRecord>
    {
        let previous = self
            .resolver
            .reader()
            .read_address(address, ObjectKind::Frame, fields::F_BACK)?;
        let resolved = self.resolver.resolve(address)?;

        Ok(FrameRecord {
            index: self.depth,
            address,
            function: resolved.function,
            file: resolved.file,
            line: resolved.line,
            line_source: resolved.line_source,
            previous: previous.non_null(),
        })
    }
}

impl<M: MemoryAccess + ?Sized, L: LineTable + ?Sized> Iterator for FrameWalk<'_, M, L>
{
    type Item = Result<FrameRecord>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.finished || self.next.is_null() {
            return None;
        }

        let address = self.next;
        if self.depth >= self.max_depth {
            return self.fail(DecodeError::CorruptedChain {
                address,
                depth: self.depth,
                fault: ChainFault::DepthExceeded,
            });
        }
        if !self.visited.insert(address) {
            return self.fail(DecodeError::CorruptedChain {
                address,
                depth: self.depth,
                fault: ChainFault::Cycle,
            });
        }

        match self.decode(address) {
            Ok(record) => {
                self.next = record.previous.unwrap_or(RemoteAddress::NULL);
                self.depth += 1;
                Some(Ok(record))
            }
            Err(error) => self.fail(error),
        }
    }
}
