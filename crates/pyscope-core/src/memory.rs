//! # Memory Access
//!
//! The single I/O boundary of the decoder.
//!
//! Everything the decoder learns about the target comes through
//! [`MemoryAccess::read`]. Implementations are bound to one target (a live
//! process, a core file, a captured image) and own all timeouts and
//! permission handling; the decoder never retries a failed read.
//!
//! [`MemoryImage`] is an in-process implementation backed by captured
//! regions, used for offline snapshots and for tests.

use std::collections::BTreeMap;
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::RemoteAddress;

/// Read capability over a target's address space.
pub trait MemoryAccess
{
    /// Read up to `len` bytes starting at `address`.
    ///
    /// A successful read may return fewer bytes than requested when the range
    /// runs off the end of mapped memory. An address that cannot be read at
    /// all is an error.
    fn read(&self, address: RemoteAddress, len: usize) -> io::Result<Vec<u8>>;
}

impl<T: MemoryAccess + ?Sized> MemoryAccess for &T
{
    fn read(&self, address: RemoteAddress, len: usize) -> io::Result<Vec<u8>>
    {
        (**self).read(address, len)
    }
}

impl<T: MemoryAccess + ?Sized> MemoryAccess for Box<T>
{
    fn read(&self, address: RemoteAddress, len: usize) -> io::Result<Vec<u8>>
    {
        (**self).read(address, len)
    }
}

/// Captured target memory as a set of non-overlapping regions
///
/// ```rust
/// use pyscope_core::memory::{MemoryAccess, MemoryImage};
/// use pyscope_core::types::RemoteAddress;
///
/// let mut image = MemoryImage::new();
/// image.map(RemoteAddress::new(0x1000), vec![1, 2, 3, 4]);
///
/// assert_eq!(image.read(RemoteAddress::new(0x1002), 8).unwrap(), vec![3, 4]);
/// assert!(image.read(RemoteAddress::new(0x2000), 1).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MemoryImage
{
    regions: BTreeMap<u64, Vec<u8>>,
    reads: AtomicUsize,
}

impl MemoryImage
{
    /// An image with nothing mapped.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Map `bytes` at `address`, replacing any region starting there.
    pub fn map(&mut self, address: RemoteAddress, bytes: Vec<u8>) -> &mut Self
    {
        self.regions.insert(address.value(), bytes);
        self
    }

    /// Map `len` zero bytes at `address`.
    pub fn map_zeroed(&mut self, address: RemoteAddress, len: usize) -> &mut Self
    {
        self.map(address, vec![0; len])
    }

    /// Remove the region starting at `address`.
    pub fn unmap(&mut self, address: RemoteAddress) -> Option<Vec<u8>>
    {
        self.regions.remove(&address.value())
    }

    /// Overwrite bytes inside an already mapped region.
    ///
    /// ## Errors
    ///
    /// Fails if the destination is not entirely inside one region.
    pub fn write(&mut self, address: RemoteAddress, bytes: &[u8]) -> io::Result<()>
    {
        let (start, region) = self
            .regions
            .range_mut(..=address.value())
            .next_back()
            .ok_or_else(|| unmapped(address))?;
        let offset = usize::try_from(address.value() - *start).map_err(|_| unmapped(address))?;
        let end = offset.checked_add(bytes.len()).ok_or_else(|| unmapped(address))?;
        if end > region.len() {
            return Err(unmapped(address));
        }
        region[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Number of reads served so far.
    pub fn reads(&self) -> usize
    {
        self.reads.load(Ordering::Relaxed)
    }

    fn region_for(&self, address: RemoteAddress) -> Option<&[u8]>
    {
        let (start, region) = self.regions.range(..=address.value()).next_back()?;
        let offset = usize::try_from(address.value() - *start).ok()?;
        region.get(offset..).filter(|rest| !rest.is_empty())
    }
}

impl MemoryAccess for MemoryImage
{
    fn read(&self, address: RemoteAddress, len: usize) -> io::Result<Vec<u8>>
    {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let rest = self.region_for(address).ok_or_else(|| unmapped(address))?;
        Ok(rest[..len.min(rest.len())].to_vec())
    }
}

fn unmapped(address: RemoteAddress) -> io::Error
{
    io::Error::new(ErrorKind::NotFound, format!("address {address} is not mapped"))
}
