//! Remote memory address type.

use std::fmt;
use std::ops::Add;

/// Address in the target process's address space
///
/// This wrapper around `u64` keeps remote addresses apart from local sizes,
/// offsets, and decoded integers. A `RemoteAddress` carries no validity
/// guarantee: the target keeps running while we sample it, so any address may
/// be stale by the time it is dereferenced. The only way to look behind one is
/// a fallible read through a [`MemoryAccess`](crate::memory::MemoryAccess)
/// implementation, which is bound to the owning process.
///
/// ## Null
///
/// The null address is a defined terminal (no previous frame, no name
/// object, end of the thread list). Readers check [`RemoteAddress::is_null`]
/// and short-circuit without touching target memory.
///
/// ## Example
///
/// ```rust
/// use pyscope_core::types::RemoteAddress;
///
/// let frame = RemoteAddress::from(0x7f00_1000);
/// let field = frame + 0x18;
/// assert_eq!(field.value(), 0x7f00_1018);
/// assert!(RemoteAddress::NULL.is_null());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteAddress(u64);

impl RemoteAddress
{
    /// The null address (0x0)
    pub const NULL: Self = RemoteAddress(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `RemoteAddress::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        RemoteAddress(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Returns `true` for the null address.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Converts a null address into `None`.
    ///
    /// ```rust
    /// use pyscope_core::types::RemoteAddress;
    ///
    /// assert_eq!(RemoteAddress::NULL.non_null(), None);
    /// assert_eq!(RemoteAddress::new(0x10).non_null(), Some(RemoteAddress::new(0x10)));
    /// ```
    pub const fn non_null(self) -> Option<Self>
    {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// Returns `Some(new_address)` if the addition doesn't overflow, or `None` if it does.
    ///
    /// ```rust
    /// use pyscope_core::types::RemoteAddress;
    ///
    /// let addr = RemoteAddress::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(RemoteAddress::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(RemoteAddress)
    }
}

impl From<u64> for RemoteAddress
{
    fn from(value: u64) -> Self
    {
        RemoteAddress(value)
    }
}

impl From<RemoteAddress> for u64
{
    fn from(address: RemoteAddress) -> Self
    {
        address.0
    }
}

impl fmt::Display for RemoteAddress
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for RemoteAddress
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for RemoteAddress
{
    type Output = RemoteAddress;

    fn add(self, rhs: u64) -> Self::Output
    {
        RemoteAddress(self.0.wrapping_add(rhs))
    }
}
