//! # Platform-Specific Memory Access
//!
//! Live-process implementations of [`MemoryAccess`](crate::memory::MemoryAccess).
//!
//! - **Linux**: `process_vm_readv(2)`
//!   - See: [process_vm_readv(2) man page](https://man7.org/linux/man-pages/man2/process_vm_readv.2.html)
//!
//! Other platforms can still decode captured [`MemoryImage`](crate::memory::MemoryImage)s.

#[cfg(target_os = "linux")]
pub mod linux;
