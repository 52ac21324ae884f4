//! # Linux Process Memory
//!
//! Reads another process's memory with `process_vm_readv(2)`.
//!
//! The call copies directly between address spaces without stopping the
//! target, which is what a sampling profiler wants: the target keeps running
//! and every read is a best-effort look at a moving process.
//!
//! ## Permissions
//!
//! The caller needs `PTRACE_MODE_ATTACH` rights over the target: same UID
//! and a permissive `kernel.yama.ptrace_scope`, or `CAP_SYS_PTRACE`.

use std::io;

use libc::{c_void, iovec, pid_t};

use crate::memory::MemoryAccess;
use crate::types::{ProcessId, RemoteAddress};

/// Read-only handle on a live process's address space.
#[derive(Debug, Clone, Copy)]
pub struct ProcessMemory
{
    pid: ProcessId,
}

impl ProcessMemory
{
    /// Bind to `pid`.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if no such process exists.
    pub fn attach(pid: ProcessId) -> io::Result<Self>
    {
        let proc_dir = format!("/proc/{}", pid.0);
        if !std::path::Path::new(&proc_dir).exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("process {pid} not found")));
        }
        tracing::debug!("bound memory reader to process {pid}");
        Ok(Self { pid })
    }

    /// Process this handle reads from.
    pub fn pid(&self) -> ProcessId
    {
        self.pid
    }
}

impl MemoryAccess for ProcessMemory
{
    fn read(&self, address: RemoteAddress, len: usize) -> io::Result<Vec<u8>>
    {
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; len];
        let local = iovec {
            iov_base: buffer.as_mut_ptr().cast::<c_void>(),
            iov_len: len,
        };
        let remote = iovec {
            iov_base: address.value() as usize as *mut c_void,
            iov_len: len,
        };

        // SAFETY: `local` describes `buffer`, which is live and exactly `len`
        // bytes long for the duration of the call. The remote iovec is only
        // interpreted by the kernel in the target's address space.
        let copied = unsafe { libc::process_vm_readv(self.pid.0 as pid_t, &local, 1, &remote, 1, 0) };
        if copied < 0 {
            return Err(io::Error::last_os_error());
        }

        buffer.truncate(copied as usize);
        Ok(buffer)
    }
}
