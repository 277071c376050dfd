//! # Linux Memory Reads
//!
//! Reads another process's memory with `process_vm_readv(2)`.
//!
//! Unlike `ptrace(PTRACE_PEEKDATA)` this needs no attach and copies a whole
//! range in one syscall. It requires the same permission as ptrace: same
//! user and a permissive `kernel.yama.ptrace_scope`, or `CAP_SYS_PTRACE`.

use std::io;

use libc::c_void;

use crate::error::{InspectError, Result};
use crate::types::{Address, ProcessId};

/// Memory of one process
#[derive(Debug, Clone, Copy)]
pub struct ProcessMemory
{
    pid: ProcessId,
}

impl ProcessMemory
{
    pub fn new(pid: ProcessId) -> Self
    {
        ProcessMemory { pid }
    }

    /// Read exactly `len` bytes at `address`
    ///
    /// ## Errors
    ///
    /// - `MemoryAccess`: unmapped address or partial read
    /// - `ProcessNotFound`: the process is gone
    /// - `PermissionDenied`: not allowed to read the process
    pub fn read(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; len];
        let local = libc::iovec {
            iov_base: buf.as_mut_ptr().cast::<c_void>(),
            iov_len: len,
        };
        let remote = libc::iovec {
            iov_base: address.value() as usize as *mut c_void,
            iov_len: len,
        };

        // SAFETY: `local` describes `buf`, which is exactly `len` writable bytes
        // and outlives the call. `remote` is only interpreted by the kernel
        // against the target's address space.
        let read = unsafe { libc::process_vm_readv(self.pid.0 as libc::pid_t, &local, 1, &remote, 1, 0) };

        if read < 0 {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::EFAULT) => InspectError::memory(address, len, "bad address"),
                Some(libc::ESRCH) => InspectError::ProcessNotFound(self.pid.0),
                Some(libc::EPERM) => InspectError::PermissionDenied(format!("process_vm_readv on PID {}", self.pid)),
                _ => InspectError::memory(address, len, err.to_string()),
            });
        }
        if read as usize != len {
            return Err(InspectError::memory(address, len, format!("partial read of {read} bytes")));
        }
        Ok(buf)
    }
}
