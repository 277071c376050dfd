//! # Platform-Specific Implementations
//!
//! Concrete [`MemoryAccessor`](crate::accessor::MemoryAccessor)s for live
//! processes.
//!
//! - **Linux**: `process_vm_readv` for memory, `/proc/<pid>/maps` plus the
//!   mapped ELF files for symbols
//!   - See: [process_vm_readv(2)](https://man7.org/linux/man-pages/man2/process_vm_readv.2.html)
//!
//! Other platforms can still use the renderer through their own accessor.

#[cfg(target_os = "linux")]
pub mod linux;
