//! # Linux Process Access
//!
//! [`LinuxProcess`] is the [`MemoryAccessor`] for a live process on Linux:
//!
//! - memory through `process_vm_readv` ([`memory`])
//! - symbols from the ELF files listed in `/proc/<pid>/maps` ([`maps`],
//!   [`symbols`]), indexed on the first lookup
//! - optionally kept stopped for the lifetime of the value ([`guards`])
//!
//! No ptrace attach is performed, so this works next to a debugger that is
//! already tracing the process.

pub mod guards;
pub mod maps;
pub mod memory;
pub mod symbols;

use once_cell::unsync::OnceCell;
use tracing::info;

use self::guards::StopGuard;
use self::maps::read_proc_maps;
use self::memory::ProcessMemory;
use self::symbols::SymbolIndex;
use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::types::{Address, MemoryRegion, ProcessId};

/// A live process opened for inspection
#[derive(Debug)]
pub struct LinuxProcess
{
    pid: ProcessId,
    memory: ProcessMemory,
    symbols: OnceCell<SymbolIndex>,
    stop: Option<StopGuard>,
}

impl LinuxProcess
{
    /// Open `pid`, stopping it first when `stop` is set
    ///
    /// The process is continued again when the returned value is dropped.
    ///
    /// ## Errors
    ///
    /// - `ProcessNotFound`: no such process
    /// - `PermissionDenied` / `SuspendFailed`: see [`StopGuard::new`]
    pub fn attach(pid: ProcessId, stop: bool) -> Result<Self>
    {
        // Fails early with ProcessNotFound for a bad PID.
        guards::process_state(pid)?;
        let stop = if stop { Some(StopGuard::new(pid)?) } else { None };
        info!(%pid, stopped = stop.as_ref().is_some_and(StopGuard::is_active), "opened process");
        Ok(LinuxProcess {
            pid,
            memory: ProcessMemory::new(pid),
            symbols: OnceCell::new(),
            stop,
        })
    }

    pub fn pid(&self) -> ProcessId
    {
        self.pid
    }

    /// Whether the process is held stopped by this value
    pub fn is_stopped_by_us(&self) -> bool
    {
        self.stop.as_ref().is_some_and(StopGuard::is_active)
    }

    /// Current mappings of the process
    pub fn regions(&self) -> Result<Vec<MemoryRegion>>
    {
        read_proc_maps(self.pid)
    }

    /// The symbol index, built on first use
    pub fn symbols(&self) -> Result<&SymbolIndex>
    {
        self.symbols
            .get_or_try_init(|| -> Result<SymbolIndex> { Ok(SymbolIndex::load(&self.regions()?)) })
    }

    /// Continue the process now, if this value stopped it
    pub fn detach(mut self) -> Result<()>
    {
        match self.stop.take() {
            Some(guard) => guard.resume(),
            None => Ok(()),
        }
    }
}

impl MemoryAccessor for LinuxProcess
{
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        self.memory.read(address, len)
    }

    fn symbol_address(&self, name: &str) -> Result<Address>
    {
        self.symbols()?
            .lookup(name)
            .ok_or_else(|| InspectError::SymbolNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_read_own_memory()
    {
        let value: u64 = 0x1122_3344_5566_7788;
        let process = LinuxProcess::attach(ProcessId::from(std::process::id()), false).unwrap();
        let address = Address::from(std::ptr::addr_of!(value) as u64);
        assert_eq!(process.read_u64(address).unwrap(), value);
    }

    #[test]
    fn test_unmapped_read_fails()
    {
        let process = LinuxProcess::attach(ProcessId::from(std::process::id()), false).unwrap();
        let err = process.read_memory(Address::from(8), 8).unwrap_err();
        assert!(matches!(err, InspectError::MemoryAccess { .. }));
    }

    #[test]
    fn test_missing_process()
    {
        // Above the kernel's maximum pid_max.
        let err = LinuxProcess::attach(ProcessId::from(0x0040_0001), false).unwrap_err();
        assert!(matches!(err, InspectError::ProcessNotFound(_)));
    }

    #[test]
    fn test_unknown_symbol()
    {
        let process = LinuxProcess::attach(ProcessId::from(std::process::id()), false).unwrap();
        let err = process.symbol_address("zvaldump_no_such_symbol").unwrap_err();
        assert!(matches!(err, InspectError::SymbolNotFound(_)));
    }
}
