//! # Memory Accessor
//!
//! The interface between the renderer and whatever holds the inspected
//! process: a live PID on Linux, or an in-memory image in tests.
//!
//! Implementors provide two primitives, raw reads and symbol lookup.
//! Typed reads and expression evaluation are built on top of them here, so
//! every accessor decodes memory the same way (little-endian, LP64).
//!
//! Any failure is an [`InspectError`]; the renderer decides how far it
//! propagates.

use crate::error::{InspectError, Result};
use crate::expr;
use crate::types::{Address, Handle};

/// Read-only view of a stopped process
///
/// ## Example
///
/// ```rust,no_run
/// use zvaldump_core::accessor::MemoryAccessor;
/// use zvaldump_core::platform::linux::LinuxProcess;
/// use zvaldump_core::types::ProcessId;
///
/// let process = LinuxProcess::attach(ProcessId::from(4242), true)?;
/// let globals = process.symbol_address("executor_globals")?;
/// let word = process.read_u64(globals)?;
/// println!("first word of executor_globals: 0x{word:x}");
/// # Ok::<(), zvaldump_core::error::InspectError>(())
/// ```
pub trait MemoryAccessor
{
    /// Read exactly `len` bytes starting at `address`
    ///
    /// ## Errors
    ///
    /// - `MemoryAccess`: the range is not (fully) readable
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>;

    /// Runtime address of a global symbol
    ///
    /// ## Errors
    ///
    /// - `SymbolNotFound`: no mapped object file defines `name`
    fn symbol_address(&self, name: &str) -> Result<Address>;

    /// Evaluate a debugger expression such as `(zval *)0x7f3a1c0`
    ///
    /// See [`crate::expr`] for the accepted grammar.
    fn evaluate(&self, expression: &str) -> Result<Handle>
    {
        expr::evaluate(self, expression)
    }

    fn read_u8(&self, address: Address) -> Result<u8>
    {
        Ok(read_array::<1, _>(self, address)?[0])
    }

    fn read_u32(&self, address: Address) -> Result<u32>
    {
        read_array(self, address).map(u32::from_le_bytes)
    }

    fn read_i32(&self, address: Address) -> Result<i32>
    {
        read_array(self, address).map(i32::from_le_bytes)
    }

    fn read_u64(&self, address: Address) -> Result<u64>
    {
        read_array(self, address).map(u64::from_le_bytes)
    }

    fn read_i64(&self, address: Address) -> Result<i64>
    {
        read_array(self, address).map(i64::from_le_bytes)
    }

    fn read_f64(&self, address: Address) -> Result<f64>
    {
        read_array(self, address).map(f64::from_le_bytes)
    }

    /// Read a pointer-sized word and treat it as an address
    fn read_pointer(&self, address: Address) -> Result<Address>
    {
        self.read_u64(address).map(Address::from)
    }
}

fn read_array<const N: usize, M>(mem: &M, address: Address) -> Result<[u8; N]>
where
    M: MemoryAccessor + ?Sized,
{
    let bytes = mem.read_memory(address, N)?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| InspectError::memory(address, N, format!("short read of {} bytes", bytes.len())))
}
