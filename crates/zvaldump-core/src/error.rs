//! # Error Types
//!
//! General error handling for zval inspection.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::Address;

/// Main error type for inspection operations
///
/// Most of these never reach the user as a failure: the renderer turns them
/// into inline text at the nearest value or table boundary so that output
/// already produced is kept. Only problems found before rendering starts
/// (attaching, resolving the session, parsing the expression) abort a command.
///
/// ## Error Categories
///
/// 1. **Expression errors**: InvalidExpression, ExpressionSyntax
/// 2. **Memory errors**: MemoryAccess, SymbolNotFound
/// 3. **Structure errors**: UnknownTag, CorruptTable, StaleObjectHandle
/// 4. **Process errors**: ProcessNotFound, PermissionDenied, SuspendFailed, ResumeFailed
/// 5. **I/O errors**: Io, ObjectFile
#[derive(Error, Debug)]
pub enum InspectError
{
    /// The expression evaluated to something other than `zval *`
    ///
    /// The message is printed verbatim as the command's only output.
    #[error("Invalid expression - must be zval *")]
    InvalidExpression
    {
        /// Declared C type of the evaluated expression
        declared: String,
    },

    /// The expression text could not be parsed or evaluated
    #[error("Expression error: {0}")]
    ExpressionSyntax(String),

    /// Reading the inspected process's memory failed
    ///
    /// Typical causes are dangling pointers in the inspected data and
    /// unmapped addresses passed on the command line.
    #[error("cannot read {len} bytes at {address}: {reason}")]
    MemoryAccess
    {
        /// First address of the failed read
        address: Address,
        /// Number of bytes requested
        len: usize,
        /// What the platform reported
        reason: String,
    },

    /// A runtime symbol could not be found in any mapped object file
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// A zval carries a type tag outside the known range
    #[error("Unknown type: {0}")]
    UnknownTag(u8),

    /// A hash table's entry list links back to an entry already visited
    #[error("hash table {table} is corrupt: entry {entry} visited twice")]
    CorruptTable
    {
        /// Address of the table being walked
        table: Address,
        /// Entry that was reached a second time
        entry: Address,
    },

    /// An object handle does not name a live slot in the objects store
    #[error("stale object handle #{0}")]
    StaleObjectHandle(u32),

    /// The process with the given PID doesn't exist or has exited
    #[error("Process not found: PID {0}")]
    ProcessNotFound(u32),

    /// Insufficient permissions to read the target process
    ///
    /// On Linux this usually means `ptrace_scope` forbids access or the
    /// target belongs to another user.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Failed to stop the target process
    #[error("Failed to suspend process: {0}")]
    SuspendFailed(String),

    /// Failed to let the target process continue
    #[error("Failed to resume process: {0}")]
    ResumeFailed(String),

    /// Invalid argument passed to an inspection function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A mapped binary could not be parsed as an object file
    #[error("Cannot parse object file {path}: {reason}")]
    ObjectFile
    {
        /// Path of the binary
        path: String,
        /// Parser error
        reason: String,
    },

    /// I/O error (reading `/proc`, binaries, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectError
{
    /// Shorthand for a failed read of `len` bytes at `address`
    pub fn memory(address: Address, len: usize, reason: impl Into<String>) -> Self
    {
        InspectError::MemoryAccess {
            address,
            len,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for `Result<T, InspectError>`
///
/// ```rust
/// use zvaldump_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, InspectError>;
