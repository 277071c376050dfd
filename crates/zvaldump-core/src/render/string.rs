//! Byte-string rendering.

use std::fmt::Write;

use super::ZvalPrinter;
use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::types::Address;

/// Longest string that is read from the process; anything longer is taken
/// as a corrupt length
pub const MAX_STRING_LEN: u64 = 256 * 1024 * 1024;

/// Escape a byte string for display
///
/// NUL becomes `\0`, other bytes below 0x20 become `\x` plus their lowercase
/// hex value without padding (`\x1`, `\x1f`), everything else is shown as the
/// Latin-1 character with that code.
///
/// ```rust
/// use zvaldump_core::render::escape_bytes;
///
/// assert_eq!(escape_bytes(b"a\0b\n\x1f"), "a\\0b\\xa\\x1f");
/// ```
pub fn escape_bytes(bytes: &[u8]) -> String
{
    let mut escaped = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            0 => escaped.push_str("\\0"),
            b if b < 0x20 => {
                let _ = write!(escaped, "\\x{b:x}");
            }
            b => escaped.push(char::from(b)),
        }
    }
    escaped
}

impl<M> ZvalPrinter<'_, M>
where
    M: MemoryAccessor + ?Sized,
{
    /// Print `len` bytes at `buffer` as `[len:escaped]`
    ///
    /// The bytes are not required to be NUL-terminated and a NUL inside them
    /// doesn't end the string. A zero length reads nothing, so `buffer` may be
    /// anything.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: `len` is above [`MAX_STRING_LEN`]
    /// - `MemoryAccess`: the bytes could not be read
    pub fn print_string(&mut self, buffer: Address, len: u64) -> Result<()>
    {
        let bytes = if len == 0 {
            Vec::new()
        } else if len > MAX_STRING_LEN {
            return Err(InspectError::InvalidArgument(format!("implausible string length {len}")));
        } else {
            let count = usize::try_from(len)
                .map_err(|_| InspectError::InvalidArgument(format!("string length {len} does not fit in memory")))?;
            self.mem.read_memory(buffer, count)?
        };
        self.out.write(&format!("[{len}:{}]", escape_bytes(&bytes)));
        Ok(())
    }
}
