//! Process and memory region types.

use std::fmt;

use super::Address;
use crate::error::{InspectError, Result};

/// Process ID (PID)
///
/// The PID of the PHP process being inspected.
///
/// ## Example
///
/// ```rust
/// use zvaldump_core::types::ProcessId;
///
/// let pid = ProcessId::from(12345);
/// assert_eq!(pid.0, 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// One mapping of the target's address space, as listed in `/proc/<pid>/maps`
///
/// Only file-backed regions matter to symbol resolution: the lowest mapping of
/// an ELF file (the one at file offset zero) gives its load address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion
{
    /// Start address of the mapping (inclusive)
    pub start: Address,

    /// End address of the mapping (exclusive)
    pub end: Address,

    /// Permission string as the kernel prints it, e.g. `"r-xp"`
    pub permissions: String,

    /// Offset of the mapping within the backing file
    pub offset: u64,

    /// Backing file or pseudo-name (`[heap]`, `[stack]`), if any
    pub name: Option<String>,
}

impl MemoryRegion
{
    /// Size of the region in bytes
    pub fn size(&self) -> u64
    {
        self.end.value().saturating_sub(self.start.value())
    }

    /// Whether the region is backed by a regular file rather than anonymous
    /// memory or a kernel pseudo-mapping
    pub fn is_file_backed(&self) -> bool
    {
        self.name
            .as_deref()
            .is_some_and(|name| !name.is_empty() && !name.starts_with('['))
    }

    /// Parse one line of `/proc/<pid>/maps`
    ///
    /// ```text
    /// 55d4c8a00000-55d4c8c1e000 r--p 00000000 fd:01 1049123    /usr/bin/php5
    /// ```
    ///
    /// The path is everything after the inode column and may contain spaces.
    /// A trailing ` (deleted)` is dropped so the path can still be opened when
    /// the binary was replaced on disk.
    pub fn parse_maps_line(line: &str) -> Result<Self>
    {
        let malformed = || InspectError::InvalidArgument(format!("malformed maps line: {line:?}"));

        let (range, rest) = split_field(line).ok_or_else(malformed)?;
        let (permissions, rest) = split_field(rest).ok_or_else(malformed)?;
        let (offset, rest) = split_field(rest).ok_or_else(malformed)?;
        let (_device, rest) = split_field(rest).ok_or_else(malformed)?;
        let (_inode, path) = split_field(rest).unwrap_or((rest.trim(), ""));

        let (start, end) = range.split_once('-').ok_or_else(malformed)?;
        let parse_hex = |s: &str| u64::from_str_radix(s, 16).map_err(|_| malformed());

        let path = path.trim_start();
        let name = if path.is_empty() {
            None
        } else {
            Some(path.strip_suffix(" (deleted)").unwrap_or(path).to_string())
        };

        Ok(MemoryRegion {
            start: Address::from(parse_hex(start)?),
            end: Address::from(parse_hex(end)?),
            permissions: permissions.to_string(),
            offset: parse_hex(offset)?,
            name,
        })
    }
}

/// Split off the first whitespace-delimited field, keeping the remainder intact
fn split_field(s: &str) -> Option<(&str, &str)>
{
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(pos) => Some((&s[..pos], &s[pos + 1..])),
        None => Some((s, "")),
    }
}
