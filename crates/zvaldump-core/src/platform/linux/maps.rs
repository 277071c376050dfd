//! `/proc/<pid>/maps` reading.

use std::fs;
use std::io::ErrorKind;

use crate::error::{InspectError, Result};
use crate::types::{MemoryRegion, ProcessId};

/// All mappings of `pid`, sorted by start address
///
/// ## Errors
///
/// - `ProcessNotFound`: no such process
/// - `PermissionDenied`: the maps file isn't readable
/// - `InvalidArgument`: a line could not be parsed
pub fn read_proc_maps(pid: ProcessId) -> Result<Vec<MemoryRegion>>
{
    let text = fs::read_to_string(format!("/proc/{pid}/maps")).map_err(|err| match err.kind() {
        ErrorKind::NotFound => InspectError::ProcessNotFound(pid.0),
        ErrorKind::PermissionDenied => InspectError::PermissionDenied(format!("/proc/{pid}/maps")),
        _ => InspectError::Io(err),
    })?;
    parse_maps(&text)
}

/// Parse the contents of a maps file
pub fn parse_maps(text: &str) -> Result<Vec<MemoryRegion>>
{
    let mut regions = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(MemoryRegion::parse_maps_line)
        .collect::<Result<Vec<_>>>()?;
    regions.sort_by_key(|region| region.start);
    Ok(regions)
}

/// Each mapped file with the lowest address it is mapped at
///
/// That lowest mapping covers the ELF header, so it is the file's load base.
/// Files are returned in address order, which puts the main executable before
/// shared libraries on typical layouts.
pub fn mapped_files(regions: &[MemoryRegion]) -> Vec<(String, crate::types::Address)>
{
    let mut files: Vec<(String, crate::types::Address)> = Vec::new();
    for region in regions.iter().filter(|region| region.is_file_backed()) {
        let Some(path) = region.name.as_deref() else {
            continue;
        };
        match files.iter_mut().find(|(known, _)| known == path) {
            Some((_, base)) => *base = (*base).min(region.start),
            None => files.push((path.to_string(), region.start)),
        }
    }
    files.sort_by_key(|(_, base)| *base);
    files
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::Address;

    const MAPS: &str = "\
7f1200000000-7f1200020000 r--p 00000000 fd:01 200 /usr/lib/libc.so.6
55d000000000-55d000100000 r--p 00000000 fd:01 100 /usr/bin/php
55d000100000-55d000400000 r-xp 00100000 fd:01 100 /usr/bin/php
55d001000000-55d001200000 rw-p 00000000 00:00 0   [heap]
7f1200020000-7f1200180000 r-xp 00020000 fd:01 200 /usr/lib/libc.so.6
7ffc00000000-7ffc00021000 rw-p 00000000 00:00 0   [stack]
";

    #[test]
    fn test_parse_maps_sorts_by_address()
    {
        let regions = parse_maps(MAPS).unwrap();
        assert_eq!(regions.len(), 6);
        assert!(regions.windows(2).all(|pair| pair[0].start <= pair[1].start));
        assert_eq!(regions[0].name.as_deref(), Some("/usr/bin/php"));
    }

    #[test]
    fn test_mapped_files_lowest_base()
    {
        let regions = parse_maps(MAPS).unwrap();
        let files = mapped_files(&regions);
        assert_eq!(
            files,
            vec![
                ("/usr/bin/php".to_string(), Address::from(0x55d0_0000_0000)),
                ("/usr/lib/libc.so.6".to_string(), Address::from(0x7f12_0000_0000)),
            ]
        );
    }

    #[test]
    fn test_parse_maps_rejects_bad_line()
    {
        assert!(parse_maps("garbage\n").is_err());
    }
}
