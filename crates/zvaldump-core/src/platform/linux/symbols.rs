//! # ELF Symbol Lookup
//!
//! Finds runtime addresses of global symbols (`executor_globals`,
//! `zend_std_get_properties`, …) by reading the symbol tables of every ELF
//! file mapped into the target.
//!
//! Both `.symtab` and `.dynsym` are used: distribution PHP binaries are
//! usually stripped of the former but still export engine symbols through
//! the latter. Position-independent files (`ET_DYN`, i.e. PIE executables
//! and shared libraries) are rebased by their load bias; `ET_EXEC` symbols
//! are already absolute.

use std::collections::HashMap;
use std::fs;

use object::{Object, ObjectKind, ObjectSegment, ObjectSymbol};
use tracing::{debug, info};

use super::maps::mapped_files;
use crate::error::{InspectError, Result};
use crate::types::{Address, MemoryRegion};

const PAGE_MASK: u64 = !0xfff;

/// Name → runtime address for every defined symbol of the mapped files
#[derive(Debug, Default, Clone)]
pub struct SymbolIndex
{
    symbols: HashMap<String, Address>,
}

impl SymbolIndex
{
    /// Index the symbols of all ELF files among `regions`
    ///
    /// Files that can't be read or aren't object files (fonts, locale
    /// archives, …) are skipped. When several files define a name, the one
    /// mapped lowest wins.
    pub fn load(regions: &[MemoryRegion]) -> Self
    {
        let mut index = SymbolIndex::default();
        for (path, base) in mapped_files(regions) {
            match index.add_file(&path, base) {
                Ok(count) => debug!(path = %path, %base, count, "indexed symbols"),
                Err(err) => debug!(path = %path, error = %err, "skipping mapped file"),
            }
        }
        info!(symbols = index.symbols.len(), "symbol index ready");
        index
    }

    /// Add the symbols of the file at `path`, loaded at `base`
    ///
    /// Returns the number of symbols seen.
    pub fn add_file(&mut self, path: &str, base: Address) -> Result<usize>
    {
        let data = fs::read(path)?;
        let file = object::File::parse(&*data).map_err(|err| InspectError::ObjectFile {
            path: path.to_string(),
            reason: err.to_string(),
        })?;

        let bias = if file.kind() == ObjectKind::Dynamic {
            let lowest = file.segments().map(|segment| segment.address()).min().unwrap_or(0);
            base.value().wrapping_sub(lowest & PAGE_MASK)
        } else {
            0
        };

        let mut count = 0;
        for symbol in file.symbols().chain(file.dynamic_symbols()) {
            if !symbol.is_definition() {
                continue;
            }
            let Ok(name) = symbol.name() else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            count += 1;
            self.insert(name, Address::from(symbol.address().wrapping_add(bias)));
        }
        Ok(count)
    }

    /// Record `name` unless it is already known
    pub fn insert(&mut self, name: &str, address: Address)
    {
        self.symbols.entry(name.to_string()).or_insert(address);
    }

    pub fn lookup(&self, name: &str) -> Option<Address>
    {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }
}
