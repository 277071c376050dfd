//! Hash-table traversal.
//!
//! A `HashTable` keeps its buckets on a doubly-linked list in insertion order
//! (`pListHead` / `pListNext`); only the forward links are followed here.
//! Each bucket has either a string key or a numeric key, and an untyped
//! `pData` whose meaning depends on the table: `zval **` for arrays and
//! object property tables, `zend_property_info *` for a class's
//! `properties_info`.

use std::collections::HashSet;

use tracing::{trace, warn};

use super::ZvalPrinter;
use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::layout::ZendLayout;
use crate::types::Address;

/// Key of one hash-table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKey
{
    /// String key: `len` bytes at `bytes`, terminator already excluded
    String
    {
        bytes: Address,
        len: u64,
    },
    /// Integer key
    Index(i64),
}

/// One bucket, as read from the inspected process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEntry
{
    /// Address of the bucket itself
    pub address: Address,
    pub key: HashKey,
    /// `pData`, interpreted by the caller
    pub data: Address,
}

/// Insertion-order walk over a table's buckets
///
/// Stops at the null `pListNext`. A bucket reached twice means the list is
/// corrupt; the walk then yields one `CorruptTable` error and ends. A failed
/// read also ends the walk after yielding the error.
pub struct HashEntries<'a, M: ?Sized>
{
    mem: &'a M,
    layout: ZendLayout,
    table: Address,
    next: Address,
    seen: HashSet<Address>,
    done: bool,
}

impl<'a, M> HashEntries<'a, M>
where
    M: MemoryAccessor + ?Sized,
{
    /// Start walking the table at `table`
    ///
    /// ## Errors
    ///
    /// - `MemoryAccess`: the list head could not be read
    pub fn new(mem: &'a M, layout: ZendLayout, table: Address) -> Result<Self>
    {
        let head = mem.read_pointer(table + layout.hash_table.list_head)?;
        Ok(HashEntries {
            mem,
            layout,
            table,
            next: head,
            seen: HashSet::new(),
            done: false,
        })
    }

    fn read_entry(&self, bucket: Address) -> Result<(HashEntry, Address)>
    {
        let layout = &self.layout.bucket;
        let key_length = self.mem.read_u32(bucket + layout.key_length)?;
        let key = if key_length > 0 {
            HashKey::String {
                bytes: self.mem.read_pointer(bucket + layout.key)?,
                len: u64::from(key_length - 1),
            }
        } else {
            // `h` is a `ulong`, but PHP array indices are signed.
            HashKey::Index(self.mem.read_i64(bucket + layout.h)?)
        };
        let entry = HashEntry {
            address: bucket,
            key,
            data: self.mem.read_pointer(bucket + layout.data)?,
        };
        let next = self.mem.read_pointer(bucket + layout.list_next)?;
        Ok((entry, next))
    }
}

impl<M> Iterator for HashEntries<'_, M>
where
    M: MemoryAccessor + ?Sized,
{
    type Item = Result<HashEntry>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.done || self.next.is_null() {
            return None;
        }

        let bucket = self.next;
        if !self.seen.insert(bucket) {
            self.done = true;
            warn!(table = %self.table, entry = %bucket, "hash table entry list loops");
            return Some(Err(InspectError::CorruptTable {
                table: self.table,
                entry: bucket,
            }));
        }

        match self.read_entry(bucket) {
            Ok((entry, next)) => {
                trace!(table = %self.table, entry = %bucket, key = ?entry.key, "hash table entry");
                self.next = next;
                Some(Ok(entry))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Per-entry callback for [`ZvalPrinter::apply_table`]
///
/// Whatever context the callback needs lives in the implementing type. The
/// visitor owns its output for the entry, indentation and line end included.
pub trait EntryVisitor<M: MemoryAccessor + ?Sized>
{
    fn visit(&mut self, printer: &mut ZvalPrinter<'_, M>, entry: &HashEntry) -> Result<()>;
}

impl<M> ZvalPrinter<'_, M>
where
    M: MemoryAccessor + ?Sized,
{
    /// `nNumOfElements` of the table at `table`
    ///
    /// The counter is trusted as-is; it is not checked against the list.
    pub fn table_count(&self, table: Address) -> Result<u32>
    {
        self.mem.read_u32(table + self.session.layout.hash_table.num_elements)
    }

    /// Print `(count) {`, the entries one level deeper, then `}`
    ///
    /// With `recurse` every `pData` is taken as `zval **` and the zval is
    /// rendered; without it only the `pData` pointer is printed.
    pub fn print_table_wrapped(&mut self, table: Address, recurse: bool) -> Result<()>
    {
        let count = self.table_count(table)?;
        self.framed(count, |printer| printer.print_table(table, recurse))
    }

    /// Print one `key => value` line per entry at the current indentation
    ///
    /// An entry that can't be rendered gets an inline error and the walk
    /// moves on. Only a failure of the walk itself ends it.
    pub fn print_table(&mut self, table: Address, recurse: bool) -> Result<()>
    {
        for entry in HashEntries::new(self.mem, self.session.layout, table)? {
            let entry = entry?;
            if let Err(err) = self.print_entry(&entry, recurse) {
                self.entry_error(&entry, &err);
            }
        }
        Ok(())
    }

    fn print_entry(&mut self, entry: &HashEntry, recurse: bool) -> Result<()>
    {
        self.out.indent();
        self.print_key(&entry.key)?;
        self.out.write(" => ");
        if recurse {
            let zval = self.mem.read_pointer(entry.data)?;
            self.print_zval_contents(zval);
        } else {
            self.out.line(&entry.data.to_string());
        }
        Ok(())
    }

    /// Like [`print_table_wrapped`](Self::print_table_wrapped), but hand each
    /// entry to `visitor` instead of rendering it
    ///
    /// An error from `visitor` is printed inline for that entry and the
    /// remaining entries are still visited.
    pub fn apply_table<V>(&mut self, table: Address, visitor: &mut V) -> Result<()>
    where
        V: EntryVisitor<M>,
    {
        let count = self.table_count(table)?;
        self.framed(count, |printer| {
            for entry in HashEntries::new(printer.mem, printer.session.layout, table)? {
                let entry = entry?;
                if let Err(err) = visitor.visit(printer, &entry) {
                    printer.entry_error(&entry, &err);
                }
            }
            Ok(())
        })
    }

    /// Finish a half-printed entry line with `err`
    fn entry_error(&mut self, entry: &HashEntry, err: &InspectError)
    {
        warn!(entry = %entry.address, error = %err, "hash table entry render failed");
        if self.out.at_line_start() {
            self.out.indent();
        }
        self.out.error(err);
    }

    /// Print a key as `[len:bytes]` or as a decimal index
    pub fn print_key(&mut self, key: &HashKey) -> Result<()>
    {
        match *key {
            HashKey::String { bytes, len } => self.print_string(bytes, len),
            HashKey::Index(index) => {
                self.out.write(&index.to_string());
                Ok(())
            }
        }
    }

    /// Braces and indentation around `body`
    ///
    /// A failure inside `body` is reported on its own line inside the braces,
    /// so the closing brace is always printed.
    fn framed(&mut self, count: u32, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()>
    {
        self.out.line(&format!("({count}) {{"));
        self.out.push_indent();
        if let Err(err) = body(self) {
            warn!(error = %err, "hash table walk aborted");
            if self.out.at_line_start() {
                self.out.indent();
            }
            self.out.error(&err);
        }
        self.out.pop_indent();
        self.out.indent();
        self.out.line("}");
        Ok(())
    }
}
