//! In-memory PHP 5.5 process image for renderer tests.
//!
//! Structures are laid out byte-for-byte through `ZendLayout`, so the
//! renderer reads them exactly as it would read a live process.

#![allow(dead_code)]

use std::collections::HashMap;

use zvaldump_core::layout::ZendLayout;
use zvaldump_core::render::{RenderOptions, ZvalPrinter};
use zvaldump_core::session::{Session, EXECUTOR_GLOBALS, STD_GET_CLASS_ENTRY, STD_GET_PROPERTIES};
use zvaldump_core::types::{Address, Handle, TypeName};
use zvaldump_core::zval::ZvalType;
use zvaldump_core::{InspectError, MemoryAccessor, Result};

/// Where [`FakeProcess::alloc`] starts handing out memory
pub const HEAP_BASE: u64 = 0x10_0000;
/// Fake code addresses of the standard handlers
pub const STD_GET_CLASS_ENTRY_ADDR: u64 = 0x40_1000;
pub const STD_GET_PROPERTIES_ADDR: u64 = 0x40_2000;

const ZVAL_SIZE: usize = 24;
const HASH_TABLE_SIZE: usize = 72;
const BUCKET_SIZE: usize = 72;
const HANDLERS_SIZE: usize = 160;
const OBJECT_SIZE: usize = 24;
const CLASS_ENTRY_SIZE: usize = 512;
const PROPERTY_INFO_SIZE: usize = 64;
const EXECUTOR_GLOBALS_SIZE: usize = 1024;
const STORE_CAPACITY: u32 = 32;

/// Key of a fake hash-table entry
#[derive(Debug, Clone, Copy)]
pub enum Key<'a>
{
    Str(&'a [u8]),
    Index(i64),
}

/// A declared property of a fake class
#[derive(Debug, Clone, Copy)]
pub struct Declared<'a>
{
    pub name: &'a str,
    pub flags: u32,
    pub offset: i32,
}

struct Region
{
    start: u64,
    bytes: Vec<u8>,
}

pub struct FakeProcess
{
    pub layout: ZendLayout,
    regions: Vec<Region>,
    symbols: HashMap<String, Address>,
    next: u64,
    pub executor_globals: Address,
    pub uninitialized: Address,
    object_buckets: Address,
    store_size: u32,
}

impl FakeProcess
{
    /// A process with executor globals, an empty object store and the
    /// standard handler symbols
    pub fn new() -> Self
    {
        let layout = ZendLayout::default();
        let mut fake = FakeProcess {
            layout,
            regions: Vec::new(),
            symbols: HashMap::new(),
            next: HEAP_BASE,
            executor_globals: Address::NULL,
            uninitialized: Address::NULL,
            object_buckets: Address::NULL,
            store_size: 0,
        };

        fake.executor_globals = fake.alloc(EXECUTOR_GLOBALS_SIZE);
        fake.uninitialized = fake.zval(ZvalType::Null, 0);
        fake.write_ptr(fake.executor_globals + layout.executor_globals.uninitialized_zval_ptr, fake.uninitialized);

        fake.object_buckets = fake.alloc(STORE_CAPACITY as usize * layout.store_bucket.stride as usize);
        let store = fake.executor_globals + layout.executor_globals.objects_store;
        fake.write_ptr(store + layout.objects_store.object_buckets, fake.object_buckets);
        // Handle 0 is never used by the engine.
        fake.set_store_size(1);

        fake.define_symbol(EXECUTOR_GLOBALS, fake.executor_globals);
        fake.define_symbol(STD_GET_CLASS_ENTRY, Address::from(STD_GET_CLASS_ENTRY_ADDR));
        fake.define_symbol(STD_GET_PROPERTIES, Address::from(STD_GET_PROPERTIES_ADDR));
        fake
    }

    pub fn define_symbol(&mut self, name: &str, address: Address)
    {
        self.symbols.insert(name.to_string(), address);
    }

    pub fn remove_symbol(&mut self, name: &str)
    {
        self.symbols.remove(name);
    }

    /// Map `size` zeroed bytes at a fixed address
    pub fn map(&mut self, start: u64, size: usize) -> Address
    {
        self.regions.push(Region {
            start,
            bytes: vec![0; size],
        });
        Address::from(start)
    }

    /// Map `size` zeroed bytes on the fake heap, 16-byte aligned
    pub fn alloc(&mut self, size: usize) -> Address
    {
        let start = self.next;
        self.next += (size.max(1) as u64 + 15) & !15;
        // A gap page between allocations catches overruns.
        self.next += 0x100;
        self.map(start, size)
    }

    pub fn write(&mut self, address: Address, data: &[u8])
    {
        let at = address.value();
        let region = self
            .regions
            .iter_mut()
            .find(|region| at >= region.start && at + data.len() as u64 <= region.start + region.bytes.len() as u64)
            .unwrap_or_else(|| panic!("fake write outside mapped memory at {address}"));
        let offset = (at - region.start) as usize;
        region.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    pub fn write_u8(&mut self, address: Address, value: u8)
    {
        self.write(address, &[value]);
    }

    pub fn write_u32(&mut self, address: Address, value: u32)
    {
        self.write(address, &value.to_le_bytes());
    }

    pub fn write_i32(&mut self, address: Address, value: i32)
    {
        self.write(address, &value.to_le_bytes());
    }

    pub fn write_u64(&mut self, address: Address, value: u64)
    {
        self.write(address, &value.to_le_bytes());
    }

    pub fn write_ptr(&mut self, address: Address, value: Address)
    {
        self.write_u64(address, value.value());
    }

    /// Copy `bytes` to the heap
    pub fn bytes(&mut self, bytes: &[u8]) -> Address
    {
        let address = self.alloc(bytes.len());
        self.write(address, bytes);
        address
    }

    /// A NUL-terminated C string
    pub fn c_string(&mut self, text: &[u8]) -> Address
    {
        let mut bytes = text.to_vec();
        bytes.push(0);
        self.bytes(&bytes)
    }

    // zvals

    /// A zval with an arbitrary tag byte and first value word
    pub fn zval_raw(&mut self, tag: u8, word: u64) -> Address
    {
        let zval = self.alloc(ZVAL_SIZE);
        self.write_zval_at(zval, tag, word);
        zval
    }

    pub fn write_zval_at(&mut self, zval: Address, tag: u8, word: u64)
    {
        let layout = self.layout.zval;
        self.write_u64(zval + layout.value, word);
        // refcount 1
        self.write_u32(zval + 16, 1);
        self.write_u8(zval + layout.type_tag, tag);
    }

    pub fn zval(&mut self, ty: ZvalType, word: u64) -> Address
    {
        self.zval_raw(ty.tag(), word)
    }

    pub fn long(&mut self, value: i64) -> Address
    {
        self.zval(ZvalType::Long, value as u64)
    }

    pub fn double(&mut self, value: f64) -> Address
    {
        self.zval(ZvalType::Double, value.to_bits())
    }

    pub fn boolean(&mut self, value: bool) -> Address
    {
        self.zval(ZvalType::Bool, u64::from(value))
    }

    pub fn null(&mut self) -> Address
    {
        self.zval(ZvalType::Null, 0)
    }

    pub fn string(&mut self, bytes: &[u8]) -> Address
    {
        let buffer = self.c_string(bytes);
        self.string_at(buffer, bytes.len() as u32)
    }

    /// A string zval whose buffer and length are given directly
    pub fn string_at(&mut self, buffer: Address, len: u32) -> Address
    {
        let zval = self.zval(ZvalType::String, buffer.value());
        self.write_u32(zval + self.layout.zval.str_len, len);
        zval
    }

    pub fn array(&mut self, table: Address) -> Address
    {
        self.zval(ZvalType::Array, table.value())
    }

    pub fn object(&mut self, handle: u32, handlers: Address) -> Address
    {
        let zval = self.zval(ZvalType::Object, 0);
        self.write_u32(zval + self.layout.zval.obj_handle, handle);
        self.write_ptr(zval + self.layout.zval.obj_handlers, handlers);
        zval
    }

    // hash tables

    /// A table whose `pData` pointers are given as-is
    pub fn raw_table(&mut self, entries: &[(Key<'_>, Address)]) -> Address
    {
        let table = self.alloc(HASH_TABLE_SIZE);
        self.write_table_at(table, entries);
        table
    }

    /// Fill in the table header at `table` and chain new buckets under it
    pub fn write_table_at(&mut self, table: Address, entries: &[(Key<'_>, Address)])
    {
        let layout = self.layout;
        self.write_u32(table + layout.hash_table.num_elements, entries.len() as u32);

        let buckets: Vec<Address> = entries.iter().map(|_| self.alloc(BUCKET_SIZE)).collect();
        for (i, (key, data)) in entries.iter().enumerate() {
            let bucket = buckets[i];
            match *key {
                Key::Str(name) => {
                    let bytes = self.c_string(name);
                    self.write_u64(bucket + layout.bucket.h, 0x5bd1_e995);
                    self.write_u32(bucket + layout.bucket.key_length, name.len() as u32 + 1);
                    self.write_ptr(bucket + layout.bucket.key, bytes);
                }
                Key::Index(index) => {
                    self.write_u64(bucket + layout.bucket.h, index as u64);
                    self.write_u32(bucket + layout.bucket.key_length, 0);
                }
            }
            self.write_ptr(bucket + layout.bucket.data, *data);
            let next = buckets.get(i + 1).copied().unwrap_or(Address::NULL);
            self.write_ptr(bucket + layout.bucket.list_next, next);
        }
        let head = buckets.first().copied().unwrap_or(Address::NULL);
        self.write_ptr(table + layout.hash_table.list_head, head);
    }

    /// An array-style table: every `pData` is a `zval **`
    pub fn table(&mut self, entries: &[(Key<'_>, Address)]) -> Address
    {
        let slots: Vec<(Key<'_>, Address)> = entries
            .iter()
            .map(|&(key, zval)| {
                let slot = self.alloc(8);
                self.write_ptr(slot, zval);
                (key, slot)
            })
            .collect();
        self.raw_table(&slots)
    }

    /// Overwrite the element counter of a table
    pub fn set_count(&mut self, table: Address, count: u32)
    {
        self.write_u32(table + self.layout.hash_table.num_elements, count);
    }

    /// The `n`th bucket of a table built by this fake
    pub fn bucket(&self, table: Address, n: usize) -> Address
    {
        let layout = self.layout;
        let mut bucket = self.read_pointer(table + layout.hash_table.list_head).unwrap();
        for _ in 0..n {
            bucket = self.read_pointer(bucket + layout.bucket.list_next).unwrap();
        }
        bucket
    }

    // objects

    /// A handler table with the given `get_class_entry` and `get_properties`
    pub fn handlers(&mut self, get_class_entry: u64, get_properties: u64) -> Address
    {
        let handlers = self.alloc(HANDLERS_SIZE);
        self.write_u64(handlers + self.layout.handlers.get_class_entry, get_class_entry);
        self.write_u64(handlers + self.layout.handlers.get_properties, get_properties);
        handlers
    }

    pub fn std_handlers(&mut self) -> Address
    {
        self.handlers(STD_GET_CLASS_ENTRY_ADDR, STD_GET_PROPERTIES_ADDR)
    }

    /// A class entry with its embedded `properties_info` table
    pub fn class_entry(&mut self, name: &str, declared: &[Declared<'_>]) -> Address
    {
        let layout = self.layout;
        let ce = self.alloc(CLASS_ENTRY_SIZE);
        let name_bytes = self.c_string(name.as_bytes());
        self.write_ptr(ce + layout.class_entry.name, name_bytes);
        self.write_u32(ce + layout.class_entry.name_length, name.len() as u32);

        let infos: Vec<(Key<'_>, Address)> = declared
            .iter()
            .map(|property| {
                let info = self.alloc(PROPERTY_INFO_SIZE);
                self.write_u32(info + layout.property_info.flags, property.flags);
                self.write_i32(info + layout.property_info.offset, property.offset);
                (Key::Str(property.name.as_bytes()), info)
            })
            .collect();
        self.write_table_at(ce + layout.class_entry.properties_info, &infos);
        ce
    }

    /// A `zend_object` registered in the object store; returns its handle
    ///
    /// `slots` becomes the inline `properties_table` (`Address::NULL` for an
    /// unset slot).
    pub fn new_object(&mut self, ce: Address, properties: Option<Address>, slots: &[Address]) -> u32
    {
        let layout = self.layout;
        let object = self.alloc(OBJECT_SIZE);
        self.write_ptr(object + layout.object.ce, ce);
        self.write_ptr(object + layout.object.properties, properties.unwrap_or(Address::NULL));

        if !slots.is_empty() {
            let table = self.alloc(slots.len() * 8);
            for (i, slot) in slots.iter().enumerate() {
                self.write_ptr(table.index(i as u64, 8), *slot);
            }
            self.write_ptr(object + layout.object.properties_table, table);
        }

        let handle = self.store_size;
        assert!(handle < STORE_CAPACITY, "fake object store is full");
        let bucket = self.object_buckets.index(u64::from(handle), layout.store_bucket.stride);
        self.write_u8(bucket + layout.store_bucket.valid, 1);
        self.write_ptr(bucket + layout.store_bucket.object, object);
        self.set_store_size(handle + 1);
        handle
    }

    /// Mark the store bucket of `handle` as freed
    pub fn free_object(&mut self, handle: u32)
    {
        let layout = self.layout;
        let bucket = self.object_buckets.index(u64::from(handle), layout.store_bucket.stride);
        self.write_u8(bucket + layout.store_bucket.valid, 0);
    }

    /// Object record behind `handle`
    pub fn object_record(&self, handle: u32) -> Address
    {
        let bucket = self.object_buckets.index(u64::from(handle), self.layout.store_bucket.stride);
        self.read_pointer(bucket + self.layout.store_bucket.object).unwrap()
    }

    fn set_store_size(&mut self, size: u32)
    {
        self.store_size = size;
        let store = self.executor_globals + self.layout.executor_globals.objects_store;
        self.write_u32(store + self.layout.objects_store.size, size);
    }

    // rendering

    pub fn session(&self) -> Session
    {
        Session::resolve(self, self.layout).unwrap()
    }

    /// Render the zval at `zval` as a `zval *` handle
    pub fn print(&self, zval: Address) -> String
    {
        self.print_with(zval, RenderOptions::default())
    }

    pub fn print_with(&self, zval: Address, options: RenderOptions) -> String
    {
        let session = self.session();
        let mut printer = ZvalPrinter::new(self, &session, options);
        printer.print(&Handle::new(zval.value(), TypeName::new("zval", 1)))
    }

    pub fn print_expression(&self, expression: &str) -> Result<String>
    {
        let session = self.session();
        let mut printer = ZvalPrinter::new(self, &session, RenderOptions::default());
        printer.print_expression(expression)
    }
}

impl MemoryAccessor for FakeProcess
{
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        let at = address.value();
        let end = at
            .checked_add(len as u64)
            .ok_or_else(|| InspectError::memory(address, len, "address overflow"))?;
        self.regions
            .iter()
            .find(|region| at >= region.start && end <= region.start + region.bytes.len() as u64)
            .map(|region| {
                let offset = (at - region.start) as usize;
                region.bytes[offset..offset + len].to_vec()
            })
            .ok_or_else(|| InspectError::memory(address, len, "unmapped"))
    }

    fn symbol_address(&self, name: &str) -> Result<Address>
    {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| InspectError::SymbolNotFound(name.to_string()))
    }
}
