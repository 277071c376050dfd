//! # Runtime Structure Layout
//!
//! Byte offsets of the Zend engine structures the renderer reads.
//!
//! The renderer never hardcodes an offset: it always goes through a
//! [`ZendLayout`]. The default describes PHP 5.5 built without thread safety
//! for an LP64 target (x86-64 or aarch64 Linux), where `long` and pointers are
//! 8 bytes and `int` is 4.
//!
//! Most of these structs have been stable for years, but `executor_globals`
//! grows and shrinks with build options, so its two offsets can be overridden
//! when the defaults don't match the target binary.

/// `zval`: a 16-byte value union followed by refcount, type and is_ref
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZvalLayout
{
    /// `value.lval` / `value.dval` / `value.ht` all start the union
    pub value: u64,
    /// `value.str.len` (`int`)
    pub str_len: u64,
    /// `value.obj.handle` (`zend_object_handle`, 32 bits)
    pub obj_handle: u64,
    /// `value.obj.handlers`
    pub obj_handlers: u64,
    /// `type` (`zend_uchar`)
    pub type_tag: u64,
}

/// `HashTable`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashTableLayout
{
    /// `nNumOfElements` (32 bits)
    pub num_elements: u64,
    /// `pListHead`
    pub list_head: u64,
}

/// `Bucket`, one hash-table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketLayout
{
    /// `h`, the numeric key or string hash
    pub h: u64,
    /// `nKeyLength` (32 bits); zero for numeric keys, otherwise includes the NUL
    pub key_length: u64,
    /// `pData`
    pub data: u64,
    /// `pListNext`, insertion-order link
    pub list_next: u64,
    /// `arKey` (`const char *`)
    pub key: u64,
}

/// `zend_object_handlers`, the function-pointer table of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlersLayout
{
    pub get_properties: u64,
    pub get_class_entry: u64,
}

/// `zend_object`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLayout
{
    pub ce: u64,
    pub properties: u64,
    /// `properties_table` (`zval **`)
    pub properties_table: u64,
}

/// `zend_class_entry`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassEntryLayout
{
    pub name: u64,
    /// `name_length` (32 bits)
    pub name_length: u64,
    /// `properties_info`, a `HashTable` embedded in the class entry
    pub properties_info: u64,
}

/// `zend_property_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfoLayout
{
    /// `flags` (32 bits), `ZEND_ACC_*`
    pub flags: u64,
    /// `offset` (`int`) into the object's `properties_table`
    pub offset: u64,
}

/// `zend_executor_globals`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorGlobalsLayout
{
    pub uninitialized_zval_ptr: u64,
    /// `objects_store`, a `zend_objects_store` embedded in the globals
    pub objects_store: u64,
}

/// `zend_objects_store`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectsStoreLayout
{
    pub object_buckets: u64,
    /// `size` (32 bits), number of allocated buckets
    pub size: u64,
}

/// `zend_object_store_bucket`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreBucketLayout
{
    /// `sizeof(zend_object_store_bucket)`
    pub stride: u64,
    /// `valid` (`zend_bool`)
    pub valid: u64,
    /// `bucket.obj.object`
    pub object: u64,
}

/// Offsets of every field the renderer touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZendLayout
{
    /// Size of a pointer in the target
    pub pointer_size: u64,
    pub zval: ZvalLayout,
    pub hash_table: HashTableLayout,
    pub bucket: BucketLayout,
    pub handlers: HandlersLayout,
    pub object: ObjectLayout,
    pub class_entry: ClassEntryLayout,
    pub property_info: PropertyInfoLayout,
    pub executor_globals: ExecutorGlobalsLayout,
    pub objects_store: ObjectsStoreLayout,
    pub store_bucket: StoreBucketLayout,
}

impl ZendLayout
{
    /// PHP 5.5, non-ZTS, LP64
    pub const fn php55_lp64() -> Self
    {
        ZendLayout {
            pointer_size: 8,
            zval: ZvalLayout {
                value: 0,
                str_len: 8,
                obj_handle: 0,
                obj_handlers: 8,
                type_tag: 20,
            },
            hash_table: HashTableLayout {
                num_elements: 8,
                list_head: 32,
            },
            bucket: BucketLayout {
                h: 0,
                key_length: 8,
                data: 16,
                list_next: 32,
                key: 64,
            },
            handlers: HandlersLayout {
                get_properties: 112,
                get_class_entry: 144,
            },
            object: ObjectLayout {
                ce: 0,
                properties: 8,
                properties_table: 16,
            },
            class_entry: ClassEntryLayout {
                name: 8,
                name_length: 16,
                properties_info: 112,
            },
            property_info: PropertyInfoLayout { flags: 0, offset: 32 },
            executor_globals: ExecutorGlobalsLayout {
                uninitialized_zval_ptr: 32,
                objects_store: 928,
            },
            objects_store: ObjectsStoreLayout {
                object_buckets: 0,
                size: 12,
            },
            store_bucket: StoreBucketLayout {
                stride: 64,
                valid: 1,
                object: 8,
            },
        }
    }

    /// Replace the build-dependent `executor_globals` offsets
    #[must_use]
    pub fn with_executor_globals(mut self, uninitialized_zval_ptr: Option<u64>, objects_store: Option<u64>) -> Self
    {
        if let Some(offset) = uninitialized_zval_ptr {
            self.executor_globals.uninitialized_zval_ptr = offset;
        }
        if let Some(offset) = objects_store {
            self.executor_globals.objects_store = offset;
        }
        self
    }
}

impl Default for ZendLayout
{
    fn default() -> Self
    {
        ZendLayout::php55_lp64()
    }
}
