//! # Session Context
//!
//! Process-global facts the renderer needs, read once before rendering.
//!
//! - the address of `EG(uninitialized_zval_ptr)`, the "not set yet" sentinel
//! - the addresses of the engine's default `get_class_entry` and
//!   `get_properties` handlers, used to tell standard objects from objects
//!   whose class or properties come from custom handlers
//! - where `EG(objects_store)` lives, to turn object handles into records
//!
//! Thread-safe (ZTS) builds keep these in per-thread storage and are not
//! supported.

use tracing::info;

use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::layout::ZendLayout;
use crate::types::Address;

pub const EXECUTOR_GLOBALS: &str = "executor_globals";
pub const STD_GET_CLASS_ENTRY: &str = "zend_std_object_get_class";
pub const STD_GET_PROPERTIES: &str = "zend_std_get_properties";

/// Read-only context shared by every render call of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session
{
    pub layout: ZendLayout,
    /// Value of `EG(uninitialized_zval_ptr)`
    pub uninitialized: Address,
    /// `&zend_std_object_get_class`
    pub std_get_class_entry: Address,
    /// `&zend_std_get_properties`
    pub std_get_properties: Address,
    /// `&EG(objects_store)`
    pub objects_store: Address,
}

impl Session
{
    /// Look up the session context in the inspected process
    ///
    /// ## Errors
    ///
    /// - `SymbolNotFound`: the target doesn't look like a PHP binary
    /// - `MemoryAccess`: `executor_globals` could not be read
    pub fn resolve<M>(mem: &M, layout: ZendLayout) -> Result<Self>
    where
        M: MemoryAccessor + ?Sized,
    {
        let globals = mem.symbol_address(EXECUTOR_GLOBALS)?;
        let uninitialized = mem.read_pointer(globals + layout.executor_globals.uninitialized_zval_ptr)?;
        let session = Session {
            layout,
            uninitialized,
            std_get_class_entry: mem.symbol_address(STD_GET_CLASS_ENTRY)?,
            std_get_properties: mem.symbol_address(STD_GET_PROPERTIES)?,
            objects_store: globals + layout.executor_globals.objects_store,
        };
        info!(
            executor_globals = %globals,
            uninitialized = %session.uninitialized,
            "resolved session context"
        );
        Ok(session)
    }

    /// Object record for the object zval at `zval`
    ///
    /// Mirrors `zend_objects_get_address`: the handle indexes
    /// `EG(objects_store).object_buckets`.
    ///
    /// ## Errors
    ///
    /// - `StaleObjectHandle`: the handle is past the end of the store or its
    ///   bucket has been freed
    /// - `MemoryAccess`: any read on the way failed
    pub fn object_address_of<M>(&self, mem: &M, zval: Address) -> Result<Address>
    where
        M: MemoryAccessor + ?Sized,
    {
        let handle = mem.read_u32(zval + self.layout.zval.obj_handle)?;
        let size = mem.read_u32(self.objects_store + self.layout.objects_store.size)?;
        if handle >= size {
            return Err(InspectError::StaleObjectHandle(handle));
        }

        let buckets = mem.read_pointer(self.objects_store + self.layout.objects_store.object_buckets)?;
        let bucket = buckets.index(u64::from(handle), self.layout.store_bucket.stride);
        if mem.read_u8(bucket + self.layout.store_bucket.valid)? == 0 {
            return Err(InspectError::StaleObjectHandle(handle));
        }
        mem.read_pointer(bucket + self.layout.store_bucket.object)
    }
}
