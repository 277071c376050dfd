//! Object rendering.
//!
//! An object prints as `ClassName#handle` followed by its properties. Where
//! those come from depends on the object's handler table:
//!
//! - standard `get_class_entry`: the class name is read from `obj->ce`,
//!   otherwise the class shows as `Unknown`
//! - standard `get_properties` with a `properties` hash table: that table
//! - standard `get_properties`, no hash table, known class: one line per
//!   declared property, read through the class's `properties_info` offsets
//!   from the inline `properties_table`
//! - anything else: no properties at all
//!
//! Custom handlers are never called; the process is stopped and calling into
//! it is out of the question.

use tracing::{debug, warn};

use super::hashtable::{EntryVisitor, HashEntry};
use super::ZvalPrinter;
use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::session::Session;
use crate::types::Address;

/// Class name shown when the class can't be resolved
pub const UNKNOWN_CLASS: &str = "Unknown";

/// `ZEND_ACC_STATIC` in `zend_property_info.flags`
const ACC_STATIC: u32 = 0x01;

/// Which parts of an object the engine's standard handlers provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectCapabilities
{
    /// `handlers->get_class_entry == zend_std_object_get_class`
    pub default_class_resolution: bool,
    /// `handlers->get_properties == zend_std_get_properties`
    pub default_property_resolution: bool,
}

impl ObjectCapabilities
{
    /// Compare the slots of the handler table at `handlers` with the
    /// standard implementations
    pub fn detect<M>(mem: &M, session: &Session, handlers: Address) -> Result<Self>
    where
        M: MemoryAccessor + ?Sized,
    {
        let layout = session.layout.handlers;
        Ok(ObjectCapabilities {
            default_class_resolution: mem.read_pointer(handlers + layout.get_class_entry)? == session.std_get_class_entry,
            default_property_resolution: mem.read_pointer(handlers + layout.get_properties)?
                == session.std_get_properties,
        })
    }
}

/// Renders `properties_info` entries from the object's inline slots
struct DeclaredProperties
{
    properties_table: Address,
}

impl<M> EntryVisitor<M> for DeclaredProperties
where
    M: MemoryAccessor + ?Sized,
{
    fn visit(&mut self, printer: &mut ZvalPrinter<'_, M>, entry: &HashEntry) -> Result<()>
    {
        let layout = printer.session.layout;
        printer.out.indent();
        printer.print_key(&entry.key)?;
        printer.out.write(" => ");

        let flags = printer.mem.read_u32(entry.data + layout.property_info.flags)?;
        if flags & ACC_STATIC != 0 {
            // Static members live in the class, not in the object's slots.
            printer.out.line("*static*");
            return Ok(());
        }

        let offset = printer.mem.read_i32(entry.data + layout.property_info.offset)?;
        let offset = u64::try_from(offset)
            .map_err(|_| InspectError::InvalidArgument(format!("negative property offset {offset}")))?;
        let slot = self.properties_table.index(offset, layout.pointer_size);
        let zval = printer.mem.read_pointer(slot)?;
        if zval.is_null() {
            printer.out.line(&format!("[{zval}] *unset*"));
        } else {
            printer.print_zval_contents(zval);
        }
        Ok(())
    }
}

impl<M> ZvalPrinter<'_, M>
where
    M: MemoryAccessor + ?Sized,
{
    /// Print the object held by the zval at `zval`
    pub(crate) fn print_object(&mut self, zval: Address) -> Result<()>
    {
        let layout = self.session.layout;
        let handle = self.mem.read_u32(zval + layout.zval.obj_handle)?;
        let handlers = self.mem.read_pointer(zval + layout.zval.obj_handlers)?;
        let object = self.session.object_address_of(self.mem, zval)?;
        let capabilities = ObjectCapabilities::detect(self.mem, self.session, handlers)?;
        debug!(handle, %object, ?capabilities, "decoding object");

        let class_entry = if capabilities.default_class_resolution {
            Some(self.mem.read_pointer(object + layout.object.ce)?)
        } else {
            warn!(handle, %handlers, "object has a custom get_class_entry handler");
            None
        };
        let class_name = match class_entry {
            Some(ce) => self.class_name(ce)?,
            None => UNKNOWN_CLASS.to_string(),
        };
        self.out.write(&format!("{class_name}#{handle}"));

        if !capabilities.default_property_resolution {
            warn!(handle, %handlers, "object has a custom get_properties handler");
            self.out.end_line();
            return Ok(());
        }
        self.print_nested(object, |printer| printer.print_properties(object, class_entry))
    }

    fn print_properties(&mut self, object: Address, class_entry: Option<Address>) -> Result<()>
    {
        let layout = self.session.layout;
        let properties = self.mem.read_pointer(object + layout.object.properties)?;
        if !properties.is_null() {
            self.out.write(" ");
            return self.print_table_wrapped(properties, true);
        }

        match class_entry {
            Some(ce) => {
                let properties_table = self.mem.read_pointer(object + layout.object.properties_table)?;
                self.out.write(" ");
                let mut visitor = DeclaredProperties { properties_table };
                self.apply_table(ce + layout.class_entry.properties_info, &mut visitor)
            }
            None => {
                self.out.end_line();
                Ok(())
            }
        }
    }

    /// Name of the class entry at `ce`
    fn class_name(&self, ce: Address) -> Result<String>
    {
        let layout = self.session.layout.class_entry;
        let name = self.mem.read_pointer(ce + layout.name)?;
        let len = self.mem.read_u32(ce + layout.name_length)?;
        let bytes = self.mem.read_memory(name, len as usize)?;
        Ok(String::from_utf8_lossy(&bytes).trim_matches('"').to_string())
    }
}
