//! Per-tag decoding of a single zval.

use tracing::{debug, warn};

use super::ZvalPrinter;
use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::types::Address;
use crate::zval::ZvalType;

impl<M> ZvalPrinter<'_, M>
where
    M: MemoryAccessor + ?Sized,
{
    /// Print the zval at `zval`, finishing the current line
    ///
    /// Always starts with `[address]`. Errors are reported inline after
    /// whatever was already printed for this value.
    pub fn print_zval_contents(&mut self, zval: Address)
    {
        self.out.write(&format!("[{zval}]"));
        if let Err(err) = self.decode_zval(zval) {
            warn!(%zval, error = %err, "zval render aborted");
            self.out.error(&err);
        }
    }

    fn decode_zval(&mut self, zval: Address) -> Result<()>
    {
        let layout = self.session.layout.zval;
        let tag = self.mem.read_u8(zval + layout.type_tag)?;
        let ty = match ZvalType::try_from(tag) {
            Ok(ty) => ty,
            Err(err) => {
                warn!(%zval, tag, "unknown zval type");
                self.out.line(&format!("[{err}]"));
                return Ok(());
            }
        };
        self.out.write(&ty.to_string());
        debug!(%zval, ty = ty.name(), "decoding zval");

        let value = zval + layout.value;
        match ty {
            // Constants are only resolved at compile time; nothing to show.
            ZvalType::Null | ZvalType::Constant | ZvalType::ConstantArray => self.out.end_line(),
            ZvalType::Long | ZvalType::Resource => {
                let lval = self.mem.read_i64(value)?;
                self.out.line(&format!(" {lval}"));
            }
            ZvalType::Double => {
                let dval = self.mem.read_f64(value)?;
                self.out.line(&format!(" {dval:?}"));
            }
            ZvalType::Bool => {
                let truth = if self.mem.read_i64(value)? == 0 { "FALSE" } else { "TRUE" };
                self.out.line(&format!(" {truth}"));
            }
            ZvalType::Array => {
                let table = self.mem.read_pointer(value)?;
                self.print_nested(table, |printer| {
                    printer.out.write(" ");
                    printer.print_table_wrapped(table, true)
                })?;
            }
            ZvalType::Object => {
                self.out.write(" ");
                self.print_object(zval)?;
            }
            ZvalType::String => {
                let buffer = self.mem.read_pointer(value)?;
                let len = self.mem.read_i32(zval + layout.str_len)?;
                let len = u64::try_from(len)
                    .map_err(|_| InspectError::InvalidArgument(format!("negative string length {len}")))?;
                self.out.write(" ");
                self.print_string(buffer, len)?;
                self.out.end_line();
            }
        }
        Ok(())
    }
}
