//! # Zval Rendering
//!
//! Turns a zval in the inspected process into indented text.
//!
//! ```text
//! [0x7f0010][4@array] (2) {
//!  [4:name] => [0x7f0100][6@string] [5:Alice]
//!  0 => [0x7f0200][5@object] User#3 (1) {
//!   [2:id] => [0x7f0300][1@long] 42
//!  }
//! }
//! ```
//!
//! Every zval starts with its address and `[tag@name]`. Arrays and property
//! tables print their element count followed by one `key => value` line per
//! entry, indented one space per nesting level.
//!
//! ## Failure handling
//!
//! Reads can fail halfway through a render (a dangling pointer inside an
//! array, say). Whatever was printed stays printed: the failing value gets an
//! inline `<error>` marker, open braces are still closed, and siblings
//! rendered later are unaffected. Nothing here returns an error to the caller
//! except expression evaluation.
//!
//! ## Submodules
//!
//! - `value`: per-tag decoding of one zval
//! - `hashtable`: walking `HashTable` entry lists
//! - `object`: class and property resolution for objects
//! - `string`: escaping of raw byte strings

pub mod hashtable;
pub mod object;
pub mod string;
mod value;

use std::collections::HashSet;

use tracing::warn;

pub use self::hashtable::{EntryVisitor, HashEntries, HashEntry, HashKey};
pub use self::object::ObjectCapabilities;
pub use self::string::{escape_bytes, MAX_STRING_LEN};
use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::session::Session;
use crate::types::{Address, Handle};

/// Text printed for `EG(uninitialized_zval_ptr)`
pub const UNINITIALIZED: &str = "*uninitialized*";
/// Text printed when an array or object contains itself
pub const RECURSION: &str = "*RECURSION*";
/// Text printed when nesting exceeds [`RenderOptions::max_depth`]
pub const MAX_DEPTH: &str = "*MAX DEPTH*";

/// Default for [`RenderOptions::max_depth`]
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Tunables for one printer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions
{
    /// Deepest array/object nesting that is expanded
    pub max_depth: usize,
}

impl Default for RenderOptions
{
    fn default() -> Self
    {
        RenderOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Line-oriented text sink with an indentation level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output
{
    text: String,
    depth: usize,
    at_line_start: bool,
}

impl Default for Output
{
    fn default() -> Self
    {
        Output {
            text: String::new(),
            depth: 0,
            at_line_start: true,
        }
    }
}

impl Output
{
    pub fn write(&mut self, s: &str)
    {
        if !s.is_empty() {
            self.text.push_str(s);
            self.at_line_start = false;
        }
    }

    pub fn end_line(&mut self)
    {
        self.text.push('\n');
        self.at_line_start = true;
    }

    pub fn line(&mut self, s: &str)
    {
        self.write(s);
        self.end_line();
    }

    /// One space per nesting level
    pub fn indent(&mut self)
    {
        let spaces = " ".repeat(self.depth);
        self.write(&spaces);
    }

    pub fn push_indent(&mut self)
    {
        self.depth += 1;
    }

    pub fn pop_indent(&mut self)
    {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize
    {
        self.depth
    }

    pub fn at_line_start(&self) -> bool
    {
        self.at_line_start
    }

    /// Append an inline `<error>` marker and finish the line
    pub fn error(&mut self, err: &InspectError)
    {
        if !self.at_line_start && !self.text.ends_with(' ') {
            self.write(" ");
        }
        self.line(&format!("<{err}>"));
    }

    pub fn as_str(&self) -> &str
    {
        &self.text
    }

    pub fn into_string(self) -> String
    {
        self.text
    }
}

/// Renders zvals read through a [`MemoryAccessor`]
///
/// One printer may serve many [`print`](Self::print) calls; each starts from
/// an empty output at depth zero. A printer is not meant to be shared between
/// threads (it owns the output and indentation state).
///
/// ## Example
///
/// ```rust,no_run
/// use zvaldump_core::layout::ZendLayout;
/// use zvaldump_core::platform::linux::LinuxProcess;
/// use zvaldump_core::render::{RenderOptions, ZvalPrinter};
/// use zvaldump_core::session::Session;
/// use zvaldump_core::types::ProcessId;
///
/// let process = LinuxProcess::attach(ProcessId::from(4242), true)?;
/// let session = Session::resolve(&process, ZendLayout::default())?;
/// let mut printer = ZvalPrinter::new(&process, &session, RenderOptions::default());
/// print!("{}", printer.print_expression("(zval *)0x7f3a1c0")?);
/// # Ok::<(), zvaldump_core::error::InspectError>(())
/// ```
pub struct ZvalPrinter<'a, M: MemoryAccessor + ?Sized>
{
    pub(crate) mem: &'a M,
    pub(crate) session: &'a Session,
    options: RenderOptions,
    pub(crate) out: Output,
    nesting: usize,
    active: HashSet<Address>,
}

impl<'a, M> ZvalPrinter<'a, M>
where
    M: MemoryAccessor + ?Sized,
{
    pub fn new(mem: &'a M, session: &'a Session, options: RenderOptions) -> Self
    {
        ZvalPrinter {
            mem,
            session,
            options,
            out: Output::default(),
            nesting: 0,
            active: HashSet::new(),
        }
    }

    /// Render the value named by an evaluated expression
    ///
    /// The handle must be declared `zval *`; anything else prints
    /// `Invalid expression - must be zval *` and nothing more. The
    /// uninitialized sentinel prints `*uninitialized*` without reading the
    /// zval.
    pub fn print(&mut self, handle: &Handle) -> String
    {
        self.reset();

        if !handle.ty.is_zval_pointer() {
            let err = InspectError::InvalidExpression {
                declared: handle.ty.to_string(),
            };
            warn!(declared = %handle.ty, "refusing to print non-zval expression");
            self.out.line(&err.to_string());
        } else if handle.address() == self.session.uninitialized {
            self.out.line(UNINITIALIZED);
        } else {
            self.print_zval_contents(handle.address());
        }

        self.take_output()
    }

    /// Evaluate `expression` through the accessor, then [`print`](Self::print) it
    ///
    /// ## Errors
    ///
    /// Only evaluation errors; rendering itself never fails.
    pub fn print_expression(&mut self, expression: &str) -> Result<String>
    {
        let handle = self.mem.evaluate(expression)?;
        Ok(self.print(&handle))
    }

    /// Hand out what has been rendered so far and start over
    pub fn take_output(&mut self) -> String
    {
        let out = std::mem::take(&mut self.out);
        self.reset();
        out.into_string()
    }

    /// Text rendered so far
    pub fn output(&self) -> &str
    {
        self.out.as_str()
    }

    /// The output sink, for [`EntryVisitor`]s that render their own entries
    pub fn output_mut(&mut self) -> &mut Output
    {
        &mut self.out
    }

    pub fn session(&self) -> &Session
    {
        self.session
    }

    pub fn accessor(&self) -> &M
    {
        self.mem
    }

    fn reset(&mut self)
    {
        self.out = Output::default();
        self.nesting = 0;
        self.active.clear();
    }

    /// Run `body` one nesting level down, unless `record` is already being
    /// rendered further up or the depth limit is reached
    pub(crate) fn print_nested(&mut self, record: Address, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()>
    {
        if self.nesting >= self.options.max_depth {
            self.out.line(&format!(" {MAX_DEPTH}"));
            return Ok(());
        }
        if !self.active.insert(record) {
            self.out.line(&format!(" {RECURSION}"));
            return Ok(());
        }

        self.nesting += 1;
        let result = body(self);
        self.nesting -= 1;
        self.active.remove(&record);
        result
    }
}
