//! # zvaldump-core
//!
//! Reads PHP values (`zval`s) out of a live PHP 5.5 process and renders them
//! as indented text, without running any code inside the target.
//!
//! The crate is split along the path a value takes:
//! - [`accessor`]: the [`MemoryAccessor`] seam, raw reads and symbol lookup
//! - [`expr`]: typed pointer expressions such as `(zval *)0x7f3a1c0`
//! - [`session`]: per-process globals resolved once (uninitialized sentinel,
//!   standard object handlers, object store)
//! - [`render`]: the zval, hash table, string and object renderers
//! - [`layout`]: byte offsets of the engine structures
//!
//! ## Platform Support
//!
//! - **Linux**: [`platform::linux::LinuxProcess`] reads with
//!   `process_vm_readv` and resolves symbols from the mapped ELF files
//! - **Others**: no live-process accessor; the renderer works against any
//!   [`MemoryAccessor`], e.g. a core-dump reader
//!
//! ## Why unsafe code is needed
//!
//! Reading another process's memory and signalling it go through raw libc
//! calls. Those calls are wrapped in the `platform` module; the renderer
//! itself is safe code.

#![allow(unsafe_code)] // Required for process_vm_readv and kill

pub mod accessor;
pub mod error;
pub mod expr;
pub mod layout;
pub mod platform;
pub mod render;
pub mod session;
pub mod types;
pub mod zval;

pub use accessor::MemoryAccessor;
pub use error::{InspectError, Result};
pub use layout::ZendLayout;
pub use render::{RenderOptions, ZvalPrinter};
pub use session::Session;
pub use types::{Address, Handle, ProcessId, TypeName};
pub use zval::ZvalType;
