//! # Types
//!
//! Plain data types shared by the renderer, the expression evaluator and the
//! platform layer.

pub mod address;
pub mod handle;
pub mod process;

// Re-export all public types
pub use address::Address;
pub use handle::{Handle, TypeName};
pub use process::{MemoryRegion, ProcessId};
