//! Typed values produced by expression evaluation.

use std::fmt;

use super::Address;

/// Declared C type of an evaluated expression
///
/// Stored in a normalised spelling: one space between the base name and the
/// first `*`, no spaces between stars (`zval *`, `zval **`, `long`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName(String);

impl TypeName
{
    /// Build a type from its base name and pointer depth
    ///
    /// ```rust
    /// use zvaldump_core::types::TypeName;
    ///
    /// assert_eq!(TypeName::new("zval", 1).as_str(), "zval *");
    /// assert_eq!(TypeName::new("long", 0).as_str(), "long");
    /// ```
    pub fn new(base: &str, pointer_depth: usize) -> Self
    {
        let base = base.split_whitespace().collect::<Vec<_>>().join(" ");
        if pointer_depth == 0 {
            TypeName(base)
        } else {
            TypeName(format!("{base} {}", "*".repeat(pointer_depth)))
        }
    }

    /// Plain `long`, the type of integer literals and of bare symbol reads
    pub fn long() -> Self
    {
        TypeName::new("long", 0)
    }

    /// `void *`, the type of `&symbol`
    pub fn void_pointer() -> Self
    {
        TypeName::new("void", 1)
    }

    pub fn as_str(&self) -> &str
    {
        &self.0
    }

    /// Base name without any pointer stars
    pub fn base(&self) -> &str
    {
        self.0.trim_end_matches('*').trim_end()
    }

    /// Number of pointer levels
    pub fn pointer_depth(&self) -> usize
    {
        self.0.len() - self.0.trim_end_matches('*').len()
    }

    pub fn is_pointer(&self) -> bool
    {
        self.pointer_depth() > 0
    }

    /// The one type the renderer accepts at the top level
    pub fn is_zval_pointer(&self) -> bool
    {
        self.base() == "zval" && self.pointer_depth() == 1
    }

    /// Type obtained by dereferencing once, if this is a dereferenceable pointer
    pub fn pointee(&self) -> Option<TypeName>
    {
        let depth = self.pointer_depth();
        if depth == 0 || (depth == 1 && self.base() == "void") {
            return None;
        }
        Some(TypeName::new(self.base(), depth - 1))
    }
}

impl fmt::Display for TypeName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.0)
    }
}

/// Result of evaluating an expression: a machine word and its declared type
///
/// For pointer types `value` is the address pointed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle
{
    pub value: u64,
    pub ty: TypeName,
}

impl Handle
{
    pub fn new(value: u64, ty: TypeName) -> Self
    {
        Handle { value, ty }
    }

    /// The value read as an address
    pub fn address(&self) -> Address
    {
        Address::from(self.value)
    }

    /// Same value, different declared type
    pub fn cast(self, ty: TypeName) -> Self
    {
        Handle { ty, ..self }
    }
}
