//! Zval type tags.

use std::fmt;

use crate::error::InspectError;

/// The `type` byte of a zval
///
/// Discriminants match the engine's `IS_*` constants. Tags 8 and 9 are
/// compile-time constants that never hold a decodable payload at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ZvalType
{
    Null = 0,
    Long = 1,
    Double = 2,
    Bool = 3,
    Array = 4,
    Object = 5,
    String = 6,
    Resource = 7,
    Constant = 8,
    ConstantArray = 9,
}

impl ZvalType
{
    /// Every tag, in discriminant order
    pub const ALL: [ZvalType; 10] = [
        ZvalType::Null,
        ZvalType::Long,
        ZvalType::Double,
        ZvalType::Bool,
        ZvalType::Array,
        ZvalType::Object,
        ZvalType::String,
        ZvalType::Resource,
        ZvalType::Constant,
        ZvalType::ConstantArray,
    ];

    /// Name shown in the `[tag@name]` header
    pub const fn name(self) -> &'static str
    {
        match self {
            ZvalType::Null => "NULL",
            ZvalType::Long => "long",
            ZvalType::Double => "double",
            ZvalType::Bool => "bool",
            ZvalType::Array => "array",
            ZvalType::Object => "object",
            ZvalType::String => "string",
            ZvalType::Resource => "resource",
            ZvalType::Constant => "constant",
            ZvalType::ConstantArray => "const_array",
        }
    }

    pub const fn tag(self) -> u8
    {
        self as u8
    }
}

impl TryFrom<u8> for ZvalType
{
    type Error = InspectError;

    fn try_from(tag: u8) -> Result<Self, Self::Error>
    {
        ZvalType::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or(InspectError::UnknownTag(tag))
    }
}

impl fmt::Display for ZvalType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[{}@{}]", self.tag(), self.name())
    }
}
