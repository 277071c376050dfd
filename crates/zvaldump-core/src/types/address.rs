//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed address in the inspected process
///
/// Every pointer the renderer follows (zvals, hash tables, buckets, class
/// entries) is carried as an `Address` so it cannot be confused with the
/// counts, lengths and offsets read next to it.
///
/// `Display` prints the bare lowercase hex form used in rendered output
/// (`0xaa`), without zero padding.
///
/// ## Example
///
/// ```rust
/// use zvaldump_core::types::Address;
///
/// let zval = Address::from(0x1000);
/// let type_tag = zval + 20; // field offset
/// assert_eq!(type_tag.value(), 0x1014);
/// assert_eq!(zval.to_string(), "0x1000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null pointer
    ///
    /// Terminates hash-table entry lists and marks absent property tables.
    pub const NULL: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// Usable in const contexts, unlike `Address::from`.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null pointer
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ## Example
    ///
    /// ```rust
    /// use zvaldump_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Address of element `index` in an array of `stride`-byte elements starting here
    ///
    /// Wraps on overflow like pointer arithmetic in the inspected process; the
    /// subsequent read fails instead.
    pub fn index(self, index: u64, stride: u64) -> Self
    {
        Address(self.0.wrapping_add(index.wrapping_mul(stride)))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
