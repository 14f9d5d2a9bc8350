//! Deterministic hash-based handles for bound entities.
//!
//! [`TypeHash`] is the opaque handle the host uses to refer to a registered
//! primitive, type, class or method. Handles are computed from names and
//! signatures, so the same binding set produces the same handles in every
//! run and a host may cache them for the lifetime of the process.
//!
//! # Hash Computation
//!
//! Uses XXHash64 with domain-specific mixing constants so that a type and a
//! function sharing a name never share a handle.
//!
//! # Examples
//!
//! ```
//! use wirebind_core::TypeHash;
//!
//! let a = TypeHash::from_name("Point");
//! assert_eq!(a, TypeHash::from_name("Point"));
//!
//! let ctor1 = TypeHash::from_constructor(a, &[TypeHash::from_name("int32_t")]);
//! let ctor2 = TypeHash::from_constructor(a, &[TypeHash::from_name("float64_t")]);
//! assert_ne!(ctor1, ctor2);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant used when folding parameter lists.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for free function hashes
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for method hashes
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for destructor hashes
    pub const DESTRUCTOR: u64 = 0x3e9f5d2a8c7b1403;

    /// Parameter position mixing constants, so `(a, b)` and `(b, a)` differ.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A stable 64-bit handle identifying a bound type, class, or method.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid handle. Never assigned to a registered entity.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type handle from a type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a free-function handle from its name and parameter types.
    #[inline]
    pub fn from_function(name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        TypeHash(fold_params(seed, param_hashes))
    }

    /// Create a method handle from the owner type, method name and parameter types.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(fold_params(seed, param_hashes))
    }

    /// Create a constructor handle. Constructors are identified by owner + params.
    #[inline]
    pub fn from_constructor(owner: TypeHash, param_hashes: &[TypeHash]) -> Self {
        TypeHash(fold_params(hash_constants::CONSTRUCTOR ^ owner.0, param_hashes))
    }

    /// Create the destructor handle of a class.
    #[inline]
    pub fn from_destructor(owner: TypeHash) -> Self {
        TypeHash(hash_constants::DESTRUCTOR ^ owner.0)
    }

    /// Check if this is the empty handle.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn fold_params(seed: u64, param_hashes: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in param_hashes.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps parameter order significant
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl From<TypeHash> for u64 {
    fn from(hash: TypeHash) -> Self {
        hash.0
    }
}

impl From<u64> for TypeHash {
    fn from(raw: u64) -> Self {
        TypeHash(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_deterministic() {
        assert_eq!(TypeHash::from_name("Point"), TypeHash::from_name("Point"));
        assert_ne!(TypeHash::from_name("Point"), TypeHash::from_name("Point *"));
    }

    #[test]
    fn parameter_order_matters() {
        let int = TypeHash::from_name("int32_t");
        let string = TypeHash::from_name("std::string");
        let owner = TypeHash::from_name("Point");
        assert_ne!(
            TypeHash::from_constructor(owner, &[int, string]),
            TypeHash::from_constructor(owner, &[string, int])
        );
    }

    #[test]
    fn domains_do_not_collide() {
        let owner = TypeHash::from_name("Point");
        let f = TypeHash::from_function("length", &[]);
        let m = TypeHash::from_method(owner, "length", &[]);
        assert_ne!(f, m);
        assert_ne!(TypeHash::from_constructor(owner, &[]), TypeHash::from_destructor(owner));
    }

    #[test]
    fn long_parameter_lists_still_hash() {
        let int = TypeHash::from_name("int32_t");
        let params = vec![int; 20];
        let a = TypeHash::from_function("many", &params);
        let b = TypeHash::from_function("many", &params[..19]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_handle() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("x").is_empty());
        assert_eq!(u64::from(TypeHash(7)), 7);
        assert_eq!(TypeHash::from(7u64).as_u64(), 7);
    }

    #[test]
    fn display_and_debug() {
        let h = TypeHash(0xff);
        assert_eq!(format!("{}", h), "0x00000000000000ff");
        assert!(format!("{:?}", h).starts_with("TypeHash("));
    }
}
