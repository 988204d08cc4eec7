//! Trait bounds and the built-in trait sets of primitive types.

use super::Prim;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const SIZED: &str = "std::marker::Sized";
pub const COPY: &str = "std::marker::Copy";
pub const CLONE: &str = "std::clone::Clone";
pub const DEBUG: &str = "std::fmt::Debug";
pub const DISPLAY: &str = "std::fmt::Display";
pub const DEFAULT: &str = "std::default::Default";
pub const PARTIAL_EQ: &str = "std::cmp::PartialEq";
pub const EQ: &str = "std::cmp::Eq";
pub const PARTIAL_ORD: &str = "std::cmp::PartialOrd";
pub const ORD: &str = "std::cmp::Ord";
pub const HASH: &str = "std::hash::Hash";
pub const HASHER: &str = "std::hash::Hasher";
pub const RNG_CORE: &str = "rand_core::RngCore";

/// A trait bound, identified by its fully qualified path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trait {
    name: String,
}

impl Trait {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every type the search handles is sized, so this bound never filters.
    pub fn is_sized(&self) -> bool {
        self.name == SIZED
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Trait {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Build a trait set from paths.
pub fn trait_set(names: &[&str]) -> BTreeSet<Trait> {
    names.iter().copied().map(Trait::new).collect()
}

/// Traits the standard library implements for a primitive.
pub(crate) fn prim_traits(prim: Prim) -> BTreeSet<Trait> {
    match prim {
        Prim::Str => trait_set(&[DEBUG, DISPLAY, PARTIAL_EQ, EQ, PARTIAL_ORD, ORD, HASH]),
        Prim::F32 | Prim::F64 => {
            trait_set(&[SIZED, COPY, CLONE, DEBUG, DISPLAY, DEFAULT, PARTIAL_EQ, PARTIAL_ORD])
        }
        _ => trait_set(&[
            SIZED,
            COPY,
            CLONE,
            DEBUG,
            DISPLAY,
            DEFAULT,
            PARTIAL_EQ,
            EQ,
            PARTIAL_ORD,
            ORD,
            HASH,
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_copy_and_hash() {
        let traits = prim_traits(Prim::U32);
        assert!(traits.contains(&Trait::new(COPY)));
        assert!(traits.contains(&Trait::new(HASH)));
    }

    #[test]
    fn test_floats_are_not_eq() {
        let traits = prim_traits(Prim::F64);
        assert!(!traits.contains(&Trait::new(EQ)));
        assert!(traits.contains(&Trait::new(PARTIAL_ORD)));
    }

    #[test]
    fn test_str_is_unsized_and_not_copy() {
        let traits = prim_traits(Prim::Str);
        assert!(!traits.contains(&Trait::new(SIZED)));
        assert!(!traits.contains(&Trait::new(COPY)));
    }

    #[test]
    fn test_trait_serializes_as_plain_path() {
        let json = serde_json::to_string(&Trait::new(DEBUG)).unwrap();
        assert_eq!(json, "\"std::fmt::Debug\"");
    }
}
