//! Built-in callables and seed types available to every analysis session,
//! independent of what the crate under test declares.

use crate::callable::{Callable, CallableKind, Param};
use crate::types::traits::{
    trait_set, CLONE, DEBUG, DEFAULT, DISPLAY, EQ, HASH, HASHER, ORD, PARTIAL_EQ, PARTIAL_ORD,
    RNG_CORE, SIZED,
};
use crate::types::{Adt, Prim, Ty};

pub const OPTION: &str = "std::option::Option";
pub const VEC: &str = "std::vec::Vec";
pub const STRING: &str = "std::string::String";
pub const STEP_RNG: &str = "rand::rngs::mock::StepRng";
pub const DEFAULT_HASHER: &str = "std::collections::hash_map::DefaultHasher";

pub fn option_of(elem: Ty) -> Ty {
    Ty::Enum(
        Adt::new(OPTION)
            .with_generics(vec![elem])
            .with_traits(trait_set(&[SIZED, CLONE, DEBUG, DEFAULT, PARTIAL_EQ])),
    )
}

pub fn vec_of(elem: Ty) -> Ty {
    Ty::Struct(
        Adt::new(VEC)
            .with_generics(vec![elem])
            .with_traits(trait_set(&[SIZED, CLONE, DEBUG, DEFAULT, PARTIAL_EQ])),
    )
}

pub fn string() -> Ty {
    Ty::Struct(Adt::new(STRING).with_traits(trait_set(&[
        SIZED,
        CLONE,
        DEBUG,
        DISPLAY,
        DEFAULT,
        PARTIAL_EQ,
        EQ,
        PARTIAL_ORD,
        ORD,
        HASH,
    ])))
}

/// Deterministic mock random-number generator.
pub fn step_rng() -> Ty {
    Ty::Struct(Adt::new(STEP_RNG).with_traits(trait_set(&[
        SIZED, CLONE, DEBUG, PARTIAL_EQ, EQ, RNG_CORE,
    ])))
}

pub fn default_hasher() -> Ty {
    Ty::Struct(Adt::new(DEFAULT_HASHER).with_traits(trait_set(&[
        SIZED, CLONE, DEBUG, DEFAULT, HASHER,
    ])))
}

/// Types every session's type table starts with.
pub fn seed_types() -> Vec<Ty> {
    vec![step_rng(), default_hasher()]
}

/// `Option::None`, `Option::Some(T)`, `StepRng::new(u64, u64)` and
/// `String::from(&str)`.
pub fn base_callables() -> Vec<Callable> {
    let t = Ty::generic("T", &[]);
    let option_t = option_of(t.clone());

    let none = Callable::new(
        "None",
        CallableKind::EnumInit {
            variant: "None".to_string(),
        },
    )
    .with_parent(option_t.clone())
    .with_generics(vec![t.clone()])
    .returning(option_t.clone());

    let some = Callable::new(
        "Some",
        CallableKind::EnumInit {
            variant: "Some".to_string(),
        },
    )
    .with_parent(option_t.clone())
    .with_generics(vec![t.clone()])
    .with_param(Param::new(t))
    .returning(option_t);

    let step_rng_new = Callable::static_method("new", step_rng())
        .with_params([
            Param::named("initial", Ty::prim(Prim::U64)),
            Param::named("increment", Ty::prim(Prim::U64)),
        ])
        .returning(step_rng());

    let string_from = Callable::static_method("from", string())
        .with_param(Param::named("s", Ty::reference(Ty::prim(Prim::Str), false)))
        .returning(string());

    vec![none, some, step_rng_new, string_from]
}
