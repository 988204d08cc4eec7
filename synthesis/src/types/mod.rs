//! Type Model
//!
//! A closed sum type over the type variants of the program under test, with
//! the structural rules the search needs to decide whether a value of one
//! type can stand in for another:
//!
//! - `can_be_same_as`: variant-compatible and, recursively, generics, array
//!   length and mutability match. A generic parameter on the receiving side
//!   accepts any type satisfying its bounds, so the relation is not
//!   symmetric for generic-bearing types.
//! - `can_be_indirectly_same_as`: the same, or reachable by unwrapping one
//!   level of a container or reference.
//! - `wraps`: the inner type found by repeatedly unwrapping containers and
//!   references; used to find wrapping generators.
//! - `bind_generics`: substitutes generic parameters into a fresh value.
//!
//! Types are plain owned values. Binding never mutates a template and two
//! bindings of the same template share nothing.

mod binding;
mod table;
pub mod traits;

pub use binding::TypeBinding;
pub use table::TypeTable;
pub use traits::Trait;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Result type alias for structural type operations
pub type TypeResult<T> = Result<T, TypeError>;

/// Structural operations that are not defined for a variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("{op} is not defined for {kind} type `{ty}`")]
    Unsupported {
        op: &'static str,
        kind: &'static str,
        ty: String,
    },

    #[error("generic arity mismatch for `{ty}`: expected {expected}, got {actual}")]
    ArityMismatch {
        ty: String,
        expected: usize,
        actual: usize,
    },
}

/// Primitive scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prim {
    Bool,
    Char,
    Str,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
}

impl Prim {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Str => "str",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    pub fn is_signed_int(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::I128 | Self::Isize
        )
    }

    pub fn is_unsigned_int(&self) -> bool {
        matches!(
            self,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::U128 | Self::Usize
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// A nominal type (struct or enum) with its generic arguments and the
/// trait bounds it is known to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Adt {
    /// Fully qualified path, e.g. `std::vec::Vec`
    pub name: String,
    #[serde(default)]
    pub generics: Vec<Ty>,
    #[serde(default)]
    pub traits: BTreeSet<Trait>,
}

impl Adt {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            traits: BTreeSet::new(),
        }
    }

    pub fn with_generics(mut self, generics: Vec<Ty>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_traits(mut self, traits: BTreeSet<Trait>) -> Self {
        self.traits = traits;
        self
    }

    fn bind(&self, binding: &TypeBinding) -> Self {
        Self {
            name: self.name.clone(),
            generics: self
                .generics
                .iter()
                .map(|g| g.bind_generics(binding))
                .collect(),
            traits: self.traits.clone(),
        }
    }

    fn without_traits(&self) -> Self {
        Self {
            name: self.name.clone(),
            generics: self.generics.iter().map(Ty::structural_key).collect(),
            traits: BTreeSet::new(),
        }
    }

    fn compatible(&self, other: &Adt) -> bool {
        self.name == other.name && all_compatible(&self.generics, &other.generics)
    }
}

/// A generic type parameter and its declared bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    #[serde(default)]
    pub bounds: BTreeSet<Trait>,
}

impl GenericParam {
    /// Whether `other` may be substituted for this parameter.
    pub fn admits(&self, other: &Ty) -> bool {
        let required = self.bounds.iter().filter(|b| !b.is_sized());
        match other {
            Ty::Generic(param) => required.into_iter().all(|b| param.bounds.contains(b)),
            _ => {
                let provided = other.implemented_traits();
                required.into_iter().all(|b| provided.contains(b))
            }
        }
    }
}

/// A `dyn Trait` object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraitObj {
    /// Principal trait path
    pub name: String,
    /// Principal trait plus auto/extra bounds
    #[serde(default)]
    pub bounds: BTreeSet<Trait>,
}

/// A function pointer / closure signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FnSig {
    #[serde(default)]
    pub params: Vec<Ty>,
    #[serde(default)]
    pub ret: Option<Box<Ty>>,
}

/// A type of the program under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ty {
    Prim(Prim),
    Struct(Adt),
    Enum(Adt),
    /// The empty tuple is the unit type
    Tuple(Vec<Ty>),
    Array { elem: Box<Ty>, len: usize },
    Slice(Box<Ty>),
    Ref { inner: Box<Ty>, mutable: bool },
    Generic(GenericParam),
    TraitObj(TraitObj),
    Fn(FnSig),
}

impl Ty {
    pub fn prim(prim: Prim) -> Self {
        Self::Prim(prim)
    }

    pub fn unit() -> Self {
        Self::Tuple(Vec::new())
    }

    pub fn structure(name: impl Into<String>, generics: Vec<Ty>) -> Self {
        Self::Struct(Adt::new(name).with_generics(generics))
    }

    pub fn enumeration(name: impl Into<String>, generics: Vec<Ty>) -> Self {
        Self::Enum(Adt::new(name).with_generics(generics))
    }

    pub fn reference(inner: Ty, mutable: bool) -> Self {
        Self::Ref {
            inner: Box::new(inner),
            mutable,
        }
    }

    pub fn array(elem: Ty, len: usize) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len,
        }
    }

    pub fn slice(elem: Ty) -> Self {
        Self::Slice(Box::new(elem))
    }

    pub fn generic(name: impl Into<String>, bounds: &[&str]) -> Self {
        Self::Generic(GenericParam {
            name: name.into(),
            bounds: traits::trait_set(bounds),
        })
    }

    pub fn trait_obj(name: impl Into<String>) -> Self {
        let name = name.into();
        let bounds = [Trait::new(name.clone())].into_iter().collect();
        Self::TraitObj(TraitObj { name, bounds })
    }

    /// Short variant label, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prim(_) => "primitive",
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::Tuple(_) => "tuple",
            Self::Array { .. } => "array",
            Self::Slice(_) => "slice",
            Self::Ref { .. } => "reference",
            Self::Generic(_) => "generic",
            Self::TraitObj(_) => "trait object",
            Self::Fn(_) => "function",
        }
    }

    /// Path-like name of nominal variants. Containers, references and
    /// signatures have no name of their own.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Prim(prim) => Some(prim.name()),
            Self::Struct(adt) | Self::Enum(adt) => Some(&adt.name),
            Self::Generic(param) => Some(&param.name),
            Self::TraitObj(obj) => Some(&obj.name),
            Self::Tuple(_) | Self::Array { .. } | Self::Slice(_) | Self::Ref { .. } | Self::Fn(_) => {
                None
            }
        }
    }

    /// Generic arguments. Arrays, slices and references report those of
    /// their element; a tuple reports its elements.
    pub fn generics(&self) -> &[Ty] {
        match self {
            Self::Struct(adt) | Self::Enum(adt) => &adt.generics,
            Self::Tuple(elems) => elems,
            Self::Array { elem, .. } | Self::Slice(elem) => elem.generics(),
            Self::Ref { inner, .. } => inner.generics(),
            Self::Prim(_) | Self::Generic(_) | Self::TraitObj(_) | Self::Fn(_) => &[],
        }
    }

    /// Replace the generic arguments of a nominal type.
    pub fn with_generics(&self, generics: Vec<Ty>) -> TypeResult<Ty> {
        match self {
            Self::Struct(adt) | Self::Enum(adt) => {
                if adt.generics.len() != generics.len() {
                    return Err(TypeError::ArityMismatch {
                        ty: self.to_string(),
                        expected: adt.generics.len(),
                        actual: generics.len(),
                    });
                }
                let adt = Adt {
                    generics,
                    ..adt.clone()
                };
                Ok(match self {
                    Self::Struct(_) => Self::Struct(adt),
                    _ => Self::Enum(adt),
                })
            }
            _ => Err(TypeError::Unsupported {
                op: "with_generics",
                kind: self.kind(),
                ty: self.to_string(),
            }),
        }
    }

    /// Direct structural children: generic arguments of nominal types,
    /// tuple elements, array/slice element, reference target.
    pub fn children(&self) -> &[Ty] {
        match self {
            Self::Struct(adt) | Self::Enum(adt) => &adt.generics,
            Self::Tuple(elems) => elems,
            Self::Array { elem, .. } | Self::Slice(elem) => std::slice::from_ref(elem.as_ref()),
            Self::Ref { inner, .. } => std::slice::from_ref(inner.as_ref()),
            Self::Prim(_) | Self::Generic(_) | Self::TraitObj(_) | Self::Fn(_) => &[],
        }
    }

    pub fn is_prim(&self) -> bool {
        matches!(self, Self::Prim(_))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref { .. })
    }

    pub fn is_mut_ref(&self) -> bool {
        matches!(self, Self::Ref { mutable: true, .. })
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Tuple(elems) if elems.is_empty())
    }

    /// Whether this type is itself a generic parameter.
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Generic(_))
    }

    /// Whether a generic parameter occurs anywhere inside this type.
    pub fn has_generic_params(&self) -> bool {
        match self {
            Self::Generic(_) => true,
            Self::Fn(sig) => {
                sig.params.iter().any(Ty::has_generic_params)
                    || sig.ret.as_deref().is_some_and(Ty::has_generic_params)
            }
            _ => self.children().iter().any(Ty::has_generic_params),
        }
    }

    /// Target of a reference type.
    pub fn referent(&self) -> Option<&Ty> {
        match self {
            Self::Ref { inner, .. } => Some(inner),
            _ => None,
        }
    }

    /// Trait bounds this type is known to satisfy.
    ///
    /// Arrays, slices, tuples and signatures report nothing without further
    /// analysis; they remain constructible through their element generators.
    pub fn implemented_traits(&self) -> BTreeSet<Trait> {
        match self {
            Self::Prim(prim) => traits::prim_traits(*prim),
            Self::Struct(adt) | Self::Enum(adt) => adt.traits.clone(),
            Self::Generic(param) => param.bounds.clone(),
            Self::TraitObj(obj) => obj.bounds.clone(),
            Self::Ref { inner, mutable } => {
                let mut set = inner.implemented_traits();
                if *mutable {
                    set.remove(&Trait::new(traits::COPY));
                    set.remove(&Trait::new(traits::CLONE));
                } else {
                    set.insert(Trait::new(traits::COPY));
                    set.insert(Trait::new(traits::CLONE));
                }
                set.insert(Trait::new(traits::SIZED));
                set
            }
            Self::Tuple(_) | Self::Array { .. } | Self::Slice(_) | Self::Fn(_) => BTreeSet::new(),
        }
    }

    pub fn implements(&self, bound: &str) -> bool {
        self.implemented_traits().contains(&Trait::new(bound))
    }

    /// Values of this type are copied rather than moved.
    pub fn is_copy(&self) -> bool {
        self.implements(traits::COPY)
    }

    /// Whether a value of type `other` can be used where `self` is expected.
    pub fn can_be_same_as(&self, other: &Ty) -> bool {
        match (self, other) {
            (Self::Generic(param), _) => param.admits(other),
            (Self::Prim(a), Self::Prim(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) | (Self::Enum(a), Self::Enum(b)) => a.compatible(b),
            (Self::Tuple(a), Self::Tuple(b)) => all_compatible(a, b),
            (
                Self::Array { elem: a, len: la },
                Self::Array { elem: b, len: lb },
            ) => la == lb && a.can_be_same_as(b),
            (Self::Slice(a), Self::Slice(b)) => a.can_be_same_as(b),
            (
                Self::Ref {
                    inner: a,
                    mutable: ma,
                },
                Self::Ref {
                    inner: b,
                    mutable: mb,
                },
            ) => ma == mb && a.can_be_same_as(b),
            (Self::TraitObj(a), Self::TraitObj(b)) => {
                a.name == b.name && a.bounds.iter().all(|bound| b.bounds.contains(bound))
            }
            (Self::Fn(a), Self::Fn(b)) => {
                all_compatible(&a.params, &b.params)
                    && match (&a.ret, &b.ret) {
                        (Some(ra), Some(rb)) => ra.can_be_same_as(rb),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    /// Whether `other` is this type or sits one container/reference level
    /// inside it. Bare generic parameters inside a container do not count.
    pub fn can_be_indirectly_same_as(&self, other: &Ty) -> bool {
        self.can_be_same_as(other)
            || self
                .children()
                .iter()
                .any(|child| !child.is_generic() && child.can_be_same_as(other))
    }

    /// The inner type matching `ty`, reached by repeatedly unwrapping
    /// containers and references. `None` when `ty` is not wrapped by this
    /// type; a type does not wrap itself.
    pub fn wraps(&self, ty: &Ty) -> Option<&Ty> {
        self.children().iter().find_map(|child| {
            if child.is_generic() {
                None
            } else if child.can_be_same_as(ty) {
                Some(child)
            } else {
                child.wraps(ty)
            }
        })
    }

    /// A fresh type with every generic parameter replaced per `binding`.
    /// Parameters missing from the binding are left in place.
    pub fn bind_generics(&self, binding: &TypeBinding) -> Ty {
        match self {
            Self::Generic(param) => binding
                .get(&param.name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Self::Prim(_) | Self::TraitObj(_) => self.clone(),
            Self::Struct(adt) => Self::Struct(adt.bind(binding)),
            Self::Enum(adt) => Self::Enum(adt.bind(binding)),
            Self::Tuple(elems) => {
                Self::Tuple(elems.iter().map(|e| e.bind_generics(binding)).collect())
            }
            Self::Array { elem, len } => Self::Array {
                elem: Box::new(elem.bind_generics(binding)),
                len: *len,
            },
            Self::Slice(elem) => Self::Slice(Box::new(elem.bind_generics(binding))),
            Self::Ref { inner, mutable } => Self::Ref {
                inner: Box::new(inner.bind_generics(binding)),
                mutable: *mutable,
            },
            Self::Fn(sig) => Self::Fn(FnSig {
                params: sig.params.iter().map(|p| p.bind_generics(binding)).collect(),
                ret: sig
                    .ret
                    .as_ref()
                    .map(|r| Box::new(r.bind_generics(binding))),
            }),
        }
    }

    /// Identity of the type: variant, name and generics, with the known
    /// trait sets of structs and enums cleared at every level.
    pub fn structural_key(&self) -> Ty {
        match self {
            Self::Prim(_) | Self::Generic(_) | Self::TraitObj(_) => self.clone(),
            Self::Struct(adt) => Self::Struct(adt.without_traits()),
            Self::Enum(adt) => Self::Enum(adt.without_traits()),
            Self::Tuple(elems) => Self::Tuple(elems.iter().map(Ty::structural_key).collect()),
            Self::Array { elem, len } => Self::Array {
                elem: Box::new(elem.structural_key()),
                len: *len,
            },
            Self::Slice(elem) => Self::Slice(Box::new(elem.structural_key())),
            Self::Ref { inner, mutable } => Self::Ref {
                inner: Box::new(inner.structural_key()),
                mutable: *mutable,
            },
            Self::Fn(sig) => Self::Fn(FnSig {
                params: sig.params.iter().map(Ty::structural_key).collect(),
                ret: sig.ret.as_ref().map(|r| Box::new(r.structural_key())),
            }),
        }
    }

    /// Same type up to the trait facts recorded on it.
    pub fn is_structurally_same(&self, other: &Ty) -> bool {
        self.structural_key() == other.structural_key()
    }

    /// Identifier-safe stem for variables holding this type.
    pub fn var_prefix(&self) -> String {
        match self {
            Self::Prim(prim) => prim.name().to_string(),
            Self::Struct(adt) | Self::Enum(adt) => snake_case(last_segment(&adt.name)),
            Self::Tuple(elems) if elems.is_empty() => "unit".to_string(),
            Self::Tuple(_) => "tuple".to_string(),
            Self::Array { elem, .. } => format!("{}_array", elem.var_prefix()),
            Self::Slice(elem) => format!("{}_slice", elem.var_prefix()),
            Self::Ref { inner, .. } => format!("{}_ref", inner.var_prefix()),
            Self::Generic(param) => snake_case(&param.name),
            Self::TraitObj(obj) => format!("dyn_{}", snake_case(last_segment(&obj.name))),
            Self::Fn(_) => "closure".to_string(),
        }
    }
}

fn all_compatible(a: &[Ty], b: &[Ty]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.can_be_same_as(y))
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if ch.is_alphanumeric() {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ty]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Renders Rust surface syntax.
impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prim(prim) => f.write_str(prim.name()),
            Self::Struct(adt) | Self::Enum(adt) => {
                f.write_str(&adt.name)?;
                if !adt.generics.is_empty() {
                    write!(f, "<")?;
                    write_list(f, &adt.generics)?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Self::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems)?;
                if elems.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Array { elem, len } => write!(f, "[{elem}; {len}]"),
            Self::Slice(elem) => write!(f, "[{elem}]"),
            Self::Ref { inner, mutable } => {
                if *mutable {
                    write!(f, "&mut {inner}")
                } else {
                    write!(f, "&{inner}")
                }
            }
            Self::Generic(param) => f.write_str(&param.name),
            Self::TraitObj(obj) => write!(f, "dyn {}", obj.name),
            Self::Fn(sig) => {
                write!(f, "fn(")?;
                write_list(f, &sig.params)?;
                write!(f, ")")?;
                if let Some(ret) = &sig.ret {
                    write!(f, " -> {ret}")?;
                }
                Ok(())
            }
        }
    }
}
