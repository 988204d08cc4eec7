use super::{Trait, Ty};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Deduplicated set of nominal types discovered during one analysis session.
/// Entries are keyed by [`Ty::structural_key`]; trait facts reported for the
/// same type from different sightings are merged.
///
/// Owned by the session's [`TypeContext`](crate::registry::TypeContext) and
/// only written while the context is being built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTable {
    types: BTreeMap<Ty, Ty>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with the built-in seed types.
    pub fn seeded() -> Self {
        let mut table = Self::new();
        for ty in crate::builtins::seed_types() {
            table.discover(&ty);
        }
        table
    }

    /// Decompose `ty` and intern every struct, enum, trait object and
    /// function type found in it. Primitives and bare generic parameters
    /// are not interned; references, tuples, arrays and slices are looked
    /// through.
    pub fn discover(&mut self, ty: &Ty) {
        match ty {
            Ty::Prim(_) | Ty::Generic(_) => {}
            Ty::Ref { inner, .. } => self.discover(inner),
            Ty::Tuple(elems) => elems.iter().for_each(|e| self.discover(e)),
            Ty::Array { elem, .. } | Ty::Slice(elem) => self.discover(elem),
            Ty::Struct(_) | Ty::Enum(_) | Ty::TraitObj(_) | Ty::Fn(_) => {
                match self.types.entry(ty.structural_key()) {
                    Entry::Vacant(slot) => {
                        tracing::trace!(ty = %ty, "discovered type");
                        slot.insert(ty.clone());
                    }
                    Entry::Occupied(mut slot) => merge_traits(slot.get_mut(), ty),
                }
            }
        }
    }

    pub fn contains(&self, ty: &Ty) -> bool {
        self.types.contains_key(&ty.structural_key())
    }

    /// The interned entry for `ty`, carrying every trait seen for it.
    pub fn get(&self, ty: &Ty) -> Option<&Ty> {
        self.types.get(&ty.structural_key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ty> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types whose implemented traits include every bound. The sizedness
    /// bound is ignored.
    pub fn implementing(&self, bounds: &[Trait]) -> Vec<&Ty> {
        let required: Vec<&Trait> = bounds.iter().filter(|b| !b.is_sized()).collect();
        self.types
            .values()
            .filter(|ty| {
                let provided = ty.implemented_traits();
                required.iter().all(|b| provided.contains(*b))
            })
            .collect()
    }
}

fn merge_traits(interned: &mut Ty, seen: &Ty) {
    if let (Ty::Struct(kept) | Ty::Enum(kept), Ty::Struct(new) | Ty::Enum(new)) = (interned, seen) {
        kept.traits.extend(new.traits.iter().cloned());
    }
}
