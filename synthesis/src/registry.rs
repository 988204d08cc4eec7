//! Callable Registry
//!
//! [`TypeContext`] indexes the callables discovered in the crate under test
//! together with the built-in set, and the types reachable from their
//! signatures. It is built once per analysis session and read-only after
//! construction. Generator and consumer queries prefer callables declared
//! in the crate under test over external ones whenever both exist.

use crate::builtins::{self, OPTION, VEC};
use crate::callable::Callable;
use crate::test_case::{TestCase, VarRef};
use crate::types::{Trait, Ty, TypeTable};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read callables from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid callables JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the discovered callable list written by the static analyzer.
pub fn load_callables(path: impl AsRef<Path>) -> Result<Vec<Callable>, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-session index of callables and discovered types.
#[derive(Debug, Clone)]
pub struct TypeContext {
    table: TypeTable,
    callables: Vec<Callable>,
}

impl TypeContext {
    /// Build the context from the analyzer's callables, starting from the
    /// seeded type table. `seed` fixes the order of the working list.
    pub fn new(discovered: Vec<Callable>, seed: u64) -> Self {
        Self::with_table(discovered, TypeTable::seeded(), seed)
    }

    pub fn with_table(discovered: Vec<Callable>, table: TypeTable, seed: u64) -> Self {
        let total = discovered.len();
        let useful = discovered.into_iter().filter(|c| !returns_bare_container(c));

        let mut seen = HashSet::new();
        let mut callables: Vec<Callable> = builtins::base_callables()
            .into_iter()
            .chain(useful)
            .filter(|c| seen.insert(c.clone()))
            .collect();
        callables.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut ctx = Self { table, callables };
        ctx.sweep();
        tracing::info!(
            discovered = total,
            callables = ctx.callables.len(),
            types = ctx.table.len(),
            "type context built"
        );
        ctx
    }

    fn sweep(&mut self) {
        for callable in &self.callables {
            if let Some(parent) = &callable.parent {
                self.table.discover(parent);
            }
            for param in &callable.params {
                self.table.discover(&param.ty);
            }
            if let Some(ret) = &callable.return_type {
                self.table.discover(ret);
            }
        }
    }

    pub fn types(&self) -> &TypeTable {
        &self.table
    }

    /// The deduplicated, shuffled working list.
    pub fn callables(&self) -> &[Callable] {
        &self.callables
    }

    /// Discovered types satisfying every bound; `Sized` is ignored.
    pub fn types_implementing(&self, bounds: &[Trait]) -> Vec<&Ty> {
        self.table.implementing(bounds)
    }

    /// Callables visible from `file_path` (public, or declared there). With
    /// `local_only`, built-ins and externals are dropped as well.
    pub fn visible_callables(&self, file_path: Option<&str>, local_only: bool) -> Vec<&Callable> {
        self.callables
            .iter()
            .filter(|c| visible(c, file_path))
            .filter(|c| !local_only || c.is_local())
            .collect()
    }

    /// Pair each variable with every method it can legally receive. A
    /// by-reference receiver needs the variable borrowable at the end of
    /// `test_case`, a by-value receiver needs it consumable there.
    pub fn methods_of<'a>(
        &'a self,
        test_case: &TestCase,
        variables: &[VarRef],
    ) -> Vec<(VarRef, &'a Callable)> {
        let end = test_case.len();
        self.callables
            .iter()
            .filter(|c| c.is_method())
            .flat_map(|method| {
                variables
                    .iter()
                    .filter(move |v| {
                        method
                            .parent
                            .as_ref()
                            .is_some_and(|parent| parent.can_be_same_as(v.ty()))
                    })
                    .filter(move |v| match method.self_param() {
                        Some(receiver) if receiver.is_by_reference() => {
                            test_case.is_borrowable_at(v, end)
                        }
                        _ => test_case.is_consumable_at(v, end),
                    })
                    .map(move |v| (v.clone(), method))
            })
            .collect()
    }

    /// Callables taking a `ty` argument. The first compatible parameter
    /// decides `only_borrowing`.
    pub fn callables_with_param(
        &self,
        ty: &Ty,
        file_path: Option<&str>,
        only_borrowing: bool,
        only_local: bool,
    ) -> Vec<&Callable> {
        let candidates = self
            .callables
            .iter()
            .filter(|c| {
                c.params
                    .iter()
                    .find(|p| p.ty.can_be_same_as(ty))
                    .is_some_and(|p| !only_borrowing || p.is_by_reference())
            })
            .filter(|c| !only_local || c.is_local())
            .filter(|c| visible(c, file_path))
            .collect();
        prefer_local(candidates)
    }

    /// Direct generators: the return type carries `ty`'s name and is not a
    /// bare generic parameter.
    pub fn generators_of(&self, ty: &Ty, file_path: Option<&str>) -> Vec<&Callable> {
        tracing::debug!(ty = %ty, "looking for generators");
        let name = ty.name();
        let candidates = self
            .callables
            .iter()
            .filter(|c| c.returns_value())
            .filter(|c| {
                c.return_type.as_ref().is_some_and(|ret| {
                    !ret.is_generic() && ret.name().is_some() && ret.name() == name
                })
            })
            .filter(|c| visible(c, file_path))
            .collect();
        prefer_local(candidates)
    }

    /// Callables whose return type contains `ty` somewhere below the top
    /// level, e.g. `Option<T>` for `T`.
    pub fn wrapping_generators_of(&self, ty: &Ty, file_path: Option<&str>) -> Vec<&Callable> {
        tracing::debug!(ty = %ty, "looking for wrapping generators");
        let candidates = self
            .callables
            .iter()
            .filter(|c| c.returns_value())
            .filter(|c| c.return_type.as_ref().is_some_and(|ret| ret.wraps(ty).is_some()))
            .filter(|c| visible(c, file_path))
            .collect();
        prefer_local(candidates)
    }

    /// Callables of `owner` whose return type is `ty` or holds it one level
    /// down.
    pub fn owner_generators_of(
        &self,
        owner: &Ty,
        ty: &Ty,
        file_path: Option<&str>,
    ) -> Vec<&Callable> {
        tracing::debug!(owner = %owner, ty = %ty, "looking for owner generators");
        let candidates = self
            .callables
            .iter()
            .filter(|c| c.parent.as_ref().is_some_and(|p| p.is_structurally_same(owner)))
            .filter(|c| c.returns_value())
            .filter(|c| {
                c.return_type
                    .as_ref()
                    .is_some_and(|ret| ret.can_be_indirectly_same_as(ty))
            })
            .filter(|c| visible(c, file_path))
            .collect();
        prefer_local(candidates)
    }
}

/// `Vec` or `Option` without any element information.
fn returns_bare_container(callable: &Callable) -> bool {
    match &callable.return_type {
        Some(ret) if callable.returns_value() => {
            matches!(ret.name(), Some(VEC) | Some(OPTION)) && ret.generics().is_empty()
        }
        _ => false,
    }
}

fn visible(callable: &Callable, file_path: Option<&str>) -> bool {
    file_path.map_or(true, |file| callable.is_visible_from(file))
}

/// Keep only callables declared in the crate under test if there are any.
pub fn prefer_local(candidates: Vec<&Callable>) -> Vec<&Callable> {
    if candidates.iter().any(|c| c.is_local()) {
        candidates.into_iter().filter(|c| c.is_local()).collect()
    } else {
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{option_of, string};
    use crate::callable::Param;
    use crate::test_case::PrimValue;
    use crate::types::traits::{trait_set, CLONE, DEBUG, DEFAULT};
    use crate::types::{Adt, Prim};

    fn counter() -> Ty {
        Ty::Struct(Adt::new("crate::Counter").with_traits(trait_set(&[DEBUG, CLONE, DEFAULT])))
    }

    fn discovered() -> Vec<Callable> {
        vec![
            Callable::static_method("new", counter())
                .with_param(Param::named("start", Ty::prim(Prim::U32)))
                .returning(counter())
                .declared_in("src/counter.rs"),
            Callable::method("get", counter(), Ty::reference(counter(), false))
                .returning(Ty::prim(Prim::U32))
                .declared_in("src/counter.rs"),
            Callable::method("into_inner", counter(), counter())
                .returning(Ty::prim(Prim::U32))
                .declared_in("src/counter.rs"),
            Callable::method("peek", counter(), Ty::reference(counter(), false))
                .returning(option_of(Ty::prim(Prim::U32)))
                .private()
                .declared_in("src/counter.rs"),
            Callable::function("crate::util::label")
                .with_param(Param::named("c", Ty::reference(counter(), false)))
                .returning(string())
                .declared_in("src/util.rs"),
            Callable::function("crate::empty")
                .returning(Ty::structure(VEC, vec![]))
                .declared_in("src/lib.rs"),
        ]
    }

    fn names(callables: &[&Callable]) -> Vec<String> {
        let mut names: Vec<String> = callables.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_bare_container_returns_are_dropped() {
        let ctx = TypeContext::new(discovered(), 1);
        assert!(ctx.callables().iter().all(|c| c.name != "crate::empty"));
        // 4 built-ins + 5 useful
        assert_eq!(ctx.callables().len(), 9);
    }

    #[test]
    fn test_duplicates_are_removed() {
        let mut input = discovered();
        input.extend(discovered());
        let ctx = TypeContext::new(input, 1);
        assert_eq!(ctx.callables().len(), 9);
    }

    #[test]
    fn test_same_seed_same_order() {
        let a = TypeContext::new(discovered(), 42);
        let b = TypeContext::new(discovered(), 42);
        assert_eq!(a.callables(), b.callables());
    }

    #[test]
    fn test_sweep_discovers_signature_types() {
        let ctx = TypeContext::new(discovered(), 0);
        assert!(ctx.types().contains(&counter()));
        assert!(ctx.types().contains(&string()));
        assert!(ctx.types().contains(&builtins::step_rng()));
        assert!(!ctx.types().contains(&Ty::prim(Prim::U32)));
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let a = TypeContext::new(discovered(), 3);
        let b = TypeContext::new(discovered(), 99);
        assert_eq!(a.types(), b.types());
    }

    #[test]
    fn test_visible_callables_filters_by_file() {
        let ctx = TypeContext::new(discovered(), 0);
        let from_util = ctx.visible_callables(Some("src/util.rs"), false);
        assert!(from_util.iter().all(|c| c.name != "peek"));
        let from_counter = ctx.visible_callables(Some("src/counter.rs"), true);
        assert!(from_counter.iter().any(|c| c.name == "peek"));
        assert!(from_counter.iter().all(|c| c.is_local()));
    }

    #[test]
    fn test_generators_match_by_name_and_prefer_local() {
        let ctx = TypeContext::new(discovered(), 0);
        assert_eq!(names(&ctx.generators_of(&counter(), None)), vec!["new"]);

        // only the built-in String::from produces a String
        let mut no_local: Vec<Callable> = discovered();
        no_local.retain(|c| c.name != "crate::util::label");
        let ctx = TypeContext::new(no_local, 0);
        assert_eq!(names(&ctx.generators_of(&string(), None)), vec!["from"]);
    }

    #[test]
    fn test_wrapping_generators() {
        let ctx = TypeContext::new(discovered(), 0);
        let wrapping = ctx.wrapping_generators_of(&Ty::prim(Prim::U32), None);
        assert_eq!(names(&wrapping), vec!["peek"]);
        assert!(ctx
            .wrapping_generators_of(&Ty::prim(Prim::U32), Some("src/util.rs"))
            .is_empty());
    }

    #[test]
    fn test_owner_generators() {
        let ctx = TypeContext::new(discovered(), 0);
        let found = ctx.owner_generators_of(&counter(), &Ty::prim(Prim::U32), None);
        assert_eq!(names(&found), vec!["get", "into_inner", "peek"]);
    }

    #[test]
    fn test_owner_matched_without_trait_facts() {
        let ctx = TypeContext::new(discovered(), 0);
        let bare = Ty::structure("crate::Counter", vec![]);
        assert_ne!(bare, counter());
        let found = ctx.owner_generators_of(&bare, &Ty::prim(Prim::U32), None);
        assert_eq!(names(&found), vec!["get", "into_inner", "peek"]);
        assert_eq!(ctx.types().get(&bare), Some(&counter()));
    }

    #[test]
    fn test_callables_with_param() {
        let ctx = TypeContext::new(discovered(), 0);
        let by_ref = Ty::reference(counter(), false);
        let found = ctx.callables_with_param(&by_ref, None, true, false);
        assert_eq!(names(&found), vec!["crate::util::label", "get", "peek"]);

        let by_value = ctx.callables_with_param(&counter(), None, false, false);
        assert_eq!(names(&by_value), vec!["into_inner"]);
        assert!(ctx.callables_with_param(&counter(), None, true, false).is_empty());
    }

    #[test]
    fn test_methods_of_respects_liveness() {
        let ctx = TypeContext::new(discovered(), 0);
        let new = ctx.generators_of(&counter(), None)[0].clone();

        let mut tc = TestCase::new(1);
        let start = tc.push_primitive(PrimValue::UInt(0, Prim::U32));
        let c = tc.push_call(new, vec![start]).unwrap();
        let found = ctx.methods_of(&tc, std::slice::from_ref(&c));
        let mut method_names: Vec<&str> = found.iter().map(|(_, m)| m.name.as_str()).collect();
        method_names.sort_unstable();
        assert_eq!(method_names, vec!["get", "into_inner", "peek"]);

        let into_inner = found.iter().find(|(_, m)| m.name == "into_inner").unwrap().1.clone();
        tc.push_call(into_inner, vec![c.clone()]);
        assert!(ctx.methods_of(&tc, &[c]).is_empty());
    }

    #[test]
    fn test_types_implementing_ignores_sized() {
        let ctx = TypeContext::new(discovered(), 0);
        let found = ctx.types_implementing(&[Trait::new(DEFAULT), Trait::new(crate::types::traits::SIZED)]);
        assert!(found.contains(&&counter()));
    }

    #[test]
    fn test_load_callables_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("callables.json");
        std::fs::write(&path, serde_json::to_string(&discovered()).unwrap()).unwrap();
        let loaded = load_callables(&path).unwrap();
        assert_eq!(loaded, discovered());

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_callables(&path), Err(LoadError::Parse { .. })));
        assert!(matches!(
            load_callables(dir.path().join("missing.json")),
            Err(LoadError::Read { .. })
        ));
    }
}
