//! Statement / Ownership Model
//!
//! A [`TestCase`] is an ordered sequence of statements: the chromosome of
//! the search. Variables are the results of earlier statements; whether one
//! may still be borrowed or moved at a given position is a liveness
//! question answered against the whole sequence.

pub mod statement;

pub use statement::{CallableStmt, PrimValue, PrimitiveStmt, RefStmt, Statement, StmtId};

use crate::callable::Callable;
use crate::coverage::Coverage;
use crate::exec::Chromosome;
use crate::types::{Ty, TypeBinding};
use std::fmt;

/// Identity of a variable within one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

/// Typed handle to the result of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarRef {
    id: VarId,
    ty: Ty,
}

impl VarRef {
    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    /// Source-level variable name.
    pub fn name(&self) -> String {
        format!("{}_{}", self.ty.var_prefix(), self.id.0)
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.ty)
    }
}

/// A candidate test: statements plus the per-run facts the pipeline
/// attaches after execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    id: u64,
    stmts: Vec<Statement>,
    next_var: usize,
    fails: bool,
    coverage: Coverage,
}

impl TestCase {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            stmts: Vec::new(),
            next_var: 0,
            fails: false,
            coverage: Coverage::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Give this test case a new identity, e.g. after cloning it into the
    /// next generation. Statements follow along.
    pub fn set_id(&mut self, id: u64) {
        self.id = id;
        for stmt in &mut self.stmts {
            stmt.reassign(id);
        }
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn stmts(&self) -> &[Statement] {
        &self.stmts
    }

    pub fn stmt(&self, pos: usize) -> Option<&Statement> {
        self.stmts.get(pos)
    }

    pub fn stmt_mut(&mut self, pos: usize) -> Option<&mut Statement> {
        self.stmts.get_mut(pos)
    }

    pub fn fails(&self) -> bool {
        self.fails
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    /// Allocate a fresh variable of type `ty`.
    pub fn fresh_var(&mut self, ty: Ty) -> VarRef {
        let id = VarId(self.next_var);
        self.next_var += 1;
        VarRef { id, ty }
    }

    /// Append a literal and return the variable holding it.
    pub fn push_primitive(&mut self, value: PrimValue) -> VarRef {
        let var = self.fresh_var(value.ty());
        self.stmts
            .push(Statement::Primitive(PrimitiveStmt::new(self.id, value, var.clone())));
        var
    }

    /// Append `&var` / `&mut var` and return the reference variable.
    pub fn push_ref(&mut self, var: &VarRef, mutable: bool) -> VarRef {
        let reference = self.fresh_var(Ty::reference(var.ty().clone(), mutable));
        self.stmts.push(Statement::Ref(RefStmt::new(
            self.id,
            var.clone(),
            mutable,
            reference.clone(),
        )));
        reference
    }

    /// Append a call. The return type's generic parameters are bound from
    /// the argument types where they can be inferred.
    ///
    /// # Panics
    ///
    /// Panics if `args` does not match the callable's parameter count.
    pub fn push_call(&mut self, callable: Callable, args: Vec<VarRef>) -> Option<VarRef> {
        let return_value = if callable.returns_value() {
            let binding = Self::infer_binding(&callable, &args);
            callable
                .return_type
                .as_ref()
                .map(|ty| ty.bind_generics(&binding))
                .map(|ty| self.fresh_var(ty))
        } else {
            None
        };
        self.stmts.push(Statement::Callable(CallableStmt::new(
            self.id,
            callable,
            args,
            return_value.clone(),
        )));
        return_value
    }

    fn infer_binding(callable: &Callable, args: &[VarRef]) -> TypeBinding {
        let mut binding = TypeBinding::new();
        for (param, arg) in callable.params.iter().zip(args) {
            if let Some(inferred) = TypeBinding::infer(&param.ty, arg.ty()) {
                for (name, ty) in inferred.iter() {
                    if binding.get(name).is_none() {
                        binding.bind(name, ty.clone());
                    }
                }
            }
        }
        binding
    }

    /// Insert a statement at `pos`.
    ///
    /// # Panics
    ///
    /// Panics if the statement belongs to another test case or `pos > len`.
    pub fn insert(&mut self, pos: usize, stmt: Statement) {
        assert_eq!(
            stmt.test_case_id(),
            self.id,
            "statement belongs to test case {}",
            stmt.test_case_id()
        );
        self.stmts.insert(pos, stmt);
    }

    pub fn remove(&mut self, pos: usize) -> Statement {
        self.stmts.remove(pos)
    }

    /// Current position of a statement, recomputed from the sequence.
    pub fn position_of(&self, id: StmtId) -> Option<usize> {
        self.stmts.iter().position(|s| s.id() == id)
    }

    pub fn defined_by(&self, var: &VarRef) -> Option<&Statement> {
        self.stmts
            .iter()
            .find(|s| s.return_value().is_some_and(|rv| rv == var))
    }

    pub fn definition_position(&self, var: &VarRef) -> Option<usize> {
        self.stmts
            .iter()
            .position(|s| s.return_value().is_some_and(|rv| rv == var))
    }

    /// Every variable defined by the sequence, in order.
    pub fn variables(&self) -> Vec<VarRef> {
        self.stmts
            .iter()
            .filter_map(|s| s.return_value().cloned())
            .collect()
    }

    /// Variables defined before `pos` that can still be borrowed there.
    pub fn borrowable_variables_at(&self, pos: usize) -> Vec<VarRef> {
        self.variables()
            .into_iter()
            .filter(|v| self.is_borrowable_at(v, pos))
            .collect()
    }

    /// `var` is defined before `pos` and no statement at or before `pos`
    /// has moved it. Copy values are never moved; references follow their
    /// referent.
    pub fn is_borrowable_at(&self, var: &VarRef, pos: usize) -> bool {
        match self.definition_position(var) {
            Some(def) if def < pos => !self.is_moved_by(var, pos),
            _ => false,
        }
    }

    /// Borrowable at `pos`, and nothing from `pos` on still uses it.
    pub fn is_consumable_at(&self, var: &VarRef, pos: usize) -> bool {
        self.is_borrowable_at(var, pos)
            && !self
                .stmts
                .iter()
                .skip(pos)
                .any(|s| s.uses(var) || s.borrows(var, self))
    }

    /// A reference taken with `&x` dies with `x`, even though `&T` is Copy.
    fn is_moved_by(&self, var: &VarRef, pos: usize) -> bool {
        if let Some(Statement::Ref(stmt)) = self.defined_by(var) {
            return self.is_moved_by(stmt.arg(), pos);
        }
        if var.ty().is_copy() {
            return false;
        }
        self.stmts
            .iter()
            .take(pos.saturating_add(1))
            .any(|s| s.consumes(var, self))
    }
}

impl Chromosome for TestCase {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_coverage(&mut self, coverage: Coverage) {
        self.coverage = coverage;
    }

    fn set_fails(&mut self, fails: bool) {
        self.fails = fails;
    }
}
