//! Statements of a test case and their ownership classification.
//!
//! Statements refer back to their test case only through its id; anything
//! that needs the surrounding sequence (position, what a reference points
//! at) takes the [`TestCase`] as an argument and recomputes from it.

use super::{TestCase, VarRef};
use crate::callable::{Callable, Param};
use crate::types::{Prim, Ty};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable statement identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtId(Uuid);

impl StmtId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StmtId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StmtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A primitive literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimValue {
    Bool(bool),
    Char(char),
    Int(i128, Prim),
    UInt(u128, Prim),
    Float(f64, Prim),
    Str(String),
}

impl PrimValue {
    /// Type of a variable initialized with this literal. String literals
    /// produce `&str`.
    pub fn ty(&self) -> Ty {
        match self {
            Self::Bool(_) => Ty::prim(Prim::Bool),
            Self::Char(_) => Ty::prim(Prim::Char),
            Self::Int(_, prim) | Self::UInt(_, prim) | Self::Float(_, prim) => Ty::prim(*prim),
            Self::Str(_) => Ty::reference(Ty::prim(Prim::Str), false),
        }
    }

    /// Rust literal syntax, suffixed so the type is unambiguous.
    pub fn literal(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Char(c) => format!("{c:?}"),
            Self::Int(v, prim) => format!("{v}{}", prim.name()),
            Self::UInt(v, prim) => format!("{v}{}", prim.name()),
            Self::Float(v, prim) => {
                if v.is_nan() {
                    format!("{}::NAN", prim.name())
                } else if v.is_infinite() && *v > 0.0 {
                    format!("{}::INFINITY", prim.name())
                } else if v.is_infinite() {
                    format!("{}::NEG_INFINITY", prim.name())
                } else {
                    format!("{v:?}{}", prim.name())
                }
            }
            Self::Str(s) => format!("{s:?}"),
        }
    }
}

/// `let x = <literal>;`
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveStmt {
    id: StmtId,
    test_case: u64,
    value: PrimValue,
    return_value: VarRef,
}

impl PrimitiveStmt {
    pub(crate) fn new(test_case: u64, value: PrimValue, return_value: VarRef) -> Self {
        Self {
            id: StmtId::new(),
            test_case,
            value,
            return_value,
        }
    }

    pub fn value(&self) -> &PrimValue {
        &self.value
    }

    pub fn set_value(&mut self, value: PrimValue) {
        self.value = value;
    }
}

/// `let r = &x;` or `let r = &mut x;`
#[derive(Debug, Clone, PartialEq)]
pub struct RefStmt {
    id: StmtId,
    test_case: u64,
    arg: VarRef,
    mutable: bool,
    return_value: VarRef,
}

impl RefStmt {
    pub(crate) fn new(test_case: u64, arg: VarRef, mutable: bool, return_value: VarRef) -> Self {
        Self {
            id: StmtId::new(),
            test_case,
            arg,
            mutable,
            return_value,
        }
    }

    /// The variable a reference is taken of.
    pub fn arg(&self) -> &VarRef {
        &self.arg
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }
}

/// Invocation of a [`Callable`].
#[derive(Debug, Clone, PartialEq)]
pub struct CallableStmt {
    id: StmtId,
    test_case: u64,
    callable: Callable,
    args: Vec<VarRef>,
    return_value: Option<VarRef>,
}

impl CallableStmt {
    /// # Panics
    ///
    /// Panics if `args` does not have one entry per parameter of `callable`.
    pub fn new(
        test_case: u64,
        callable: Callable,
        args: Vec<VarRef>,
        return_value: Option<VarRef>,
    ) -> Self {
        assert_eq!(
            args.len(),
            callable.params.len(),
            "unequal number of args and params for {}",
            callable
        );
        Self {
            id: StmtId::new(),
            test_case,
            callable,
            args,
            return_value,
        }
    }

    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    pub fn name(&self) -> &str {
        &self.callable.name
    }

    pub fn params(&self) -> &[Param] {
        &self.callable.params
    }

    pub fn generics(&self) -> &[Ty] {
        &self.callable.generics
    }

    pub fn parent(&self) -> Option<&Ty> {
        self.callable.parent.as_ref()
    }

    pub fn args(&self) -> &[VarRef] {
        &self.args
    }

    pub fn return_value(&self) -> Option<&VarRef> {
        self.return_value.as_ref()
    }

    /// Types of the bound arguments, which may be more specific than the
    /// declared parameter types.
    pub fn actual_param_types(&self) -> Vec<&Ty> {
        self.args.iter().map(VarRef::ty).collect()
    }

    /// # Panics
    ///
    /// Panics if the arity differs from the callable's parameter count.
    /// Callers validate before calling.
    pub fn set_args(&mut self, args: Vec<VarRef>) {
        assert_eq!(
            args.len(),
            self.callable.params.len(),
            "unequal number of args and params for {}",
            self.callable
        );
        self.args = args;
    }

    /// # Panics
    ///
    /// Panics if `pos` is out of range.
    pub fn set_arg(&mut self, pos: usize, arg: VarRef) {
        self.args[pos] = arg;
    }

    /// `var` (or, for a reference variable, the variable it was taken of)
    /// is bound to a by-value parameter.
    pub fn consumes(&self, var: &VarRef, test_case: &TestCase) -> bool {
        self.debug_check_owner(test_case);
        let target = if var.ty().is_ref() {
            match test_case.defined_by(var) {
                Some(Statement::Ref(stmt)) => stmt.arg(),
                _ => return false,
            }
        } else {
            var
        };
        self.params()
            .iter()
            .zip(&self.args)
            .any(|(param, arg)| arg == target && !param.is_by_reference())
    }

    /// A reference `var` is passed directly, or a plain `var` is the
    /// referent behind some reference argument.
    pub fn borrows(&self, var: &VarRef, test_case: &TestCase) -> bool {
        self.debug_check_owner(test_case);
        if var.ty().is_ref() {
            self.args.iter().any(|arg| arg == var)
        } else {
            self.args
                .iter()
                .filter(|arg| arg.ty().is_ref())
                .filter_map(|arg| test_case.defined_by(arg))
                .filter_map(Statement::as_ref_stmt)
                .any(|stmt| stmt.arg() == var)
        }
    }

    /// `var` is bound, by position, to a `&mut` parameter.
    pub fn mutates(&self, var: &VarRef) -> bool {
        self.params()
            .iter()
            .zip(&self.args)
            .any(|(param, arg)| arg == var && param.is_by_reference() && param.is_mutable())
    }

    pub fn uses(&self, var: &VarRef) -> bool {
        self.args.iter().any(|arg| arg == var)
    }

    /// Substitute `new` at every argument position holding `old`.
    ///
    /// # Panics
    ///
    /// Panics if `old` is not among the arguments.
    pub fn replace(&mut self, old: &VarRef, new: &VarRef) {
        assert!(
            self.uses(old),
            "{} is not an argument of {}",
            old,
            self.callable
        );
        for arg in self.args.iter_mut().filter(|arg| **arg == *old) {
            *arg = new.clone();
        }
    }

    /// Position within the owning test case.
    ///
    /// # Panics
    ///
    /// Panics if this statement is not part of `test_case`.
    pub fn position(&self, test_case: &TestCase) -> usize {
        test_case
            .position_of(self.id)
            .unwrap_or_else(|| panic!("statement {} is not part of test case {}", self.id, test_case.id()))
    }

    fn debug_check_owner(&self, test_case: &TestCase) {
        debug_assert_eq!(
            self.test_case,
            test_case.id(),
            "statement queried against a foreign test case"
        );
    }
}

/// One instruction of a test case.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Primitive(PrimitiveStmt),
    Ref(RefStmt),
    Callable(CallableStmt),
}

impl Statement {
    pub fn id(&self) -> StmtId {
        match self {
            Self::Primitive(s) => s.id,
            Self::Ref(s) => s.id,
            Self::Callable(s) => s.id,
        }
    }

    /// Id of the owning test case.
    pub fn test_case_id(&self) -> u64 {
        match self {
            Self::Primitive(s) => s.test_case,
            Self::Ref(s) => s.test_case,
            Self::Callable(s) => s.test_case,
        }
    }

    pub(crate) fn reassign(&mut self, test_case: u64) {
        match self {
            Self::Primitive(s) => s.test_case = test_case,
            Self::Ref(s) => s.test_case = test_case,
            Self::Callable(s) => s.test_case = test_case,
        }
    }

    pub fn return_value(&self) -> Option<&VarRef> {
        match self {
            Self::Primitive(s) => Some(&s.return_value),
            Self::Ref(s) => Some(&s.return_value),
            Self::Callable(s) => s.return_value.as_ref(),
        }
    }

    pub fn args(&self) -> &[VarRef] {
        match self {
            Self::Primitive(_) => &[],
            Self::Ref(s) => std::slice::from_ref(&s.arg),
            Self::Callable(s) => &s.args,
        }
    }

    pub fn as_callable(&self) -> Option<&CallableStmt> {
        match self {
            Self::Callable(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_callable_mut(&mut self) -> Option<&mut CallableStmt> {
        match self {
            Self::Callable(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ref_stmt(&self) -> Option<&RefStmt> {
        match self {
            Self::Ref(s) => Some(s),
            _ => None,
        }
    }

    pub fn uses(&self, var: &VarRef) -> bool {
        self.args().contains(var)
    }

    pub fn consumes(&self, var: &VarRef, test_case: &TestCase) -> bool {
        match self {
            Self::Callable(s) => s.consumes(var, test_case),
            Self::Primitive(_) | Self::Ref(_) => false,
        }
    }

    /// Taking `&x` borrows `x`; calls borrow per [`CallableStmt::borrows`].
    pub fn borrows(&self, var: &VarRef, test_case: &TestCase) -> bool {
        match self {
            Self::Callable(s) => s.borrows(var, test_case),
            Self::Ref(s) => &s.arg == var,
            Self::Primitive(_) => false,
        }
    }

    pub fn mutates(&self, var: &VarRef) -> bool {
        match self {
            Self::Callable(s) => s.mutates(var),
            Self::Ref(s) => s.mutable && &s.arg == var,
            Self::Primitive(_) => false,
        }
    }
}
