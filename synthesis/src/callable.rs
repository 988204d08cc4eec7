//! Callables: functions, methods and value constructors discovered in the
//! crate under test, plus the built-in set.

use crate::types::Ty;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an argument is handed to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassingMode {
    ByValue,
    ByRef,
    ByMutRef,
}

/// A formal parameter. For methods the receiver is the first parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: Option<String>,
    pub ty: Ty,
}

impl Param {
    pub fn new(ty: Ty) -> Self {
        Self { name: None, ty }
    }

    pub fn named(name: impl Into<String>, ty: Ty) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn mode(&self) -> PassingMode {
        match &self.ty {
            Ty::Ref { mutable: true, .. } => PassingMode::ByMutRef,
            Ty::Ref { .. } => PassingMode::ByRef,
            _ => PassingMode::ByValue,
        }
    }

    pub fn is_by_reference(&self) -> bool {
        self.mode() != PassingMode::ByValue
    }

    pub fn is_mutable(&self) -> bool {
        self.mode() == PassingMode::ByMutRef
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    /// Free function
    Function,
    /// Method with a `self` receiver as its first parameter
    Method,
    /// Associated function without receiver
    StaticMethod,
    /// Struct literal; parameters are the fields
    StructInit,
    /// Enum variant constructor
    EnumInit { variant: String },
}

/// A function, method or value constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Callable {
    pub name: String,
    pub kind: CallableKind,
    /// Type the callable belongs to (receiver type for methods)
    #[serde(default)]
    pub parent: Option<Ty>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: Option<Ty>,
    #[serde(default)]
    pub generics: Vec<Ty>,
    pub visibility: Visibility,
    /// Source file of the declaration; `None` for built-ins and externals
    #[serde(default)]
    pub src_file: Option<String>,
    /// Trait this method implements, if any
    #[serde(default)]
    pub of_trait: Option<String>,
}

impl Callable {
    pub fn new(name: impl Into<String>, kind: CallableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            params: Vec::new(),
            return_type: None,
            generics: Vec::new(),
            visibility: Visibility::Public,
            src_file: None,
            of_trait: None,
        }
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, CallableKind::Function)
    }

    /// Method on `parent` whose receiver is passed as `receiver`
    /// (`parent`, `&parent` or `&mut parent`).
    pub fn method(name: impl Into<String>, parent: Ty, receiver: Ty) -> Self {
        let mut method = Self::new(name, CallableKind::Method);
        method.parent = Some(parent);
        method.params.push(Param::named("self", receiver));
        method
    }

    pub fn static_method(name: impl Into<String>, parent: Ty) -> Self {
        Self::new(name, CallableKind::StaticMethod).with_parent(parent)
    }

    pub fn with_parent(mut self, parent: Ty) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_generics(mut self, generics: Vec<Ty>) -> Self {
        self.generics = generics;
        self
    }

    pub fn returning(mut self, ty: Ty) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn declared_in(mut self, file: impl Into<String>) -> Self {
        self.src_file = Some(file.into());
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Local;
        self
    }

    pub fn is_method(&self) -> bool {
        self.kind == CallableKind::Method
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Declared in the crate under test (has a known source file).
    pub fn is_local(&self) -> bool {
        self.src_file.is_some()
    }

    /// Callable from code in `file`: public, or declared in that file.
    pub fn is_visible_from(&self, file: &str) -> bool {
        self.is_public() || self.src_file.as_deref() == Some(file)
    }

    pub fn returns_value(&self) -> bool {
        self.return_type.as_ref().is_some_and(|ty| !ty.is_unit())
    }

    /// The receiver parameter of a method.
    pub fn self_param(&self) -> Option<&Param> {
        if self.is_method() {
            self.params.first()
        } else {
            None
        }
    }

    /// Path of the owning type without generic arguments, if it has one.
    pub fn parent_path(&self) -> Option<&str> {
        self.parent.as_ref().and_then(Ty::name)
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.parent_path()) {
            (CallableKind::EnumInit { variant }, Some(parent)) => write!(f, "{parent}::{variant}")?,
            (_, Some(parent)) => write!(f, "{parent}::{}", self.name)?,
            (_, None) => f.write_str(&self.name)?,
        }
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.ty)?;
        }
        write!(f, ")")?;
        if let Some(ret) = &self.return_type {
            write!(f, " -> {ret}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Prim;

    fn counter() -> Ty {
        Ty::structure("crate::Counter", vec![])
    }

    #[test]
    fn test_param_mode_follows_type() {
        assert_eq!(Param::new(counter()).mode(), PassingMode::ByValue);
        assert_eq!(
            Param::new(Ty::reference(counter(), false)).mode(),
            PassingMode::ByRef
        );
        let p = Param::new(Ty::reference(counter(), true));
        assert!(p.is_by_reference());
        assert!(p.is_mutable());
    }

    #[test]
    fn test_method_receiver_is_first_param() {
        let m = Callable::method("incr", counter(), Ty::reference(counter(), true))
            .with_param(Param::named("by", Ty::prim(Prim::U32)));
        assert!(m.is_method());
        assert_eq!(m.params.len(), 2);
        assert_eq!(m.self_param().map(Param::mode), Some(PassingMode::ByMutRef));
    }

    #[test]
    fn test_static_method_has_no_receiver() {
        let new = Callable::static_method("new", counter()).returning(counter());
        assert!(!new.is_method());
        assert!(new.self_param().is_none());
        assert!(new.returns_value());
    }

    #[test]
    fn test_unit_return_is_not_a_value() {
        let f = Callable::function("crate::reset").returning(Ty::unit());
        assert!(!f.returns_value());
    }

    #[test]
    fn test_visibility_from_file() {
        let private = Callable::function("helper").private().declared_in("src/lib.rs");
        assert!(private.is_visible_from("src/lib.rs"));
        assert!(!private.is_visible_from("src/other.rs"));

        let public = Callable::function("api");
        assert!(public.is_visible_from("src/other.rs"));
        assert!(!public.is_local());
    }

    #[test]
    fn test_display_signature() {
        let m = Callable::method("get", counter(), Ty::reference(counter(), false))
            .returning(Ty::prim(Prim::U32));
        assert_eq!(m.to_string(), "crate::Counter::get(&crate::Counter) -> u32");
    }

    #[test]
    fn test_deserialize_analysis_record() {
        let json = r#"{
            "name": "new",
            "kind": "static_method",
            "parent": {"struct": {"name": "crate::Counter"}},
            "params": [{"ty": {"prim": "u32"}}],
            "return_type": {"struct": {"name": "crate::Counter"}},
            "visibility": "public",
            "src_file": "src/counter.rs"
        }"#;
        let callable: Callable = serde_json::from_str(json).unwrap();
        assert_eq!(callable.kind, CallableKind::StaticMethod);
        assert_eq!(callable.parent, Some(counter()));
        assert_eq!(callable.params[0].ty, Ty::prim(Prim::U32));
        assert!(callable.is_local());
    }
}
