//! Rust source for generated test cases.
//!
//! The pipeline compiles the candidate crate with one generated test module
//! in it; this module produces that module's text.

use crate::callable::CallableKind;
use crate::test_case::{CallableStmt, Statement, TestCase, VarRef};
use std::collections::HashSet;
use std::fmt::Write;

/// Name of the generated test function for a test case. Failure parsing
/// relies on the trailing `_<id>`.
pub fn test_fn_name(id: u64) -> String {
    format!("case_{id}")
}

/// `#[cfg(test)] mod <module> { ... }` holding one `#[test]` per case.
pub fn render_test_module(module: &str, cases: &[TestCase]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#[cfg(test)]");
    let _ = writeln!(out, "#[allow(unused)]");
    let _ = writeln!(out, "mod {module} {{");
    let _ = writeln!(out, "    use super::*;");
    for case in cases {
        let _ = writeln!(out);
        out.push_str(&render_test_case(case));
    }
    let _ = writeln!(out, "}}");
    out
}

pub fn render_test_case(case: &TestCase) -> String {
    let mutable = mutable_vars(case);
    let mut out = String::new();
    let _ = writeln!(out, "    #[test]");
    let _ = writeln!(out, "    fn {}() {{", test_fn_name(case.id()));
    for stmt in case.stmts() {
        let _ = writeln!(out, "        {}", render_stmt(stmt, &mutable));
    }
    let _ = writeln!(out, "    }}");
    out
}

/// Variables that are mutably borrowed or passed to a `&mut` parameter.
fn mutable_vars(case: &TestCase) -> HashSet<VarRef> {
    let mut vars = HashSet::new();
    for stmt in case.stmts() {
        match stmt {
            Statement::Ref(r) if r.is_mutable() => {
                vars.insert(r.arg().clone());
            }
            Statement::Callable(call) => {
                vars.extend(
                    call.args()
                        .iter()
                        .filter(|arg| !arg.ty().is_ref() && call.mutates(arg))
                        .cloned(),
                );
            }
            _ => {}
        }
    }
    vars
}

fn binding(var: &VarRef, mutable: &HashSet<VarRef>) -> String {
    let keyword = if mutable.contains(var) { "let mut" } else { "let" };
    if var.ty().has_generic_params() {
        format!("{keyword} {}", var.name())
    } else {
        format!("{keyword} {}: {}", var.name(), var.ty())
    }
}

fn render_stmt(stmt: &Statement, mutable: &HashSet<VarRef>) -> String {
    match stmt {
        Statement::Primitive(p) => {
            let var = stmt.return_value().map(|v| binding(v, mutable)).unwrap_or_default();
            format!("{var} = {};", p.value().literal())
        }
        Statement::Ref(r) => {
            let var = stmt.return_value().map(|v| binding(v, mutable)).unwrap_or_default();
            let amp = if r.is_mutable() { "&mut " } else { "&" };
            format!("{var} = {amp}{};", r.arg().name())
        }
        Statement::Callable(call) => {
            let expr = render_call(call);
            match call.return_value() {
                Some(rv) => format!("{} = {expr};", binding(rv, mutable)),
                None => format!("{expr};"),
            }
        }
    }
}

fn render_call(call: &CallableStmt) -> String {
    let callable = call.callable();
    let args: Vec<String> = call.args().iter().map(VarRef::name).collect();
    let parent = callable.parent_path();

    match (&callable.kind, parent) {
        (CallableKind::Method, _) if !args.is_empty() => {
            format!("{}.{}({})", args[0], callable.name, args[1..].join(", "))
        }
        (CallableKind::StructInit, Some(parent)) => {
            if callable.params.iter().all(|p| p.name.is_some()) && !callable.params.is_empty() {
                let fields: Vec<String> = callable
                    .params
                    .iter()
                    .zip(&args)
                    .map(|(p, a)| format!("{}: {a}", p.name.as_deref().unwrap_or_default()))
                    .collect();
                format!("{parent} {{ {} }}", fields.join(", "))
            } else if args.is_empty() {
                parent.to_string()
            } else {
                format!("{parent}({})", args.join(", "))
            }
        }
        (CallableKind::EnumInit { variant }, Some(parent)) => {
            if args.is_empty() {
                format!("{parent}::{variant}")
            } else {
                format!("{parent}::{variant}({})", args.join(", "))
            }
        }
        (_, Some(parent)) => format!("{parent}::{}({})", callable.name, args.join(", ")),
        (_, None) => format!("{}({})", callable.name, args.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::callable::{Callable, Param};
    use crate::test_case::PrimValue;
    use crate::types::{Prim, Ty};

    fn counter() -> Ty {
        Ty::structure("crate::Counter", vec![])
    }

    #[test]
    fn test_render_calls_and_refs() {
        let mut tc = TestCase::new(7);
        let start = tc.push_primitive(PrimValue::UInt(1, Prim::U32));
        let new = Callable::static_method("new", counter())
            .with_param(Param::named("start", Ty::prim(Prim::U32)))
            .returning(counter());
        let c = tc.push_call(new, vec![start]).unwrap();
        let m = tc.push_ref(&c, true);
        let incr = Callable::method("incr", counter(), Ty::reference(counter(), true));
        tc.push_call(incr, vec![m]);

        let text = render_test_case(&tc);
        assert!(text.contains("fn case_7() {"));
        assert!(text.contains("let u32_0: u32 = 1u32;"));
        assert!(text.contains("let mut counter_1: crate::Counter = crate::Counter::new(u32_0);"));
        assert!(text.contains("let counter_ref_2: &mut crate::Counter = &mut counter_1;"));
        assert!(text.contains("counter_ref_2.incr();"));
    }

    #[test]
    fn test_render_enum_and_struct_init() {
        let mut tc = TestCase::new(1);
        let n = tc.push_primitive(PrimValue::Int(-3, Prim::I64));
        let some = builtins::base_callables()
            .into_iter()
            .find(|c| c.name == "Some")
            .unwrap();
        tc.push_call(some, vec![n.clone()]);

        let point = Ty::structure("crate::Point", vec![]);
        let init = Callable::new("Point", CallableKind::StructInit)
            .with_parent(point.clone())
            .with_params([
                Param::named("x", Ty::prim(Prim::I64)),
                Param::named("y", Ty::prim(Prim::I64)),
            ])
            .returning(point);
        tc.push_call(init, vec![n.clone(), n]);

        let text = render_test_case(&tc);
        assert!(text.contains("= std::option::Option::Some(i64_0);"));
        assert!(text.contains("= crate::Point { x: i64_0, y: i64_0 };"));
    }

    #[test]
    fn test_render_module_wraps_cases() {
        let module = render_test_module("rusty_tests", &[TestCase::new(1), TestCase::new(2)]);
        assert!(module.starts_with("#[cfg(test)]"));
        assert!(module.contains("mod rusty_tests {"));
        assert!(module.contains("fn case_1()"));
        assert!(module.contains("fn case_2()"));
        assert!(module.trim_end().ends_with('}'));
    }
}
