// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Function registry & dispatcher (C5).

use crate::error::RegistryError;
use crate::value::{coerce_int, ArgKind, ArgValue, ReturnKind, ReturnValue};
use magi_wire::MAX_ARITY;

/// A registered callable together with its declared signature. The
/// callable itself is an opaque boxed closure — per spec §9's "Dynamic
/// dispatch without reflection" note, Rust's native closures let the
/// dispatcher collapse the original's per-arity invocation arms into a
/// single call site, so there is exactly one shape here rather than ten.
pub struct RegisteredFunction {
    pub name: String,
    pub arg_types: Vec<ArgKind>,
    pub return_kind: ReturnKind,
    callable: Box<dyn Fn(Vec<ArgValue>) -> ReturnValue + Send + Sync>,
}

impl std::fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("name", &self.name)
            .field("arg_types", &self.arg_types)
            .field("return_kind", &self.return_kind)
            .finish()
    }
}

/// Holds the set of registered callables. Dispatch performs a linear scan
/// by name, per spec §4.5 step 1 — entries are few (user-registered
/// functions plus the built-in `stop`), so this is not a hot-path concern.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: Vec<RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `register_function(name, return_kind, callable, arg_types[])`
    /// (spec §4.5). Re-registering an existing name replaces it in place,
    /// preserving its position for a stable dispatch order.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        return_kind: ReturnKind,
        arg_types: Vec<ArgKind>,
        callable: impl Fn(Vec<ArgValue>) -> ReturnValue + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if arg_types.len() > MAX_ARITY {
            return Err(RegistryError::TooManyArgs(name, arg_types.len()));
        }
        let entry = RegisteredFunction {
            name: name.clone(),
            arg_types,
            return_kind,
            callable: Box::new(callable),
        };
        if let Some(existing) = self.functions.iter_mut().find(|f| f.name == name) {
            *existing = entry;
        } else {
            self.functions.push(entry);
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    /// Dispatch `(name, string_args[])` to the matching registered
    /// function (spec §4.5). Always returns a `ReturnValue` — a dispatch
    /// miss, arity mismatch, or an over-arity callable all yield the
    /// literal `ReturnValue::Str("False")`, matching the C1 error taxonomy
    /// (spec §7): dispatch errors never stop the agent.
    pub fn dispatch(&self, name: &str, string_args: &[String]) -> ReturnValue {
        let Some(func) = self.functions.iter().find(|f| f.name == name) else {
            tracing::error!(name, "dispatch: unknown function");
            return ReturnValue::failure();
        };

        if string_args.len() != func.arg_types.len() {
            tracing::error!(
                name,
                expected = func.arg_types.len(),
                got = string_args.len(),
                "dispatch: arity mismatch"
            );
            return ReturnValue::failure();
        }
        if func.arg_types.len() > MAX_ARITY {
            tracing::error!(name, arity = func.arg_types.len(), "dispatch: arity cap exceeded");
            return ReturnValue::failure();
        }

        let coerced: Vec<ArgValue> = string_args
            .iter()
            .zip(&func.arg_types)
            .map(|(s, kind)| match kind {
                ArgKind::Int => ArgValue::Int(coerce_int(s)),
                ArgKind::Str => ArgValue::Str(s.clone()),
            })
            .collect();

        (func.callable)(coerced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn dispatch_unknown_function_returns_false() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.dispatch("nope", &[]), ReturnValue::failure());
    }

    #[test]
    fn dispatch_arity_mismatch_returns_false() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("echo", ReturnKind::IntBox, vec![ArgKind::Int], |args| {
                ReturnValue::Int(match &args[0] {
                    ArgValue::Int(v) => *v,
                    _ => 0,
                })
            })
            .unwrap();
        assert_eq!(
            registry.dispatch("echo", &[]),
            ReturnValue::failure()
        );
    }

    #[test]
    fn dispatch_int_echo_succeeds() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("echo", ReturnKind::IntBox, vec![ArgKind::Int], |args| {
                ReturnValue::Int(match &args[0] {
                    ArgValue::Int(v) => *v,
                    _ => 0,
                })
            })
            .unwrap();
        let result = registry.dispatch("echo", &["42".to_string()]);
        assert_eq!(result, ReturnValue::Int(42));
        assert_eq!(result.render(), "42");
    }

    #[test]
    fn dispatch_dictionary_return_renders_flat_fragment() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("stats", ReturnKind::Dictionary, vec![], |_args| {
                ReturnValue::Dict(vec![
                    ("mean".to_string(), "3.5".to_string()),
                    ("count".to_string(), "2".to_string()),
                ])
            })
            .unwrap();
        let result = registry.dispatch("stats", &[]);
        assert_eq!(result.render(), "mean: 3.5, count: 2");
    }

    #[test]
    fn dispatch_void_stop_sets_flag() {
        let mut registry = FunctionRegistry::new();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();
        registry
            .register("stop", ReturnKind::Void, vec![], move |_args| {
                flag.store(true, Ordering::SeqCst);
                ReturnValue::Void
            })
            .unwrap();
        let result = registry.dispatch("stop", &[]);
        assert_eq!(result, ReturnValue::Void);
        assert_eq!(result.render(), "True");
        assert!(stop_flag.load(Ordering::SeqCst));
    }

    #[test]
    fn registering_same_name_twice_overwrites() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("f", ReturnKind::Void, vec![], |_| ReturnValue::Void)
            .unwrap();
        registry
            .register("f", ReturnKind::IntBox, vec![], |_| ReturnValue::Int(7))
            .unwrap();
        assert_eq!(registry.dispatch("f", &[]), ReturnValue::Int(7));
        assert_eq!(registry.names().count(), 1);
    }

    #[test]
    fn registering_too_many_args_is_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry
            .register(
                "toomany",
                ReturnKind::Void,
                vec![ArgKind::Int; 11],
                |_| ReturnValue::Void,
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::TooManyArgs(_, 11)));
    }
}
