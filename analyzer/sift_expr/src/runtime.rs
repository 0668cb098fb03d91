//! Evaluation runtime: variables, method groups, globals, finder.
//!
//! The runtime owns an ordered variable list and namespaced groups of
//! method descriptors (each group name-sorted for binary search). Global
//! objects are shared handles the runtime borrows — the owning component
//! controls their lifetime, the runtime never frees them. An optional
//! *finder* callback resolves variables the list does not hold (table
//! columns, environment values).

use std::any::Any;
use std::sync::Arc;

use bitflags::bitflags;

use sift_value::Value;

bitflags! {
    /// Method descriptor flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MethodFlags: u8 {
        /// The method receives the runtime as its first argument.
        const RUNTIME = 0x01;
        /// The method produces no value.
        const VOID = 0x02;
    }
}

/// One of the six dispatch shapes:
/// `{0, 1, many} outputs × {plain, needs-runtime}`.
#[derive(Clone, Copy)]
pub enum MethodFn {
    Plain0(fn(&[Value]) -> Result<(), String>),
    Plain1(fn(&[Value]) -> Result<Value, String>),
    PlainMany(fn(&[Value]) -> Result<Vec<Value>, String>),
    Runtime0(fn(&mut Runtime, &[Value]) -> Result<(), String>),
    Runtime1(fn(&mut Runtime, &[Value]) -> Result<Value, String>),
    RuntimeMany(fn(&mut Runtime, &[Value]) -> Result<Vec<Value>, String>),
}

impl std::fmt::Debug for MethodFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match self {
            MethodFn::Plain0(_) => "Plain0",
            MethodFn::Plain1(_) => "Plain1",
            MethodFn::PlainMany(_) => "PlainMany",
            MethodFn::Runtime0(_) => "Runtime0",
            MethodFn::Runtime1(_) => "Runtime1",
            MethodFn::RuntimeMany(_) => "RuntimeMany",
        };
        f.write_str(shape)
    }
}

/// Callable method: name, arities, flags and the dispatch shape.
#[derive(Clone, Copy, Debug)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub in_count: usize,
    pub out_count: usize,
    pub flags: MethodFlags,
    pub call: MethodFn,
}

impl MethodDescriptor {
    /// Plain single-output method, the common shape.
    pub const fn plain(
        name: &'static str,
        in_count: usize,
        call: fn(&[Value]) -> Result<Value, String>,
    ) -> Self {
        Self {
            name,
            in_count,
            out_count: 1,
            flags: MethodFlags::empty(),
            call: MethodFn::Plain1(call),
        }
    }

    /// Runtime-aware single-output method.
    pub const fn with_runtime(
        name: &'static str,
        in_count: usize,
        call: fn(&mut Runtime, &[Value]) -> Result<Value, String>,
    ) -> Self {
        Self {
            name,
            in_count,
            out_count: 1,
            flags: MethodFlags::RUNTIME,
            call: MethodFn::Runtime1(call),
        }
    }
}

/// A namespace with its name-sorted method descriptors.
#[derive(Clone, Debug)]
struct MethodGroup {
    namespace: String,
    methods: Vec<MethodDescriptor>,
}

/// Variable finder callback: name to value, `None` when unknown.
pub type FinderFn = dyn Fn(&str) -> Option<Value> + Send;

/// Expression evaluation runtime.
#[derive(Default)]
pub struct Runtime {
    /// Ordered variable list; lookup is linear, assignment appends.
    variables: Vec<(String, Value)>,
    /// Method groups; the root namespace has the empty name.
    methods: Vec<MethodGroup>,
    /// Borrowed global objects, resolved by name and downcast.
    globals: Vec<(String, Arc<dyn Any + Send + Sync>)>,
    /// Fallback variable resolver.
    finder: Option<Box<FinderFn>>,
    /// Messages recorded during evaluation (soft failures).
    errors: Vec<String>,
    /// Debug mode enables stricter argument checking diagnostics.
    debug: bool,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("variables", &self.variables)
            .field("groups", &self.methods.len())
            .field("globals", &self.globals.len())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime with the root and `str::` libraries pre-registered, the
    /// way the one-shot entry points build it.
    pub fn with_standard_methods() -> Self {
        let mut runtime = Self::new();
        runtime.add_methods("", crate::methods::root_methods());
        runtime.add_methods("str", crate::methods::string_methods());
        runtime
    }

    /// Runtime with a variable finder callback.
    pub fn with_finder(finder: Box<FinderFn>) -> Self {
        let mut runtime = Self::with_standard_methods();
        runtime.finder = Some(finder);
        runtime
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    // === variables ===

    /// Set a variable, updating an existing binding or appending.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        if let Some(slot) = self
            .variables
            .iter_mut()
            .find(|(existing, _)| existing == name)
        {
            slot.1 = value;
        } else {
            self.variables.push((name.to_string(), value));
        }
    }

    /// Variable by name from the ordered list.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Resolve through the finder callback.
    pub fn find_value(&self, name: &str) -> Option<Value> {
        self.finder.as_ref().and_then(|finder| finder(name))
    }

    /// Drop all variables; methods, globals and finder stay.
    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    // === methods ===

    /// Register a method group under `namespace` (empty for root). The
    /// group is sorted by name so lookup can binary-search.
    pub fn add_methods(&mut self, namespace: &str, mut methods: Vec<MethodDescriptor>) {
        methods.sort_by(|a, b| a.name.cmp(b.name));
        self.methods.push(MethodGroup {
            namespace: namespace.to_string(),
            methods,
        });
    }

    /// Exact-name lookup in the root namespace.
    pub fn find_method(&self, name: &str) -> Option<MethodDescriptor> {
        self.find_in_namespace("", name)
    }

    /// Exact-name lookup of a `namespace::name` token: the namespace
    /// selects the group, the name binary-searches within it.
    pub fn find_method_namespaced(&self, full_name: &str) -> Option<MethodDescriptor> {
        let (namespace, name) = full_name.rsplit_once("::")?;
        self.find_in_namespace(namespace, name)
    }

    fn find_in_namespace(&self, namespace: &str, name: &str) -> Option<MethodDescriptor> {
        let group = self
            .methods
            .iter()
            .find(|group| group.namespace == namespace)?;
        let index = group
            .methods
            .binary_search_by(|descriptor| descriptor.name.cmp(name))
            .ok()?;
        Some(group.methods[index])
    }

    // === globals ===

    /// Register a shared global object under `name`.
    pub fn add_global(&mut self, name: &str, object: Arc<dyn Any + Send + Sync>) {
        self.globals.push((name.to_string(), object));
    }

    /// Global by name, downcast to its concrete type.
    pub fn global<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.globals
            .iter()
            .find(|(existing, _)| existing == name)
            .and_then(|(_, object)| Arc::clone(object).downcast::<T>().ok())
    }

    // === errors ===

    /// Record a soft evaluation failure message.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    #[inline]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Drain the recorded messages.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{MethodDescriptor, Runtime};
    use pretty_assertions::assert_eq;
    use sift_value::Value;
    use std::sync::Arc;

    fn ok_one(_: &[Value]) -> Result<Value, String> {
        Ok(Value::Int(1))
    }

    // === Variables ===

    #[test]
    fn set_variable_updates_in_place() {
        let mut runtime = Runtime::new();
        runtime.set_variable("x", Value::Int(1));
        runtime.set_variable("x", Value::Int(2));
        assert_eq!(runtime.variable("x"), Some(&Value::Int(2)));
        assert_eq!(runtime.variable("y"), None);
    }

    #[test]
    fn finder_resolves_unknown_names() {
        let runtime = Runtime::with_finder(Box::new(|name| {
            (name == "answer").then_some(Value::Int(42))
        }));
        assert_eq!(runtime.find_value("answer"), Some(Value::Int(42)));
        assert_eq!(runtime.find_value("question"), None);
    }

    // === Methods ===

    #[test]
    fn lookup_is_exact_name() {
        let mut runtime = Runtime::new();
        runtime.add_methods(
            "",
            vec![
                MethodDescriptor::plain("sum", 2, ok_one),
                MethodDescriptor::plain("substring", 3, ok_one),
            ],
        );
        assert!(runtime.find_method("sum").is_some());
        assert!(runtime.find_method("su").is_none());
        assert!(runtime.find_method("summary").is_none());
    }

    #[test]
    fn namespaced_lookup_scans_groups() {
        let mut runtime = Runtime::new();
        runtime.add_methods("str", vec![MethodDescriptor::plain("length", 1, ok_one)]);
        runtime.add_methods("source", vec![MethodDescriptor::plain("line", 0, ok_one)]);
        assert!(runtime.find_method_namespaced("str::length").is_some());
        assert!(runtime.find_method_namespaced("source::line").is_some());
        assert!(runtime.find_method_namespaced("str::line").is_none());
        assert!(runtime.find_method_namespaced("length").is_none());
    }

    #[test]
    fn standard_library_is_registered() {
        let runtime = Runtime::with_standard_methods();
        assert!(runtime.find_method("average").is_some());
        assert!(runtime.find_method("if").is_some());
        assert!(runtime.find_method_namespaced("str::tolower").is_some());
        assert!(runtime.find_method_namespaced("str::mid").is_some());
    }

    // === Globals ===

    #[test]
    fn globals_downcast_by_type() {
        let mut runtime = Runtime::new();
        runtime.add_global("limits", Arc::new(7usize));
        assert_eq!(runtime.global::<usize>("limits").as_deref(), Some(&7));
        assert!(runtime.global::<String>("limits").is_none());
    }

    // === Errors ===

    #[test]
    fn errors_accumulate_and_drain() {
        let mut runtime = Runtime::new();
        runtime.add_error("first");
        runtime.add_error("second");
        assert!(runtime.has_errors());
        assert_eq!(runtime.take_errors().len(), 2);
        assert!(!runtime.has_errors());
    }
}
