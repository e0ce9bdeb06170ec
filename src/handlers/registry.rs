//! Error handler registry.
//!
//! Maps a workflow kind to its diagnostic handlers. The registry is filled in
//! once while workflow kinds are defined and then shared read-only behind an
//! `Arc`, so many workflow instances can look it up concurrently.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use super::verdict::HandlerVerdict;
use crate::domain::{InputSnapshot, LoopState, Outcome, SubmissionUnit};

/// Everything a handler may inspect when classifying a finished unit.
pub struct HandlerContext<'a> {
    pub workflow_id: &'a str,
    pub unit: &'a SubmissionUnit,
    pub outcome: &'a Outcome,
    pub state: &'a LoopState,
    /// Snapshot as edited by higher-priority handlers earlier in this pass
    pub pending: &'a InputSnapshot,
}

/// A single diagnostic rule.
pub trait ErrorHandler: Send + Sync {
    /// Stable name; registering the same name twice for a kind is a no-op
    fn name(&self) -> &str;

    /// Classify the finished unit and optionally repair the next inputs.
    fn classify(&self, ctx: &HandlerContext<'_>) -> HandlerVerdict;
}

/// Adapter so plain closures can be registered as handlers.
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&HandlerContext<'_>) -> HandlerVerdict + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ErrorHandler for FnHandler<F>
where
    F: Fn(&HandlerContext<'_>) -> HandlerVerdict + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, ctx: &HandlerContext<'_>) -> HandlerVerdict {
        (self.func)(ctx)
    }
}

/// A registered handler with its priority (higher runs first).
#[derive(Clone)]
pub struct HandlerEntry {
    pub priority: i32,
    /// Registration order, breaks priority ties
    pub sequence: usize,
    pub handler: Arc<dyn ErrorHandler>,
}

impl HandlerEntry {
    pub fn name(&self) -> &str {
        self.handler.name()
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .field("name", &self.name())
            .finish()
    }
}

/// Workflow kind → ordered handler set.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    entries: HashMap<String, Vec<HandlerEntry>>,
    next_sequence: usize,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the reference handlers for the base workflow kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtin(&mut registry);
        registry
    }

    /// Append a handler for `kind`. Returns false if a handler with the same
    /// name was already registered for that kind.
    pub fn register(&mut self, kind: &str, priority: i32, handler: impl ErrorHandler + 'static) -> bool {
        self.register_arc(kind, priority, Arc::new(handler))
    }

    /// Register a closure as a handler.
    pub fn register_fn<F>(&mut self, kind: &str, priority: i32, name: &str, func: F) -> bool
    where
        F: Fn(&HandlerContext<'_>) -> HandlerVerdict + Send + Sync + 'static,
    {
        self.register(kind, priority, FnHandler::new(name, func))
    }

    pub fn register_arc(&mut self, kind: &str, priority: i32, handler: Arc<dyn ErrorHandler>) -> bool {
        let handlers = self.entries.entry(kind.to_string()).or_default();
        if handlers.iter().any(|e| e.name() == handler.name()) {
            debug!("Handler '{}' already registered for '{}'", handler.name(), kind);
            return false;
        }

        debug!("Registering handler '{}' for '{}' at priority {}", handler.name(), kind, priority);
        handlers.push(HandlerEntry {
            priority,
            sequence: self.next_sequence,
            handler,
        });
        self.next_sequence += 1;
        true
    }

    /// Handlers for `kind`, priority descending, ties in registration order.
    pub fn lookup(&self, kind: &str) -> Vec<&HandlerEntry> {
        let mut handlers: Vec<&HandlerEntry> = self
            .entries
            .get(kind)
            .map(|entries| entries.iter().collect())
            .unwrap_or_default();
        handlers.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.sequence.cmp(&b.sequence)));
        handlers
    }

    /// Registered workflow kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self, kind: &str) -> usize {
        self.entries.get(kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &HandlerContext<'_>) -> HandlerVerdict {
        HandlerVerdict::not_handled()
    }

    #[test]
    fn test_lookup_orders_by_priority_then_registration() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("calc", 100, "low", noop);
        registry.register_fn("calc", 300, "high", noop);
        registry.register_fn("calc", 200, "mid-a", noop);
        registry.register_fn("calc", 200, "mid-b", noop);

        let names: Vec<&str> = registry.lookup("calc").iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["high", "mid-a", "mid-b", "low"]);
    }

    #[test]
    fn test_register_is_idempotent_per_name() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register_fn("calc", 100, "scf", noop));
        assert!(!registry.register_fn("calc", 150, "scf", noop));
        assert_eq!(registry.len("calc"), 1);
        assert_eq!(registry.lookup("calc")[0].priority, 100);
    }

    #[test]
    fn test_same_name_in_different_kinds() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register_fn("a", 1, "h", noop));
        assert!(registry.register_fn("b", 1, "h", noop));
        assert_eq!(registry.kinds(), vec!["a", "b"]);
    }

    #[test]
    fn test_lookup_unknown_kind_is_empty() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup("nothing").is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_with_builtin_registers_reference_handlers() {
        let registry = HandlerRegistry::with_builtin();
        let entries = registry.lookup(crate::domain::BASE_WORKFLOW_KIND);
        let priorities: Vec<i32> = entries.iter().map(|e| e.priority).collect();
        assert_eq!(priorities, vec![130, 120]);
    }
}
