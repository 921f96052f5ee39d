//! Environment system for identifier resolution during closure computation.
//!
//! This module provides immutable linked-list environments for binding names to
//! values, with shadowing semantics: binding a name again hides the older
//! binding without mutating the environment it was derived from. Entering a
//! scatter or conditional body is a `bind` on a clone; leaving it is dropping
//! the clone.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An individual binding of a name to a value.
///
/// Generic over `T`, which is a [`crate::types::Type`] for type environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding<T> {
    name: String,
    value: T,
}

impl<T> Binding<T> {
    pub fn new(name: String, value: T) -> Self {
        Self { name, value }
    }

    /// Get the binding name. Namespaced names are dot-separated.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Display> fmt::Display for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Immutable environment consisting of a linked list of bindings.
#[derive(Debug, Clone)]
pub struct Bindings<T>
where
    T: Clone,
{
    binding: Option<Binding<T>>,
    next: Option<Box<Bindings<T>>>,
}

impl<T> Default for Bindings<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bindings<T>
where
    T: Clone,
{
    /// Create an empty environment.
    pub fn new() -> Self {
        Self {
            binding: None,
            next: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Number of visible (unshadowed) bindings.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Return a new environment with a binding added.
    ///
    /// Any existing binding with the same name is shadowed.
    pub fn bind(&self, name: impl Into<String>, value: T) -> Self {
        Self {
            binding: Some(Binding::new(name.into(), value)),
            next: Some(Box::new(self.clone())),
        }
    }

    /// Look up a binding by exact name.
    pub fn resolve_binding(&self, name: &str) -> Option<&Binding<T>> {
        self.iter().find(|binding| binding.name() == name)
    }

    pub fn resolve(&self, name: &str) -> Option<&T> {
        self.resolve_binding(name).map(|b| b.value())
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.resolve_binding(name).is_some()
    }

    /// True when `name` or one of its dotted prefixes is bound, so a binding
    /// for `add` covers a reference to `add.result`.
    pub fn covers(&self, name: &str) -> bool {
        if self.has_binding(name) {
            return true;
        }
        name.match_indices('.')
            .any(|(idx, _)| self.has_binding(&name[..idx]))
    }

    /// Iterator over unique bindings, newest first (shadowed bindings are skipped).
    pub fn iter(&self) -> BindingIterator<'_, T> {
        BindingIterator {
            current: Some(self),
            seen: HashSet::new(),
        }
    }
}

/// Iterator over bindings in an environment.
pub struct BindingIterator<'a, T: Clone> {
    current: Option<&'a Bindings<T>>,
    seen: HashSet<String>,
}

impl<'a, T: Clone> Iterator for BindingIterator<'a, T> {
    type Item = &'a Binding<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(env) = self.current {
            self.current = env.next.as_deref();
            if let Some(ref binding) = env.binding {
                if self.seen.insert(binding.name().to_string()) {
                    return Some(binding);
                }
            }
        }
        None
    }
}
