//! Custom lookup registry.
//!
//! Lookups that the built-in [`Lookup`](crate::query::lookups::Lookup) enum
//! does not cover can be registered here by name with a SQL template. The
//! global registry ships with `ne` (`<lhs> <> <rhs>`), the one comparison
//! operator missing from the standard suffix set; applications can register
//! more at startup via [`register_lookup`].
//!
//! Resolution happens when a filter is built (see
//! [`F::lookup`](crate::query::fields::F::lookup)); the compiler renders the
//! template with a backend-appropriate parameter placeholder.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// The SQL template for the default not-equal lookup.
pub const NE_SQL: &str = "{column} <> {value}";

/// A custom lookup that produces a boolean SQL expression.
///
/// The template uses `{column}` and `{value}` placeholders; `{value}` is
/// replaced with a parameter placeholder appropriate for the backend
/// (`$1`, `?`, ...), never with the literal value.
#[derive(Debug, Clone)]
pub struct CustomLookup {
    /// The name of this lookup (e.g., "ne").
    pub name: String,
    /// The SQL template with `{column}` and `{value}` placeholders.
    pub sql_template: String,
}

impl CustomLookup {
    /// Creates a new custom lookup.
    pub fn new(name: impl Into<String>, sql_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_template: sql_template.into(),
        }
    }

    /// Renders this lookup for the given column and parameter placeholder.
    pub fn compile(&self, column: &str, placeholder: &str) -> String {
        self.sql_template
            .replace("{column}", &format!("\"{column}\""))
            .replace("{value}", placeholder)
    }
}

/// A registry of custom lookups, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct LookupRegistry {
    lookups: HashMap<String, CustomLookup>,
}

impl LookupRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the standard extras.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CustomLookup::new("ne", NE_SQL));
        registry
    }

    /// Registers a lookup under its own name, replacing any previous entry.
    pub fn register(&mut self, lookup: CustomLookup) {
        self.lookups.insert(lookup.name.clone(), lookup);
    }

    /// Returns the lookup registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&CustomLookup> {
        self.lookups.get(name)
    }
}

static REGISTRY: LazyLock<RwLock<LookupRegistry>> =
    LazyLock::new(|| RwLock::new(LookupRegistry::with_defaults()));

/// Registers a lookup in the global registry.
pub fn register_lookup(lookup: CustomLookup) {
    if let Ok(mut registry) = REGISTRY.write() {
        registry.register(lookup);
    }
}

/// Resolves a lookup name against the global registry.
pub fn resolve(name: &str) -> Option<CustomLookup> {
    REGISTRY
        .read()
        .ok()
        .and_then(|registry| registry.get(name).cloned())
}
