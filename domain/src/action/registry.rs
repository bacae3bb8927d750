//! Capability registry and resolver.
//!
//! [`ActionRegistry`] is the single source of truth for what can be invoked.
//! It is built once at startup from the descriptors every integration
//! supplies, then shared read-only (`Arc<ActionRegistry>`) with the
//! dispatcher and tool adapter.
//!
//! # Registration checks
//!
//! Authoring mistakes fail [`register`](ActionRegistry::register), and so
//! process startup, instead of surfacing at dispatch time:
//!
//! - empty or duplicate names (compared normalized)
//! - aliases colliding with another action's name or alias
//! - examples whose `input` does not satisfy the input schema
//!
//! # Resolution
//!
//! [`resolve`](ActionRegistry::resolve) normalizes the query (trim,
//! lowercase, collapse whitespace), prefers an exact name match, then falls
//! back to aliases in registration order.

use super::descriptor::ActionDescriptor;
use super::schema::ValidationError;
use crate::core::string::normalize_key;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while building or querying the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Action name must not be empty")]
    EmptyName,

    #[error("Action '{0}' is already registered")]
    DuplicateName(String),

    #[error("Alias '{alias}' of action '{action}' collides with action '{existing}'")]
    AliasCollision {
        alias: String,
        action: String,
        existing: String,
    },

    #[error("Example #{index} of action '{action}' does not satisfy its input schema: {source}")]
    InvalidExample {
        action: String,
        index: usize,
        source: ValidationError,
    },

    #[error("Action not found: {0}")]
    NotFound(String),
}

/// Registry of action descriptors, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    entries: Vec<Arc<ActionDescriptor>>,
    /// Normalized name → index into `entries`
    names: HashMap<String, usize>,
    /// Normalized alias → index into `entries`
    aliases: HashMap<String, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a closed set of descriptors, failing on the first
    /// authoring error.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ActionDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Register a descriptor after running the self-checks.
    pub fn register(
        &mut self,
        descriptor: ActionDescriptor,
    ) -> Result<Arc<ActionDescriptor>, RegistryError> {
        let key = normalize_key(descriptor.name());
        if key.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.names.contains_key(&key) {
            return Err(RegistryError::DuplicateName(descriptor.name().to_string()));
        }
        if let Some(&index) = self.aliases.get(&key) {
            return Err(RegistryError::AliasCollision {
                alias: key,
                action: self.entries[index].name().to_string(),
                existing: descriptor.name().to_string(),
            });
        }

        for alias in descriptor.aliases() {
            if *alias == key {
                continue;
            }
            if let Some(&index) = self.names.get(alias).or_else(|| self.aliases.get(alias)) {
                return Err(RegistryError::AliasCollision {
                    alias: alias.clone(),
                    action: descriptor.name().to_string(),
                    existing: self.entries[index].name().to_string(),
                });
            }
        }

        if let Some((index, source)) = descriptor.first_invalid_example() {
            return Err(RegistryError::InvalidExample {
                action: descriptor.name().to_string(),
                index,
                source,
            });
        }

        let index = self.entries.len();
        self.names.insert(key.clone(), index);
        for alias in descriptor.aliases() {
            if *alias != key {
                self.aliases.insert(alias.clone(), index);
            }
        }

        let descriptor = Arc::new(descriptor);
        self.entries.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Exact lookup by registered name.
    pub fn get(&self, name: &str) -> Result<&Arc<ActionDescriptor>, RegistryError> {
        self.names
            .get(&normalize_key(name))
            .map(|&index| &self.entries[index])
            .filter(|d| d.name() == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Resolve a planner-supplied name or alias.
    pub fn resolve(&self, query: &str) -> Result<&Arc<ActionDescriptor>, RegistryError> {
        let key = normalize_key(query);
        self.names
            .get(&key)
            .or_else(|| self.aliases.get(&key))
            .map(|&index| &self.entries[index])
            .ok_or_else(|| RegistryError::NotFound(query.trim().to_string()))
    }

    pub fn contains(&self, query: &str) -> bool {
        self.resolve(query).is_ok()
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActionDescriptor>> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.name())
    }

    pub fn confirmation_required(&self) -> impl Iterator<Item = &Arc<ActionDescriptor>> {
        self.entries.iter().filter(|d| d.requires_confirmation())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
