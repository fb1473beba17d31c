//! Component catalog.
//!
//! The registry maps every component id the build understands to the
//! auxiliary Foundation plugins it needs. It is built once at startup and
//! passed by reference to everything that resolves or composes asset lists.

use std::collections::HashMap;

/// A single entry of the component catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Component id (e.g. "top-bar")
    pub id: String,

    /// Auxiliary script ids, in load order (e.g. "topbar")
    pub javascripts: Vec<String>,
}

impl ComponentDescriptor {
    /// Create a descriptor from an id and its script ids.
    pub fn new(id: impl Into<String>, javascripts: &[&str]) -> Self {
        Self {
            id: id.into(),
            javascripts: javascripts.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Read-only mapping from component id to descriptor.
///
/// Iteration follows registration order so every consumer sees the same
/// sequence of ids.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entries: Vec<ComponentDescriptor>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    /// Build a registry from descriptors. Ids must be unique.
    pub fn new(entries: Vec<ComponentDescriptor>) -> Result<Self, ComponentError> {
        let mut index = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.id.clone(), position).is_some() {
                return Err(ComponentError::Duplicate(entry.id.clone()));
            }
        }

        Ok(Self { entries, index })
    }

    /// The Foundation 5 component catalog.
    pub fn foundation() -> Self {
        let entries: Vec<ComponentDescriptor> = FOUNDATION_COMPONENTS
            .iter()
            .map(|(id, scripts)| ComponentDescriptor::new(*id, scripts))
            .collect();

        // Ids in the table are unique
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();

        Self { entries, index }
    }

    /// Look up a component by id.
    pub fn lookup(&self, id: &str) -> Result<&ComponentDescriptor, ComponentError> {
        self.index
            .get(id)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| ComponentError::Unknown(id.to_string()))
    }

    /// Check if a component exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.entries.iter()
    }

    /// All registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The registry together with the components every site must include.
#[derive(Debug, Clone)]
pub struct Catalog {
    registry: ComponentRegistry,
    required: Vec<String>,
}

impl Catalog {
    /// Pair a registry with a required set. Every required id must be registered.
    pub fn new(registry: ComponentRegistry, required: Vec<String>) -> Result<Self, ComponentError> {
        if let Some(missing) = required.iter().find(|id| !registry.contains(id)) {
            return Err(ComponentError::Unknown(missing.clone()));
        }

        Ok(Self { registry, required })
    }

    /// Foundation catalog with the boilerplate's required components.
    pub fn foundation() -> Self {
        Self {
            registry: ComponentRegistry::foundation(),
            required: REQUIRED_COMPONENTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Components active for every site, in catalog order.
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::foundation()
    }
}

/// Errors raised by the catalog and the resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    #[error("Unknown component: {0}")]
    Unknown(String),

    #[error("Component registered twice: {0}")]
    Duplicate(String),
}

const FOUNDATION_COMPONENTS: &[(&str, &[&str])] = &[
    ("grid", &["interchange"]),
    ("accordion", &["accordion"]),
    ("alert-boxes", &["alert"]),
    ("block-grid", &[]),
    ("breadcrumbs", &[]),
    ("button-groups", &[]),
    ("buttons", &[]),
    ("clearing", &["clearing"]),
    ("dropdown", &["dropdown"]),
    ("dropdown-buttons", &[]),
    ("equalizer", &["equalizer"]),
    ("flex-video", &[]),
    ("forms", &["abide"]),
    ("icon-bar", &[]),
    ("inline-lists", &[]),
    ("joyride", &["joyride"]),
    ("keystrokes", &[]),
    ("labels", &[]),
    ("magellan", &["magellan"]),
    ("orbit", &["orbit"]),
    ("pagination", &[]),
    ("panels", &[]),
    ("pricing-tables", &[]),
    ("progress-bars", &[]),
    ("range-slider", &["slider"]),
    ("reveal", &["reveal"]),
    ("side-nav", &[]),
    ("split-buttons", &["dropdown"]),
    ("sub-nav", &[]),
    ("switches", &[]),
    ("tables", &[]),
    ("tabs", &["tab"]),
    ("thumbs", &[]),
    ("tooltips", &["tooltip"]),
    ("top-bar", &["topbar"]),
    ("type", &[]),
    ("offcanvas", &["offcanvas"]),
    ("visibility", &[]),
];

const REQUIRED_COMPONENTS: &[&str] = &[
    "grid",
    "alert-boxes",
    "breadcrumbs",
    "equalizer",
    "forms",
    "inline-lists",
    "pagination",
    "tables",
    "top-bar",
    "type",
    "visibility",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_registered_components() {
        let registry = ComponentRegistry::foundation();

        let top_bar = registry.lookup("top-bar").unwrap();

        assert_eq!(top_bar.javascripts, vec!["topbar".to_string()]);
        assert_eq!(registry.len(), 38);
    }

    #[test]
    fn unknown_lookup_is_an_error() {
        let registry = ComponentRegistry::foundation();

        assert_eq!(
            registry.lookup("carousel"),
            Err(ComponentError::Unknown("carousel".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = ComponentRegistry::new(vec![
            ComponentDescriptor::new("grid", &[]),
            ComponentDescriptor::new("grid", &["interchange"]),
        ]);

        assert!(matches!(result, Err(ComponentError::Duplicate(id)) if id == "grid"));
    }

    #[test]
    fn required_set_must_be_registered() {
        let registry =
            ComponentRegistry::new(vec![ComponentDescriptor::new("grid", &["interchange"])])
                .unwrap();

        let result = Catalog::new(registry, vec!["grid".into(), "tabs".into()]);

        assert!(matches!(result, Err(ComponentError::Unknown(id)) if id == "tabs"));
    }

    #[test]
    fn foundation_required_set_is_registered() {
        let catalog = Catalog::foundation();

        for id in catalog.required() {
            assert!(catalog.registry().contains(id), "{id} missing");
        }
    }
}
