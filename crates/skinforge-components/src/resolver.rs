//! Active component resolution.

use crate::registry::{Catalog, ComponentDescriptor, ComponentError};

/// Components active for one site: the required set followed by the site's
/// own selection.
///
/// Duplicates are kept. The variable document relies on first-declaration
/// semantics, so a repeated id is harmless there, and script composition
/// deduplicates on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveComponentSet {
    ids: Vec<String>,
}

impl ActiveComponentSet {
    /// Active ids in resolution order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Whether the inclusion flag for `id` is on.
    pub fn is_active(&self, id: &str) -> bool {
        self.ids.iter().any(|active| active == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Resolves site selections against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct ComponentResolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> ComponentResolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Compute the active set for a site's component selection.
    ///
    /// All-or-nothing: the first unregistered id fails the whole resolution.
    pub fn resolve(&self, selected: &[String]) -> Result<ActiveComponentSet, ComponentError> {
        let registry = self.catalog.registry();

        let ids: Vec<String> = self
            .catalog
            .required()
            .iter()
            .chain(selected)
            .cloned()
            .collect();

        if let Some(unknown) = ids.iter().find(|id| !registry.contains(id)) {
            return Err(ComponentError::Unknown(unknown.clone()));
        }

        Ok(ActiveComponentSet { ids })
    }

    /// Descriptors of the active set, in order.
    pub fn descriptors<'s>(
        &self,
        active: &'s ActiveComponentSet,
    ) -> impl Iterator<Item = &'a ComponentDescriptor> + 's
    where
        'a: 's,
    {
        let registry = self.catalog.registry();
        active.iter().filter_map(move |id| registry.lookup(id).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ComponentDescriptor, ComponentRegistry};
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let registry = ComponentRegistry::new(vec![
            ComponentDescriptor::new("accordion", &["accordion"]),
            ComponentDescriptor::new("grid", &["interchange"]),
            ComponentDescriptor::new("tabs", &["tab"]),
        ])
        .unwrap();
        Catalog::new(registry, vec!["grid".to_string()]).unwrap()
    }

    #[test]
    fn required_components_come_first() {
        let catalog = catalog();
        let resolver = ComponentResolver::new(&catalog);

        let active = resolver.resolve(&["accordion".to_string()]).unwrap();

        assert_eq!(active.ids(), &["grid".to_string(), "accordion".to_string()]);
        assert!(active.is_active("accordion"));
        assert!(!active.is_active("tabs"));
    }

    #[test]
    fn keeps_duplicate_selections() {
        let catalog = catalog();
        let resolver = ComponentResolver::new(&catalog);

        let active = resolver.resolve(&["grid".to_string()]).unwrap();

        assert_eq!(active.len(), 2);
    }

    #[test]
    fn fails_on_unknown_selection() {
        let catalog = catalog();
        let resolver = ComponentResolver::new(&catalog);

        let result = resolver.resolve(&["tabs".to_string(), "carousel".to_string()]);

        assert_eq!(result, Err(ComponentError::Unknown("carousel".to_string())));
    }

    #[test]
    fn empty_selection_resolves_to_required_set() {
        let catalog = Catalog::foundation();
        let resolver = ComponentResolver::new(&catalog);

        let active = resolver.resolve(&[]).unwrap();

        assert_eq!(active.ids(), catalog.required());
    }
}
