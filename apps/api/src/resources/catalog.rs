//! Static resource catalog, compiled in from `data/resources.json`.
//!
//! Layout is `location -> category -> [Resource]`. Locations without their own
//! data resolve to the default location's entries.

use std::collections::BTreeMap;

use thiserror::Error;

use super::models::{Resource, ResourceType, DEFAULT_LOCATION};

const BUNDLED_RESOURCES: &str = include_str!("../../data/resources.json");

pub const RELATED_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed resource catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Resource catalog has no entries for the default location '{0}'")]
    MissingDefaultLocation(&'static str),
}

#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    locations: BTreeMap<String, BTreeMap<ResourceType, Vec<Resource>>>,
}

impl ResourceCatalog {
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_RESOURCES)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let locations: BTreeMap<String, BTreeMap<ResourceType, Vec<Resource>>> =
            serde_json::from_str(json)?;
        if !locations.contains_key(DEFAULT_LOCATION) {
            return Err(CatalogError::MissingDefaultLocation(DEFAULT_LOCATION));
        }
        Ok(Self { locations })
    }

    /// The location whose data serves `requested`.
    pub fn resolve_location<'a>(&'a self, requested: &'a str) -> &'a str {
        if self.locations.contains_key(requested) {
            requested
        } else {
            DEFAULT_LOCATION
        }
    }

    pub fn has_location(&self, location: &str) -> bool {
        self.locations.contains_key(location)
    }

    /// Resources of one category. Empty when the location has none.
    pub fn category(&self, location: &str, resource_type: ResourceType) -> &[Resource] {
        self.locations
            .get(self.resolve_location(location))
            .and_then(|categories| categories.get(&resource_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every resource of a location, grouped in category order.
    pub fn for_location(&self, location: &str) -> Vec<&Resource> {
        self.locations
            .get(self.resolve_location(location))
            .map(|categories| categories.values().flatten().collect())
            .unwrap_or_default()
    }

    pub fn find(&self, location: &str, resource_type: ResourceType, id: u32) -> Option<&Resource> {
        self.category(location, resource_type)
            .iter()
            .find(|r| r.id == id)
    }

    /// Up to [`RELATED_LIMIT`] other resources sharing the category and location.
    pub fn related(&self, resource: &Resource) -> Vec<&Resource> {
        self.category(&resource.location, resource.resource_type)
            .iter()
            .filter(|r| r.id != resource.id && r.location == resource.location)
            .take(RELATED_LIMIT)
            .collect()
    }

    /// The first `limit` resources of a location, used as chat prompt context.
    pub fn sample(&self, location: &str, limit: usize) -> Vec<&Resource> {
        self.for_location(location).into_iter().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ResourceCatalog {
        ResourceCatalog::bundled().unwrap()
    }

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = catalog();
        assert!(catalog.has_location("nyc"));
        assert!(catalog.has_location("boston"));
        assert_eq!(catalog.category("nyc", ResourceType::Emergency).len(), 4);
    }

    #[test]
    fn test_unknown_location_falls_back_to_nyc() {
        let catalog = catalog();
        assert_eq!(catalog.resolve_location("miami"), "nyc");
        assert_eq!(
            catalog.category("miami", ResourceType::Food),
            catalog.category("nyc", ResourceType::Food)
        );
    }

    #[test]
    fn test_locations_are_not_merged() {
        let catalog = catalog();
        assert!(catalog
            .for_location("boston")
            .iter()
            .all(|r| r.location == "boston"));
        assert!(catalog.category("boston", ResourceType::Legal).is_empty());
    }

    #[test]
    fn test_find_and_related() {
        let catalog = catalog();
        let resource = catalog.find("nyc", ResourceType::Housing, 1).unwrap();
        let related = catalog.related(resource);
        assert_eq!(related.len(), RELATED_LIMIT);
        assert!(related.iter().all(|r| r.id != 1));
        assert!(related
            .iter()
            .all(|r| r.resource_type == ResourceType::Housing && r.location == "nyc"));
    }

    #[test]
    fn test_related_is_empty_for_single_entry_category() {
        let catalog = catalog();
        let resource = catalog.find("boston", ResourceType::Food, 104).unwrap();
        assert!(catalog.related(resource).is_empty());
    }

    #[test]
    fn test_sample_is_bounded() {
        assert_eq!(catalog().sample("nyc", 5).len(), 5);
    }

    #[test]
    fn test_catalog_without_default_location_is_rejected() {
        let err = ResourceCatalog::from_json(r#"{"boston": {}}"#).unwrap_err();
        assert!(matches!(err, CatalogError::MissingDefaultLocation("nyc")));
    }

    #[test]
    fn test_unknown_category_is_a_parse_error() {
        let err = ResourceCatalog::from_json(r#"{"nyc": {"transport": []}}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
