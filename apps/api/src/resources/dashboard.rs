use serde::Serialize;

use super::catalog::ResourceCatalog;
use super::models::{Resource, ResourceType};
use super::relevance::{is_resource_high_priority, UserNeeds};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedResource {
    #[serde(flatten)]
    pub resource: Resource,
    pub high_priority: bool,
}

impl AnnotatedResource {
    /// Preview mode hides the badge without changing what the engine decided.
    pub fn new(resource: &Resource, needs: Option<&UserNeeds>, preview: bool) -> Self {
        Self {
            resource: resource.clone(),
            high_priority: !preview && is_resource_high_priority(resource, needs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceBuckets {
    pub emergency: Vec<AnnotatedResource>,
    pub housing: Vec<AnnotatedResource>,
    pub healthcare: Vec<AnnotatedResource>,
    pub food: Vec<AnnotatedResource>,
}

impl ResourceBuckets {
    pub fn get(&self, resource_type: ResourceType) -> &[AnnotatedResource] {
        match resource_type {
            ResourceType::Emergency => &self.emergency,
            ResourceType::Housing => &self.housing,
            ResourceType::Healthcare => &self.healthcare,
            ResourceType::Food => &self.food,
            ResourceType::Legal => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotatedResource> {
        self.emergency
            .iter()
            .chain(&self.housing)
            .chain(&self.healthcare)
            .chain(&self.food)
    }
}

/// Builds the four dashboard buckets for one location. Pure: the same inputs give the same buckets.
pub fn select_dashboard_resources(
    catalog: &ResourceCatalog,
    location: &str,
    needs: Option<&UserNeeds>,
    preview: bool,
) -> ResourceBuckets {
    let annotate = |resource_type: ResourceType| -> Vec<AnnotatedResource> {
        catalog
            .category(location, resource_type)
            .iter()
            .map(|r| AnnotatedResource::new(r, needs, preview))
            .collect()
    };

    ResourceBuckets {
        emergency: annotate(ResourceType::Emergency),
        housing: annotate(ResourceType::Housing),
        healthcare: annotate(ResourceType::Healthcare),
        food: annotate(ResourceType::Food),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::models::Priority;

    fn catalog() -> ResourceCatalog {
        ResourceCatalog::bundled().unwrap()
    }

    fn homeless_needs() -> UserNeeds {
        UserNeeds {
            housing_status: "homeless".into(),
            food_security: "never".into(),
            healthcare_needs: vec![],
            location: "nyc".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_homeless_user_in_nyc() {
        let needs = homeless_needs();
        let buckets = select_dashboard_resources(&catalog(), "nyc", Some(&needs), false);

        assert!(!buckets.housing.is_empty());
        assert!(buckets.housing.iter().all(|r| r.high_priority));
        assert!(buckets.emergency.iter().all(|r| r.high_priority));

        // Without answers, food and healthcare fall through to static priority.
        for r in buckets.food.iter().chain(&buckets.healthcare) {
            assert_eq!(r.high_priority, r.resource.priority == Priority::High);
        }
        assert!(buckets.food.iter().any(|r| !r.high_priority));
    }

    #[test]
    fn test_preview_turns_every_badge_off() {
        let needs = homeless_needs();
        let buckets = select_dashboard_resources(&catalog(), "nyc", Some(&needs), true);
        assert!(buckets.iter().all(|r| !r.high_priority));
    }

    #[test]
    fn test_guest_sees_static_priority() {
        let buckets = select_dashboard_resources(&catalog(), "nyc", None, false);
        assert!(buckets
            .iter()
            .all(|r| r.high_priority == (r.resource.priority == Priority::High)));
    }

    #[test]
    fn test_legal_is_not_bucketed() {
        let buckets = select_dashboard_resources(&catalog(), "nyc", None, false);
        assert!(buckets.iter().all(|r| r.resource.resource_type != ResourceType::Legal));
        assert!(buckets.get(ResourceType::Legal).is_empty());
    }

    #[test]
    fn test_switching_location_recomputes() {
        let catalog = catalog();
        let nyc = select_dashboard_resources(&catalog, "nyc", None, false);
        let boston = select_dashboard_resources(&catalog, "boston", None, false);
        assert_ne!(nyc, boston);
        assert!(boston.iter().all(|r| r.resource.location == "boston"));
        assert_eq!(boston, select_dashboard_resources(&catalog, "boston", None, false));
    }

    #[test]
    fn test_serializes_flat_with_badge() {
        let buckets = select_dashboard_resources(&catalog(), "boston", None, false);
        let json = serde_json::to_value(&buckets.food[0]).unwrap();
        assert_eq!(json["type"], "food");
        assert_eq!(json["high_priority"], true);
    }
}
