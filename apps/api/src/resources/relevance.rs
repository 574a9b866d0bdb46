//! Relevance engine: decides whether a resource is flagged high priority for a viewer.
//!
//! Rules run in order and stop at the first match:
//! 1. no needs (guest or preview): the resource's static priority
//! 2. a type-specific check against the viewer's needs
//! 3. a "yes" answer to one of the resource's related questions
//! 4. for `show_if_marked` resources, a "yes" answer per [`MARKED_RESPONSE_POLICY`]
//! 5. the resource's static priority

use serde::{Deserialize, Serialize};

use super::models::{Priority, Resource, ResourceType};
use crate::questionnaire::models::UserResponse;
use crate::questionnaire::visibility::YES;

/// Substrings of `housing_status` that indicate unstable housing.
pub const UNSTABLE_HOUSING_MARKERS: [&str; 4] = ["unstable", "temporary", "homeless", "at_risk"];

pub const FOOD_INSECURE_LEVELS: [&str; 3] = ["sometimes", "often", "always"];

pub const CITIZEN: &str = "citizen";

/// Which "yes" answers satisfy the `show_if_marked` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkedResponsePolicy {
    /// Any "yes" answer anywhere in the questionnaire.
    AnyYesAnswer,
    /// Only "yes" answers to the resource's own related questions.
    RelatedYesAnswer,
}

// AnyYesAnswer over-triggers: one "yes" marks every show_if_marked resource.
pub const MARKED_RESPONSE_POLICY: MarkedResponsePolicy = MarkedResponsePolicy::AnyYesAnswer;

/// Personalization inputs projected from a stored profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNeeds {
    pub housing_status: String,
    pub food_security: String,
    pub healthcare_needs: Vec<String>,
    pub immigration_status: String,
    pub has_children: bool,
    pub responses: Vec<UserResponse>,
    pub location: String,
}

pub fn is_resource_high_priority(resource: &Resource, needs: Option<&UserNeeds>) -> bool {
    is_resource_high_priority_with_policy(resource, needs, MARKED_RESPONSE_POLICY)
}

pub fn is_resource_high_priority_with_policy(
    resource: &Resource,
    needs: Option<&UserNeeds>,
    policy: MarkedResponsePolicy,
) -> bool {
    let statically_high = resource.priority == Priority::High;

    let Some(needs) = needs else {
        return statically_high;
    };

    if matches_type_need(resource.resource_type, needs) {
        return true;
    }

    if answered_yes_to_related(resource, &needs.responses) {
        return true;
    }

    if resource.show_if_marked && marked(resource, &needs.responses, policy) {
        return true;
    }

    statically_high
}

fn matches_type_need(resource_type: ResourceType, needs: &UserNeeds) -> bool {
    match resource_type {
        ResourceType::Housing => UNSTABLE_HOUSING_MARKERS
            .iter()
            .any(|marker| needs.housing_status.contains(marker)),
        ResourceType::Food => FOOD_INSECURE_LEVELS.contains(&needs.food_security.as_str()),
        ResourceType::Healthcare => !needs.healthcare_needs.is_empty(),
        ResourceType::Emergency => true,
        ResourceType::Legal => {
            !needs.immigration_status.is_empty() && needs.immigration_status != CITIZEN
        }
    }
}

fn answered_yes_to_related(resource: &Resource, responses: &[UserResponse]) -> bool {
    !resource.related_question_ids.is_empty()
        && responses.iter().any(|r| {
            resource.related_question_ids.contains(&r.question_id) && r.response == YES
        })
}

fn marked(resource: &Resource, responses: &[UserResponse], policy: MarkedResponsePolicy) -> bool {
    match policy {
        MarkedResponsePolicy::AnyYesAnswer => responses.iter().any(|r| r.response == YES),
        MarkedResponsePolicy::RelatedYesAnswer => answered_yes_to_related(resource, responses),
    }
}
