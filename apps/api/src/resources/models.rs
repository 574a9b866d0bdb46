use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Housing,
    Healthcare,
    Food,
    Emergency,
    Legal,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Housing => "housing",
            ResourceType::Healthcare => "healthcare",
            ResourceType::Food => "food",
            ResourceType::Emergency => "emergency",
            ResourceType::Legal => "legal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "housing" => Some(ResourceType::Housing),
            "healthcare" => Some(ResourceType::Healthcare),
            "food" => Some(ResourceType::Food),
            "emergency" => Some(ResourceType::Emergency),
            "legal" => Some(ResourceType::Legal),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// A catalog entry. Ids are unique only within one location's category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: u32,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub related_question_ids: BTreeSet<i32>,
    #[serde(default)]
    pub show_if_marked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
}

pub const DEFAULT_LOCATION: &str = "nyc";

pub static AVAILABLE_LOCATIONS: [Location; 5] = [
    Location { id: "nyc", name: "New York City" },
    Location { id: "boston", name: "Boston" },
    Location { id: "chicago", name: "Chicago" },
    Location { id: "la", name: "Los Angeles" },
    Location { id: "miami", name: "Miami" },
];

pub fn location_name(id: &str) -> Option<&'static str> {
    AVAILABLE_LOCATIONS
        .iter()
        .find(|l| l.id == id)
        .map(|l| l.name)
}
