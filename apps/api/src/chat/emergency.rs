use serde::Serialize;

/// Phrases in the user's own message that bring up the emergency contacts panel.
pub const EMERGENCY_PHRASES: [&str; 7] = [
    "suicide",
    "kill myself",
    "want to die",
    "end my life",
    "domestic violence",
    "abuse",
    "emergency",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmergencyContact {
    pub name: &'static str,
    pub phone: &'static str,
    pub description: &'static str,
}

pub const EMERGENCY_CONTACTS: [EmergencyContact; 4] = [
    EmergencyContact {
        name: "NYC Well Mental Health Crisis",
        phone: "888-692-9355",
        description: "24/7 mental health support",
    },
    EmergencyContact {
        name: "NYC DHS Housing/Shelter",
        phone: "800-994-6494",
        description: "Emergency housing assistance",
    },
    EmergencyContact {
        name: "Safe Horizon Domestic Violence",
        phone: "800-621-4673",
        description: "24/7 domestic violence support",
    },
    EmergencyContact {
        name: "NYC 311",
        phone: "311",
        description: "General city services assistance",
    },
];

pub fn contains_emergency_phrase(message: &str) -> bool {
    let message = message.to_lowercase();
    EMERGENCY_PHRASES.iter().any(|p| message.contains(p))
}
