//! Canned answers used when text generation is unavailable.
//!
//! Keyword sets are checked in a fixed order (housing, food, healthcare,
//! emergency) with plain substring matching on the lower-cased message, so
//! "I need rent help, this is an emergency" answers from the housing set.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Housing,
    Food,
    Healthcare,
    Emergency,
}

pub const HOUSING_KEYWORDS: [&str; 6] = ["housing", "homeless", "shelter", "evict", "rent", "apartment"];
pub const FOOD_KEYWORDS: [&str; 6] = ["food", "hungry", "eat", "meal", "snap", "pantry"];
pub const HEALTHCARE_KEYWORDS: [&str; 7] =
    ["health", "doctor", "medical", "sick", "insurance", "therapy", "mental"];
pub const EMERGENCY_KEYWORDS: [&str; 8] = [
    "emergency",
    "crisis",
    "urgent",
    "suicide",
    "kill myself",
    "die",
    "violence",
    "abuse",
];

const HOUSING_RESPONSES: [&str; 3] = [
    "For emergency housing in NYC, you can contact the Department of Homeless Services at 800-994-6494 or visit a Prevention Assistance and Temporary Housing (PATH) center.",
    "NYC offers several housing assistance programs including Section 8 vouchers, NYCHA public housing, and affordable housing lotteries through NYC Housing Connect.",
    "If you're facing eviction, you may qualify for free legal representation through the Right to Counsel program. Call 311 to be connected to legal services.",
];

const FOOD_RESPONSES: [&str; 3] = [
    "NYC has over 500 food pantries and soup kitchens. You can find the nearest one by texting 'FOOD' to 877-877 or calling 311.",
    "SNAP benefits (food stamps) can help you purchase groceries. Apply online at ACCESS HRA or call 718-557-1399 for assistance.",
    "Emergency food assistance is available through GetFoodNYC. Visit nyc.gov/getfood or call 311 to learn more.",
];

const HEALTHCARE_RESPONSES: [&str; 3] = [
    "NYC Health + Hospitals provides care to all New Yorkers regardless of ability to pay or immigration status. Call 844-NYC-4NYC to make an appointment.",
    "NYC Care provides affordable healthcare access for those who don't qualify for or can't afford health insurance. Enroll by calling 646-NYC-CARE.",
    "For mental health support, NYC Well offers free, confidential counseling 24/7. Call 888-NYC-WELL, text WELL to 65173, or chat online.",
];

const EMERGENCY_RESPONSES: [&str; 3] = [
    "If this is a life-threatening emergency, please call 911 immediately.",
    "NYC Well provides 24/7 mental health crisis support at 888-692-9355.",
    "For domestic violence emergencies, call NYC's 24-hour hotline at 800-621-HOPE (4673).",
];

pub const FALLBACK_RESPONSES: [&str; 8] = [
    "I'm currently unable to process your request due to technical limitations. Please try again later or contact support for assistance.",
    "Our AI service is temporarily unavailable. In the meantime, you can call NYC 311 for immediate assistance with city services.",
    "I apologize, but I can't generate a personalized response right now. For urgent housing needs, please call the NYC DHS at 800-994-6494.",
    "Service is currently undergoing maintenance. For immediate mental health support, please contact NYC Well at 888-692-9355.",
    "I'm here to help with housing, healthcare, and emergency resources in NYC. What specific assistance are you looking for today?",
    "I can provide information about NYC resources for housing, food, healthcare, and other essential services. How can I assist you?",
    "NYC offers many support services for residents. Could you tell me more about what kind of help you're looking for?",
    "I'd be happy to help you find resources in NYC. What specific needs do you have right now?",
];

impl Topic {
    /// Match order.
    pub const ALL: [Topic; 4] = [Topic::Housing, Topic::Food, Topic::Healthcare, Topic::Emergency];

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Housing => &HOUSING_KEYWORDS,
            Topic::Food => &FOOD_KEYWORDS,
            Topic::Healthcare => &HEALTHCARE_KEYWORDS,
            Topic::Emergency => &EMERGENCY_KEYWORDS,
        }
    }

    pub fn responses(&self) -> &'static [&'static str] {
        match self {
            Topic::Housing => &HOUSING_RESPONSES,
            Topic::Food => &FOOD_RESPONSES,
            Topic::Healthcare => &HEALTHCARE_RESPONSES,
            Topic::Emergency => &EMERGENCY_RESPONSES,
        }
    }
}

/// First topic whose keyword set matches the message.
pub fn match_topic(message: &str) -> Option<Topic> {
    let message = message.to_lowercase();
    Topic::ALL
        .into_iter()
        .find(|topic| topic.keywords().iter().any(|k| message.contains(k)))
}

/// A canned response for the matched topic, else a generic fallback.
pub fn pattern_or_fallback<R: Rng + ?Sized>(message: &str, rng: &mut R) -> &'static str {
    let options = match match_topic(message) {
        Some(topic) => topic.responses(),
        None => &FALLBACK_RESPONSES,
    };
    options.choose(rng).copied().unwrap_or(FALLBACK_RESPONSES[0])
}

/// Shared uniform picker. Seeded for reproducible runs, otherwise seeded from entropy.
pub struct ResponsePicker {
    rng: Mutex<StdRng>,
}

impl ResponsePicker {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn respond(&self, message: &str) -> &'static str {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pattern_or_fallback(message, &mut *rng)
    }
}
