pub mod catalog;
pub mod flow;
pub mod handlers;
pub mod models;
pub mod onboarding;
pub mod visibility;
