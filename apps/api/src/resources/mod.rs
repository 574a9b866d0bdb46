pub mod catalog;
pub mod dashboard;
pub mod handlers;
pub mod models;
pub mod relevance;
