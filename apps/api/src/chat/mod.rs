pub mod emergency;
pub mod handlers;
pub mod patterns;
pub mod prompts;
pub mod sanitize;
pub mod service;
