pub mod agent;
pub mod config;
pub mod errors;
pub mod grounding;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod sandbox;
pub mod tools;
