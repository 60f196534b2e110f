pub mod anthropic;
pub mod base;
pub mod chat;
pub mod configs;
pub mod factory;
pub mod format;
pub mod mistral;
pub mod openai;
pub mod tool_parser;
pub mod utils;

#[cfg(test)]
pub mod mock;
