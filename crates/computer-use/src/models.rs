//! These models represent the objects passed around by the agent
//!
//! Every vendor speaks a slightly different dialect of the same chat format:
//! - openai-compatible messages/tools, sent to most hosted models
//! - anthropic messages/tools, with a side-channel system prompt
//! - mistral messages, which may not end on an assistant turn
//!
//! The internal models are simpler than any of these. Images are
//! kept as raw bytes and only encoded by the provider that sends them.
pub mod message;
pub mod tool;
