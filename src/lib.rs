//! Screenshot-to-code service.
//!
//! Takes an image URL (or captures one from a website), asks a vision model
//! to turn it into a React + Tailwind component and streams the code back
//! as it is produced.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod llm;
pub mod prompts;
pub mod relay;
pub mod screenshot;
