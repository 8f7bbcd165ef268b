//! AI-assisted drafting
//!
//! Sends one prompt to a generative-language endpoint and turns the reply
//! into a title/content pair for the template editor:
//! - `client` speaks the `generateContent` JSON contract
//! - `prompts` builds the drafting instructions
//! - `draft` validates the request and parses the model's answer

mod client;
mod draft;
mod prompts;

pub use client::GeminiClient;
pub use draft::{Draft, DraftRequest, Tone, request_draft};
