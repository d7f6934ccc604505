//! NFT image generation for new agents

mod generator;
pub mod prompts;

pub use generator::{ImageGenerator, ImageSubject};
