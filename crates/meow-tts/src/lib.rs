//! # meow-tts
//!
//! Speech synthesis behind the [`SynthesisClient`] trait.
//!
//! - [`ElevenLabsClient`]: streaming HTTP client for the ElevenLabs API
//! - [`MockSynthesizer`]: scripted responses for tests

#![deny(unsafe_code)]

pub mod client;
pub mod elevenlabs;
pub mod errors;
pub mod mock;

pub use client::{AudioStream, SynthesisClient};
pub use elevenlabs::{ElevenLabsClient, ElevenLabsConfig};
pub use errors::SynthesisError;
pub use mock::{MockResponse, MockSynthesizer};
