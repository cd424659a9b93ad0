//! # AIMS Common Library
//!
//! Shared code for the AI Music Service:
//! - Prompt enhancement and caption-to-prompt translation
//! - Audio post-processing (normalize, clip, quantize to 16-bit PCM)
//! - WAV serialization of generated waveforms
//! - TOML bootstrap configuration
//!
//! Everything in [`prompt`] and [`audio`] is pure and stateless, so it can be
//! called from any thread without coordination.

pub mod audio;
pub mod config;
pub mod error;
pub mod prompt;

pub use audio::{postprocess, AudioLayout, PcmWaveform, RawAudioBuffer};
pub use error::{Error, Result};
pub use prompt::{enhance, suggest_prompt};
