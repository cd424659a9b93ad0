//! Prompt enhancement and caption-to-prompt translation
//!
//! Both functions are deterministic string templating over the caller's
//! text. Keyword checks in [`enhance`] always look at the trimmed user text,
//! never at the clauses already appended, so the order of steps cannot leak
//! trigger words from one clause into a later check.

use crate::{Error, Result};
use tracing::debug;

/// Appended when the user did not mention any instrumentation
pub const INSTRUMENTATION_CLAUSE: &str = ", rich instrumentation";

/// Appended when the user gave no tempo/energy hint
pub const TEMPO_CLAUSE: &str = ", dynamic tempo";

/// Production quality descriptors, always appended
pub const QUALITY_CLAUSE: &str = ", high quality, clear sound, professional production";

/// Appended when vocals were requested
pub const VOCALS_CLAUSE: &str = ", with expressive vocals and clear melody";

/// Appended when vocals were not requested
pub const INSTRUMENTAL_CLAUSE: &str = ", instrumental";

/// Musicality descriptors, always the final clause
pub const MUSICALITY_CLAUSE: &str = ", harmonic progression, well-structured composition";

/// Prefix of every suggested prompt derived from an image caption
pub const CAPTION_PROMPT_PREFIX: &str = "Music that captures the mood of: ";

const INSTRUMENT_KEYWORD: &str = "instrument";

const TEMPO_KEYWORDS: [&str; 6] = ["fast", "slow", "upbeat", "calm", "energetic", "relaxed"];

/// Rewrite a user prompt into a richer music-generation prompt
///
/// Steps, in order:
/// 1. Trim the input.
/// 2. Add [`INSTRUMENTATION_CLAUSE`] unless the text mentions "instrument".
/// 3. Add [`TEMPO_CLAUSE`] unless the text mentions a tempo keyword.
/// 4. Add [`QUALITY_CLAUSE`].
/// 5. Add [`VOCALS_CLAUSE`] or [`INSTRUMENTAL_CLAUSE`].
/// 6. Add [`MUSICALITY_CLAUSE`].
///
/// Keyword checks are case-insensitive substring matches, so "Instrumental"
/// and "instrumentation" both count as mentioning "instrument".
///
/// Not idempotent: feeding the output back in yields a different string.
///
/// # Errors
/// [`Error::EmptyInput`] if the prompt is empty after trimming.
pub fn enhance(user_prompt: &str, with_vocals: bool) -> Result<String> {
    let trimmed = user_prompt.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyInput("prompt"));
    }

    let lowered = trimmed.to_lowercase();
    let mut enhanced = String::with_capacity(trimmed.len() + 160);
    enhanced.push_str(trimmed);

    if !lowered.contains(INSTRUMENT_KEYWORD) {
        enhanced.push_str(INSTRUMENTATION_CLAUSE);
    }

    if !TEMPO_KEYWORDS.iter().any(|word| lowered.contains(word)) {
        enhanced.push_str(TEMPO_CLAUSE);
    }

    enhanced.push_str(QUALITY_CLAUSE);

    if with_vocals {
        enhanced.push_str(VOCALS_CLAUSE);
    } else {
        enhanced.push_str(INSTRUMENTAL_CLAUSE);
    }

    enhanced.push_str(MUSICALITY_CLAUSE);

    debug!(enhanced = %enhanced, "Enhanced prompt");
    Ok(enhanced)
}

/// Wrap an image caption into a suggested music prompt
///
/// The caption is used verbatim (no trimming).
///
/// # Errors
/// [`Error::EmptyInput`] if the caption is empty.
pub fn suggest_prompt(caption: &str) -> Result<String> {
    if caption.is_empty() {
        return Err(Error::EmptyInput("caption"));
    }
    Ok(format!("{}{}", CAPTION_PROMPT_PREFIX, caption))
}
