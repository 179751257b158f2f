pub mod elevenlabs;
pub mod openai;
pub mod pexels;

/// First 800 characters of a response body, for diagnostics.
pub(crate) fn body_snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}
