//! Cache key generation for partition entries.

use sha2::{Digest, Sha256};

/// Key of a request-identified entry: method plus absolute URL.
pub fn request_key(method: &str, url: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), url)
}

/// Synthetic key of a synthesized speech clip.
///
/// Voice and text are hashed together so that keys stay short and never
/// leak the spoken text into the store's key index. The voice is length
/// prefixed so no (voice, text) split collides with another.
pub fn tts_cache_key(voice: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((voice.len() as u64).to_le_bytes());
    hasher.update(voice.as_bytes());
    hasher.update(text.as_bytes());
    format!("/tts-cache/{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_normalizes_method() {
        assert_eq!(request_key("get", "https://example.com/a"), "GET https://example.com/a");
    }

    #[test]
    fn test_tts_key_stability() {
        assert_eq!(tts_cache_key("el:rachel", "hello"), tts_cache_key("el:rachel", "hello"));
    }

    #[test]
    fn test_tts_key_depends_on_voice_and_text() {
        let base = tts_cache_key("el:rachel", "hello");
        assert_ne!(base, tts_cache_key("openai:nova", "hello"));
        assert_ne!(base, tts_cache_key("el:rachel", "hello!"));
        assert_ne!(tts_cache_key("ab", "c"), tts_cache_key("a", "bc"));
    }

    #[test]
    fn test_tts_key_newlines_do_not_collide() {
        assert_ne!(tts_cache_key("a\nb", "c"), tts_cache_key("a", "b\nc"));
        assert_ne!(tts_cache_key("", "a"), tts_cache_key("a", ""));
    }

    #[test]
    fn test_tts_key_format() {
        let key = tts_cache_key("voice", "text");
        let digest = key.strip_prefix("/tts-cache/").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
