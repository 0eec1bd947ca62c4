//! TTS partition: synthesized speech cached under a synthetic key.

use serde::Serialize;

use hypernews_core::{Error, cache::hash::tts_cache_key};

use super::ServiceWorker;
use crate::fetch::{Request, Response};

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
}

impl ServiceWorker {
    /// Cached clip for `voice` and `text`, if any.
    pub async fn cached_speech(&self, voice: &str, text: &str) -> Option<Response> {
        self.lookup(&self.partitions.tts, &tts_cache_key(voice, text)).await
    }

    /// Synthesize through the backend and cache the audio.
    ///
    /// A 402 answer maps to `PaymentRequired`; other failures to `HttpError`.
    pub async fn synthesize_speech(&self, voice: &str, text: &str) -> Result<Response, Error> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("text must not be empty".into()));
        }

        let url = self.resolve(&format!("{}tts", self.config.api_prefix))?;
        let request = Request::post_json(url, &SpeechRequest { text, voice_id: voice })?;
        let response = self.network.fetch(&request).await?;

        match response.status {
            402 => return Err(Error::PaymentRequired("speech synthesis requires a subscription".into())),
            status if !response.is_success() => return Err(Error::HttpError(format!("TTS error: {status}"))),
            _ => {}
        }

        let audio = Response { content_type: Some("audio/mpeg".into()), headers: Vec::new(), ..response };
        self.store(&self.partitions.tts, &tts_cache_key(voice, text), &audio).await;
        Ok(audio)
    }

    /// Cache-first speech lookup.
    pub async fn speech(&self, voice: &str, text: &str) -> Result<Response, Error> {
        match self.cached_speech(voice, text).await {
            Some(cached) => Ok(cached),
            None => self.synthesize_speech(voice, text).await,
        }
    }
}
