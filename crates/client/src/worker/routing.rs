//! Request classification: which strategy handles a request.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Method;

use crate::fetch::{Destination, Request};

static IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|webp|svg|ico)$").expect("Invalid regex"));

/// Strategy selected for a request. First matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Non-GET: goes to the network untouched.
    Passthrough,
    /// Backend JSON under the API prefix: stale-while-revalidate.
    Api,
    /// Thumbnails: cache-first.
    Image,
    /// Application shell: cache-first with background update.
    Static,
}

/// Pick the strategy for `request`.
pub fn classify(request: &Request, api_prefix: &str) -> Route {
    if request.method != Method::GET {
        return Route::Passthrough;
    }
    if request.url.path().starts_with(api_prefix) {
        return Route::Api;
    }
    if looks_like_image(request) {
        return Route::Image;
    }
    Route::Static
}

fn looks_like_image(request: &Request) -> bool {
    if request.destination == Destination::Image {
        return true;
    }
    IMAGE_EXT.is_match(request.url.path())
}
