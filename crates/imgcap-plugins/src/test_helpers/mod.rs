//! Test helpers for node unit tests
//!
//! Fixtures for configurations, tensors and chat-completion response bodies.

use imgcap_core::{CaptionConfig, EnvFallback, EnvSearch};
use imgcap_processing::ImageTensor;
use serde_json::json;

/// Configuration with a test key pointing at a mock server
pub fn test_config(base_url: &str) -> CaptionConfig {
    CaptionConfig::with_api_key("sk-test").with_base_url(base_url)
}

/// Configuration that found neither a `.env` nor an `OPENAI_API_KEY`
pub fn config_without_key(base_url: &str) -> CaptionConfig {
    let search = EnvSearch::new(Vec::new()).with_fallback(EnvFallback::Disabled);
    CaptionConfig::load_with(&search, |_| None).with_base_url(base_url)
}

/// 1x8x8x3 all-zero image
pub fn black_tensor() -> ImageTensor {
    ImageTensor::zeros(vec![1, 8, 8, 3]).expect("valid shape")
}

/// Chat-completion response body with a single choice
pub fn chat_response(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// Base URL of a local port nothing listens on
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}
