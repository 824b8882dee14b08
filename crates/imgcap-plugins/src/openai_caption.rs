//! OpenAI caption node: sends one image plus a prompt to the chat-completions
//! API and returns the generated caption

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};

use imgcap_core::{CaptionConfig, CaptionError, CaptionModel, CaptionResult};
use imgcap_processing::{encode_png, ImageTensor};

use crate::node::{
    InputKind, InputSpec, Node, NodeDefinition, NodeInputs, NodeOutputs, NodeValue,
};

pub const NODE_NAME: &str = "OpenAICaptionImage";
pub const CATEGORY: &str = "openai";
pub const FUNCTION: &str = "caption";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_CAPTION_PROMPT: &str = "What's in this image?";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_TEMPERATURE: f64 = 0.5;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Parameters for one caption call
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRequest {
    pub model: CaptionModel,
    pub system_prompt: String,
    pub caption_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for CaptionRequest {
    fn default() -> Self {
        Self {
            model: CaptionModel::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            caption_prompt: DEFAULT_CAPTION_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Token counts reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionOutput {
    pub text: String,
    pub model: CaptionModel,
    pub usage: Option<TokenUsage>,
}

// Chat completions request/response structures
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Caption node implementation
pub struct OpenAiCaptionNode {
    http_client: reqwest::Client,
    config: CaptionConfig,
}

impl Debug for OpenAiCaptionNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiCaptionNode")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAiCaptionNode {
    pub fn new(config: CaptionConfig) -> CaptionResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(|e| {
            CaptionError::Transport(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &CaptionConfig {
        &self.config
    }

    /// Caption one image.
    ///
    /// The API key is checked first, so a missing credential never reaches
    /// the network. Exactly one request is sent; failures are not retried.
    pub async fn caption(
        &self,
        image: &ImageTensor,
        request: &CaptionRequest,
    ) -> CaptionResult<CaptionOutput> {
        let api_key = self.config.require_api_key()?;

        let encoded = encode_png(image)?;
        let data_url = encoded.data_url();
        let body = build_request_body(request, &data_url);

        tracing::info!(
            model = %request.model,
            image_size = encoded.png_bytes().len(),
            max_tokens = request.max_tokens,
            "Sending caption request"
        );

        let response = self.send(api_key, &body).await?;
        let usage = response.usage;
        let text = extract_caption(response)?;

        if let Some(usage) = usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Caption token usage"
            );
        }
        tracing::info!(model = %request.model, chars = text.len(), "Caption received");

        Ok(CaptionOutput {
            text,
            model: request.model,
            usage,
        })
    }

    /// Blocking variant of [`OpenAiCaptionNode::caption`] for synchronous
    /// hosts. Must not be called from inside a tokio runtime.
    pub fn caption_blocking(
        &self,
        image: &ImageTensor,
        request: &CaptionRequest,
    ) -> CaptionResult<CaptionOutput> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CaptionError::Transport(format!("failed to start runtime: {}", e)))?;
        runtime.block_on(self.caption(image, request))
    }

    async fn send(
        &self,
        api_key: &str,
        body: &ChatCompletionRequest<'_>,
    ) -> CaptionResult<ChatCompletionResponse> {
        let response = self
            .http_client
            .post(self.config.chat_completions_url())
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CaptionError::Transport(error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CaptionError::Transport(format!(
                "{} - {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            CaptionError::Transport(format!("invalid response body: {}", error_chain(&e)))
        })
    }

    /// Read the node inputs, applying the declared defaults.
    fn parse_inputs(mut inputs: NodeInputs) -> CaptionResult<(ImageTensor, CaptionRequest)> {
        let image = inputs.take_image("image_in")?.ok_or_else(|| {
            CaptionError::InvalidInput("missing required input 'image_in'".to_string())
        })?;

        let model = match inputs.string("model")? {
            Some(name) => name.parse::<CaptionModel>()?,
            None => CaptionModel::default(),
        };

        let max_tokens = match inputs.int("max_tokens")? {
            Some(v) => u32::try_from(v).ok().filter(|v| *v > 0).ok_or_else(|| {
                CaptionError::InvalidInput(format!(
                    "max_tokens must be a positive integer, got {}",
                    v
                ))
            })?,
            None => DEFAULT_MAX_TOKENS,
        };

        let temperature = inputs.float("temperature")?.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(CaptionError::InvalidInput(format!(
                "temperature must be between 0 and {}, got {}",
                MAX_TEMPERATURE, temperature
            )));
        }

        let request = CaptionRequest {
            model,
            system_prompt: inputs
                .string("system_prompt")?
                .unwrap_or(DEFAULT_SYSTEM_PROMPT)
                .to_string(),
            caption_prompt: inputs
                .string("caption_prompt")?
                .unwrap_or(DEFAULT_CAPTION_PROMPT)
                .to_string(),
            max_tokens,
            temperature,
        };

        Ok((image, request))
    }
}

fn build_request_body<'a>(
    request: &'a CaptionRequest,
    data_url: &'a str,
) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model: request.model.as_str(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(&request.system_prompt),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: &request.caption_prompt,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ]),
            },
        ],
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

/// Trimmed text of the first choice
fn extract_caption(response: ChatCompletionResponse) -> CaptionResult<String> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(CaptionError::EmptyResult);
    }
    Ok(text)
}

/// Error message including its sources
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl Node for OpenAiCaptionNode {
    fn name(&self) -> &str {
        NODE_NAME
    }

    fn definition(&self) -> NodeDefinition {
        NodeDefinition {
            name: NODE_NAME.to_string(),
            display_name: "OpenAI Caption Image".to_string(),
            description: "Caption an image with an OpenAI vision model".to_string(),
            inputs: vec![
                InputSpec::new("image_in", InputKind::Image),
                InputSpec::new(
                    "model",
                    InputKind::Choice {
                        options: CaptionModel::names().into_iter().map(String::from).collect(),
                    },
                ),
                InputSpec::new(
                    "system_prompt",
                    InputKind::String {
                        default: DEFAULT_SYSTEM_PROMPT.to_string(),
                    },
                ),
                InputSpec::new(
                    "caption_prompt",
                    InputKind::String {
                        default: DEFAULT_CAPTION_PROMPT.to_string(),
                    },
                ),
                InputSpec::new(
                    "max_tokens",
                    InputKind::Int {
                        default: i64::from(DEFAULT_MAX_TOKENS),
                        min: Some(1),
                    },
                ),
                InputSpec::new(
                    "temperature",
                    InputKind::Float {
                        default: DEFAULT_TEMPERATURE,
                        min: Some(0.0),
                        max: Some(MAX_TEMPERATURE),
                    },
                ),
            ],
            return_types: vec!["STRING".to_string()],
            return_names: vec!["text_out".to_string()],
            category: CATEGORY.to_string(),
            function: FUNCTION.to_string(),
        }
    }

    async fn execute(&self, inputs: NodeInputs) -> CaptionResult<NodeOutputs> {
        let (image, request) = Self::parse_inputs(inputs)?;
        let output = self.caption(&image, &request).await?;
        Ok(NodeOutputs(vec![NodeValue::String(output.text)]))
    }
}
