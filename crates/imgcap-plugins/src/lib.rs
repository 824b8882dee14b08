//! imgcap plugins
//!
//! The node contract understood by the host application, the node registry,
//! and the OpenAI caption node.

pub mod node;
pub mod registry;

#[cfg(feature = "node-openai-caption")]
pub mod openai_caption;

// Re-export commonly used types
pub use node::{
    InputKind, InputSpec, Node, NodeDefinition, NodeInputs, NodeOutputs, NodeValue,
};
pub use registry::NodeRegistry;

#[cfg(feature = "node-openai-caption")]
pub use openai_caption::{CaptionOutput, CaptionRequest, OpenAiCaptionNode, TokenUsage};

// Test helpers (only available in test mode)
#[cfg(test)]
pub mod test_helpers;
