//! Node registry for managing available nodes

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use imgcap_core::{CaptionError, CaptionResult};

use crate::node::{Node, NodeDefinition};

/// Registry for managing and retrieving nodes.
///
/// Registration typically happens once at host startup; lookups can then run
/// from many tasks at the same time.
#[derive(Clone)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<String, Arc<dyn Node>>>>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry holding every node this crate ships, sharing one configuration
    #[cfg(feature = "node-openai-caption")]
    pub async fn with_defaults(config: imgcap_core::CaptionConfig) -> CaptionResult<Self> {
        let registry = Self::new();
        registry
            .register(Arc::new(crate::openai_caption::OpenAiCaptionNode::new(
                config,
            )?))
            .await;
        Ok(registry)
    }

    /// Register a node, replacing any node with the same name
    pub async fn register(&self, node: Arc<dyn Node>) {
        let name = node.name().to_string();
        let mut nodes = self.nodes.write().await;
        if nodes.insert(name.clone(), node).is_some() {
            tracing::warn!(node = %name, "Replaced previously registered node");
        }
    }

    /// Get a node by name
    pub async fn get(&self, name: &str) -> CaptionResult<Arc<dyn Node>> {
        let nodes = self.nodes.read().await;

        nodes
            .get(name)
            .cloned()
            .ok_or_else(|| CaptionError::InvalidInput(format!("Node '{}' not found", name)))
    }

    /// Definitions of all registered nodes, sorted by name
    pub async fn list(&self) -> Vec<NodeDefinition> {
        let nodes = self.nodes.read().await;

        let mut definitions: Vec<NodeDefinition> =
            nodes.values().map(|n| n.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.nodes.read().await.contains_key(name)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
