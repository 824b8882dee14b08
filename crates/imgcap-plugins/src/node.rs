//! Node contract shared with the host application
//!
//! A node declares its inputs, outputs, category and entry function through a
//! [`NodeDefinition`]; the host calls [`Node::execute`] with the values wired
//! into those inputs.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt::Debug;

use imgcap_core::{CaptionError, CaptionResult};
use imgcap_processing::ImageTensor;

/// Declared type of one node input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputKind {
    Image,
    /// Closed list of string options; the first one is the default
    Choice { options: Vec<String> },
    String { default: String },
    Int { default: i64, min: Option<i64> },
    Float { default: f64, min: Option<f64>, max: Option<f64> },
}

impl InputKind {
    /// Host type tag and options, e.g. `["STRING", {"default": "..."}]`
    fn host_declaration(&self) -> Value {
        match self {
            InputKind::Image => json!(["IMAGE", {}]),
            InputKind::Choice { options } => json!([options]),
            InputKind::String { default } => json!(["STRING", { "default": default }]),
            InputKind::Int { default, min } => {
                let mut opts = Map::new();
                opts.insert("default".into(), json!(default));
                if let Some(min) = min {
                    opts.insert("min".into(), json!(min));
                }
                json!(["INT", opts])
            }
            InputKind::Float { default, min, max } => {
                let mut opts = Map::new();
                opts.insert("default".into(), json!(default));
                if let Some(min) = min {
                    opts.insert("min".into(), json!(min));
                }
                if let Some(max) = max {
                    opts.insert("max".into(), json!(max));
                }
                json!(["FLOAT", opts])
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    pub name: String,
    pub kind: InputKind,
}

impl InputSpec {
    pub fn new(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Everything the host needs to register a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDefinition {
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Required inputs, in display order
    pub inputs: Vec<InputSpec>,
    pub return_types: Vec<String>,
    pub return_names: Vec<String>,
    pub category: String,
    /// Entry function the host invokes
    pub function: String,
}

impl NodeDefinition {
    /// Inputs in the host's `INPUT_TYPES` shape: `{"required": {name: declaration}}`
    pub fn input_types(&self) -> Value {
        let required: Map<String, Value> = self
            .inputs
            .iter()
            .map(|i| (i.name.clone(), i.kind.host_declaration()))
            .collect();
        json!({ "required": required })
    }

    /// Full registration document for a host bridge
    pub fn host_manifest(&self) -> Value {
        json!({
            "name": self.name,
            "display_name": self.display_name,
            "description": self.description,
            "input": self.input_types(),
            "output": self.return_types,
            "output_name": self.return_names,
            "category": self.category,
            "function": self.function,
        })
    }
}

/// A value wired into or out of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Image(ImageTensor),
    String(String),
    Int(i64),
    Float(f64),
}

impl NodeValue {
    fn type_name(&self) -> &'static str {
        match self {
            NodeValue::Image(_) => "IMAGE",
            NodeValue::String(_) => "STRING",
            NodeValue::Int(_) => "INT",
            NodeValue::Float(_) => "FLOAT",
        }
    }
}

/// Input values keyed by input name
#[derive(Debug, Clone, Default)]
pub struct NodeInputs {
    values: HashMap<String, NodeValue>,
}

impl NodeInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: NodeValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: NodeValue) {
        self.values.insert(name.into(), value);
    }

    pub fn take_image(&mut self, name: &str) -> CaptionResult<Option<ImageTensor>> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(NodeValue::Image(tensor)) => Ok(Some(tensor)),
            Some(other) => Err(type_mismatch(name, "IMAGE", &other)),
        }
    }

    pub fn string(&self, name: &str) -> CaptionResult<Option<&str>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(NodeValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(type_mismatch(name, "STRING", other)),
        }
    }

    pub fn int(&self, name: &str) -> CaptionResult<Option<i64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(NodeValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(type_mismatch(name, "INT", other)),
        }
    }

    /// Integers are accepted for float inputs.
    pub fn float(&self, name: &str) -> CaptionResult<Option<f64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(NodeValue::Float(v)) => Ok(Some(*v)),
            Some(NodeValue::Int(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(type_mismatch(name, "FLOAT", other)),
        }
    }
}

fn type_mismatch(name: &str, expected: &str, got: &NodeValue) -> CaptionError {
    CaptionError::InvalidInput(format!(
        "input '{}' expects {}, got {}",
        name,
        expected,
        got.type_name()
    ))
}

/// Output values, in the order of [`NodeDefinition::return_types`]
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutputs(pub Vec<NodeValue>);

impl NodeOutputs {
    pub fn first_string(&self) -> Option<&str> {
        self.0.iter().find_map(|v| match v {
            NodeValue::String(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

/// Trait that all nodes must implement
#[async_trait]
pub trait Node: Send + Sync + Debug {
    /// Registration name, unique within a registry
    fn name(&self) -> &str;

    fn definition(&self) -> NodeDefinition;

    /// Run the node once with the host-supplied inputs
    async fn execute(&self, inputs: NodeInputs) -> CaptionResult<NodeOutputs>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_definition() -> NodeDefinition {
        NodeDefinition {
            name: "Sample".to_string(),
            display_name: "Sample".to_string(),
            description: "test node".to_string(),
            inputs: vec![
                InputSpec::new("image_in", InputKind::Image),
                InputSpec::new(
                    "mode",
                    InputKind::Choice {
                        options: vec!["a".to_string(), "b".to_string()],
                    },
                ),
                InputSpec::new(
                    "count",
                    InputKind::Int {
                        default: 3,
                        min: Some(1),
                    },
                ),
            ],
            return_types: vec!["STRING".to_string()],
            return_names: vec!["text_out".to_string()],
            category: "test".to_string(),
            function: "run".to_string(),
        }
    }

    #[test]
    fn test_input_types_shape() {
        let types = sample_definition().input_types();
        assert_eq!(types["required"]["image_in"], json!(["IMAGE", {}]));
        assert_eq!(types["required"]["mode"], json!([["a", "b"]]));
        assert_eq!(
            types["required"]["count"],
            json!(["INT", {"default": 3, "min": 1}])
        );
    }

    #[test]
    fn test_host_manifest_fields() {
        let manifest = sample_definition().host_manifest();
        assert_eq!(manifest["output"], json!(["STRING"]));
        assert_eq!(manifest["output_name"], json!(["text_out"]));
        assert_eq!(manifest["category"], "test");
        assert_eq!(manifest["function"], "run");
    }

    #[test]
    fn test_typed_getters() {
        let mut inputs = NodeInputs::new()
            .with("prompt", NodeValue::String("hi".to_string()))
            .with("count", NodeValue::Int(2))
            .with("image_in", NodeValue::Image(ImageTensor::zeros(vec![1, 1, 3]).unwrap()));

        assert_eq!(inputs.string("prompt").unwrap(), Some("hi"));
        assert_eq!(inputs.int("count").unwrap(), Some(2));
        assert_eq!(inputs.float("count").unwrap(), Some(2.0));
        assert_eq!(inputs.string("missing").unwrap(), None);
        assert!(inputs.take_image("image_in").unwrap().is_some());
        assert!(inputs.take_image("image_in").unwrap().is_none());
    }

    #[test]
    fn test_type_mismatch_is_invalid_input() {
        let inputs = NodeInputs::new().with("count", NodeValue::String("3".to_string()));
        let err = inputs.int("count").unwrap_err();
        assert!(matches!(err, CaptionError::InvalidInput(_)));
        assert!(err.to_string().contains("expects INT, got STRING"));
    }
}
