//! Declarative pipeline descriptions.
//!
//! A description is an ordered list of algorithm declarations. Order
//! matters: default sources and dynamic links may only name instances
//! declared earlier. Descriptions are read from XML, JSON or TOML.

use crate::data::builtin;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::xml;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How a parameter's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Bool,
    Int,
    Double,
    Point,
    Xml,
    /// `"<instance>/<output>"` link to an earlier instance
    Dynamic,
}

impl ParameterType {
    /// Built-in data type a literal of this kind is stored as.
    pub fn data_type(self) -> Option<&'static str> {
        match self {
            ParameterType::String => Some(builtin::STRING),
            ParameterType::Bool => Some(builtin::BOOL),
            ParameterType::Int => Some(builtin::INT),
            ParameterType::Double => Some(builtin::DOUBLE),
            ParameterType::Point => Some(builtin::POINT),
            ParameterType::Xml => Some(builtin::XML),
            ParameterType::Dynamic => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Bool => "bool",
            ParameterType::Int => "int",
            ParameterType::Double => "double",
            ParameterType::Point => "point",
            ParameterType::Xml => "xml",
            ParameterType::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = PipelineError;

    fn from_str(s: &str) -> PipelineResult<Self> {
        match s.trim() {
            "string" => Ok(ParameterType::String),
            "bool" => Ok(ParameterType::Bool),
            "int" => Ok(ParameterType::Int),
            "double" => Ok(ParameterType::Double),
            "point" => Ok(ParameterType::Point),
            "xml" => Ok(ParameterType::Xml),
            "dynamic" => Ok(ParameterType::Dynamic),
            other => Err(PipelineError::UnknownParameterType(other.to_string())),
        }
    }
}

/// One `parameter` of an algorithm declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub value: String,
}

impl ParameterDecl {
    pub fn new(name: impl Into<String>, kind: ParameterType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }

    /// Link `name` to `source`'s `output`.
    pub fn link(name: impl Into<String>, source: &str, output: &str) -> Self {
        Self::new(name, ParameterType::Dynamic, format!("{}/{}", source, output))
    }
}

/// One algorithm declaration: kind `id`, instance `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmDecl {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_source: Option<String>,
    #[serde(default, rename = "parameter", alias = "parameters")]
    pub parameters: Vec<ParameterDecl>,
}

impl AlgorithmDecl {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_source: None,
            parameters: Vec::new(),
        }
    }

    pub fn default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = Some(source.into());
        self
    }

    pub fn parameter(mut self, parameter: ParameterDecl) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Ordered algorithm declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescription {
    #[serde(default, rename = "algorithm", alias = "algorithms")]
    pub algorithms: Vec<AlgorithmDecl>,
}

impl PipelineDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn algorithm(mut self, decl: AlgorithmDecl) -> Self {
        self.algorithms.push(decl);
        self
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    pub fn from_xml_str(content: &str) -> PipelineResult<Self> {
        xml::parse_pipeline(content)
    }

    pub fn from_json_str(content: &str) -> PipelineResult<Self> {
        serde_json::from_str(content).map_err(|e| PipelineError::Parse(e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        toml::from_str(content).map_err(|e| PipelineError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::Parse(e.to_string()))
    }

    /// Read a description, choosing the format by extension
    /// (`.xml`, `.json`, `.toml`).
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let parse: fn(&str) -> PipelineResult<Self> = match extension.as_str() {
            "xml" => Self::from_xml_str,
            "json" => Self::from_json_str,
            "toml" => Self::from_toml_str,
            _ => return Err(PipelineError::UnsupportedFormat(path.to_path_buf()).into()),
        };
        let content = std::fs::read_to_string(path)?;
        let description = parse(&content)
            .map_err(|e| crate::ViennaMeshError::from(e).with_context(format!("Reading {:?}", path)))?;
        tracing::debug!(
            "Read {} algorithm declaration(s) from {:?}",
            description.len(),
            path
        );
        Ok(description)
    }
}
