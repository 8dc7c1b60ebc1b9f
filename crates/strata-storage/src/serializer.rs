//! Text codecs for storage files.

use std::fmt;

use strata_common::config::Format;
use strata_common::error::{StrataError, StrataResult};

/// Converts between file contents and JSON documents.
pub trait Serializer: Send + Sync + fmt::Debug {
    /// The format this serializer reads and writes.
    fn format(&self) -> Format;

    /// Parses file contents.
    fn parse(&self, raw: &str) -> StrataResult<serde_json::Value>;

    /// Renders a document as file contents.
    fn stringify(&self, document: &serde_json::Value) -> StrataResult<String>;

    /// File extension, without the leading dot.
    fn extension(&self) -> &'static str {
        self.format().extension()
    }
}

/// Pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn format(&self) -> Format {
        Format::Json
    }

    fn parse(&self, raw: &str) -> StrataResult<serde_json::Value> {
        Ok(serde_json::from_str(raw)?)
    }

    fn stringify(&self, document: &serde_json::Value) -> StrataResult<String> {
        Ok(serde_json::to_string_pretty(document)?)
    }
}

/// Block-style YAML.
///
/// Documents go through `serde_json::Value`, so both formats share the same
/// document model. Mapping keys must be strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSerializer;

impl Serializer for YamlSerializer {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn parse(&self, raw: &str) -> StrataResult<serde_json::Value> {
        serde_yaml::from_str(raw).map_err(yaml_error)
    }

    fn stringify(&self, document: &serde_json::Value) -> StrataResult<String> {
        serde_yaml::to_string(document).map_err(yaml_error)
    }
}

fn yaml_error(err: serde_yaml::Error) -> StrataError {
    StrataError::Serialization {
        message: err.to_string(),
    }
}

/// Returns the serializer for a format.
pub fn serializer_for(format: Format) -> Box<dyn Serializer> {
    match format {
        Format::Json => Box::new(JsonSerializer),
        Format::Yaml => Box::new(YamlSerializer),
    }
}
