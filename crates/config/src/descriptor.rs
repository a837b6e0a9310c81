//! Deployment descriptor model
//!
//! Only the parts this system reads or writes are typed; everything else is
//! carried through untouched so a descriptor survives a load/save cycle.

use crate::format::{read_structured, FileFormat};
use deployenv_core::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Runtime environment mapping as it appears in a descriptor
pub type DescriptorEnvironment = IndexMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<DescriptorEnvironment>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Value>,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
    /// Stage-merged deploy variables, written during initialization
    #[serde(
        rename = "deployVariables",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deploy_variables: Option<IndexMap<String, Value>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl DeploymentDescriptor {
    pub fn from_path(path: &Path) -> Result<Self> {
        read_structured(path)
    }

    pub fn render(&self, format: FileFormat) -> Result<String> {
        format.render(self)
    }

    /// `custom.<path...>`, if every segment exists
    #[must_use]
    pub fn custom_value(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(self.custom.as_ref()?, |value, segment| value.get(segment))
    }

    /// `custom.defaults.stage`
    #[must_use]
    pub fn default_stage(&self) -> Option<&str> {
        self.custom_value(&["defaults", "stage"])
            .and_then(Value::as_str)
    }

    /// The runtime environment, created empty if missing
    pub fn environment_mut(&mut self) -> &mut DescriptorEnvironment {
        self.provider.environment.get_or_insert_with(IndexMap::new)
    }

    /// Runtime environment values in string form
    #[must_use]
    pub fn environment_strings(&self) -> IndexMap<String, String> {
        self.provider
            .environment
            .iter()
            .flatten()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"
service: orders
provider:
  name: aws
  stage: dev
  region: us-east-1
  runtime: nodejs18.x
  environment:
    EXISTING: keep
    COUNT: 3
custom:
  defaults:
    stage: test
  deploy:
    environments:
      default:
        a: 1
functions:
  hello:
    handler: handler.hello
"#;

    #[test]
    fn test_parse_descriptor() {
        let descriptor: DeploymentDescriptor = FileFormat::Yaml.parse(DESCRIPTOR).unwrap();
        assert_eq!(descriptor.provider.region.as_deref(), Some("us-east-1"));
        assert_eq!(descriptor.provider.stage.as_deref(), Some("dev"));
        assert_eq!(descriptor.default_stage(), Some("test"));
        assert!(descriptor.extra.contains_key("functions"));
        assert!(descriptor.provider.extra.contains_key("runtime"));

        let env = descriptor.environment_strings();
        assert_eq!(env["EXISTING"], "keep");
        assert_eq!(env["COUNT"], "3");
    }

    #[test]
    fn test_round_trip_keeps_unknown_sections() {
        let descriptor: DeploymentDescriptor = FileFormat::Yaml.parse(DESCRIPTOR).unwrap();
        let rendered = descriptor.render(FileFormat::Yaml).unwrap();
        let reparsed: DeploymentDescriptor = FileFormat::Yaml.parse(&rendered).unwrap();
        assert_eq!(descriptor, reparsed);
        assert!(!rendered.contains("deployVariables"));
    }

    #[test]
    fn test_environment_mut_creates_section() {
        let mut descriptor = DeploymentDescriptor::default();
        assert!(descriptor.provider.environment.is_none());
        descriptor
            .environment_mut()
            .insert("A".to_string(), Value::String("1".to_string()));
        assert_eq!(descriptor.environment_strings()["A"], "1");
    }
}
