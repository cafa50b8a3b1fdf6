//! YAML loading using yaml-rust2
//!
//! Spec files are parsed with yaml-rust2, converted to `serde_json::Value`, and
//! then deserialized into typed structs with serde.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::Error;

/// Parse a YAML string into a `serde_json::Value`.
///
/// For multi-document YAML only the first document is returned.
/// Empty input yields `Value::Null`.
pub fn parse_yaml(input: &str) -> Result<Value, Error> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| Error::serialization(e.to_string()))?;
    match docs.into_iter().next() {
        Some(doc) => yaml_to_json(doc),
        None => Ok(Value::Null),
    }
}

/// Parse YAML and deserialize it into `T`.
///
/// An empty document deserializes from `{}` so that all-default specs can be
/// written as an empty file.
pub fn from_yaml<T: DeserializeOwned>(input: &str) -> Result<T, Error> {
    let value = match parse_yaml(input)? {
        Value::Null => Value::Object(Map::new()),
        v => v,
    };
    Ok(serde_json::from_value(value)?)
}

fn yaml_to_json(yaml: Yaml) -> Result<Value, Error> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(b)),
        Yaml::Integer(i) => Ok(Value::Number(i.into())),
        Yaml::Real(s) => {
            let f: f64 = s
                .parse()
                .map_err(|e: std::num::ParseFloatError| Error::serialization(e.to_string()))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Array(arr) => arr
            .into_iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Hash(map) => map
            .into_iter()
            .map(|(k, v)| {
                let key = match k {
                    Yaml::String(s) => s,
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Real(r) => r,
                    Yaml::Boolean(b) => b.to_string(),
                    _ => return Err(Error::serialization("unsupported YAML key type")),
                };
                yaml_to_json(v).map(|v| (key, v))
            })
            .collect::<Result<Map<String, Value>, _>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err(Error::serialization("YAML aliases not supported")),
        Yaml::BadValue => Err(Error::serialization("bad YAML value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{DeploySpec, DeploymentStrategy};

    #[test]
    fn loads_deploy_spec() {
        let yaml = r#"
ports:
  - name: http
    containerPort: 8080
env:
  LOG_LEVEL: debug
  WORKERS: 4
healthCheck:
  httpGet:
    path: /healthz
    port: http
deploymentStrategy: Recreate
replicas: 2
"#;
        let spec: DeploySpec = from_yaml(yaml).unwrap();
        assert_eq!(spec.ports[0].container_port, 8080);
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.deployment_strategy, DeploymentStrategy::Recreate);
        assert_eq!(spec.env["WORKERS"].literal(), Some("4".to_string()));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let spec: DeploySpec = from_yaml("").unwrap();
        assert_eq!(spec, DeploySpec::default());
    }

    #[test]
    fn unknown_strategy_is_a_serialization_error() {
        let err = from_yaml::<DeploySpec>("deploymentStrategy: Canary").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
