use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::config::Config;

/// How to parse a spec file's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
    /// Try JSON first, fall back to YAML.
    Auto,
}

impl SpecFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "auto" => Ok(Self::Auto),
            other => anyhow::bail!("Unknown spec format: '{}'. Must be auto, yaml, or json.", other),
        }
    }

    /// Picks a format from the file extension, using `fallback` when the
    /// extension is missing or unrecognized.
    pub fn for_path(path: &Path, fallback: SpecFormat) -> SpecFormat {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => SpecFormat::Json,
            Some("yaml") | Some("yml") => SpecFormat::Yaml,
            _ => fallback,
        }
    }
}

/// Picks the effective format for a spec file: an explicit request wins,
/// then the file extension, then the configured default.
pub fn effective_format(
    config: &Config,
    path: &Path,
    requested: Option<SpecFormat>,
) -> Result<SpecFormat> {
    match requested {
        Some(format) => Ok(format),
        None => {
            let fallback = SpecFormat::parse(&config.ingest.default_format)?;
            Ok(SpecFormat::for_path(path, fallback))
        }
    }
}

/// A spec file read and parsed, ready for projection.
#[derive(Debug)]
pub struct LoadedSpec {
    /// File basename, recorded as the contract's component id.
    pub component_id: String,
    /// Raw file text, persisted verbatim on the contract row.
    pub raw: String,
    /// Parsed document root, guaranteed to be a JSON object.
    pub document: Value,
}

pub fn load_spec(path: &Path, format: SpecFormat) -> Result<LoadedSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read OpenAPI file: {}", path.display()))?;

    let document = parse_document(&raw, format)
        .with_context(|| format!("Failed to parse OpenAPI content from {}", path.display()))?;

    // Both parsers accept scalar and empty documents; a spec has to be a
    // mapping.
    if !document.is_object() {
        anyhow::bail!(
            "OpenAPI content from {} does not parse to a mapping",
            path.display()
        );
    }

    let component_id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(LoadedSpec {
        component_id,
        raw,
        document,
    })
}

fn parse_document(content: &str, format: SpecFormat) -> Result<Value> {
    match format {
        SpecFormat::Json => serde_json::from_str(content).context("invalid JSON"),
        SpecFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(content).context("invalid YAML")?;
            yaml_to_json(yaml)
        }
        SpecFormat::Auto => match serde_json::from_str(content) {
            Ok(document) => Ok(document),
            Err(_) => {
                let yaml: serde_yaml::Value =
                    serde_yaml::from_str(content).context("neither valid JSON nor valid YAML")?;
                yaml_to_json(yaml)
            }
        },
    }
}

/// Converts a parsed YAML value into its JSON rendering.
///
/// YAML permits non-string scalar keys (`200:` is an integer); those are
/// stringified so response status maps and similar sections keep their
/// keys. Non-finite floats have no JSON form and become null.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect::<Result<_>>()?)
        }
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (key, child) in map {
                object.insert(yaml_key_to_string(&key)?, yaml_to_json(child)?);
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key_to_string(key: &serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        other => anyhow::bail!("unsupported non-scalar mapping key: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_for_path_by_extension() {
        let fallback = SpecFormat::Auto;
        assert_eq!(
            SpecFormat::for_path(&PathBuf::from("api.json"), fallback),
            SpecFormat::Json
        );
        assert_eq!(
            SpecFormat::for_path(&PathBuf::from("api.yaml"), fallback),
            SpecFormat::Yaml
        );
        assert_eq!(
            SpecFormat::for_path(&PathBuf::from("api.YML"), fallback),
            SpecFormat::Yaml
        );
        assert_eq!(
            SpecFormat::for_path(&PathBuf::from("api.txt"), fallback),
            SpecFormat::Auto
        );
        assert_eq!(
            SpecFormat::for_path(&PathBuf::from("api"), SpecFormat::Yaml),
            SpecFormat::Yaml
        );
    }

    #[test]
    fn test_parse_rejects_unknown_format_name() {
        assert!(SpecFormat::parse("toml").is_err());
        assert_eq!(SpecFormat::parse("yml").unwrap(), SpecFormat::Yaml);
    }

    #[test]
    fn test_parse_document_yaml_numeric_keys_become_strings() {
        let doc = parse_document(
            "responses:\n  200:\n    description: ok\n  default:\n    description: fallback\n",
            SpecFormat::Yaml,
        )
        .unwrap();
        assert!(doc["responses"]["200"].is_object());
        assert!(doc["responses"]["default"].is_object());
    }

    #[test]
    fn test_parse_document_yaml_values_keep_their_types() {
        let doc = parse_document(
            "schema:\n  type: integer\n  maximum: 100\n  exclusiveMinimum: true\n",
            SpecFormat::Yaml,
        )
        .unwrap();
        assert_eq!(doc["schema"]["maximum"], 100);
        assert_eq!(doc["schema"]["exclusiveMinimum"], true);
    }

    #[test]
    fn test_parse_document_auto_accepts_both() {
        let json = parse_document(r#"{"openapi": "3.0.0"}"#, SpecFormat::Auto).unwrap();
        assert_eq!(json["openapi"], "3.0.0");

        let yaml = parse_document("openapi: 3.0.0\n", SpecFormat::Auto).unwrap();
        assert!(yaml.is_object());
    }

    #[test]
    fn test_parse_document_empty_yaml_is_null() {
        let doc = parse_document("", SpecFormat::Yaml).unwrap();
        assert!(doc.is_null());
    }

    #[test]
    fn test_parse_document_json_rejects_yaml() {
        assert!(parse_document("openapi: 3.0.0\n", SpecFormat::Json).is_err());
    }
}
