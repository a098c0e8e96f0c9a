//! Layered YAML loading: deep-merge, canonical key order, SHA-256 hash.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

use crate::error::ConfigError;

/// The merged, canonicalized config plus its stable hash.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load and deep-merge YAML files in order; later files override earlier
/// ones. A later layer's map keys shadow the earlier layer's; scalars and
/// arrays are replaced outright.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig, ConfigError> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let s = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
        sources.push((path.to_string(), s));
    }
    merge_sources(sources)
}

/// Same merge/canonicalize/hash pipeline as [`load_layered_yaml`], but over
/// in-memory YAML strings rather than files on disk. Used by tests and by
/// callers that already hold config text (e.g. embedded defaults).
pub fn load_layered_yaml_from_strings(layers: &[&str]) -> Result<LoadedConfig, ConfigError> {
    let sources = layers
        .iter()
        .enumerate()
        .map(|(i, s)| (format!("<layer {i}>"), s.to_string()))
        .collect();
    merge_sources(sources)
}

fn merge_sources(sources: Vec<(String, String)>) -> Result<LoadedConfig, ConfigError> {
    let mut merged = Value::Object(Default::default());
    for (path, text) in sources {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        let json_val = serde_json::to_value(yaml_val).map_err(|e| ConfigError::Parse {
            path,
            detail: e.to_string(),
        })?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let config_hash = hex::encode(hasher.finalize());

    let config_json: Value = serde_json::from_str(&canonical)
        .map_err(|e| ConfigError::Shape(format!("canonical json reparse failed: {e}")))?;

    Ok(LoadedConfig {
        config_json,
        canonical_json: canonical,
        config_hash,
    })
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization of a Value must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
server:
  bind_address: "0.0.0.0:8080"
trading:
  default_commission_micros: 500
  risk_free_daily_micros: 119
"#;

    const BASE_REORDERED: &str = r#"
trading:
  risk_free_daily_micros: 119
  default_commission_micros: 500
server:
  bind_address: "0.0.0.0:8080"
"#;

    const OVERLAY: &str = r#"
server:
  bind_address: "127.0.0.1:9090"
"#;

    #[test]
    fn same_input_produces_identical_hash() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn reordered_keys_produce_same_hash() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE_REORDERED]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.canonical_json, b.canonical_json);
    }

    #[test]
    fn overlay_overrides_base_and_changes_hash() {
        let base = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let merged = load_layered_yaml_from_strings(&[BASE, OVERLAY]).unwrap();
        assert_ne!(base.config_hash, merged.config_hash);
        let addr = merged
            .config_json
            .pointer("/server/bind_address")
            .and_then(|v| v.as_str())
            .unwrap();
        assert_eq!(addr, "127.0.0.1:9090");

        // The overlay only touches bind_address; trading section survives untouched.
        let rf = merged
            .config_json
            .pointer("/trading/risk_free_daily_micros")
            .and_then(|v| v.as_i64())
            .unwrap();
        assert_eq!(rf, 119);
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let loaded = load_layered_yaml_from_strings(&[BASE]).unwrap();
        assert_eq!(loaded.config_hash.len(), 64);
        assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_layered_yaml(&["/nonexistent/path/does-not-exist.yaml"]).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
