use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::schema::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "auth_",
    "bearer",
    "serviceaccount",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

/// Environment variables that override a configuration path.
const ENV_OVERRIDES: [(&str, &[&str]); 7] = [
    ("NUCLIA_API_BASE", &["nuclia", "api_base"]),
    ("NUCLIA_KB", &["nuclia", "kb"]),
    ("NUCLIA_TOKEN", &["nuclia", "api_key"]),
    ("ANTHROPIC_API_KEY", &["llm", "api_key"]),
    ("CLAUDE_MODEL", &["llm", "model"]),
    ("HOST", &["server", "host"]),
    ("PORT", &["server", "port"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    /// Merged raw configuration: config file, then secrets, then environment.
    pub fn load_raw(&self) -> Value {
        let public_config = load_yaml_file(&self.paths.config_path);
        let secrets_config = load_yaml_file(&self.paths.secrets_path);
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged, |name| env::var(name).ok());
        merged
    }

    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        parse_config(self.load_raw())
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn parse_config(raw: Value) -> Result<AppConfig, ApiError> {
    validate_config(&raw)?;
    serde_json::from_value(raw)
        .map_err(|err| ApiError::BadRequest(format!("Invalid config: {}", err)))
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (name, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(name) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value = if name == "PORT" {
            raw.parse::<u64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string()))
        } else {
            Value::String(raw.to_string())
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "nuclia": { "kb": "kb-1", "api_base": "https://a" },
            "llm": { "model": "m1" }
        });
        let secrets = json!({
            "nuclia": { "api_key": "secret" },
            "llm": { "model": "m2" }
        });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(
            merged,
            json!({
                "nuclia": { "kb": "kb-1", "api_base": "https://a", "api_key": "secret" },
                "llm": { "model": "m2" }
            })
        );
    }

    #[test]
    fn env_overrides_create_missing_sections() {
        let mut config = json!({ "nuclia": { "kb": "from-file" } });
        apply_env_overrides(&mut config, |name| match name {
            "NUCLIA_KB" => Some("from-env".to_string()),
            "PORT" => Some("9001".to_string()),
            "CLAUDE_MODEL" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config["nuclia"]["kb"], json!("from-env"));
        assert_eq!(config["server"]["port"], json!(9001));
        assert!(config.get("llm").is_none());
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "nuclia": { "api_key": "secret", "kb": "kb-1" },
            "llm": { "api_key": "sk", "max_tokens": 800 },
            "headers": [ { "x-nuclia-serviceaccount": "Bearer abc" } ]
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "nuclia": { "api_key": "****", "kb": "kb-1" },
                "llm": { "api_key": "****", "max_tokens": 800 },
                "headers": [ { "x-nuclia-serviceaccount": "****" } ]
            })
        );
    }

    #[test]
    fn load_config_merges_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        let secrets_path = dir.path().join("secrets.yaml");
        fs::write(
            &config_path,
            "nuclia:\n  api_base: https://europe-1.nuclia.cloud/api/v1\n  kb: kb-1\nllm:\n  model: claude-test\n",
        )
        .unwrap();
        fs::write(
            &secrets_path,
            "nuclia:\n  api_key: nuclia-secret\nllm:\n  api_key: sk-test\n",
        )
        .unwrap();

        let paths = AppPaths {
            project_root: PathBuf::from(dir.path()),
            config_path,
            secrets_path,
        };
        let raw = deep_merge(
            &load_yaml_file(&paths.config_path),
            &load_yaml_file(&paths.secrets_path),
        );
        let config = parse_config(raw).unwrap();

        assert_eq!(config.nuclia.kb, "kb-1");
        assert_eq!(config.nuclia.api_key, "nuclia-secret");
        assert_eq!(config.nuclia.download_url_ttl_secs, 3600);
        assert_eq!(config.llm.max_tokens, 800);
        assert_eq!(config.server.port, 8000);
        assert_eq!(
            config.nuclia.kb_url(),
            "https://europe-1.nuclia.cloud/api/v1/kb/kb-1"
        );
    }

    #[test]
    fn missing_files_yield_empty_objects() {
        let value = load_yaml_file(Path::new("/nonexistent/kb-agent/config.yml"));
        assert_eq!(value, json!({}));
    }
}
