use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    let nuclia = expect_required_object(root, "nuclia")?;
    validate_url_field(nuclia, "nuclia.api_base", "api_base")?;
    validate_required_string_field(nuclia, "nuclia.kb", "kb")?;
    validate_required_string_field(nuclia, "nuclia.api_key", "api_key")?;
    validate_optional_string_field(nuclia, "nuclia.vectorset", "vectorset")?;
    validate_string_array_field(nuclia, "nuclia.internal_domains", "internal_domains")?;
    validate_string_map_field(nuclia, "nuclia.extra_headers", "extra_headers")?;
    validate_u64_field(
        nuclia,
        "nuclia.download_url_ttl_secs",
        "download_url_ttl_secs",
        1,
        86_400,
    )?;
    for key in [
        "search_timeout_secs",
        "ask_timeout_secs",
        "download_timeout_secs",
    ] {
        validate_u64_field(nuclia, &format!("nuclia.{}", key), key, 1, 600)?;
    }

    let llm = expect_required_object(root, "llm")?;
    if llm.contains_key("base_url") {
        validate_url_field(llm, "llm.base_url", "base_url")?;
    }
    validate_required_string_field(llm, "llm.api_key", "api_key")?;
    validate_required_string_field(llm, "llm.model", "model")?;
    validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 4096)?;
    validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 1.0)?;
    validate_optional_string_field(llm, "llm.instructions", "instructions")?;
    validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 600)?;

    if let Some(logging) = expect_optional_object(root, "logging")? {
        validate_optional_string_field(logging, "logging.dir", "dir")?;
        validate_optional_string_field(logging, "logging.level", "level")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn expect_required_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, ApiError> {
    expect_optional_object(root, key)?.ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': section is required", key))
    })
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_url_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    validate_required_string_field(section, path, key)?;
    let text = section.get(key).and_then(|v| v.as_str()).unwrap_or_default();
    if !(text.starts_with("http://") || text.starts_with("https://")) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be an http(s) URL",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn validate_string_map_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(entries) = value.as_object() else {
        return Err(config_type_error(path, "map of strings"));
    };
    for (name, item) in entries {
        if item.as_str().is_none() {
            return Err(config_type_error(&format!("{}.{}", path, name), "string"));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "nuclia": {
                "api_base": "https://europe-1.nuclia.cloud/api/v1",
                "kb": "kb-1",
                "api_key": "secret"
            },
            "llm": { "api_key": "sk-test", "model": "claude-test" }
        })
    }

    #[test]
    fn accepts_minimal_config() {
        assert!(validate_config(&minimal()).is_ok());
    }

    #[test]
    fn rejects_missing_sections_and_keys() {
        let err = validate_config(&json!({ "llm": {} })).unwrap_err();
        assert!(err.to_string().contains("nuclia"));

        let mut config = minimal();
        config["nuclia"].as_object_mut().unwrap().remove("kb");
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("nuclia.kb"));
    }

    #[test]
    fn rejects_non_http_api_base() {
        let mut config = minimal();
        config["nuclia"]["api_base"] = json!("ftp://example.com");
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("http(s) URL"));
    }

    #[test]
    fn rejects_out_of_range_llm_values() {
        let mut config = minimal();
        config["llm"]["temperature"] = json!(1.5);
        assert!(validate_config(&config).is_err());

        let mut config = minimal();
        config["llm"]["max_tokens"] = json!(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_non_string_header_values() {
        let mut config = minimal();
        config["nuclia"]["extra_headers"] = json!({ "x-ndb-client": 3 });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("nuclia.extra_headers.x-ndb-client"));
    }
}
