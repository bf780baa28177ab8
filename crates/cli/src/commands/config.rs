use std::env;
use std::fs;
use std::path::Path;

use printchat_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::CommandResult;

struct Field {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key_path: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["PRINTCHAT_SERVER_BIND_ADDRESS"],
        },
        Field {
            key_path: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["PRINTCHAT_SERVER_PORT"],
        },
        Field {
            key_path: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["PRINTCHAT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key_path: "llm.provider",
            value: format!("{:?}", config.llm.provider),
            env_keys: &["PRINTCHAT_LLM_PROVIDER"],
        },
        Field {
            key_path: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["PRINTCHAT_LLM_MODEL"],
        },
        Field {
            key_path: "llm.base_url",
            value: config.llm.effective_base_url().to_string(),
            env_keys: &["PRINTCHAT_LLM_BASE_URL"],
        },
        Field {
            key_path: "llm.api_key",
            value: redact_secret(config.llm.api_key.as_ref()),
            env_keys: &["PRINTCHAT_LLM_API_KEY", "OPENAI_API_KEY"],
        },
        Field {
            key_path: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["PRINTCHAT_LLM_TIMEOUT_SECS"],
        },
        Field {
            key_path: "cloudprinter.base_url",
            value: config.cloudprinter.base_url.clone(),
            env_keys: &["PRINTCHAT_CLOUDPRINTER_BASE_URL"],
        },
        Field {
            key_path: "cloudprinter.api_key",
            value: redact_secret(config.cloudprinter.api_key.as_ref()),
            env_keys: &["PRINTCHAT_CLOUDPRINTER_API_KEY", "CLOUDPRINT_API_KEY"],
        },
        Field {
            key_path: "cloudprinter.timeout_secs",
            value: config.cloudprinter.timeout_secs.to_string(),
            env_keys: &["PRINTCHAT_CLOUDPRINTER_TIMEOUT_SECS"],
        },
        Field {
            key_path: "catalog.path",
            value: config.catalog.path.display().to_string(),
            env_keys: &["PRINTCHAT_CATALOG_PATH"],
        },
        Field {
            key_path: "chat.max_rounds",
            value: config.chat.max_rounds.to_string(),
            env_keys: &["PRINTCHAT_CHAT_MAX_ROUNDS"],
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["PRINTCHAT_LOGGING_LEVEL", "PRINTCHAT_LOG_LEVEL"],
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["PRINTCHAT_LOGGING_FORMAT", "PRINTCHAT_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    // Keep a recognizable prefix such as `sk-`.
    if let Some((prefix, _)) = trimmed.split_once('-') {
        if prefix.len() <= 4 {
            return format!("{prefix}-***");
        }
    }

    "<redacted>".to_string()
}
