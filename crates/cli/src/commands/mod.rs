pub mod catalog;
pub mod config;
pub mod doctor;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Pretty JSON output with the given exit code; falls back to a
    /// `serialization` failure payload if `value` cannot be encoded.
    pub fn json<T: Serialize>(command: &str, exit_code: u8, value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 2),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::CommandResult;

    #[test]
    fn json_output_keeps_exit_code_and_payload() {
        let result = CommandResult::json("catalog", 1, &json!({"error": "nothing here"}));

        assert_eq!(result.exit_code, 1);
        let payload: Value = serde_json::from_str(&result.output).expect("json output");
        assert_eq!(payload, json!({"error": "nothing here"}));
    }

    #[test]
    fn failure_payload_names_command_and_error_class() {
        let result = CommandResult::failure("doctor", "catalog_load", "file missing", 2);

        assert_eq!(result.exit_code, 2);
        let payload: Value = serde_json::from_str(&result.output).expect("json output");
        assert_eq!(payload["command"], "doctor");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "catalog_load");
        assert_eq!(payload["message"], "file missing");
    }
}
