//! Intent classifier: conversation history in, validated `IntentRecord` out.
//!
//! The model is forced through the `classify_question` tool. Its raw payload
//! is validated here, once; everything downstream works on the typed record.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chat::history::ConversationHistory;
use crate::chat::prompts::{CLASSIFY_SYSTEM_TEMPLATE, CLASSIFY_TOOL_DESCRIPTION, CLASSIFY_TOOL_NAME};
use crate::llm_client::prompts::TOOL_ONLY_INSTRUCTION;
use crate::llm_client::{LanguageModel, LlmError, ToolSpec};

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("malformed classification payload: {0}")]
    Malformed(String),

    #[error("history contains no user message")]
    NoUserMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    General,
    Salary,
    Vacancy,
}

impl RequestType {
    /// Maps a model label onto a category. `None` for labels we don't know.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "global_question" | "general" | "global" => Some(Self::General),
            "salary_request" | "salary" => Some(Self::Salary),
            "vacancy_request" | "vacancy" | "vacation" => Some(Self::Vacancy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Salary => "salary",
            Self::Vacancy => "vacancy",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub request_type: RequestType,
    pub employee_code: Option<String>,
}

/// Raw tool input. Both fields are optional so a sloppy payload still
/// validates into a record instead of failing the turn.
#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    #[serde(default)]
    request_type: Option<String>,
    #[serde(default)]
    employee_code: Option<Value>,
}

pub struct IntentClassifier {
    llm: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn classify(
        &self,
        history: &ConversationHistory,
    ) -> Result<IntentRecord, ClassificationError> {
        let latest = history
            .latest_user_message()
            .ok_or(ClassificationError::NoUserMessage)?;

        let system = format!(
            "{}\n\n{}",
            CLASSIFY_SYSTEM_TEMPLATE.replace("{time}", &Utc::now().to_rfc3339()),
            TOOL_ONLY_INSTRUCTION
        );
        let payload = self
            .llm
            .complete_structured(&system, &history.to_messages(), &classify_tool())
            .await?;

        let mut record = validate_payload(payload)?;
        if record.employee_code.is_none() {
            record.employee_code = extract_employee_code(latest);
        }

        debug!(
            "Classified as {} (employee code present: {})",
            record.request_type,
            record.employee_code.is_some()
        );
        Ok(record)
    }
}

fn classify_tool() -> ToolSpec {
    ToolSpec {
        name: CLASSIFY_TOOL_NAME.to_string(),
        description: CLASSIFY_TOOL_DESCRIPTION.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "request_type": {
                    "type": "string",
                    "enum": ["salary_request", "vacancy_request", "global_question"],
                    "description": "Category of the user's latest request."
                },
                "employee_code": {
                    "type": ["string", "null"],
                    "description": "Employee code mentioned by the user, or null."
                }
            },
            "required": ["request_type", "employee_code"]
        }),
    }
}

fn validate_payload(payload: Value) -> Result<IntentRecord, ClassificationError> {
    if !payload.is_object() {
        return Err(ClassificationError::Malformed(format!(
            "expected an object, got {payload}"
        )));
    }
    let raw: ClassificationPayload = serde_json::from_value(payload)
        .map_err(|e| ClassificationError::Malformed(e.to_string()))?;

    let request_type = match raw.request_type.as_deref() {
        Some(label) => RequestType::from_label(label).unwrap_or_else(|| {
            warn!("Unknown request_type {label:?}, routing to general");
            RequestType::General
        }),
        None => {
            warn!("Classification payload has no request_type, routing to general");
            RequestType::General
        }
    };

    Ok(IntentRecord {
        request_type,
        employee_code: raw.employee_code.and_then(normalize_code),
    })
}

fn normalize_code(value: Value) -> Option<String> {
    let code = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match code.to_ascii_lowercase().as_str() {
        "" | "null" | "none" => None,
        _ => Some(code),
    }
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)(?:",
            r"\b(?:my|employee)\s+(?:employee\s+)?(?:code|id|identifier|number)\s*(?:is\b|:|=|#)?",
            r"|\bid\s*[:#]",
            r")\s*([a-z0-9][a-z0-9-]*)",
        ))
        .expect("employee code pattern is valid")
    })
}

/// Best-effort extraction of a code the user states as their own ("my code is ..",
/// "employee ID ..", "ID: .."). Bare numbers after other nouns never count, and
/// only tokens containing a digit do, so "my ID please" is ignored.
pub fn extract_employee_code(text: &str) -> Option<String> {
    code_pattern()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
        .map(String::from)
}
