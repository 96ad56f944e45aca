//! Domain handlers and the tagged result they produce.

pub mod general;
pub mod hr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::classifier::RequestType;
use crate::knowledge::store::RetrievalError;
use crate::llm_client::LlmError;

/// Output of exactly one handler per turn. Closed: the finalizer matches it
/// exhaustively, and deserializing an unknown `kind` fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerResult {
    ClassificationEcho {
        request_type: RequestType,
        employee_code: Option<String>,
    },
    GeneralAnswer {
        answer: String,
    },
    SalaryAnswer {
        answer: String,
    },
    VacancyAnswer {
        answer: String,
    },
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0} requests need an employee code")]
    MissingEmployeeCode(RequestType),

    #[error("context retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("answer generation failed: {0}")]
    Model(#[from] LlmError),
}
