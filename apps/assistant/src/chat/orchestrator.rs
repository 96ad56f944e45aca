//! Routing graph: `classify → {general | salary | vacancy} → finalize`.
//!
//! Each turn walks the graph on a private copy of the history. The caller's
//! history is never touched; the updated copy is returned only when every
//! node succeeded.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::chat::classifier::{ClassificationError, IntentClassifier, IntentRecord, RequestType};
use crate::chat::finalizer::{finalize, FinalAnswer};
use crate::chat::handlers::general::GeneralKnowledgeHandler;
use crate::chat::handlers::hr::{missing_code_message, HrHandler};
use crate::chat::handlers::{HandlerError, HandlerResult};
use crate::chat::history::{ConversationHistory, ConversationTurn};
use crate::hr_client::HrLookup;
use crate::knowledge::store::Retriever;
use crate::llm_client::LanguageModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    General,
    Salary,
    Vacancy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Classify,
    Handler(Branch),
    Finalize,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: FinalAnswer,
    pub intent: IntentRecord,
    pub path: Vec<Node>,
    pub history: ConversationHistory,
}

/// Conditional edge out of `classify`. Total over the validated record.
pub fn route(intent: &IntentRecord) -> Branch {
    match intent.request_type {
        RequestType::General => Branch::General,
        RequestType::Salary => Branch::Salary,
        RequestType::Vacancy => Branch::Vacancy,
    }
}

enum Step {
    Classify,
    Handle(IntentRecord),
    Finalize(IntentRecord, HandlerResult),
}

pub struct Orchestrator {
    classifier: IntentClassifier,
    general: GeneralKnowledgeHandler,
    hr: HrHandler,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LanguageModel>, retriever: Retriever, hr: Arc<dyn HrLookup>) -> Self {
        Self {
            classifier: IntentClassifier::new(llm.clone()),
            general: GeneralKnowledgeHandler::new(llm, retriever),
            hr: HrHandler::new(hr),
        }
    }

    pub async fn process_turn(
        &self,
        history: &ConversationHistory,
        message: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let mut working = history.clone();
        working.push(ConversationTurn::user(message));

        let mut path = Vec::with_capacity(3);
        let mut step = Step::Classify;
        loop {
            step = match step {
                Step::Classify => {
                    path.push(Node::Classify);
                    Step::Handle(self.classifier.classify(&working).await?)
                }
                Step::Handle(intent) => {
                    let branch = route(&intent);
                    path.push(Node::Handler(branch));
                    let result = self.run_handler(branch, &intent, message).await?;
                    Step::Finalize(intent, result)
                }
                Step::Finalize(intent, result) => {
                    path.push(Node::Finalize);
                    let answer = finalize(&result);
                    working.push(ConversationTurn::assistant(answer.answer.clone()));
                    info!("Turn completed: {path:?}");
                    return Ok(TurnOutcome {
                        answer,
                        intent,
                        path,
                        history: working,
                    });
                }
            };
        }
    }

    /// Classifies a single message and returns the echoed classification
    /// without running any domain handler.
    pub async fn classify_only(
        &self,
        message: &str,
    ) -> Result<(IntentRecord, FinalAnswer), TurnError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let mut history = ConversationHistory::default();
        history.push(ConversationTurn::user(message));
        let intent = self.classifier.classify(&history).await?;

        let echo = HandlerResult::ClassificationEcho {
            request_type: intent.request_type,
            employee_code: intent.employee_code.clone(),
        };
        Ok((intent, finalize(&echo)))
    }

    async fn run_handler(
        &self,
        branch: Branch,
        intent: &IntentRecord,
        question: &str,
    ) -> Result<HandlerResult, TurnError> {
        let result = match branch {
            Branch::General => self.general.handle(question).await,
            Branch::Salary => self.hr.salary(intent).await,
            Branch::Vacancy => self.hr.vacancy(intent).await,
        };

        match result {
            Ok(result) => Ok(result),
            Err(HandlerError::MissingEmployeeCode(kind)) => recover_missing_code(branch, kind),
            Err(e) => Err(e.into()),
        }
    }
}

/// A missing code on an HR branch is recovered locally: the explanation is the
/// answer. The general branch never needs a code, so it stays an error there.
fn recover_missing_code(branch: Branch, kind: RequestType) -> Result<HandlerResult, TurnError> {
    debug!("No employee code for {kind} request");
    match branch {
        Branch::Salary => Ok(HandlerResult::SalaryAnswer {
            answer: missing_code_message(kind),
        }),
        Branch::Vacancy => Ok(HandlerResult::VacancyAnswer {
            answer: missing_code_message(kind),
        }),
        Branch::General => Err(HandlerError::MissingEmployeeCode(kind).into()),
    }
}
