//! General-knowledge handler: retrieve company context, then answer from it.

use std::sync::Arc;

use tracing::debug;

use crate::chat::handlers::{HandlerError, HandlerResult};
use crate::chat::prompts::{GENERAL_PROMPT_TEMPLATE, GENERAL_SYSTEM, NO_CONTEXT_PLACEHOLDER};
use crate::knowledge::store::Retriever;
use crate::knowledge::RetrievedSnippet;
use crate::llm_client::prompts::GROUNDED_ANSWER_INSTRUCTION;
use crate::llm_client::{LanguageModel, Message};

pub struct GeneralKnowledgeHandler {
    llm: Arc<dyn LanguageModel>,
    retriever: Retriever,
}

impl GeneralKnowledgeHandler {
    pub fn new(llm: Arc<dyn LanguageModel>, retriever: Retriever) -> Self {
        Self { llm, retriever }
    }

    pub async fn handle(&self, question: &str) -> Result<HandlerResult, HandlerError> {
        let snippets = self.retriever.retrieve(question).await?;
        debug!("Retrieved {} snippets for general question", snippets.len());

        let prompt = GENERAL_PROMPT_TEMPLATE
            .replace("{context}", &render_context(&snippets))
            .replace("{question}", question);
        let system = format!("{GENERAL_SYSTEM}\n\n{GROUNDED_ANSWER_INSTRUCTION}");

        let answer = self.llm.complete(&system, &[Message::user(prompt)]).await?;
        Ok(HandlerResult::GeneralAnswer {
            answer: answer.trim().to_string(),
        })
    }
}

fn render_context(snippets: &[RetrievedSnippet]) -> String {
    if snippets.is_empty() {
        return NO_CONTEXT_PLACEHOLDER.to_string();
    }
    snippets
        .iter()
        .map(|s| format!("[Source: {}]\n{}", s.source, s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
