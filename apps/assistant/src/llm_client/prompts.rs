// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Appended to every system prompt that forces a tool call.
pub const TOOL_ONLY_INSTRUCTION: &str = "\
    You MUST answer by calling the provided tool exactly once. \
    Do NOT answer in prose. \
    Do NOT include explanations or apologies.";

/// Appended to prompts whose answer is shown verbatim to employees.
pub const GROUNDED_ANSWER_INSTRUCTION: &str = "\
    Answer only from the context provided. \
    If the context does not contain the answer, say that you could not find it \
    in the company documents. Do NOT invent policies, figures, or dates.";
