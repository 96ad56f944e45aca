// Chat LLM prompt templates.
// All prompts for the routing assistant are defined here.

pub const CLASSIFY_TOOL_NAME: &str = "classify_question";

pub const CLASSIFY_TOOL_DESCRIPTION: &str =
    "Record the classified request type and the employee code found in the conversation.";

pub const CLASSIFY_SYSTEM_TEMPLATE: &str = "\
You are an advanced AI specialized in analyzing and extracting structured information from text.

Current time: {time}

Instructions:
1. Analyze the user's latest message, using earlier turns only as context, and classify it into one of:
   - 'salary_request': questions about salary or year-to-date payroll.
   - 'vacancy_request': questions about leave or vacation balance.
   - 'global_question': general or unrelated questions.
2. Extract the 'employee_code' if present. It can appear as \"my number is xxx\", \"my code is xxx\", \
\"employee ID is xxx\", \"ID: xxx\" or similar, and may be numeric (12345) or alphanumeric (ABC123).
3. Set 'employee_code' to null when no code is present. Never guess one.";

/// Context used when retrieval found nothing.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant information found.";

pub const GENERAL_SYSTEM: &str = "\
You are the company's internal assistant. \
Answer employees' questions accurately and concisely.";

pub const GENERAL_PROMPT_TEMPLATE: &str = "\
Use the context below to answer the user's question accurately and concisely.

Context:
{context}

Question:
{question}

Answer:";
