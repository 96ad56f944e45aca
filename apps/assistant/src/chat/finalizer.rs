use serde::{Deserialize, Serialize};

use crate::chat::handlers::HandlerResult;

/// The single normalized answer of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswer {
    pub answer: String,
}

/// Pure mapping from any handler result to the final answer shape.
pub fn finalize(result: &HandlerResult) -> FinalAnswer {
    let answer = match result {
        HandlerResult::ClassificationEcho {
            request_type,
            employee_code,
        } => {
            let label = request_type.as_str().to_uppercase();
            match employee_code {
                Some(code) => format!("{label} ({code})"),
                None => label,
            }
        }
        HandlerResult::GeneralAnswer { answer }
        | HandlerResult::SalaryAnswer { answer }
        | HandlerResult::VacancyAnswer { answer } => answer.clone(),
    };
    FinalAnswer { answer }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::classifier::RequestType;

    #[test]
    fn test_echo_with_code() {
        let result = HandlerResult::ClassificationEcho {
            request_type: RequestType::Salary,
            employee_code: Some("abc123".to_string()),
        };
        assert_eq!(finalize(&result).answer, "SALARY (abc123)");
    }

    #[test]
    fn test_echo_without_code_omits_parentheses() {
        let result = HandlerResult::ClassificationEcho {
            request_type: RequestType::General,
            employee_code: None,
        };
        assert_eq!(finalize(&result).answer, "GENERAL");
    }

    #[test]
    fn test_domain_answers_pass_through_verbatim() {
        let answer = "  Your vacancy balance is 4 days. ".to_string();
        for result in [
            HandlerResult::GeneralAnswer { answer: answer.clone() },
            HandlerResult::SalaryAnswer { answer: answer.clone() },
            HandlerResult::VacancyAnswer { answer: answer.clone() },
        ] {
            assert_eq!(finalize(&result).answer, answer);
        }
    }

    #[test]
    fn test_finalize_is_pure() {
        let result = HandlerResult::SalaryAnswer {
            answer: "Your YTD payroll is 100.00.".to_string(),
        };
        let snapshot = result.clone();
        assert_eq!(finalize(&result), finalize(&result));
        assert_eq!(result, snapshot);
    }
}
