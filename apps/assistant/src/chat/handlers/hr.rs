//! Salary and vacancy handlers backed by the HR lookup service.
//!
//! Lookup failures never fail the turn: the error text becomes the answer.

use std::sync::Arc;

use tracing::warn;

use crate::chat::classifier::{IntentRecord, RequestType};
use crate::chat::handlers::{HandlerError, HandlerResult};
use crate::hr_client::{EmployeeRecord, HrLookup};

pub struct HrHandler {
    hr: Arc<dyn HrLookup>,
}

impl HrHandler {
    pub fn new(hr: Arc<dyn HrLookup>) -> Self {
        Self { hr }
    }

    pub async fn salary(&self, intent: &IntentRecord) -> Result<HandlerResult, HandlerError> {
        let answer = self
            .answer_with(intent, RequestType::Salary, salary_answer)
            .await?;
        Ok(HandlerResult::SalaryAnswer { answer })
    }

    pub async fn vacancy(&self, intent: &IntentRecord) -> Result<HandlerResult, HandlerError> {
        let answer = self
            .answer_with(intent, RequestType::Vacancy, vacancy_answer)
            .await?;
        Ok(HandlerResult::VacancyAnswer { answer })
    }

    async fn answer_with(
        &self,
        intent: &IntentRecord,
        kind: RequestType,
        render: fn(&EmployeeRecord) -> String,
    ) -> Result<String, HandlerError> {
        let code = intent
            .employee_code
            .as_deref()
            .ok_or(HandlerError::MissingEmployeeCode(kind))?;

        match self.hr.employee_data(code).await {
            Ok(record) => Ok(render(&record)),
            Err(e) => {
                warn!("HR lookup for {kind} request failed: {e}");
                Ok(format!("Error: {e}"))
            }
        }
    }
}

fn salary_answer(record: &EmployeeRecord) -> String {
    match &record.name {
        Some(name) => format!("{name}, your YTD payroll is {:.2}.", record.ytd_payroll),
        None => format!("Your YTD payroll is {:.2}.", record.ytd_payroll),
    }
}

fn vacancy_answer(record: &EmployeeRecord) -> String {
    let days = record.vacancy_balance_days;
    let unit = if days == 1 { "day" } else { "days" };
    match &record.name {
        Some(name) => format!("{name}, your vacancy balance is {days} {unit}."),
        None => format!("Your vacancy balance is {days} {unit}."),
    }
}

/// User-facing text for a salary/vacancy request without an employee code.
pub fn missing_code_message(kind: RequestType) -> String {
    let subject = match kind {
        RequestType::Salary => "your payroll",
        RequestType::Vacancy => "your vacancy balance",
        RequestType::General => "your records",
    };
    format!(
        "I need your employee code to look up {subject}. \
         Please include it, for example: \"my code is ABC123\"."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHr;

    fn intent(request_type: RequestType, code: Option<&str>) -> IntentRecord {
        IntentRecord {
            request_type,
            employee_code: code.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_salary_answer_contains_payroll_only() {
        let hr = Arc::new(FakeHr::returning(17, 100.0, None));
        let handler = HrHandler::new(hr.clone());

        let result = handler
            .salary(&intent(RequestType::Salary, Some("abc123")))
            .await
            .unwrap();
        let HandlerResult::SalaryAnswer { answer } = result else {
            panic!("expected salary answer");
        };
        assert!(answer.contains("100.0"));
        assert!(!answer.contains("17"));
        assert_eq!(hr.lookups(), vec!["abc123"]);
    }

    #[tokio::test]
    async fn test_salary_answer_addresses_employee_by_name() {
        let handler = HrHandler::new(Arc::new(FakeHr::returning(3, 2500.5, Some("Ana"))));
        let result = handler
            .salary(&intent(RequestType::Salary, Some("7")))
            .await
            .unwrap();
        assert_eq!(
            result,
            HandlerResult::SalaryAnswer {
                answer: "Ana, your YTD payroll is 2500.50.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_vacancy_answer_states_days() {
        let handler = HrHandler::new(Arc::new(FakeHr::returning(10, 4321.0, None)));
        let result = handler
            .vacancy(&intent(RequestType::Vacancy, Some("abc123")))
            .await
            .unwrap();
        let HandlerResult::VacancyAnswer { answer } = result else {
            panic!("expected vacancy answer");
        };
        assert_eq!(answer, "Your vacancy balance is 10 days.");
    }

    #[tokio::test]
    async fn test_failing_lookup_becomes_answer() {
        let handler = HrHandler::new(Arc::new(FakeHr::failing()));
        let result = handler
            .vacancy(&intent(RequestType::Vacancy, Some("abc123")))
            .await
            .unwrap();
        let HandlerResult::VacancyAnswer { answer } = result else {
            panic!("expected vacancy answer");
        };
        assert!(answer.starts_with("Error: "));
        assert!(answer.contains("employee not found"));
    }

    #[tokio::test]
    async fn test_missing_code_is_typed_error() {
        let hr = Arc::new(FakeHr::returning(1, 1.0, None));
        let handler = HrHandler::new(hr.clone());
        let result = handler.salary(&intent(RequestType::Salary, None)).await;
        assert!(matches!(
            result,
            Err(HandlerError::MissingEmployeeCode(RequestType::Salary))
        ));
        assert!(hr.lookups().is_empty());
    }

    #[test]
    fn test_missing_code_message_names_subject() {
        assert!(missing_code_message(RequestType::Vacancy).contains("vacancy balance"));
        assert!(missing_code_message(RequestType::Salary).contains("employee code"));
    }
}
