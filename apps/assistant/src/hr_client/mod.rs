//! HR data client: looks up payroll and leave figures by employee code.
//!
//! The HR service speaks a single request/response contract:
//! `POST {base}/employee/data` with `{"employeeCode": ".."}` returning
//! `{"vacancyBalanceDays": int, "YTDPayroll": number, "name"?: string}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const EMPLOYEE_DATA_PATH: &str = "/employee/data";

#[derive(Debug, Error)]
pub enum HrError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HR service returned status {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Serialize)]
struct EmployeeRequest<'a> {
    #[serde(rename = "employeeCode")]
    employee_code: &'a str,
}

/// Figures returned for one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    #[serde(rename = "vacancyBalanceDays")]
    pub vacancy_balance_days: i64,
    #[serde(rename = "YTDPayroll")]
    pub ytd_payroll: f64,
    #[serde(default)]
    pub name: Option<String>,
}

/// The HR lookup seam consumed by the salary and vacancy handlers.
#[async_trait]
pub trait HrLookup: Send + Sync {
    async fn employee_data(&self, employee_code: &str) -> Result<EmployeeRecord, HrError>;
}

/// reqwest-backed HR client.
#[derive(Clone)]
pub struct HrClient {
    client: Client,
    endpoint: String,
}

impl HrClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, HrError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()?,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), EMPLOYEE_DATA_PATH),
        })
    }
}

#[async_trait]
impl HrLookup for HrClient {
    async fn employee_data(&self, employee_code: &str) -> Result<EmployeeRecord, HrError> {
        debug!("HR lookup for employee {employee_code}");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmployeeRequest { employee_code })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(HrError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<EmployeeRecord>().await?)
    }
}
