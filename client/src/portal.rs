//! Typed client for the course-portal proxy. Every call goes through the
//! retry engine; inputs are validated before anything touches the network.

use coursefetch_retry::RequestDescriptor;
use coursefetch_retry::ReqwestTransport;
use coursefetch_retry::ResponsePayload;
use coursefetch_retry::RetryEngine;
use coursefetch_retry::RetryError;
use coursefetch_retry::Transport;
use coursefetch_retry::config::InvalidConfig;
use coursefetch_retry::transport::TransportError;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::AppConfig;
use crate::courses::Course;
use crate::courses::Department;
use crate::courses::Semester;

/// Header the proxy uses to tell API calls from page loads.
const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected before any request was made.
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Retry(#[from] RetryError),

    /// The call succeeded but the body did not have the expected shape.
    #[error("unexpected response from portal: {0}")]
    Decode(String),

    #[error("failed to set up HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] InvalidConfig),
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Retry(RetryError::UserCancelled))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Successful login reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Choices for the course query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalOptions {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub semesters: Vec<Semester>,
}

#[derive(Deserialize)]
struct CoursesResponse {
    #[serde(default)]
    courses: Vec<Course>,
}

pub struct PortalClient<T = ReqwestTransport> {
    engine: RetryEngine<T>,
    base_url: String,
}

impl PortalClient {
    /// Production client: reqwest transport with a cookie store, retry policy
    /// and base URL from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let engine = RetryEngine::new(config.retry.clone(), ReqwestTransport::new()?)?;
        Ok(Self::new(&config.portal.base_url, engine))
    }
}

impl<T: Transport> PortalClient<T> {
    pub fn new(base_url: &str, engine: RetryEngine<T>) -> Self {
        Self {
            engine,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    /// Replace the engine, e.g. to attach a reporter or a shutdown token.
    pub fn map_engine(self, f: impl FnOnce(RetryEngine<T>) -> RetryEngine<T>) -> Self {
        Self {
            engine: f(self.engine),
            base_url: self.base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::InvalidInput(
                "Please enter both User ID and Password".to_string(),
            ));
        }

        let request = RequestDescriptor::post_json(
            self.url("login"),
            json!({ "username": username, "password": password }),
        )
        .with_header(REQUESTED_WITH.0, REQUESTED_WITH.1);

        let payload = self.engine.execute(request, "Logging in").await?;
        tracing::info!(user = %username, "logged in");
        decode(&payload)
    }

    pub async fn logout(&self) -> Result<()> {
        let request = RequestDescriptor::post_json(self.url("logout"), json!({}))
            .with_header(REQUESTED_WITH.0, REQUESTED_WITH.1);
        self.engine.execute(request, "Logging out").await?;
        Ok(())
    }

    pub async fn fetch_options(&self) -> Result<PortalOptions> {
        let request = RequestDescriptor::get(self.url("options"))
            .with_header(REQUESTED_WITH.0, REQUESTED_WITH.1);
        let payload = self
            .engine
            .execute(request, "Fetching department & semester options")
            .await?;
        let options: PortalOptions = decode(&payload)?;
        tracing::debug!(
            departments = options.departments.len(),
            semesters = options.semesters.len(),
            "loaded portal options"
        );
        Ok(options)
    }

    pub async fn fetch_courses(&self, department_id: &str, semester_id: &str) -> Result<Vec<Course>> {
        let department_id = department_id.trim();
        let semester_id = semester_id.trim();
        if department_id.is_empty() || semester_id.is_empty() {
            return Err(ClientError::InvalidInput(
                "Please select both department and semester".to_string(),
            ));
        }

        let request = RequestDescriptor::post_json(
            self.url("courses"),
            json!({ "departmentId": department_id, "semesterId": semester_id }),
        )
        .with_header(REQUESTED_WITH.0, REQUESTED_WITH.1);

        let payload = self.engine.execute(request, "Fetching courses").await?;
        let response: CoursesResponse = decode(&payload)?;
        tracing::info!(count = response.courses.len(), "loaded courses");
        Ok(response.courses)
    }
}

fn decode<R: DeserializeOwned>(payload: &ResponsePayload) -> Result<R> {
    payload
        .deserialize()
        .map_err(|e| ClientError::Decode(e.to_string()))
}
