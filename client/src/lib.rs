//! Client for the course-portal proxy.
//!
//! [`PortalClient`] wraps the four proxy endpoints (login, logout, options,
//! courses) in the retry engine. [`courses`] holds the listing model and the
//! filter / sort / export helpers the CLI builds on, and [`config`] loads the
//! layered application configuration.

pub mod config;
pub mod courses;
mod portal;

pub use config::AppConfig;
pub use config::ConfigError;
pub use config::ConfigLoader;
pub use courses::Course;
pub use courses::CourseQuery;
pub use courses::Department;
pub use courses::Schedule;
pub use courses::Semester;
pub use courses::SortKey;
pub use portal::ClientError;
pub use portal::LoginResponse;
pub use portal::PortalClient;
pub use portal::PortalOptions;
