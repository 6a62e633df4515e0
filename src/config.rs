//! Action configuration
//!
//! Immutable metadata record for the Sisu KDA action. Constructed once at
//! registration time and passed by reference afterwards; nothing mutates it
//! at runtime.

use serde::Serialize;
use std::time::Duration;

/// Default Sisu environment the action talks to
pub const DEFAULT_API_BASE: &str = "https://dev.sisu.ai";

/// Project that hosts the analyses created by this action
pub const DEFAULT_PROJECT_ID: i64 = 951;

/// Registration-surface metadata plus the remote endpoint settings.
#[derive(Debug, Clone, Serialize)]
pub struct ActionConfig {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub icon_name: &'static str,
    pub supported_action_types: &'static [&'static str],
    pub supported_formats: &'static [&'static str],
    pub required_field_tag: &'static str,
    /// Name of the user-supplied credential parameter
    pub token_param: &'static str,

    /// Base URL of the Sisu REST API
    pub api_base: String,
    /// Project under which analyses are created
    pub project_id: i64,
    /// Total timeout applied to each remote call
    #[serde(skip)]
    pub request_timeout: Duration,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            name: "sisu",
            label: "Create a general performance kda.",
            description: "Send data to Sisu and create a general performance kda.",
            icon_name: "sisu/sisu_logo.svg",
            supported_action_types: &["cell", "dashboard", "query"],
            supported_formats: &["json_detail"],
            required_field_tag: "sisu",
            token_param: "sisu_api_token",
            api_base: DEFAULT_API_BASE.to_string(),
            project_id: DEFAULT_PROJECT_ID,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ActionConfig {
    /// Override the API base URL (used by tests to point at a local server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_project_id(mut self, project_id: i64) -> Self {
        self.project_id = project_id;
        self
    }
}
