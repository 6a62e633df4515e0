//! Sisu KDA Action
//!
//! Integration action that turns a scheduled report into a Sisu key-driver
//! analysis: it resolves the report's table in the Sisu catalog, rewrites the
//! report SQL to cover every table dimension, registers a base query and a
//! metric derived from the report's measure, and creates and runs a KDA
//! referencing that metric.

pub mod action;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use action::SisuKdaAction;
pub use config::ActionConfig;
pub use models::{ActionForm, ActionRequest, ActionResponse, KdaChain};
pub use services::{KdaService, SisuApi, SisuClient};
pub use utils::{ApiError, ApiResult};

#[cfg(test)]
mod tests;
