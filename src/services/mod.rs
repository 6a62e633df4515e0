pub mod kda_service;
pub mod query_rewriter;
pub mod sisu_client;

pub use kda_service::KdaService;
pub use sisu_client::{SisuApi, SisuClient};
