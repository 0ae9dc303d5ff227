//! Configuration for the analyzer server and pipeline

pub mod security;
pub mod server;

pub use security::{security_middleware, SecurityState};
pub use server::{
    DatabaseConfig, LlmSection, PipelineConfig, SecurityConfig, SecurityMode, ServerConfig,
    ServerConfigError, ServerInfoConfig,
};
