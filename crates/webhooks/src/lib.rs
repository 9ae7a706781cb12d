pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod signing;

pub use config::WebhookConfig;
pub use engine::WebhookEngine;
pub use error::WebhookError;
pub use signing::{generate_secret, sign, verify};
