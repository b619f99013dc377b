pub mod config;
pub mod resolver;
pub mod scoring;

pub use config::AttributionConfig;
pub use resolver::OrderResolver;
pub use scoring::{score_candidate, AttributionScore};
