pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod evaluator;
pub mod state;

pub use config::EngagementConfig;
pub use controller::EngagementController;
pub use dispatcher::{SuggestionCallback, SuggestionDispatcher};
pub use evaluator::evaluate_tick;
pub use state::{EvaluatorStatus, FiredTrigger, SessionState};
