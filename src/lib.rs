//! Order attribution and proactive engagement engine for a chat widget.
//!
//! Two decision subsystems over noisy, partial visitor data:
//!
//! - **Attribution**: links e-commerce orders to the chat conversation
//!   that likely caused them, with a calibrated confidence score built
//!   from email, temporal, and product-mention signals.
//! - **Engagement**: a per-visitor-session trigger evaluator that decides,
//!   from behavioral telemetry, when to proactively surface a single chat
//!   suggestion.
//!
//! The two sides never share mutable state; they communicate only through
//! persisted conversation and order records.

pub mod attribution;
pub mod db;
pub mod engagement;
pub mod models;
pub mod settings;
pub mod signals;
pub mod utils;

pub use attribution::{AttributionConfig, OrderResolver};
pub use db::Database;
pub use engagement::{
    EngagementConfig, EngagementController, SuggestionCallback, SuggestionDispatcher,
};
pub use models::{
    AttributedOrder, AttributionType, BehaviorEvent, BehaviorEventType, Conversation, LineItem,
    Order, ProactiveSuggestion, TriggerDefinition, TriggerRule, VisitorSession,
};
pub use settings::SettingsStore;
pub use utils::logging::init_logging;
