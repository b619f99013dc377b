pub mod attribution;
pub mod order;
pub mod session;
pub mod suggestion;
pub mod trigger;

pub use attribution::{AttributedOrder, AttributionType};
pub use order::{Conversation, LineItem, Order};
pub use session::{BehaviorEvent, BehaviorEventType, VisitorSession};
pub use suggestion::{ProactiveSuggestion, SUGGESTION_TYPE_PROACTIVE_CHAT};
pub use trigger::{TriggerDefinition, TriggerRow, TriggerRule};
