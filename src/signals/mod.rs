pub mod attribution;
pub mod behavior;

pub use attribution::{email_match, product_mention, temporal_proximity};
pub use attribution::{ProductMention, TemporalProximity};
pub use behavior::{max_scroll_depth, time_elapsed};
