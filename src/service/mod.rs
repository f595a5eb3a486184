// ============================================================================
// Service Module
// External-facing facade and notification fan-out
// ============================================================================

mod exchange;
mod notifications;

pub use exchange::Exchange;
pub use notifications::{Notification, NotificationHub, SubscriptionFilter};
