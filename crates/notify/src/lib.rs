pub mod batcher;
pub mod cards;
pub mod channel;

pub use batcher::{BatchCategory, BatcherSettings, NotificationBatcher};
pub use cards::{MessageCard, NotificationEvent};
pub use channel::{DeliveryChannel, DeliveryError, NoopChannel, WebhookChannel};
