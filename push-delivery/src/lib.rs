pub mod consumer;
pub mod webpush;

pub use consumer::run;
pub use webpush::{classify_status, DeliveryOutcome, WebPushDelivery, WebPushError};
