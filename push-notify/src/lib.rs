pub mod consumer;
pub mod service;

pub use consumer::run;
pub use service::{dispatch, NotificationService, NotificationSink};
