pub mod auth;
pub mod handlers;
pub mod server;

pub use server::{router, run};
