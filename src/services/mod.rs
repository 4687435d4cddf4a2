pub mod auth_service;
pub mod connection_service;
pub mod fanout_service;
pub mod match_service;
pub mod notification_service;
pub mod user_service;

pub use fanout_service::{FanoutEvent, FanoutHub, Subscription};
