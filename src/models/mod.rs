pub mod connection;
pub mod notification;
pub mod user;

pub use connection::*;
pub use notification::*;
pub use user::*;
