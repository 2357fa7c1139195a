pub mod models;
pub mod error;
pub mod room_code;
pub mod session;
pub mod coordinator;
