pub mod client;
pub mod draft;
pub mod message;
