pub mod backup;
pub mod client;
