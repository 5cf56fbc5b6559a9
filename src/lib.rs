pub mod directory;
pub mod dispatch;
pub mod mac;
pub mod message;
pub mod metrics;
pub mod mqtt;
pub mod target;
pub mod wol;
