pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_memory, DbPool};
pub use repositories::{SqlApprovalStore, SqlTrackingStore};
