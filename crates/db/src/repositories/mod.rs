pub mod approval;
pub mod tracking;

pub use approval::SqlApprovalStore;
pub use tracking::SqlTrackingStore;

use docgate_core::store::StoreError;

pub(crate) fn backend(error: sqlx::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

pub(crate) fn decode(message: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(message.to_string())
}
