pub mod approval;
pub mod decision;
pub mod tracking;
