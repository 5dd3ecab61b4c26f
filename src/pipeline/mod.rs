// Traffic-processing pipeline — discovery tracking, capture, coordination.

pub mod batch;
pub mod capture;
pub mod coordinator;
pub mod tracking;
