//! Workflow pipelines orchestrating stateless services.

pub mod gateway;
pub mod sign;
pub mod visualize;
