//! Data Transfer Objects for REST request/response serialization.

pub mod attendant_dto;

pub use attendant_dto::*;
