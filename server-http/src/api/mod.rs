pub mod errors;
pub mod requests;
pub mod responses;

pub use errors::ApiError;
