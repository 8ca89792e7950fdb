//! Domain errors

mod decode_error;

pub use decode_error::DecodeError;
