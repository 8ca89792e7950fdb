//! Value objects - immutable types that represent domain concepts

mod snowflake;
mod status;

pub use snowflake::{Snowflake, SnowflakeParseError};
pub use status::{Status, StatusParseError};
