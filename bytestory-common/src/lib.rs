pub mod model;
pub mod recycle;
pub mod snowflake;
pub mod util;
