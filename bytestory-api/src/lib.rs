pub mod server;
pub mod sweep;
