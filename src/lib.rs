pub mod config;
pub mod logger;
pub mod models;
pub mod server;

pub use config::*;
pub use logger::*;
pub use server::RelayApplicationServer;
pub use server::*;
