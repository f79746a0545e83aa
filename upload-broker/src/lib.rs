pub mod background_service;
pub mod config;
pub mod infrastructure;
pub mod server;
