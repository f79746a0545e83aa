pub mod database;
pub mod event;
pub mod lock;
pub mod object_store;
pub mod repository;
pub mod service_provider;
