pub mod app;
pub mod config;
pub mod engine;
pub mod identity;
pub mod service;
pub mod session;
pub mod store;
pub mod ui;
