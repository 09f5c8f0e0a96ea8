pub mod appointment;
pub mod boundary;
pub mod config;
pub mod directory;
pub mod error;
pub mod policy;
pub mod request;
pub mod service;
pub mod status;
pub mod store;
pub mod utils;
