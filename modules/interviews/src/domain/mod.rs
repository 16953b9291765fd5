pub mod account;
pub mod error;
pub mod export;
pub mod mapper;
pub mod ports;
pub mod profile;
pub mod service;
pub mod sync;
pub mod validation;
pub mod views;
