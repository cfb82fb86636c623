pub mod app;
pub mod catalog;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod output;
pub mod store;
