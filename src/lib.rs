pub mod aggregate;
pub mod app;
pub mod config;
pub mod converter;
pub mod coverage;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod index;
pub mod ledger;
pub mod lock;
pub mod output;
pub mod reports;
pub mod store;
pub mod translation;
