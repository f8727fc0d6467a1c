pub mod catalog;
pub mod config;
pub mod convert;
pub mod domain;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod fetcher;
pub mod fs_util;
pub mod http;
pub mod output;
pub mod plan;
pub mod report;
pub mod resolver;
pub mod store;
pub mod tools;
