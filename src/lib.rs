pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod epoch;
pub mod error;
pub mod normalize;
pub mod output;
pub mod parse;
pub mod remote;
pub mod session;
pub mod store;
pub mod swift;
pub mod units;
pub mod webdriver;
