pub mod backend;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod feed;
pub mod journal;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod web;
