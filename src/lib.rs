pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod shutdown;
pub mod worker;
