//! Hive Mind: a cooperative sliding-block puzzle engine and its room server.

pub mod config;
pub mod engine;
pub mod games;
pub mod server;
pub mod storage;
