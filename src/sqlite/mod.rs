// SQLite module - the `ConnectionHandle` implementations backed by rusqlite
//
// - config: options, builder and the bb8 connection manager
// - connection: a single shared connection and the blocking/cancellation bridge
// - pool: a bb8 pool of connections
// - params: conversion from `RowValues` to rusqlite values
// - query: row extraction and the blocking tasks run by the helper

pub mod config;
pub mod connection;
pub mod params;
pub mod pool;
pub mod query;

pub use config::{SqliteManager, SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteConnection;
pub use params::Params;
pub use pool::SqlitePool;
pub use query::{sqlite_extract_value_sync, sqlite_value_to_row_value};
