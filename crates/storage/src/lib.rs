#![forbid(unsafe_code)]

//! Persistence layer: repository contracts, an in-memory implementation
//! for tests and prototyping, and the `SQLite` backend.

pub mod repository;
pub mod sqlite;
