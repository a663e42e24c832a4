//! Rately server library.
//!
//! This crate provides the store-rating backend as a library, allowing it to
//! be tested and reused. The binary in `main.rs` wires it to a `PostgreSQL`
//! pool and an axum listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
