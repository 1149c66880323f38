//! Library crate for guessr-back, exposing modules for binaries and integration tests.

pub mod calendar;
pub mod config;
pub mod dao;
mod dto;
pub mod error;
pub mod geo;
pub mod routes;
pub mod scoring;
pub mod services;
pub mod state;
pub mod tournament;
