//! Studiobase - backend for a web-development agency site and customer portal
//!
//! This library provides the core functionality for the Studiobase server.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
