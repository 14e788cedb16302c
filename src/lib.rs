//! Bookshelf Application Library
//!
//! This library provides the application modules for the bookshelf API.

pub mod modules;
