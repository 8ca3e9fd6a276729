// src/lib.rs

//! Notion page cache library.
//!
//! Serves Notion record maps through a read-through cache, merging in the
//! site's navigation pages and low-quality image placeholders.

pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
