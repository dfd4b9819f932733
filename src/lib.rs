// src/lib.rs

//! Course catalogue crawler library

pub mod adapters;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
