#![forbid(unsafe_code)]

pub mod app;
pub mod assemble;
pub mod backend;
pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod diversity;
pub mod error;
pub mod logging;
pub mod model;
pub mod openai;
pub mod prompts;
pub mod render;
