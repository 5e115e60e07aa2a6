pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod health;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod signal_generator;
pub mod state;
pub mod telegram;
