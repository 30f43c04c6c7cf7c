pub mod aggregation;
pub mod cache;
pub mod classifier;
pub mod common;
pub mod data_loader;
pub mod errors;
pub mod export;
pub mod generate_commands;
pub mod pipeline;
pub mod plan;
pub mod plan_execution;
pub mod record;
pub mod schema;
pub mod temporal;
