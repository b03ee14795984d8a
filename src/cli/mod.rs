//! CLI module for the LLM tier router
//!
//! Subcommands:
//! - `serve`: run the HTTP server
//! - `classify`: show how a query would be routed

pub mod classify;
pub mod serve;

use clap::{Parser, Subcommand};

/// LLM tier router - complexity-based model selection with a semantic cache
#[derive(Parser)]
#[command(name = "llm-tier-router")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Print features, tier and candidate models for a query
    Classify(classify::ClassifyArgs),
}
