//! Skryba - Transcript Harvesting Pipeline
//!
//! A CLI tool that turns configured feeds and channels into per-source JSONL
//! logs of plain-text transcripts.
//!
//! The name "Skryba" comes from the Polish word for "scribe."
//!
//! # Overview
//!
//! Skryba allows you to:
//! - Enumerate the most recent items from RSS/Atom feeds and video channels
//! - Filter items by duration and publication date before any heavy work
//! - Resolve each item's text through a chain of fallback strategies, from
//!   published transcripts down to speech-to-text on the raw audio
//! - Resume interrupted runs without duplicating output
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and source list management
//! - `enumerate` - Candidate item discovery per source
//! - `filter` - Metadata gating (duration, publication date)
//! - `resolve` - The tiered text resolution chain
//! - `transcribe` - Speech-to-text engine abstraction
//! - `sink` - Append-only JSONL output with resume support
//! - `pacing` - Retry backoff and inter-item pacing
//! - `runner` - External tool invocation
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use skryba::config::{load_sources, Settings};
//! use skryba::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let sources = load_sources(&settings.sources_file())?;
//!     let mut orchestrator = Orchestrator::new(&settings, sources)?;
//!
//!     let summary = orchestrator.run().await?;
//!     println!("Resolved {} item(s)", summary.total_resolved());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod pacing;
pub mod resolve;
pub mod runner;
pub mod sink;
pub mod transcribe;

pub use error::{Result, SkrybaError};
