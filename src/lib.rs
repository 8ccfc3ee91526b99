//! Tag-up play dataset builder
//!
//! Builds one-row-per-play tables of "runner tags up on a fly ball and tries to score" plays
//! from per-fielder Statcast records.
//!
//! This library provides:
//! - `pivot`: long per-fielder rows to one wide row per play
//! - `identity`: runner id resolution against team rosters
//! - `enrich`: sprint and arm-strength metrics with a previous-season fallback
//! - `geometry`: catch-to-base and distance-traveled features
//! - `game_state`: pre-play outs / base occupancy filter
//! - `pipeline`: the stages run end to end over files
//! - `frame`, `io`: polars join/stack helpers and CSV/Parquet files
//!
//! Binaries:
//! - `tagup`: runs the pipeline or single stages from the command line

pub mod enrich;
pub mod error;
pub mod frame;
pub mod game_state;
pub mod geometry;
pub mod identity;
pub mod io;
pub mod pipeline;
pub mod pivot;
pub mod prep;
pub mod sources;

pub use error::{Error, Result};
pub use polars::prelude::DataFrame;
