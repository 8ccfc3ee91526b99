//! Game-state filter
//!
//! Selects the plays that started from a given number of outs and, optionally, a given
//! base-occupancy configuration.

use crate::error::Result;
use crate::frame::require;
use polars::prelude::*;

pub const PRE_OUTS: &str = "pre_outs";
pub const PRE_RUNNER_1B: &str = "pre_runner_1b";
pub const PRE_RUNNER_2B: &str = "pre_runner_2b";
pub const PRE_RUNNER_3B: &str = "pre_runner_3b";

/// Pre-play configuration to keep. `None` base flags are not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    pub pre_outs: i64,
    pub runner_on_1b: Option<bool>,
    pub runner_on_2b: Option<bool>,
    pub runner_on_3b: Option<bool>,
}

impl Default for GameState {
    /// One out, bases unconstrained.
    fn default() -> Self {
        Self::outs(1)
    }
}

impl GameState {
    pub fn outs(pre_outs: i64) -> Self {
        Self {
            pre_outs,
            runner_on_1b: None,
            runner_on_2b: None,
            runner_on_3b: None,
        }
    }

    pub fn with_bases(mut self, first: bool, second: bool, third: bool) -> Self {
        self.runner_on_1b = Some(first);
        self.runner_on_2b = Some(second);
        self.runner_on_3b = Some(third);
        self
    }

    /// Keep the rows matching this state. Columns and row order are unchanged; a null in any
    /// checked column never matches.
    ///
    /// `pre_outs` may be stored as integers, floats or numeric text.
    pub fn filter(&self, plays: &DataFrame) -> Result<DataFrame> {
        require(plays, &[PRE_OUTS])?;
        let mut predicate = col(PRE_OUTS)
            .cast(DataType::Float64)
            .eq(lit(self.pre_outs as f64));
        for (column, wanted) in [
            (PRE_RUNNER_1B, self.runner_on_1b),
            (PRE_RUNNER_2B, self.runner_on_2b),
            (PRE_RUNNER_3B, self.runner_on_3b),
        ] {
            if let Some(wanted) = wanted {
                require(plays, &[column])?;
                let dtype = plays.column(column)?.dtype();
                predicate = predicate.and(occupancy_is(column, dtype, wanted));
            }
        }

        let filtered = plays.clone().lazy().filter(predicate).collect()?;
        log::info!(
            "Game state {:?}: kept {} of {} plays",
            self,
            filtered.height(),
            plays.height()
        );
        Ok(filtered)
    }
}

const OCCUPIED_TOKENS: [&str; 6] = ["true", "True", "TRUE", "t", "T", "1"];
const EMPTY_TOKENS: [&str; 6] = ["false", "False", "FALSE", "f", "F", "0"];

// Occupancy may arrive as a boolean, as the id of the runner on the base, or as text.
fn occupancy_is(column: &str, dtype: &DataType, occupied: bool) -> Expr {
    match dtype {
        DataType::Boolean => col(column).eq(lit(occupied)),
        DataType::String => {
            let tokens = if occupied {
                OCCUPIED_TOKENS
            } else {
                EMPTY_TOKENS
            };
            tokens
                .into_iter()
                .map(|t| col(column).eq(lit(t)))
                .reduce(|a, b| a.or(b))
                .unwrap_or(lit(false))
        }
        _ => {
            let value = col(column).cast(DataType::Float64);
            if occupied {
                value.neq(lit(0.0))
            } else {
                value.eq(lit(0.0))
            }
        }
    }
}
