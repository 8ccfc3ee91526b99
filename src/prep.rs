//! Small clean-up steps applied around the main stages.

use crate::error::Result;
use crate::frame::{has_column, require};
use polars::prelude::*;

pub const EVENT_TYPE: &str = "event_type";
pub const IS_SUCCESSFUL: &str = "is_successful";

/// Name columns that get spelling corrections.
pub const NAME_COLUMNS: [&str; 2] = ["runner_name", "fielder_name"];

/// Spellings in the play data that differ from the roster's.
pub fn default_name_corrections() -> Vec<(String, String)> {
    vec![("Manny Pina".to_string(), "Manny Piña".to_string())]
}

/// Replace every occurrence of each `(from, to)` pair in the name columns that exist.
pub fn correct_names(mut plays: DataFrame, corrections: &[(String, String)]) -> Result<DataFrame> {
    for column in NAME_COLUMNS {
        if !has_column(&plays, column) {
            continue;
        }
        let names = plays.column(column)?;
        if names.dtype() != &DataType::String {
            continue;
        }
        let mut changed = 0usize;
        let fixed: Vec<Option<String>> = names
            .str()?
            .into_iter()
            .map(|name| {
                name.map(|name| {
                    let fixed = corrections
                        .iter()
                        .fold(name.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to));
                    if fixed != name {
                        changed += 1;
                    }
                    fixed
                })
            })
            .collect();
        plays.with_column(Series::new(column, fixed))?;
        if changed > 0 {
            log::debug!("Corrected {} names in {}", changed, column);
        }
    }
    Ok(plays)
}

/// Add `is_successful`: true when the play's `event_type` starts with `sac_fly`.
pub fn add_is_successful(mut plays: DataFrame) -> Result<DataFrame> {
    require(&plays, &[EVENT_TYPE])?;
    let events = plays.column(EVENT_TYPE)?.cast(&DataType::String)?;
    let flags: Vec<Option<bool>> = events
        .str()?
        .into_iter()
        .map(|event| event.map(|e| e.starts_with("sac_fly")))
        .collect();
    plays.with_column(Series::new(IS_SUCCESSFUL, flags))?;
    Ok(plays)
}
