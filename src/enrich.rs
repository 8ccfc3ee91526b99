//! Season-fallback enrichment with player skill metrics
//!
//! Sprint and arm-strength tables hold one row per (player, season) together with two season
//! keys: `current_season`, the season the metric was measured in, and `season_after`, the
//! season that should fall back to it. A play in season Y takes the player's season-Y value
//! when there is one and the season-(Y-1) value otherwise.

use crate::error::{Error, Result};
use crate::frame::{coalesce_into, column_names, has_column, left_join_first, require};
use polars::prelude::DataFrame;

pub const METRIC_ID: &str = "player_id";
pub const CURRENT_SEASON: &str = "current_season";
pub const SEASON_AFTER: &str = "season_after";

/// Season column of the play tables.
pub const PLAY_SEASON: &str = "year";

/// Suffix of the fallback columns while the two joins are reconciled.
pub const FALLBACK_SUFFIX: &str = "_prev_season";

/// Left join `right` twice and keep the primary match's value, else the secondary's.
///
/// `coalesce` names the right columns to reconcile; each ends up holding the primary join's
/// value when non-null and the secondary join's value otherwise. A coalesce column with no
/// suffixed twin after the second join is skipped. Every other column brought in from `right`
/// is dropped, so the output is `left`'s columns followed by `coalesce`, with `left`'s row
/// count.
pub fn prefer_primary_join(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &[&str],
    primary_on: &[&str],
    secondary_on: &[&str],
    coalesce: &[&str],
    suffix: &str,
) -> Result<DataFrame> {
    if let Some(taken) = coalesce.iter().find(|c| has_column(left, c)) {
        return Err(Error::DuplicateColumn(taken.to_string()));
    }

    let primary = left_join_first(left, right, left_on, primary_on, suffix)?;
    let mut merged = left_join_first(&primary, right, left_on, secondary_on, suffix)?;

    for &column in coalesce {
        let twin = format!("{}{}", column, suffix);
        if !has_column(&merged, &twin) {
            log::debug!("no fallback column for {}, leaving it as joined", column);
            continue;
        }
        merged = coalesce_into(&merged, column, &[column, twin.as_str()])?;
    }

    let kept: Vec<String> = column_names(&merged)
        .into_iter()
        .filter(|c| has_column(left, c) || coalesce.contains(&c.as_str()))
        .collect();
    Ok(merged.select(kept)?)
}

/// Metric column name for a participant, e.g. `arm_overall_mlb_person_id_LF`.
pub fn participant_metric(metric: &str, participant_column: &str) -> String {
    format!("{}_{}", metric, participant_column)
}

/// Attach every metric in `metrics` to the player in `participant_column`.
///
/// `metrics` must carry `player_id`, `current_season` and `season_after`; each remaining column
/// is added as `<metric>_<participant_column>`, filled from the play season's row when present
/// and from the previous season's row otherwise. Plays without a match keep nulls.
pub fn merge_season_fallback(
    plays: &DataFrame,
    metrics: &DataFrame,
    participant_column: &str,
) -> Result<DataFrame> {
    require(plays, &[participant_column, PLAY_SEASON])?;
    require(metrics, &[METRIC_ID, CURRENT_SEASON, SEASON_AFTER])?;

    let mut renamed = metrics.clone();
    let mut enriched = Vec::new();
    for column in column_names(metrics) {
        if [METRIC_ID, CURRENT_SEASON, SEASON_AFTER].contains(&column.as_str()) {
            continue;
        }
        let name = participant_metric(&column, participant_column);
        renamed.rename(&column, &name)?;
        enriched.push(name);
    }
    let enriched: Vec<&str> = enriched.iter().map(String::as_str).collect();

    let merged = prefer_primary_join(
        plays,
        &renamed,
        &[participant_column, PLAY_SEASON],
        &[METRIC_ID, CURRENT_SEASON],
        &[METRIC_ID, SEASON_AFTER],
        &enriched,
        FALLBACK_SUFFIX,
    )?;

    log::info!(
        "Merged {} metric columns onto {} for {} plays",
        enriched.len(),
        participant_column,
        merged.height()
    );
    Ok(merged)
}
