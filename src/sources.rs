//! Loading the season-level skill metrics and rosters
//!
//! Metric files are exported one per season by the download tooling:
//! `sprint_<season>.csv` (Statcast running splits) and `arm_strength_<season>.csv`
//! (Statcast arm strength). Each loaded row is tagged with `current_season` and
//! `season_after` for [`crate::enrich::merge_season_fallback`].

use crate::enrich::{CURRENT_SEASON, METRIC_ID, SEASON_AFTER};
use crate::error::{Error, Result};
use crate::identity::{ROSTER_ID, ROSTER_NAME, ROSTER_SEASON, ROSTER_TEAM};
use crate::frame::{column_names, concat_rows, has_column, require};
use crate::io::{read_csv, read_table};
use chrono::Datelike;
use polars::prelude::*;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Running-split timings, seconds from contact to each 5 ft mark up to 90 ft.
pub const SPLIT_COLUMNS: [&str; 19] = [
    "seconds_since_hit_000",
    "seconds_since_hit_005",
    "seconds_since_hit_010",
    "seconds_since_hit_015",
    "seconds_since_hit_020",
    "seconds_since_hit_025",
    "seconds_since_hit_030",
    "seconds_since_hit_035",
    "seconds_since_hit_040",
    "seconds_since_hit_045",
    "seconds_since_hit_050",
    "seconds_since_hit_055",
    "seconds_since_hit_060",
    "seconds_since_hit_065",
    "seconds_since_hit_070",
    "seconds_since_hit_075",
    "seconds_since_hit_080",
    "seconds_since_hit_085",
    "seconds_since_hit_090",
];

/// Descriptive sprint columns that are not metrics.
const SPRINT_DESCRIPTIVE: [&str; 7] = [
    "last_name, first_name",
    "team_id",
    "team",
    "position",
    "age",
    "position_name",
    "name_abbrev",
];

/// Sprint sample-size column.
pub const COMPETITIVE_RUNS: &str = "competitive_runs";

/// Inclusive range of seasons to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonRange {
    pub first: i64,
    pub last: i64,
}

impl SeasonRange {
    pub fn new(first: i64, last: i64) -> Self {
        Self { first, last }
    }

    /// From `first` through the current calendar year.
    pub fn through_current(first: i64) -> Self {
        Self::new(first, i64::from(chrono::Local::now().year()))
    }

    pub fn seasons(&self) -> impl Iterator<Item = i64> {
        self.first..=self.last
    }
}

fn tag_seasons(frame: DataFrame, season: i64) -> Result<DataFrame> {
    Ok(frame
        .lazy()
        .with_columns([
            lit(season).alias(CURRENT_SEASON),
            lit(season + 1).alias(SEASON_AFTER),
        ])
        .collect()?)
}

// ============================================================================
// Sprint
// ============================================================================

pub fn sprint_path(dir: &Path, season: i64) -> PathBuf {
    dir.join(format!("sprint_{}.csv", season))
}

/// Clean one season's raw running-splits table.
///
/// Player-seasons with fewer than `min_runs` competitive runs are dropped when the
/// `competitive_runs` column is present; descriptive columns are removed and the split
/// timings cast to floats.
pub fn prepare_sprint(raw: DataFrame, season: i64, min_runs: i64) -> Result<DataFrame> {
    let raw = if has_column(&raw, COMPETITIVE_RUNS) {
        let runs = col(COMPETITIVE_RUNS).cast(DataType::Float64);
        let kept = raw
            .clone()
            .lazy()
            .filter(runs.clone().is_null().or(runs.gt_eq(lit(min_runs as f64))))
            .collect()?;
        log::debug!(
            "Sprint {}: {} of {} players meet {} competitive runs",
            season,
            kept.height(),
            raw.height(),
            min_runs
        );
        kept
    } else {
        raw
    };
    require(&raw, &[METRIC_ID])?;
    require(&raw, &SPLIT_COLUMNS)?;

    let kept: Vec<String> = column_names(&raw)
        .into_iter()
        .filter(|c| c.as_str() != COMPETITIVE_RUNS && !SPRINT_DESCRIPTIVE.contains(&c.as_str()))
        .collect();
    let mut casts = vec![col(METRIC_ID).cast(DataType::Int64)];
    casts.extend(SPLIT_COLUMNS.iter().map(|c| col(c).cast(DataType::Float64)));
    let sprint = raw.select(kept)?.lazy().with_columns(casts).collect()?;
    tag_seasons(sprint, season)
}

/// Load and stack the sprint tables of every season in `seasons`.
pub fn load_sprint(dir: &Path, seasons: SeasonRange, min_runs: i64) -> Result<DataFrame> {
    let mut frames = Vec::new();
    for season in seasons.seasons() {
        let path = sprint_path(dir, season);
        if !path.exists() {
            return Err(Error::MissingArtifact {
                path,
                reason: format!("no sprint data for season {}", season),
            });
        }
        frames.push(prepare_sprint(read_csv(&path)?, season, min_runs)?);
    }
    if frames.is_empty() {
        return Err(Error::MissingArtifact {
            path: dir.to_path_buf(),
            reason: format!("empty season range {:?}", seasons),
        });
    }
    let sprint = concat_rows(frames)?;
    log::info!("Loaded {} player-seasons of sprint data", sprint.height());
    Ok(sprint)
}

// ============================================================================
// Arm strength
// ============================================================================

#[derive(Debug, Deserialize)]
struct ArmStrengthRecord {
    player_id: i64,
    total_throws: Option<i64>,
    max_arm_strength: Option<f64>,
    arm_overall: Option<f64>,
}

pub const ARM_COLUMNS: [&str; 4] = [METRIC_ID, "total_throws", "max_arm_strength", "arm_overall"];

/// Season of an `arm_strength_<season>.csv` file name.
pub fn arm_strength_season(path: &Path) -> Option<i64> {
    lazy_static::lazy_static! {
        static ref ARM_FILE: Regex = Regex::new(r"^arm_strength_(\d{4})\.csv$").unwrap();
    }
    let name = path.file_name()?.to_str()?;
    ARM_FILE.captures(name)?.get(1)?.as_str().parse().ok()
}

/// All `arm_strength_<season>.csv` files in `dir`, ordered by season.
pub fn arm_strength_files(dir: &Path) -> Result<Vec<(i64, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(season) = arm_strength_season(&path) {
            files.push((season, path));
        }
    }
    files.sort();
    Ok(files)
}

/// Read one arm-strength file, keeping players with at least `min_throws` throws.
pub fn read_arm_strength(path: &Path, season: i64, min_throws: i64) -> Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let mut player_id = Vec::new();
    let mut total_throws = Vec::new();
    let mut max_arm_strength = Vec::new();
    let mut arm_overall = Vec::new();
    let mut below_minimum = 0usize;
    for result in reader.deserialize() {
        let record: ArmStrengthRecord = result?;
        if record.total_throws.is_some_and(|n| n < min_throws) {
            below_minimum += 1;
            continue;
        }
        player_id.push(record.player_id);
        total_throws.push(record.total_throws);
        max_arm_strength.push(record.max_arm_strength);
        arm_overall.push(record.arm_overall);
    }
    if below_minimum > 0 {
        log::debug!(
            "Arm strength {}: dropped {} players under {} throws",
            season,
            below_minimum,
            min_throws
        );
    }
    let [id_column, throws_column, max_column, overall_column] = ARM_COLUMNS;
    let frame = DataFrame::new(vec![
        Series::new(id_column, player_id),
        Series::new(throws_column, total_throws),
        Series::new(max_column, max_arm_strength),
        Series::new(overall_column, arm_overall),
    ])?;
    tag_seasons(frame, season)
}

/// Load and stack the arm-strength files in `dir`.
///
/// With `seasons`, every season in the range must have a file and other files are ignored;
/// without it, every file found is loaded. Finding no file at all is an error.
pub fn load_arm_strength(
    dir: &Path,
    seasons: Option<SeasonRange>,
    min_throws: i64,
) -> Result<DataFrame> {
    let mut files = arm_strength_files(dir)?;
    if let Some(range) = seasons {
        files.retain(|(season, _)| range.seasons().any(|s| s == *season));
        if let Some(season) = range.seasons().find(|s| !files.iter().any(|(f, _)| f == s)) {
            return Err(Error::MissingArtifact {
                path: dir.join(format!("arm_strength_{}.csv", season)),
                reason: format!("no arm strength data for season {}", season),
            });
        }
    }
    if files.is_empty() {
        return Err(Error::MissingArtifact {
            path: dir.to_path_buf(),
            reason: "no arm_strength_<season>.csv files found".to_string(),
        });
    }

    let frames = files
        .iter()
        .map(|(season, path)| read_arm_strength(path, *season, min_throws))
        .collect::<Result<Vec<_>>>()?;
    let arm = concat_rows(frames)?;
    log::info!("Loaded {} player-seasons of arm strength data", arm.height());
    Ok(arm)
}

// ============================================================================
// Rosters
// ============================================================================

/// Load the roster table and keep the columns identity resolution needs.
pub fn load_roster(path: &Path) -> Result<DataFrame> {
    let roster = read_table(path)?;
    require(&roster, &[ROSTER_NAME, ROSTER_SEASON, ROSTER_TEAM, ROSTER_ID])?;
    let roster = roster
        .lazy()
        .select([
            col(ROSTER_NAME).cast(DataType::String),
            col(ROSTER_SEASON).cast(DataType::Int64),
            col(ROSTER_TEAM).cast(DataType::String),
            col(ROSTER_ID).cast(DataType::Int64),
        ])
        .collect()?;
    log::info!("Loaded {} roster entries", roster.height());
    Ok(roster)
}
