//! Pipeline functions for programmatic use by the CLI.
//!
//! Each dataset (one raw long-form play table) goes through the stages in order and every
//! intermediate is written next to the others under a suffix naming the stages applied so far:
//! `<stem>_wide`, `<stem>_wide_sprint`, `<stem>_wide_sprint_arm`,
//! `<stem>_wide_sprint_arm_geometry` and
//! `<stem>_wide_sprint_arm_geometry_game_state_filtered`.

use crate::enrich::merge_season_fallback;
use crate::error::Result;
use crate::frame::{coalesce_into, has_column};
use crate::game_state::GameState;
use crate::geometry::{derive_geometry, Diamond};
use crate::identity::{resolve_ids, NamedParticipant};
use crate::io::{locate, read_table, write_outputs};
use crate::pivot::{
    pivot_wide, widened_column, LongFormSchema, PivotStats, Role, PARTICIPANT_COLUMN,
};
use crate::prep::{add_is_successful, correct_names, default_name_corrections};
use crate::sources::{load_arm_strength, load_roster, load_sprint, SeasonRange};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::fmt::Write;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration
// ============================================================================

/// Earliest season the roster and metric exports cover.
pub const DEFAULT_FIRST_SEASON: i64 = 2021;

/// File stem of the roster table in the data directory.
pub const ROSTER_STEM: &str = "team_rosters";

pub const WIDE_SUFFIX: &str = "_wide";
pub const SPRINT_SUFFIX: &str = "_sprint";
pub const ARM_SUFFIX: &str = "_arm";
pub const GEOMETRY_SUFFIX: &str = "_geometry";
pub const FILTERED_SUFFIX: &str = "_game_state_filtered";

/// One raw play table and the base runner its plays are about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// File stem of the raw table, e.g. `throw_home_runner_on_third`
    pub stem: String,
    /// Role slot of the tagging runner
    pub runner: Role,
}

impl Dataset {
    pub fn new(stem: impl Into<String>, runner: Role) -> Self {
        Self {
            stem: stem.into(),
            runner,
        }
    }

    pub fn runner_on_third() -> Self {
        Self::new("throw_home_runner_on_third", Role::RunnerOnThird)
    }

    pub fn runner_on_second() -> Self {
        Self::new("throw_home_runner_on_second", Role::RunnerOnSecond)
    }

    /// Pick the runner role from a stem ending in `_on_second` / `_on_third`.
    pub fn from_stem(stem: &str) -> Option<Self> {
        let runner = if stem.ends_with("on_third") {
            Role::RunnerOnThird
        } else if stem.ends_with("on_second") {
            Role::RunnerOnSecond
        } else {
            return None;
        };
        Some(Self::new(stem, runner))
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the raw play, metric and roster files
    pub data_dir: PathBuf,
    /// Directory the stage outputs are written to
    pub output_dir: PathBuf,
    /// Raw play tables to process
    pub datasets: Vec<Dataset>,
    /// Seasons of sprint data to load
    pub seasons: SeasonRange,
    /// Minimum competitive runs for a sprint player-season
    pub min_competitive_runs: i64,
    /// Minimum throws for an arm-strength player-season
    pub min_throws: i64,
    /// Long-form column layout of the raw tables
    pub schema: LongFormSchema,
    /// Field coordinates of home plate
    pub diamond: Diamond,
    /// Pre-play state the final output is restricted to
    pub game_state: GameState,
    /// `(from, to)` spelling fixes for runner and fielder names
    pub name_corrections: Vec<(String, String)>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data"),
            datasets: vec![Dataset::runner_on_second(), Dataset::runner_on_third()],
            seasons: SeasonRange::through_current(DEFAULT_FIRST_SEASON),
            min_competitive_runs: 10,
            min_throws: 10,
            schema: LongFormSchema::default(),
            diamond: Diamond::default(),
            game_state: GameState::default(),
            name_corrections: default_name_corrections(),
        }
    }
}

impl PipelineConfig {
    /// Read and write everything in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            data_dir: dir.clone(),
            output_dir: dir,
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_datasets(mut self, datasets: Vec<Dataset>) -> Self {
        self.datasets = datasets;
        self
    }

    pub fn with_seasons(mut self, seasons: SeasonRange) -> Self {
        self.seasons = seasons;
        self
    }

    pub fn with_game_state(mut self, game_state: GameState) -> Self {
        self.game_state = game_state;
        self
    }

    pub fn with_diamond(mut self, diamond: Diamond) -> Self {
        self.diamond = diamond;
        self
    }
}

// ============================================================================
// Shared sources
// ============================================================================

/// Metric and roster tables shared by every dataset of a run.
#[derive(Debug, Clone)]
pub struct Sources {
    pub sprint: DataFrame,
    pub arm_strength: DataFrame,
    pub roster: DataFrame,
}

impl Sources {
    /// Every season in `config.seasons` needs both a sprint and an arm-strength file.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let dir = &config.data_dir;
        Ok(Self {
            sprint: load_sprint(dir, config.seasons, config.min_competitive_runs)?,
            arm_strength: load_arm_strength(dir, Some(config.seasons), config.min_throws)?,
            roster: load_roster(&locate(dir, ROSTER_STEM)?)?,
        })
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Fill the runner's id from the pivoted runner slot, else from the roster match.
///
/// The returned table carries the id in `who.id_column`.
pub fn attach_runner_id(wide: &DataFrame, roster: &DataFrame, runner: Role) -> Result<DataFrame> {
    let who = NamedParticipant::runner();
    let pivoted = widened_column(PARTICIPANT_COLUMN, runner);
    let resolved = resolve_ids(wide, roster, &who)?;
    if !has_column(&resolved, &pivoted) {
        return Ok(resolved);
    }
    coalesce_into(
        &resolved,
        &who.id_column,
        &[pivoted.as_str(), who.id_column.as_str()],
    )
}

/// Attach arm strength for each outfielder slot.
pub fn merge_outfield_arms(plays: &DataFrame, arm_strength: &DataFrame) -> Result<DataFrame> {
    let mut merged = plays.clone();
    for role in Role::OUTFIELD {
        merged = merge_season_fallback(
            &merged,
            arm_strength,
            &widened_column(PARTICIPANT_COLUMN, role),
        )?;
    }
    Ok(merged)
}

/// Outcome of one dataset's run.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub stem: String,
    pub pivot: PivotStats,
    /// Plays in the enriched table
    pub plays: usize,
    /// Plays left after the game-state filter
    pub filtered: usize,
    /// Every file written, parquet and csv, in stage order
    pub outputs: Vec<PathBuf>,
}

struct StageWriter<'a> {
    dir: &'a Path,
    name: String,
    outputs: Vec<PathBuf>,
}

impl StageWriter<'_> {
    fn write(&mut self, suffix: &str, frame: &DataFrame) -> Result<()> {
        self.name.push_str(suffix);
        let (parquet, csv) = write_outputs(frame, self.dir, &self.name)?;
        self.outputs.push(parquet);
        self.outputs.push(csv);
        Ok(())
    }
}

/// Run every stage on one dataset, writing each intermediate.
pub fn run_dataset(
    config: &PipelineConfig,
    dataset: &Dataset,
    sources: &Sources,
) -> Result<DatasetSummary> {
    log::info!("Processing {}", dataset.stem);
    let raw = read_table(&locate(&config.data_dir, &dataset.stem)?)?;
    let mut writer = StageWriter {
        dir: &config.output_dir,
        name: dataset.stem.clone(),
        outputs: Vec::new(),
    };

    let raw = correct_names(raw, &config.name_corrections)?;
    let pivoted = pivot_wide(&raw, &config.schema)?;
    let wide = pivoted.table;
    writer.write(WIDE_SUFFIX, &wide)?;

    let who = NamedParticipant::runner();
    let with_runner = attach_runner_id(&wide, &sources.roster, dataset.runner)?;
    let with_sprint = merge_season_fallback(&with_runner, &sources.sprint, &who.id_column)?;
    writer.write(SPRINT_SUFFIX, &with_sprint)?;

    let with_arms = merge_outfield_arms(&with_sprint, &sources.arm_strength)?;
    writer.write(ARM_SUFFIX, &with_arms)?;

    let enriched = add_is_successful(derive_geometry(&with_arms, &config.diamond)?)?;
    writer.write(GEOMETRY_SUFFIX, &enriched)?;

    let filtered = config.game_state.filter(&enriched)?;
    writer.write(FILTERED_SUFFIX, &filtered)?;

    Ok(DatasetSummary {
        stem: dataset.stem.clone(),
        pivot: pivoted.stats,
        plays: enriched.height(),
        filtered: filtered.height(),
        outputs: writer.outputs,
    })
}

/// Load the shared sources once and run every dataset in parallel.
pub fn run_pipeline(config: &PipelineConfig) -> Result<Vec<DatasetSummary>> {
    let sources = Sources::load(config)?;
    config
        .datasets
        .par_iter()
        .map(|dataset| run_dataset(config, dataset, &sources))
        .collect()
}

/// Human-readable report of a run.
pub fn format_summary(summaries: &[DatasetSummary]) -> Result<String> {
    let mut out = String::new();
    for s in summaries {
        writeln!(out, "{}", s.stem)?;
        writeln!(
            out,
            "  long rows: {} ({} discarded, {} duplicate roles, {} unlabeled plays)",
            s.pivot.rows_in,
            s.pivot.rows_discarded,
            s.pivot.duplicate_role_rows,
            s.pivot.unlabeled_plays
        )?;
        writeln!(out, "  plays: {} ({} after game-state filter)", s.plays, s.filtered)?;
        for path in &s.outputs {
            writeln!(out, "  wrote {}", path.display())?;
        }
    }
    Ok(out)
}
