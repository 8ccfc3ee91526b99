//! Tagup - Build the tag-up play datasets
//!
//! Runs the full pipeline over the raw `throw_home_runner_on_*` tables, or a single stage
//! (pivot, game-state filter) over one file.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tagup::game_state::GameState;
use tagup::geometry::Diamond;
use tagup::io::{read_table, write_outputs};
use tagup::pipeline::{format_summary, run_pipeline, Dataset, PipelineConfig};
use tagup::pivot::{pivot_wide, LongFormSchema};
use tagup::sources::SeasonRange;

#[derive(Parser)]
#[command(name = "tagup")]
#[command(about = "Build tag-up play datasets from per-fielder Statcast records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Pre-play state to keep.
#[derive(Args, Clone)]
struct StateArgs {
    /// Outs before the play
    #[arg(long, default_value = "1")]
    pre_outs: i64,

    /// Require the bases as `first,second,third` flags, e.g. `false,false,true`
    #[arg(long, value_delimiter = ',', num_args = 3)]
    bases: Option<Vec<bool>>,
}

impl StateArgs {
    fn game_state(&self) -> Result<GameState> {
        let state = GameState::outs(self.pre_outs);
        match self.bases.as_deref() {
            None => Ok(state),
            Some(&[first, second, third]) => Ok(state.with_bases(first, second, third)),
            Some(other) => bail!("--bases takes three flags, got {}", other.len()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage over the raw play tables and write each intermediate
    Run {
        /// Directory with the raw play, sprint, arm strength and roster files
        #[arg(short, long, env = "TAGUP_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Output directory (default: the data directory)
        #[arg(short, long, env = "TAGUP_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Raw table stems ending in `_on_second` or `_on_third` (default: both)
        #[arg(long, value_delimiter = ',')]
        datasets: Vec<String>,

        /// First season of sprint data
        #[arg(long, env = "TAGUP_FIRST_SEASON", default_value = "2021")]
        first_season: i64,

        /// Last season of sprint data (default: current year)
        #[arg(long, env = "TAGUP_LAST_SEASON")]
        last_season: Option<i64>,

        /// Minimum competitive runs for a sprint player-season
        #[arg(long, default_value = "10")]
        min_runs: i64,

        /// Minimum throws for an arm strength player-season
        #[arg(long, default_value = "10")]
        min_throws: i64,

        /// Home plate x coordinate
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        home_x: f64,

        /// Home plate y coordinate
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        home_y: f64,

        #[command(flatten)]
        state: StateArgs,

        /// Number of parallel threads (default: number of CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Pivot one long-form table to wide form
    Pivot {
        /// Input .parquet or .csv file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Output name without extension (default: input stem + `_wide`)
        #[arg(long)]
        name: Option<String>,
    },

    /// Filter one wide table by game state
    Filter {
        /// Input .parquet or .csv file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        #[command(flatten)]
        state: StateArgs,
    },
}

fn input_stem(input: &std::path::Path) -> Result<String> {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Bad input file name: {}", input.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data_dir,
            output_dir,
            datasets,
            first_season,
            last_season,
            min_runs,
            min_throws,
            home_x,
            home_y,
            state,
            threads,
        } => {
            if let Some(n) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build_global()
                    .ok();
            }

            let seasons = match last_season {
                Some(last) => SeasonRange::new(first_season, last),
                None => SeasonRange::through_current(first_season),
            };
            let mut config = PipelineConfig::in_dir(&data_dir)
                .with_seasons(seasons)
                .with_diamond(Diamond::with_home(home_x, home_y))
                .with_game_state(state.game_state()?);
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }
            if !datasets.is_empty() {
                let parsed = datasets
                    .iter()
                    .map(|stem| {
                        Dataset::from_stem(stem).with_context(|| {
                            format!("Cannot tell the runner base from '{}'", stem)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                config = config.with_datasets(parsed);
            }
            config.min_competitive_runs = min_runs;
            config.min_throws = min_throws;

            let summaries = run_pipeline(&config)
                .with_context(|| format!("Pipeline failed for {}", data_dir.display()))?;
            print!("{}", format_summary(&summaries)?);
        }
        Commands::Pivot {
            input,
            output_dir,
            name,
        } => {
            let long = read_table(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let pivoted = pivot_wide(&long, &LongFormSchema::default())
                .with_context(|| format!("Failed to pivot {}", input.display()))?;
            let name = match name {
                Some(name) => name,
                None => format!("{}_wide", input_stem(&input)?),
            };
            let (parquet, csv) = write_outputs(&pivoted.table, &output_dir, &name)?;
            println!("{:?}", pivoted.stats);
            println!("Wrote {} and {}", parquet.display(), csv.display());
        }
        Commands::Filter {
            input,
            output_dir,
            state,
        } => {
            let wide = read_table(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let filtered = state.game_state()?.filter(&wide)?;
            let name = format!("{}_game_state_filtered", input_stem(&input)?);
            let (parquet, csv) = write_outputs(&filtered, &output_dir, &name)?;
            println!(
                "Kept {} of {} plays; wrote {} and {}",
                filtered.height(),
                wide.height(),
                parquet.display(),
                csv.display()
            );
        }
    }

    Ok(())
}
