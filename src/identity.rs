//! Player identity resolution against team rosters
//!
//! Play records name the runner but do not always carry the runner's MLB id. The id is
//! recovered from roster records, first by (name, season, team) and, for rows that still
//! lack one, by name alone. The name-only pass picks the first roster row for a name, so a
//! name shared by two players can be attributed to the wrong one.

use crate::error::{Error, Result};
use crate::frame::{concat_rows, has_column, left_join_first, require};
use polars::prelude::*;

pub const ROSTER_NAME: &str = "person_full_name";
pub const ROSTER_SEASON: &str = "season";
pub const ROSTER_TEAM: &str = "team_abbreviation";
pub const ROSTER_ID: &str = "person_id";

/// Pairs of left/right key columns for one join attempt.
#[derive(Debug, Clone)]
pub struct KeySet {
    pub left_on: Vec<String>,
    pub right_on: Vec<String>,
}

impl KeySet {
    pub fn new(left_on: &[&str], right_on: &[&str]) -> Self {
        Self {
            left_on: left_on.iter().map(|s| s.to_string()).collect(),
            right_on: right_on.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Attach `target` from `right` to every row of `left`, trying each key set in turn.
///
/// Rows matched by a key set are set aside; only the rows that are still unmatched move on
/// to the next (weaker) key set. Rows no key set matches get a null `target`. The output holds
/// every input row exactly once: rows resolved by the first key set, then by the second, and
/// so on, followed by the unresolved rows.
pub fn fallback_join(
    left: &DataFrame,
    right: &DataFrame,
    key_sets: &[KeySet],
    target: &str,
) -> Result<DataFrame> {
    if has_column(left, target) {
        return Err(Error::DuplicateColumn(target.to_string()));
    }
    require(right, &[target])?;
    let target_type = right.column(target)?.dtype().clone();

    let mut resolved = Vec::with_capacity(key_sets.len() + 1);
    let mut pending = left.clone();

    for (phase, keys) in key_sets.iter().enumerate() {
        if pending.height() == 0 {
            break;
        }
        let left_on: Vec<&str> = keys.left_on.iter().map(String::as_str).collect();
        let mut right_cols: Vec<&str> = keys.right_on.iter().map(String::as_str).collect();
        right_cols.push(target);
        require(right, &right_cols)?;
        let projection = right.select(&right_cols)?;

        let joined = left_join_first(
            &pending,
            &projection,
            &left_on,
            &right_cols[..left_on.len()],
            "_right",
        )?;
        let hits = joined
            .clone()
            .lazy()
            .filter(col(target).is_not_null())
            .collect()?;
        let misses = joined
            .lazy()
            .filter(col(target).is_null())
            .collect()?
            .drop(target)?;

        log::debug!(
            "{} phase {}: matched {} of {} rows on {:?}",
            target,
            phase + 1,
            hits.height(),
            pending.height(),
            keys.left_on
        );
        resolved.push(hits);
        pending = misses;
    }

    let unresolved = pending.height();
    if unresolved > 0 {
        log::info!("{} rows left without {}", unresolved, target);
    }
    pending.with_column(Series::full_null(target, unresolved, &target_type))?;
    resolved.push(pending);
    concat_rows(resolved)
}

/// Columns naming a participant whose id should be resolved.
#[derive(Debug, Clone)]
pub struct NamedParticipant {
    pub name_column: String,
    pub season_column: String,
    pub team_column: String,
    /// Column the resolved id is written to
    pub id_column: String,
}

impl NamedParticipant {
    /// The base runner of a `throw_home_runner_on_*` play.
    pub fn runner() -> Self {
        Self {
            name_column: "runner_name".to_string(),
            season_column: "year".to_string(),
            team_column: "runner_team".to_string(),
            id_column: "runner_player_id".to_string(),
        }
    }
}

/// Resolve the participant's id from `roster` by (name, season, team), then by name alone.
///
/// `roster` needs `person_full_name`, `season`, `team_abbreviation` and `person_id`. The output
/// has one more column, `who.id_column`, and exactly as many rows as `plays`.
pub fn resolve_ids(
    plays: &DataFrame,
    roster: &DataFrame,
    who: &NamedParticipant,
) -> Result<DataFrame> {
    let roster_columns = [ROSTER_NAME, ROSTER_SEASON, ROSTER_TEAM, ROSTER_ID];
    require(roster, &roster_columns)?;
    let mut roster = roster.select(roster_columns)?;
    roster.rename(ROSTER_ID, &who.id_column)?;

    let key_sets = [
        KeySet::new(
            &[
                who.name_column.as_str(),
                who.season_column.as_str(),
                who.team_column.as_str(),
            ],
            &[ROSTER_NAME, ROSTER_SEASON, ROSTER_TEAM],
        ),
        KeySet::new(&[who.name_column.as_str()], &[ROSTER_NAME]),
    ];

    let resolved = fallback_join(plays, &roster, &key_sets, &who.id_column)?;
    log::info!(
        "Resolved {} for {} of {} plays",
        who.id_column,
        resolved.height() - resolved.column(&who.id_column)?.null_count(),
        resolved.height()
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::cell;

    fn plays() -> DataFrame {
        df!(
            "play_id" => ["p1", "p2", "p3", "p4"],
            "runner_name" => [Some("Manny Piña"), Some("Tim Traded"), Some("Nobody Known"), None],
            "year" => [2022i64, 2023, 2023, 2023],
            "runner_team" => ["ATL", "SEA", "NYY", "NYY"]
        )
        .unwrap()
    }

    fn roster() -> DataFrame {
        df!(
            ROSTER_NAME => ["Manny Piña", "Manny Piña", "Tim Traded"],
            ROSTER_SEASON => [2022i64, 2022, 2022],
            ROSTER_TEAM => ["ATL", "ATL", "TOR"],
            ROSTER_ID => [444i64, 999, 555]
        )
        .unwrap()
    }

    fn id_of(frame: &DataFrame, play: &str) -> Option<i64> {
        let row = frame
            .column("play_id")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .position(|v| v == Some(play))
            .unwrap();
        frame
            .column("runner_player_id")
            .unwrap()
            .i64()
            .unwrap()
            .get(row)
    }

    #[test]
    fn test_two_phase_resolution() {
        let out = resolve_ids(&plays(), &roster(), &NamedParticipant::runner()).unwrap();
        assert_eq!(out.height(), 4);
        // exact (name, season, team) match, first roster row wins
        assert_eq!(id_of(&out, "p1"), Some(444));
        // team and season differ, so only the name-only pass finds the id
        assert_eq!(id_of(&out, "p2"), Some(555));
        assert_eq!(id_of(&out, "p3"), None);
        assert_eq!(id_of(&out, "p4"), None);
        // phase-one rows come first
        assert_eq!(cell(&out, "play_id", 0), AnyValue::String("p1"));
        assert_eq!(cell(&out, "play_id", 1), AnyValue::String("p2"));
    }

    #[test]
    fn test_empty_roster_keeps_every_row() {
        let empty = df!(
            ROSTER_NAME => Vec::<&str>::new(),
            ROSTER_SEASON => Vec::<i64>::new(),
            ROSTER_TEAM => Vec::<&str>::new(),
            ROSTER_ID => Vec::<i64>::new()
        )
        .unwrap();
        let out = resolve_ids(&plays(), &empty, &NamedParticipant::runner()).unwrap();
        assert_eq!(out.height(), plays().height());
        assert_eq!(out.column("runner_player_id").unwrap().null_count(), 4);
        assert_eq!(
            out.column("runner_player_id").unwrap().dtype(),
            &DataType::Int64
        );
    }

    #[test]
    fn test_fallback_join_rejects_existing_target() {
        let err = fallback_join(&plays(), &roster(), &[], "year").unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(_)));
    }
}
