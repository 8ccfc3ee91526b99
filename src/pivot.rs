//! Wide pivot of per-fielder play records
//!
//! Raw play data arrives in long form: one row per (play, role slot), where the role is the
//! left/center/right fielder or the runner on second/third. [`pivot_wide`] folds those rows
//! into one row per play, spreading every fielder value across role-suffixed columns such as
//! `at_fielded_x_LF`. [`melt_wide`] undoes the fold.

use crate::error::{Error, Result};
use crate::frame::{column_names, concat_rows, first_per_key, ordered_left_join, require};
use polars::prelude::*;
use std::collections::HashSet;

/// Column holding the numeric role code.
pub const ROLE_COLUMN: &str = "pos_id";

/// Column holding the MLB id of the fielder or runner in the slot.
pub const PARTICIPANT_COLUMN: &str = "mlb_person_id";

/// Per-slot columns that get widened, in output order.
pub const VALUE_COLUMNS: [&str; 13] = [
    "pos_code",
    "pos_id",
    "mlb_person_id",
    "at_pitch_x",
    "at_pitch_y",
    "at_zone_x",
    "at_zone_y",
    "at_landing_x",
    "at_landing_y",
    "at_fielded_x",
    "at_fielded_y",
    "at_throw_1_x",
    "at_throw_1_y",
];

const ROLE_COUNT: usize = 5;

/// A labeled role slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    LeftField,
    CenterField,
    RightField,
    RunnerOnThird,
    RunnerOnSecond,
}

impl Role {
    /// Every labeled role, in widened-column order.
    pub const ALL: [Role; ROLE_COUNT] = [
        Role::LeftField,
        Role::CenterField,
        Role::RightField,
        Role::RunnerOnThird,
        Role::RunnerOnSecond,
    ];

    pub const OUTFIELD: [Role; 3] = [Role::LeftField, Role::CenterField, Role::RightField];

    /// Map a role code to its role. Codes other than 7, 8, 9, 36 and 37 are unlabeled.
    pub fn from_code(code: i64) -> Option<Role> {
        match code {
            7 => Some(Role::LeftField),
            8 => Some(Role::CenterField),
            9 => Some(Role::RightField),
            37 => Some(Role::RunnerOnThird),
            36 => Some(Role::RunnerOnSecond),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Role::LeftField => 7,
            Role::CenterField => 8,
            Role::RightField => 9,
            Role::RunnerOnThird => 37,
            Role::RunnerOnSecond => 36,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::LeftField => "LF",
            Role::CenterField => "CF",
            Role::RightField => "RF",
            Role::RunnerOnThird => "R3",
            Role::RunnerOnSecond => "R2",
        }
    }

    pub fn from_label(label: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.label() == label)
    }
}

/// Name of the widened column carrying `value` for `role`, e.g. `at_zone_x_CF`.
pub fn widened_column(value: &str, role: Role) -> String {
    format!("{}_{}", value, role.label())
}

/// Column layout expected of a long-form table.
#[derive(Debug, Clone)]
pub struct LongFormSchema {
    /// Columns widened per role
    pub value_columns: Vec<String>,
    /// Column holding the role code
    pub role_column: String,
    /// Column holding the participant id
    pub participant_column: String,
    /// Hard-coded index columns; `None` infers them as everything else
    pub index_columns: Option<Vec<String>>,
}

impl Default for LongFormSchema {
    fn default() -> Self {
        Self {
            value_columns: VALUE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            role_column: ROLE_COLUMN.to_string(),
            participant_column: PARTICIPANT_COLUMN.to_string(),
            index_columns: None,
        }
    }
}

impl LongFormSchema {
    /// Require the index columns to be exactly `columns`.
    pub fn with_index<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.index_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Check `long` against the schema and return its index columns.
    pub fn validate(&self, long: &DataFrame) -> Result<Vec<String>> {
        let columns = column_names(long);
        let present: HashSet<&str> = columns.iter().map(String::as_str).collect();

        let mut expected: Vec<&str> = self.value_columns.iter().map(String::as_str).collect();
        for extra in [self.role_column.as_str(), self.participant_column.as_str()] {
            if !expected.contains(&extra) {
                expected.push(extra);
            }
        }
        if let Some(index) = &self.index_columns {
            expected.extend(index.iter().map(String::as_str));
        }

        let missing: Vec<String> = expected
            .iter()
            .filter(|c| !present.contains(*c))
            .map(|c| c.to_string())
            .collect();
        let unexpected: Vec<String> = match &self.index_columns {
            Some(_) => columns
                .iter()
                .filter(|c| !expected.contains(&c.as_str()))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(Error::SchemaMismatch {
                missing,
                unexpected,
            });
        }

        Ok(columns
            .iter()
            .filter(|c| **c != self.role_column && !self.value_columns.contains(c))
            .cloned()
            .collect())
    }
}

/// Data-quality counters collected while pivoting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotStats {
    /// Rows read
    pub rows_in: usize,
    /// Rows discarded for having neither a role nor a participant id
    pub rows_discarded: usize,
    /// Rows that repeated a role already seen for their play (first row kept)
    pub duplicate_role_rows: usize,
    /// Plays made only of unlabeled rows, which produce no wide row
    pub unlabeled_plays: usize,
    /// Wide rows written
    pub rows_out: usize,
}

/// Result of [`pivot_wide`].
#[derive(Debug, Clone)]
pub struct Pivoted {
    pub table: DataFrame,
    pub stats: PivotStats,
}

fn is_role(code: &Expr, role: Role) -> Expr {
    code.clone().eq(lit(role.code()))
}

fn is_labeled(code: &Expr) -> Expr {
    Role::ALL
        .into_iter()
        .map(|role| is_role(code, role))
        .reduce(|a, b| a.or(b))
        .unwrap_or(lit(false))
}

/// Fold a long-form table into one row per play.
///
/// Plays are grouped on the full tuple of index columns in order of first appearance, with
/// null equal to null. Each labeled role contributes the cells of the first row carrying it;
/// later rows for the same role are counted in [`PivotStats::duplicate_role_rows`] and
/// ignored.
pub fn pivot_wide(long: &DataFrame, schema: &LongFormSchema) -> Result<Pivoted> {
    let index_columns = schema.validate(long)?;
    let index: Vec<&str> = index_columns.iter().map(String::as_str).collect();
    let code = col(&schema.role_column).cast(DataType::Int64);

    let kept = long
        .clone()
        .lazy()
        .filter(
            col(&schema.role_column)
                .is_not_null()
                .or(col(&schema.participant_column).is_not_null()),
        )
        .collect()?;
    let labeled = kept.clone().lazy().filter(is_labeled(&code)).collect()?;

    let all_plays = first_per_key(&kept.select(&index)?, &index)?.height();
    let plays = first_per_key(&labeled.select(&index)?, &index)?;
    let mut role_key = index.clone();
    role_key.push(&schema.role_column);
    let distinct_roles = first_per_key(&labeled, &role_key)?.height();

    let mut wide = plays;
    for role in Role::ALL {
        let cells: Vec<Expr> = index
            .iter()
            .map(|c| col(c))
            .chain(
                schema
                    .value_columns
                    .iter()
                    .map(|v| col(v).alias(&widened_column(v, role))),
            )
            .collect();
        let slot = labeled
            .clone()
            .lazy()
            .filter(is_role(&code, role))
            .unique_stable(Some(index_columns.clone()), UniqueKeepStrategy::First)
            .select(cells)
            .collect()?;
        wide = ordered_left_join(&wide, &slot, &index, &index, "_slot", true)?;
    }

    let mut columns = index_columns.clone();
    for value in &schema.value_columns {
        for role in Role::ALL {
            columns.push(widened_column(value, role));
        }
    }
    let wide = wide.select(&columns)?;

    let stats = PivotStats {
        rows_in: long.height(),
        rows_discarded: long.height() - kept.height(),
        duplicate_role_rows: labeled.height() - distinct_roles,
        unlabeled_plays: all_plays - wide.height(),
        rows_out: wide.height(),
    };
    if stats.duplicate_role_rows > 0 {
        log::warn!(
            "{} rows repeat a role already present in their play; kept the first of each",
            stats.duplicate_role_rows
        );
    }
    if stats.unlabeled_plays > 0 {
        log::warn!(
            "{} plays had no labeled role rows and were dropped",
            stats.unlabeled_plays
        );
    }
    log::info!(
        "Pivoted {} long rows ({} discarded) into {} plays",
        stats.rows_in,
        stats.rows_discarded,
        stats.rows_out
    );

    Ok(Pivoted { table: wide, stats })
}

const MELT_ROW: &str = "__melt_row";
const MELT_SLOT: &str = "__melt_slot";

/// Re-expand a wide table into long form.
///
/// Any column that is not a widened `value_columns` column is treated as an index column.
/// One long row is emitted per (play, role) whose widened cells are not all null, plays in
/// input order and roles in [`Role::ALL`] order. Output columns are the index columns
/// followed by `value_columns`.
pub fn melt_wide(wide: &DataFrame, value_columns: &[&str]) -> Result<DataFrame> {
    let widened: HashSet<String> = value_columns
        .iter()
        .flat_map(|v| Role::ALL.into_iter().map(move |r| widened_column(v, r)))
        .collect();
    let index_columns: Vec<String> = column_names(wide)
        .into_iter()
        .filter(|c| !widened.contains(c))
        .collect();

    let mut slots = Vec::with_capacity(Role::ALL.len());
    for (slot, role) in Role::ALL.into_iter().enumerate() {
        let sources: Vec<String> = value_columns.iter().map(|v| widened_column(v, role)).collect();
        let source_refs: Vec<&str> = sources.iter().map(String::as_str).collect();
        require(wide, &source_refs)?;

        let present = sources
            .iter()
            .map(|c| col(c).is_not_null())
            .reduce(|a, b| a.or(b))
            .unwrap_or(lit(false));
        let mut cells = vec![col(MELT_ROW), lit(slot as u32).alias(MELT_SLOT)];
        cells.extend(index_columns.iter().map(|c| col(c)));
        cells.extend(sources.iter().zip(value_columns).map(|(s, v)| col(s).alias(v)));

        slots.push(
            wide.clone()
                .lazy()
                .with_row_index(MELT_ROW, None)
                .filter(present)
                .select(cells)
                .collect()?,
        );
    }

    let melted = concat_rows(slots)?
        .lazy()
        .sort([MELT_ROW, MELT_SLOT], SortMultipleOptions::default())
        .collect()?;
    Ok(melted.drop(MELT_ROW)?.drop(MELT_SLOT)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::cell;

    type Slot = (&'static str, Option<i64>, Option<i64>, (f64, f64));

    fn long_frame(slots: &[Slot]) -> DataFrame {
        let n = slots.len();
        let mut columns = vec![
            Series::new("play_id", slots.iter().map(|s| s.0).collect::<Vec<_>>()),
            Series::new("year", vec![2023i64; n]),
            Series::new("fielder_position", vec![8i64; n]),
        ];
        for value in VALUE_COLUMNS {
            columns.push(match value {
                "pos_code" => Series::new(
                    value,
                    slots.iter().map(|s| s.1.map(|p| p.to_string())).collect::<Vec<_>>(),
                ),
                "pos_id" => Series::new(value, slots.iter().map(|s| s.1).collect::<Vec<_>>()),
                "mlb_person_id" => {
                    Series::new(value, slots.iter().map(|s| s.2).collect::<Vec<_>>())
                }
                "at_zone_x" => Series::new(value, slots.iter().map(|s| s.3 .0).collect::<Vec<_>>()),
                "at_zone_y" => Series::new(value, slots.iter().map(|s| s.3 .1).collect::<Vec<_>>()),
                _ => Series::new(value, vec![None::<f64>; n]),
            });
        }
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_role_codes() {
        assert_eq!(Role::from_code(7), Some(Role::LeftField));
        assert_eq!(Role::from_code(36).map(Role::label), Some("R2"));
        assert_eq!(Role::from_code(2), None);
        for role in Role::ALL {
            assert_eq!(Role::from_code(role.code()), Some(role));
            assert_eq!(Role::from_label(role.label()), Some(role));
        }
    }

    #[test]
    fn test_pivot_one_row_per_play() {
        let long = long_frame(&[
            ("a", Some(8), Some(100), (0.0, 300.0)),
            ("a", Some(37), Some(200), (1.0, 1.0)),
            ("b", Some(7), Some(101), (5.0, 250.0)),
        ]);
        let pivoted = pivot_wide(&long, &LongFormSchema::default()).unwrap();
        let wide = pivoted.table;

        assert_eq!(wide.height(), 2);
        assert_eq!(
            &wide.get_column_names()[..3],
            ["play_id", "year", "fielder_position"]
        );
        assert_eq!(wide.width(), 3 + VALUE_COLUMNS.len() * Role::ALL.len());
        assert_eq!(wide.get_column_names()[3], "pos_code_LF");
        assert_eq!(cell(&wide, "play_id", 0), AnyValue::String("a"));
        assert_eq!(cell(&wide, "at_zone_y_CF", 0), AnyValue::Float64(300.0));
        assert_eq!(cell(&wide, "mlb_person_id_R3", 0), AnyValue::Int64(200));
        assert_eq!(cell(&wide, "at_zone_x_LF", 0), AnyValue::Null);
        assert_eq!(cell(&wide, "pos_id_LF", 1), AnyValue::Int64(7));
        assert_eq!(pivoted.stats.rows_out, 2);
    }

    #[test]
    fn test_pivot_discards_rows_without_role_or_id() {
        let long = long_frame(&[
            ("a", Some(9), None, (0.0, 0.0)),
            ("a", None, None, (9.0, 9.0)),
            ("c", None, Some(5), (1.0, 1.0)),
        ]);
        let pivoted = pivot_wide(&long, &LongFormSchema::default()).unwrap();
        assert_eq!(pivoted.stats.rows_discarded, 1);
        // play "c" has only an unlabeled row and produces no wide row
        assert_eq!(pivoted.stats.unlabeled_plays, 1);
        assert_eq!(pivoted.table.height(), 1);
        assert_eq!(cell(&pivoted.table, "at_zone_x_RF", 0), AnyValue::Float64(0.0));
    }

    #[test]
    fn test_pivot_duplicate_role_keeps_first() {
        let long = long_frame(&[
            ("a", Some(8), Some(1), (10.0, 10.0)),
            ("a", Some(8), Some(2), (20.0, 20.0)),
        ]);
        let pivoted = pivot_wide(&long, &LongFormSchema::default()).unwrap();
        assert_eq!(pivoted.stats.duplicate_role_rows, 1);
        assert_eq!(cell(&pivoted.table, "mlb_person_id_CF", 0), AnyValue::Int64(1));
        assert_eq!(cell(&pivoted.table, "at_zone_x_CF", 0), AnyValue::Float64(10.0));
    }

    #[test]
    fn test_pivot_groups_null_index_values_together() {
        let mut long = long_frame(&[
            ("a", Some(8), Some(1), (10.0, 10.0)),
            ("a", Some(7), Some(2), (20.0, 20.0)),
        ]);
        long.with_column(Series::new("year", [None::<i64>, None]))
            .unwrap();
        let pivoted = pivot_wide(&long, &LongFormSchema::default()).unwrap();
        assert_eq!(pivoted.table.height(), 1);
        assert_eq!(cell(&pivoted.table, "mlb_person_id_LF", 0), AnyValue::Int64(2));
    }

    #[test]
    fn test_schema_mismatch_names_both_sides() {
        let long = long_frame(&[]).drop("at_throw_1_y").unwrap();

        let err = pivot_wide(
            &long,
            &LongFormSchema::default().with_index(["play_id", "year"]),
        )
        .unwrap_err();
        match err {
            Error::SchemaMismatch {
                missing,
                unexpected,
            } => {
                assert_eq!(missing, vec!["at_throw_1_y".to_string()]);
                assert_eq!(unexpected, vec!["fielder_position".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pivot_then_melt_round_trip() {
        let long = long_frame(&[
            ("a", Some(8), Some(100), (0.0, 300.0)),
            ("a", Some(37), Some(200), (1.0, 2.0)),
            ("b", Some(7), Some(101), (5.0, 250.0)),
            ("b", Some(9), None, (6.0, 240.0)),
        ]);
        let wide = pivot_wide(&long, &LongFormSchema::default()).unwrap().table;
        let melted = melt_wide(&wide, &VALUE_COLUMNS).unwrap();

        assert_eq!(column_names(&melted), column_names(&long));
        // roles come back in LF, CF, RF, R3, R2 order within each play
        let by_play_and_role = |frame: &DataFrame| {
            frame
                .sort(["play_id", "pos_id"], SortMultipleOptions::default())
                .unwrap()
        };
        assert!(by_play_and_role(&melted).equals_missing(&by_play_and_role(&long)));
        assert_eq!(cell(&melted, "pos_id", 0), AnyValue::Int64(8));
        assert_eq!(cell(&melted, "pos_id", 2), AnyValue::Int64(7));
    }
}
