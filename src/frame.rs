//! Relational helpers over polars frames shared by the stages.
//!
//! The joins here never multiply rows: the right side is cut down to its first row per key
//! before joining, so every left row comes out exactly once and in its original order.

use crate::error::{Error, Result};
use polars::prelude::*;

const ROW_ORDER: &str = "__row_order";

pub fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_index(name).is_some()
}

pub fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Fail with [`Error::ColumnNotFound`] naming the first absent column.
pub fn require(frame: &DataFrame, columns: &[&str]) -> Result<()> {
    match columns.iter().find(|c| !has_column(frame, c)) {
        Some(missing) => Err(Error::ColumnNotFound(missing.to_string())),
        None => Ok(()),
    }
}

fn exprs(columns: &[&str]) -> Vec<Expr> {
    columns.iter().map(|c| col(c)).collect()
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

/// Keep the first row of each distinct `keys` tuple, in order of first appearance.
pub fn first_per_key(frame: &DataFrame, keys: &[&str]) -> Result<DataFrame> {
    require(frame, keys)?;
    Ok(frame
        .clone()
        .lazy()
        .unique_stable(Some(owned(keys)), UniqueKeepStrategy::First)
        .collect()?)
}

// `right` must already be unique on `right_on`.
pub(crate) fn ordered_left_join(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &[&str],
    right_on: &[&str],
    suffix: &str,
    join_nulls: bool,
) -> Result<DataFrame> {
    let joined = left
        .clone()
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join_builder()
        .with(right.clone().lazy())
        .left_on(exprs(left_on))
        .right_on(exprs(right_on))
        .how(JoinType::Left)
        .suffix(suffix)
        .join_nulls(join_nulls)
        .finish()
        .sort([ROW_ORDER], SortMultipleOptions::default())
        .collect()?;
    Ok(joined.drop(ROW_ORDER)?)
}

/// Left join `right` onto `left`, taking the first matching right row per key.
///
/// `right`'s key columns are cast to the types of `left`'s and dropped from the output; its
/// other columns that collide with `left`'s get `suffix`. A null key never matches.
pub fn left_join_first(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &[&str],
    right_on: &[&str],
    suffix: &str,
) -> Result<DataFrame> {
    require(left, left_on)?;
    require(right, right_on)?;
    if left_on.len() != right_on.len() {
        return Err(Error::InvalidValue {
            column: right_on.join(","),
            message: format!("{} left keys but {} right keys", left_on.len(), right_on.len()),
        });
    }

    let casts = left_on
        .iter()
        .zip(right_on)
        .map(|(l, r)| Ok(col(r).cast(left.column(l)?.dtype().clone())))
        .collect::<Result<Vec<Expr>>>()?;
    let deduped = right
        .clone()
        .lazy()
        .with_columns(casts)
        .unique_stable(Some(owned(right_on)), UniqueKeepStrategy::First)
        .collect()?;
    if deduped.height() < right.height() {
        log::debug!(
            "{} right rows repeat a key on {:?}; joining the first of each",
            right.height() - deduped.height(),
            right_on
        );
    }

    ordered_left_join(left, &deduped, left_on, right_on, suffix, false)
}

/// Set `target` to the first non-null value among `sources`, row by row.
pub fn coalesce_into(frame: &DataFrame, target: &str, sources: &[&str]) -> Result<DataFrame> {
    require(frame, sources)?;
    Ok(frame
        .clone()
        .lazy()
        .with_column(coalesce(&exprs(sources)).alias(target))
        .collect()?)
}

/// Stack frames holding the same columns, in the first frame's column order.
///
/// Column types are widened to a common supertype where they differ.
pub fn concat_rows(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let Some(first) = frames.first() else {
        return Ok(DataFrame::empty());
    };
    let order = column_names(first);

    let mut stacked = Vec::with_capacity(frames.len());
    for frame in &frames {
        let names = column_names(frame);
        let missing: Vec<String> = order.iter().filter(|c| !names.contains(c)).cloned().collect();
        let unexpected: Vec<String> = names.iter().filter(|c| !order.contains(c)).cloned().collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(Error::SchemaMismatch {
                missing,
                unexpected,
            });
        }
        let columns: Vec<Expr> = order.iter().map(|c| col(c)).collect();
        stacked.push(frame.clone().lazy().select(columns));
    }

    let args = UnionArgs {
        to_supertypes: true,
        ..Default::default()
    };
    Ok(concat(stacked, args)?.collect()?)
}

#[cfg(test)]
pub(crate) fn cell<'a>(frame: &'a DataFrame, column: &str, row: usize) -> AnyValue<'a> {
    frame.column(column).unwrap().get(row).unwrap()
}
