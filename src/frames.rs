//! Relational steps over canonical rows
//!
//! Typed rows go in as columns, the grouping, reshaping and joining runs as
//! polars lazy frames, and the collected columns come back out as plain
//! values.

use crate::error::{QaError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

pub const STATE: &str = "state";
pub const YEAR: &str = "year";
pub const KEY: &str = "key";
pub const VALUE: &str = "value";
const ROW: &str = "row_nr";
const STATION: &str = "variable";

/// How a group of values collapses to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Sum,
    Mean,
}

impl Agg {
    fn expr(self, column: &str) -> Expr {
        match self {
            Agg::Sum => col(column).sum(),
            Agg::Mean => col(column).mean(),
        }
    }
}

/// One value per year. Rows with a null year or value are dropped first, so
/// a year with no numeric values does not appear.
pub fn yearly(
    years: Vec<Option<i32>>,
    values: Vec<Option<f64>>,
    agg: Agg,
) -> Result<BTreeMap<i32, f64>> {
    let df = DataFrame::new(vec![Series::new(YEAR, years), Series::new(VALUE, values)])?;
    let out = df
        .lazy()
        .filter(col(YEAR).is_not_null().and(col(VALUE).is_not_null()))
        .group_by([col(YEAR)])
        .agg([agg.expr(VALUE)])
        .collect()
        .map_err(|e| QaError::Query(format!("Yearly aggregation failed: {}", e)))?;

    let years = out.column(YEAR)?.i32()?;
    let values = out.column(VALUE)?.f64()?;
    Ok(years
        .into_iter()
        .zip(values)
        .filter_map(|(year, value)| Some((year?, value?)))
        .collect())
}

/// Inner join of two per-year series on year, ascending.
pub fn join_years(
    left: &BTreeMap<i32, f64>,
    right: &BTreeMap<i32, f64>,
) -> Result<Vec<(i32, f64, f64)>> {
    let frame = |series: &BTreeMap<i32, f64>, name: &str| -> Result<LazyFrame> {
        let years: Vec<i32> = series.keys().copied().collect();
        let values: Vec<f64> = series.values().copied().collect();
        Ok(DataFrame::new(vec![Series::new(YEAR, years), Series::new(name, values)])?.lazy())
    };

    let joined = frame(left, "left")?
        .join(
            frame(right, "right")?,
            [col(YEAR)],
            [col(YEAR)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort([YEAR], SortMultipleOptions::default())
        .collect()
        .map_err(|e| QaError::Query(format!("Year join failed: {}", e)))?;

    let years = joined.column(YEAR)?.i32()?;
    let lefts = joined.column("left")?.f64()?;
    let rights = joined.column("right")?.f64()?;
    Ok(years
        .into_iter()
        .zip(lefts)
        .zip(rights)
        .filter_map(|((year, l), r)| Some((year?, l?, r?)))
        .collect())
}

/// Sum of `values` per key, largest first, at most `limit` keys. Keys keep
/// their first-appearance order on ties; null values count as nothing.
pub fn ranked_totals(
    keys: Vec<&str>,
    values: Vec<Option<f64>>,
    limit: usize,
) -> Result<Vec<(String, f64)>> {
    let df = DataFrame::new(vec![Series::new(KEY, keys), Series::new(VALUE, values)])?;
    let out = df
        .lazy()
        .group_by_stable([col(KEY)])
        .agg([col(VALUE).fill_null(lit(0.0)).sum()])
        .sort(
            [VALUE],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(IdxSize::try_from(limit).unwrap_or(IdxSize::MAX))
        .collect()
        .map_err(|e| QaError::Query(format!("Ranking failed: {}", e)))?;

    let keys = out.column(KEY)?.str()?;
    let totals = out.column(VALUE)?.f64()?;
    Ok(keys
        .into_iter()
        .zip(totals)
        .filter_map(|(key, total)| Some((key?.to_string(), total.unwrap_or(0.0))))
        .collect())
}

/// Mean of `value` per (state, year); rows without a year are dropped.
fn mean_by_state_year(frame: LazyFrame) -> LazyFrame {
    frame
        .filter(col(YEAR).is_not_null())
        .group_by([col(STATE), col(YEAR)])
        .agg([col(VALUE).mean()])
}

/// Reshape one reading column per station into (station, year) pairs, attach
/// each station's state, and average per (state, year), ordered by state then
/// year. A group whose readings are all null keeps a null mean.
pub fn melt_station_means(
    years: Vec<Option<i32>>,
    stations: &[(String, Vec<Option<f64>>)],
    station_states: &[String],
) -> Result<Vec<(String, i32, Option<f64>)>> {
    let mut columns = vec![Series::new(YEAR, years)];
    columns.extend(stations.iter().map(|(name, readings)| Series::new(name, readings)));
    let names: Vec<&str> = stations.iter().map(|(name, _)| name.as_str()).collect();

    let long = DataFrame::new(columns)?.melt([YEAR], &names)?;
    let attribution = DataFrame::new(vec![
        Series::new(STATION, &names),
        Series::new(STATE, station_states),
    ])?;

    let out = mean_by_state_year(long.lazy().join(
        attribution.lazy(),
        [col(STATION)],
        [col(STATION)],
        JoinArgs::new(JoinType::Left),
    ))
    .sort([STATE, YEAR], SortMultipleOptions::default())
    .collect()
    .map_err(|e| QaError::Query(format!("Station aggregation failed: {}", e)))?;

    let states = out.column(STATE)?.str()?;
    let years = out.column(YEAR)?.i32()?;
    let means = out.column(VALUE)?.f64()?;
    Ok(states
        .into_iter()
        .zip(years)
        .zip(means)
        .filter_map(|((state, year), mean)| Some((state?.to_string(), year?, mean)))
        .collect())
}

/// Left join of (state, year) rows onto the mean of a second (state, year,
/// value) set. Output is aligned with the left rows.
pub fn left_join_state_year_mean(
    left: (Vec<&str>, Vec<Option<i32>>),
    right: (Vec<&str>, Vec<Option<i32>>, Vec<Option<f64>>),
) -> Result<Vec<Option<f64>>> {
    let (left_states, left_years) = left;
    let (right_states, right_years, right_values) = right;
    let height = left_states.len();

    let left = DataFrame::new(vec![
        Series::new(STATE, left_states),
        Series::new(YEAR, left_years),
    ])?;
    let right = DataFrame::new(vec![
        Series::new(STATE, right_states),
        Series::new(YEAR, right_years),
        Series::new(VALUE, right_values),
    ])?;

    let joined = left
        .lazy()
        .with_row_index(ROW, None)
        .join(
            mean_by_state_year(right.lazy()),
            [col(STATE), col(YEAR)],
            [col(STATE), col(YEAR)],
            JoinArgs::new(JoinType::Left),
        )
        .sort([ROW], SortMultipleOptions::default())
        .collect()
        .map_err(|e| QaError::Query(format!("State-year join failed: {}", e)))?;

    if joined.height() != height {
        return Err(QaError::Query(format!(
            "State-year join returned {} rows for {} inputs",
            joined.height(),
            height
        )));
    }
    Ok(joined.column(VALUE)?.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yearly_sum_and_mean_skip_nulls() {
        let years = vec![Some(2019), Some(2019), Some(2020), None, Some(2021)];
        let values = vec![Some(10.0), Some(30.0), Some(4.0), Some(99.0), None];

        let sums = yearly(years.clone(), values.clone(), Agg::Sum).unwrap();
        assert_eq!(sums, BTreeMap::from([(2019, 40.0), (2020, 4.0)]));

        let means = yearly(years, values, Agg::Mean).unwrap();
        assert_eq!(means, BTreeMap::from([(2019, 20.0), (2020, 4.0)]));

        assert!(yearly(Vec::new(), Vec::new(), Agg::Sum).unwrap().is_empty());
    }

    #[test]
    fn test_join_years_keeps_shared_years_only() {
        let production = BTreeMap::from([(2018, 1.0), (2019, 2.0), (2020, 3.0)]);
        let rainfall = BTreeMap::from([(2020, 30.0), (2019, 20.0), (2022, 50.0)]);
        assert_eq!(
            join_years(&production, &rainfall).unwrap(),
            vec![(2019, 2.0, 20.0), (2020, 3.0, 30.0)]
        );
        assert!(join_years(&production, &BTreeMap::new()).unwrap().is_empty());
    }

    #[test]
    fn test_ranked_totals_ties_keep_first_appearance() {
        let keys = vec!["millet", "rice", "millet", "cashew", "wheat"];
        let values = vec![Some(5.0), Some(7.0), Some(2.0), Some(1.0), None];

        let ranked = ranked_totals(keys.clone(), values.clone(), 10).unwrap();
        assert_eq!(
            ranked,
            vec![
                ("millet".to_string(), 7.0),
                ("rice".to_string(), 7.0),
                ("cashew".to_string(), 1.0),
                ("wheat".to_string(), 0.0),
            ]
        );
        assert_eq!(ranked_totals(keys, values, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_station_columns_melt_into_state_year_means() {
        let years = vec![Some(2019), Some(2019), Some(2020), None];
        let stations = vec![
            ("karur".to_string(), vec![Some(10.0), Some(20.0), Some(4.0), Some(500.0)]),
            ("kadavur".to_string(), vec![Some(30.0), None, Some(8.0), Some(500.0)]),
            ("shimoga".to_string(), vec![Some(100.0), Some(300.0), None, None]),
        ];
        let states = vec![
            "Tamil Nadu".to_string(),
            "Tamil Nadu".to_string(),
            "Karnataka".to_string(),
        ];

        let means = melt_station_means(years, &stations, &states).unwrap();
        assert_eq!(
            means,
            vec![
                ("Karnataka".to_string(), 2019, Some(200.0)),
                ("Karnataka".to_string(), 2020, None),
                ("Tamil Nadu".to_string(), 2019, Some(20.0)),
                ("Tamil Nadu".to_string(), 2020, Some(6.0)),
            ]
        );
    }

    #[test]
    fn test_left_join_aligns_with_left_rows() {
        let joined = left_join_state_year_mean(
            (vec!["Goa", "Kerala", "Goa", "Goa"], vec![Some(2021), Some(2020), Some(2020), None]),
            (
                vec!["Goa", "Goa", "Kerala", "Goa"],
                vec![Some(2020), Some(2020), Some(2021), None],
                vec![Some(100.0), Some(300.0), Some(5.0), Some(9.0)],
            ),
        )
        .unwrap();
        assert_eq!(joined, vec![None, None, Some(200.0), None]);
    }
}
