use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::core::{QueryResult, Value};

pub const DATE_COLUMN: &str = "USAGE_DATE";
pub const CATEGORY_COLUMN: &str = "DATABASE_NAME";
pub const METRIC_COLUMN: &str = "TOTAL_BYTES";

pub const CHART_TITLE: &str = "Total Storage Per Day by Database";

/// One stacked segment: a database's summed storage on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub usage_date: NaiveDate,
    pub database_name: String,
    pub total_bytes: f64,
}

/// Result grouped by (day, database), sorted by day then database name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub points: Vec<ChartPoint>,
}

/// Dates truncated to the day; text is accepted as `YYYY-MM-DD[...]`
fn day_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => s
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()),
        _ => None,
    }
}

impl ChartSeries {
    /// Group and sum the usage result.
    ///
    /// Rows missing a date, database name or metric are skipped. Each group
    /// is summed in sorted order, so the output does not depend on the order
    /// of the source rows.
    pub fn from_result(result: &QueryResult) -> Self {
        let (Some(date_idx), Some(name_idx), Some(metric_idx)) = (
            result.column_index(DATE_COLUMN),
            result.column_index(CATEGORY_COLUMN),
            result.column_index(METRIC_COLUMN),
        ) else {
            tracing::debug!("Result lacks chart columns, nothing to plot");
            return Self::default();
        };

        let mut groups: BTreeMap<(NaiveDate, String), Vec<f64>> = BTreeMap::new();
        for row in result.rows() {
            let date = day_of(&row[date_idx]);
            let name = row[name_idx].as_text();
            let metric = row[metric_idx].as_float();

            match (date, name, metric) {
                (Some(date), Some(name), Some(metric)) => {
                    groups.entry((date, name.to_string())).or_default().push(metric);
                }
                _ => tracing::debug!("Skipping incomplete row: {:?}", row),
            }
        }

        let points = groups
            .into_iter()
            .map(|((usage_date, database_name), mut values)| {
                values.sort_by(f64::total_cmp);
                ChartPoint {
                    usage_date,
                    database_name,
                    total_bytes: values.iter().sum(),
                }
            })
            .collect();

        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct database names in stacking order
    pub fn databases(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.points.iter().map(|p| p.database_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Vega-Lite specification of the stacked bar chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChartSpec(serde_json::Value);

impl ChartSpec {
    /// Day on x, summed GB on y, one color per database stacked by name
    pub fn stacked_bar(series: &ChartSeries) -> Self {
        let values: Vec<serde_json::Value> = series
            .points
            .iter()
            .map(|p| {
                json!({
                    DATE_COLUMN: p.usage_date.format("%Y-%m-%d").to_string(),
                    CATEGORY_COLUMN: p.database_name,
                    METRIC_COLUMN: p.total_bytes,
                })
            })
            .collect();

        Self(json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "title": CHART_TITLE,
            "width": "container",
            "data": { "values": values },
            "mark": "bar",
            "encoding": {
                "x": {
                    "field": DATE_COLUMN,
                    "type": "temporal",
                    "timeUnit": "yearmonthdate",
                    "title": "Usage Date",
                    "axis": {
                        "format": "%Y-%b-%d",
                        "labelOverlap": false,
                        "labelAngle": -45
                    }
                },
                "y": {
                    "field": METRIC_COLUMN,
                    "aggregate": "sum",
                    "type": "quantitative",
                    "title": "Total GB"
                },
                "color": {
                    "field": CATEGORY_COLUMN,
                    "type": "nominal"
                },
                "order": {
                    "field": CATEGORY_COLUMN,
                    "sort": "ascending"
                }
            }
        }))
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ColumnKind};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn result_from(rows: &[(Value, &str, Value)]) -> QueryResult {
        let mut result = QueryResult::new(vec![
            Column::new("USAGE_DATE", ColumnKind::Date),
            Column::new("DATABASE_NAME", ColumnKind::Text),
            Column::new("TOTAL_BYTES", ColumnKind::Float),
        ]);
        for (date, name, bytes) in rows {
            result
                .push_row(vec![date.clone(), Value::Text(name.to_string()), bytes.clone()])
                .unwrap();
        }
        result
    }

    #[test]
    fn test_groups_and_sums() {
        let result = result_from(&[
            (Value::Date(d(1)), "A", Value::Float(2.0)),
            (Value::Date(d(1)), "A", Value::Float(3.0)),
            (Value::Date(d(1)), "B", Value::Float(1.0)),
        ]);

        let series = ChartSeries::from_result(&result);
        assert_eq!(
            series.points,
            vec![
                ChartPoint { usage_date: d(1), database_name: "A".to_string(), total_bytes: 5.0 },
                ChartPoint { usage_date: d(1), database_name: "B".to_string(), total_bytes: 1.0 },
            ]
        );
    }

    #[test]
    fn test_order_is_independent_of_row_order() {
        let rows = [
            (Value::Date(d(2)), "B", Value::Float(0.1)),
            (Value::Date(d(1)), "B", Value::Float(0.2)),
            (Value::Date(d(2)), "A", Value::Float(0.3)),
            (Value::Date(d(2)), "B", Value::Float(0.7)),
            (Value::Date(d(1)), "A", Value::Float(1e-9)),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = ChartSeries::from_result(&result_from(&rows));
        let backward = ChartSeries::from_result(&result_from(&reversed));
        assert_eq!(forward, backward);

        let keys: Vec<(NaiveDate, &str)> = forward
            .points
            .iter()
            .map(|p| (p.usage_date, p.database_name.as_str()))
            .collect();
        assert_eq!(keys, vec![(d(1), "A"), (d(1), "B"), (d(2), "A"), (d(2), "B")]);
        assert_eq!(forward.databases(), vec!["A", "B"]);
    }

    #[test]
    fn test_text_dates_are_truncated_to_day() {
        let result = result_from(&[
            (Value::Text("2024-06-01 08:00:00.000".to_string()), "A", Value::Float(1.0)),
            (Value::Text("2024-06-01 17:30:00.000".to_string()), "A", Value::Float(2.0)),
        ]);
        let series = ChartSeries::from_result(&result);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].usage_date, d(1));
        assert_eq!(series.points[0].total_bytes, 3.0);
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let result = result_from(&[
            (Value::Null, "A", Value::Float(1.0)),
            (Value::Date(d(1)), "A", Value::Null),
            (Value::Date(d(1)), "B", Value::Float(4.0)),
        ]);
        let series = ChartSeries::from_result(&result);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].database_name, "B");
    }

    #[test]
    fn test_missing_columns_yield_empty_series() {
        let result = QueryResult::new(vec![Column::new("X", ColumnKind::Text)]);
        assert!(ChartSeries::from_result(&result).is_empty());
    }

    #[test]
    fn test_stacked_bar_spec() {
        let series = ChartSeries::from_result(&result_from(&[(
            Value::Date(d(3)),
            "A",
            Value::Float(2.5),
        )]));
        let spec = ChartSpec::stacked_bar(&series);
        let json = spec.as_json();

        assert_eq!(json["title"], CHART_TITLE);
        assert_eq!(json["mark"], "bar");
        assert_eq!(json["encoding"]["x"]["axis"]["labelAngle"], -45);
        assert_eq!(json["encoding"]["x"]["timeUnit"], "yearmonthdate");
        assert_eq!(json["encoding"]["y"]["aggregate"], "sum");
        assert_eq!(json["encoding"]["y"]["title"], "Total GB");
        assert_eq!(json["encoding"]["color"]["field"], "DATABASE_NAME");
        assert_eq!(json["encoding"]["order"]["sort"], "ascending");
        assert_eq!(json["data"]["values"][0]["USAGE_DATE"], "2024-06-03");
        assert_eq!(json["data"]["values"][0]["TOTAL_BYTES"], 2.5);
    }
}
