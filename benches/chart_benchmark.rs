use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use snow_chart::{ChartSeries, ChartSpec, Column, ColumnKind, QueryResult, TableView, Value};

fn create_usage_rows(days: usize, databases: usize) -> QueryResult {
    let mut result = QueryResult::new(vec![
        Column::new("USAGE_DATE", ColumnKind::Date),
        Column::new("DATABASE_NAME", ColumnKind::Text),
        Column::new("TOTAL_BYTES", ColumnKind::Float),
    ]);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for day in 0..days {
        for db in 0..databases {
            result
                .push_row(vec![
                    Value::Date(start + chrono::Duration::days(day as i64)),
                    Value::Text(format!("DB_{}", db)),
                    Value::Float((day * databases + db) as f64 / 7.0),
                ])
                .unwrap();
        }
    }
    result
}

fn bench_aggregation(c: &mut Criterion) {
    let week = create_usage_rows(7, 10);
    let quarter = create_usage_rows(90, 50);

    c.bench_function("chart_series_7d_10db", |b| {
        b.iter(|| black_box(ChartSeries::from_result(&week)));
    });

    c.bench_function("chart_series_90d_50db", |b| {
        b.iter(|| black_box(ChartSeries::from_result(&quarter)));
    });

    let series = ChartSeries::from_result(&quarter);
    c.bench_function("stacked_bar_spec_90d_50db", |b| {
        b.iter(|| black_box(ChartSpec::stacked_bar(&series)));
    });

    c.bench_function("table_view_90d_50db", |b| {
        b.iter(|| black_box(TableView::from_result(&quarter)));
    });
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
