use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use snow_chart::{
    cache::{MemoryCache, QueryCache, SqliteCache},
    core::{Column, ColumnKind, QueryResult, Value},
    usage_sql, DayRange,
};
use std::sync::Arc;

fn usage_result(rows: usize) -> Arc<QueryResult> {
    let mut result = QueryResult::new(vec![
        Column::new("USAGE_DATE", ColumnKind::Date),
        Column::new("DATABASE_NAME", ColumnKind::Text),
        Column::new("TOTAL_BYTES", ColumnKind::Float),
    ]);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for i in 0..rows {
        result
            .push_row(vec![
                Value::Date(start + chrono::Duration::days((i / 8) as i64)),
                Value::Text(format!("DB_{}", i % 8)),
                Value::Float(i as f64 * 0.5),
            ])
            .unwrap();
    }
    Arc::new(result)
}

async fn populate(cache: &dyn QueryCache) {
    for i in 0..100 {
        cache
            .put(&format!("query{}", i), usage_result(90 * 8), Utc::now())
            .await
            .unwrap();
    }
}

fn bench_memory_cache(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let cache = MemoryCache::new();
    runtime.block_on(populate(&cache));

    c.bench_function("memory_get_hit", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(cache.get("query50").await.unwrap())
        });
    });

    c.bench_function("memory_get_miss", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(cache.get("nonexistent").await.unwrap())
        });
    });
}

fn bench_sqlite_cache(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let cache = runtime.block_on(SqliteCache::new(":memory:")).unwrap();
    runtime.block_on(populate(&cache));

    c.bench_function("sqlite_get_hit", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(cache.get("query50").await.unwrap())
        });
    });

    let result = usage_result(90 * 8);
    c.bench_function("sqlite_put", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(cache.put("query50", Arc::clone(&result), Utc::now()).await.unwrap())
        });
    });
}

fn bench_query_text(c: &mut Criterion) {
    c.bench_function("usage_sql", |b| {
        b.iter(|| black_box(usage_sql(black_box(DayRange::Quarter))));
    });
}

criterion_group!(benches, bench_memory_cache, bench_sqlite_cache, bench_query_text);
criterion_main!(benches);
