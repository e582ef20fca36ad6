use std::hint::black_box;

use column_infer::{FormatOptions, SchemaOptions, data_format, get_schema};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};

fn generate_orders(rows: usize) -> Vec<Value> {
    (0..rows)
        .map(|i| {
            let status = match i % 3 {
                0 => "shipped",
                1 => "pending",
                _ => "N/A",
            };
            let day = (i % 28) + 1;
            let hour = (i % 23) + 1;
            json!({
                "id": i.to_string(),
                "ordered_at": format!("2024-01-{day:02}"),
                "ship_time": format!("{hour:02}:00:00"),
                "status": status,
                "total": format!("${},{:03}.{:02}", i % 9 + 1, i % 1000, i % 100),
                "discount": format!("{}%", i % 40),
                "contact": format!("buyer{i}@example.com"),
            })
        })
        .collect()
}

fn bench_inference(c: &mut Criterion) {
    let rows = generate_orders(20_000);
    let plain = SchemaOptions::default();
    let with_markers = SchemaOptions {
        use_null_markers_for_inference: true,
        sanitize_keys: true,
        ..SchemaOptions::default()
    };

    let mut group = c.benchmark_group("inference");

    group.bench_function("get_schema", |b| {
        b.iter(|| get_schema(black_box(&rows), &plain));
    });

    group.bench_function("get_schema_null_markers", |b| {
        b.iter(|| get_schema(black_box(&rows), &with_markers));
    });

    let format_options = FormatOptions {
        convert_dates: true,
        ..FormatOptions::default()
    };
    group.bench_function("data_format", |b| {
        b.iter_batched(
            || rows.clone(),
            |input| data_format(&input, &format_options),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_inference);
criterion_main!(benches);
