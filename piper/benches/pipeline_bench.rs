//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use piper::pipeline::{PipelineBuilder, PipelineSpec};
use piper::testing::test_registry;
use serde_json::{json, Value};

fn chain_spec(len: usize) -> Value {
    let stages: Vec<Value> = (0..len)
        .map(|i| {
            let source = if i == 0 {
                "input.x".to_string()
            } else {
                format!("s{}", i - 1)
            };
            json!({"name": format!("s{i}"), "func": "identity", "input": {"value": source}})
        })
        .collect();
    json!({"input": ["x"], "stages": stages, "output": format!("s{}", len - 1)})
}

fn map_spec() -> Value {
    json!({
        "input": ["items"],
        "stages": [{
            "name": "doubled",
            "func": "map",
            "input": {"items": "input.items"},
            "params": {
                "stages": [{"name": "d", "func": "double", "input": {"x": "input"}}],
                "output": "d"
            }
        }],
        "output": "doubled"
    })
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let registry = test_registry();

    let chain = chain_spec(32);
    c.bench_function("parse_chain_32", |b| {
        b.iter(|| PipelineSpec::from_value(black_box(chain.clone())).unwrap());
    });

    c.bench_function("run_chain_32", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let pipeline = PipelineBuilder::new(chain.clone())
                    .with_registry(registry.clone())
                    .build()
                    .unwrap();
                black_box(pipeline.run([("x", json!(1))]).await.unwrap())
            })
        });
    });

    let spec = map_spec();
    let items: Vec<i64> = (0..100).collect();
    c.bench_function("run_map_100", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let pipeline = PipelineBuilder::new(spec.clone())
                    .with_registry(registry.clone())
                    .build()
                    .unwrap();
                black_box(pipeline.run([("items", json!(items))]).await.unwrap())
            })
        });
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
