//! Benchmarks for data conversion and pipeline execution
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use viennamesh::data::builtin;
use viennamesh::pipeline::{AlgorithmDecl, ParameterDecl, ParameterType};
use viennamesh::{
    Algorithm, AlgorithmIo, Context, PipelineBuilder, PipelineDescription, Result, DEFAULT_PORT,
};

/// Adds one to its int input.
#[derive(Default)]
struct Increment;

impl Algorithm for Increment {
    fn run(&mut self, io: &mut AlgorithmIo<'_>) -> Result<()> {
        let value = io.get_required_input_as("value", builtin::INT)?;
        let next = value.value::<i64>(0)? + 1;
        let mut out = io.output_for_write(DEFAULT_PORT, builtin::INT)?;
        out.set(0, next)?;
        out.commit();
        Ok(())
    }
}

fn chain(len: usize) -> PipelineDescription {
    let mut desc = PipelineDescription::new().algorithm(
        AlgorithmDecl::new("increment", "n0")
            .parameter(ParameterDecl::new("value", ParameterType::String, "0")),
    );
    for i in 1..len {
        desc = desc.algorithm(
            AlgorithmDecl::new("increment", format!("n{}", i))
                .default_source(format!("n{}", i - 1)),
        );
    }
    desc
}

fn bench_conversion(c: &mut Criterion) {
    let ctx = Context::new();
    let mut group = c.benchmark_group("conversion");

    for size in [1usize, 100, 10_000] {
        let mut data = ctx.make_data(builtin::INT).unwrap();
        data.resize(size).unwrap();
        for i in 0..size {
            data.set(i, i as i64).unwrap();
        }
        let source = data.share();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("int_to_string", size), &source, |b, s| {
            b.iter(|| black_box(ctx.convert(s, builtin::STRING).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("int_to_double", size), &source, |b, s| {
            b.iter(|| black_box(ctx.convert(s, builtin::DOUBLE).unwrap()))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let ctx = Context::new();
    ctx.register_algorithm_type::<Increment>("increment").unwrap();
    let mut group = c.benchmark_group("pipeline");

    for len in [10usize, 100, 1000] {
        let desc = chain(len);
        group.bench_with_input(BenchmarkId::new("build", len), &desc, |b, d| {
            b.iter(|| black_box(PipelineBuilder::new(&ctx).build(d).unwrap()))
        });

        let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
        group.bench_with_input(BenchmarkId::new("run", len), &pipeline, |b, p| {
            b.iter(|| p.run().unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_conversion, bench_pipeline);
criterion_main!(benches);
