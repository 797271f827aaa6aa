extern crate rangeopt;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rangeopt::{
    analysis::{Analyzer, ProvenanceInterpreter},
    assembly::{InstructionAssembler, MethodBody},
    config::RangeConvention,
    emulation::{EmValue, Executor},
    optimize,
};
use std::hint::black_box;

/// A static `run(a, b)` with `loops` sequential `for (i in a until b)` loops.
fn method_with_loops(loops: u16) -> MethodBody {
    let mut asm = InstructionAssembler::new_static("run", "(II)V");
    for n in 0..loops {
        let base = 2 + 3 * n;
        let head = asm.new_label();
        let exit = asm.new_label();
        asm.iload(0)
            .iload(1)
            .invokestatic("kotlin/ranges/RangesKt", "until", "(II)Lkotlin/ranges/IntRange;")
            .invokevirtual("kotlin/ranges/IntRange", "iterator", "()Ljava/util/Iterator;")
            .astore(base)
            .mark(head)
            .aload(base)
            .invokeinterface("java/util/Iterator", "hasNext", "()Z")
            .ifeq(exit)
            .aload(base)
            .invokeinterface("java/util/Iterator", "next", "()Ljava/lang/Object;")
            .astore(base + 1)
            .aload(base + 1)
            .checkcast("java/lang/Number")
            .invokevirtual("java/lang/Number", "intValue", "()I")
            .istore(base + 2)
            .iload(base + 2)
            .invokestatic("demo/Sink", "accept", "(I)V")
            .goto(head)
            .mark(exit);
    }
    asm.return_void();
    asm.finish().expect("valid method")
}

/// Frame computation with the provenance interpreter, by method size.
fn bench_analysis(c: &mut Criterion) {
    let convention = RangeConvention::default();
    let mut group = c.benchmark_group("provenance_analysis");

    for loops in [1u16, 8, 64] {
        let body = method_with_loops(loops);
        group.throughput(Throughput::Elements(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(loops), &body, |b, body| {
            let analyzer = Analyzer::new(ProvenanceInterpreter::new(&convention));
            b.iter(|| black_box(analyzer.analyze("demo/Bench", black_box(body)).unwrap()));
        });
    }
    group.finish();
}

/// Full optimization (analysis, matching and rewriting), by method size.
fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");

    for loops in [1u16, 8, 64] {
        let body = method_with_loops(loops);
        group.throughput(Throughput::Elements(u64::from(loops)));
        group.bench_with_input(BenchmarkId::from_parameter(loops), &body, |b, body| {
            b.iter(|| {
                let mut body = body.clone();
                optimize("demo/Bench", &mut body);
                black_box(body)
            });
        });
    }
    group.finish();
}

/// Executing a loop over 10k elements before and after unboxing.
fn bench_execution(c: &mut Criterion) {
    let original = method_with_loops(1);
    let mut optimized = original.clone();
    optimize("demo/Bench", &mut optimized);

    let executor = Executor::new();
    let args = [EmValue::Int(0), EmValue::Int(10_000)];

    let mut group = c.benchmark_group("execute_10k");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("boxed", |b| {
        b.iter(|| black_box(executor.execute(black_box(&original), &args).unwrap()));
    });
    group.bench_function("unboxed", |b| {
        b.iter(|| black_box(executor.execute(black_box(&optimized), &args).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_analysis, bench_optimize, bench_execution);
criterion_main!(benches);
