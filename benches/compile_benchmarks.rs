//! Performance benchmarks for the AGS script compiler.
//!
//! - Scanning: the token list alone
//! - Compilation: the complete pipeline on each fixture script
//! - Scaling: a generated script with many functions

use agscript::{CompileOptions, Diagnostics, Scanner, compile};
use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

const FIXTURES: &[(&str, &str)] = &[
    ("globals", include_str!("../test_scripts/globals.as")),
    ("control_flow", include_str!("../test_scripts/control_flow.as")),
    ("structs", include_str!("../test_scripts/structs.as")),
    ("strings", include_str!("../test_scripts/strings.as")),
    ("imports_exports", include_str!("../test_scripts/imports_exports.as")),
];

fn scanner_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");
    for (name, source) in FIXTURES {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(*name, |b| {
            b.iter(|| {
                let arena = Bump::new();
                let tokens = Scanner::new(black_box(source), &arena).scan_all();
                black_box(tokens.map(|t| t.len()).unwrap_or(0))
            });
        });
    }
    group.finish();
}

fn compile_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for (name, source) in FIXTURES {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut diagnostics = Diagnostics::new();
                let script = compile(black_box(source), CompileOptions::LINE_NUMBERS, &mut diagnostics);
                black_box(script.map(|s| s.code.len()).unwrap_or(0))
            });
        });
    }
    group.finish();
}

/// A script of `count` functions, each calling the one before it.
fn generated_script(count: usize) -> String {
    let mut source = String::from("int total;\nint F0(int n) { return n; }\n");
    for i in 1..count {
        source.push_str(&format!(
            "int F{i}(int n)\n{{\n  int acc = 0;\n  for (int k = 0; k < n; k++)\n  {{\n    if (k % 3 == 0)\n      acc += F{}(k);\n    else\n      acc -= k;\n  }}\n  total += acc;\n  return acc;\n}}\n",
            i - 1
        ));
    }
    source
}

fn scaling_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/scaling");
    for count in [10usize, 100, 1000] {
        let source = generated_script(count);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &source, |b, source| {
            b.iter(|| {
                let mut diagnostics = Diagnostics::new();
                let script = compile(black_box(source), CompileOptions::empty(), &mut diagnostics);
                black_box(script.map(|s| s.code.len()).unwrap_or(0))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, scanner_benchmarks, compile_benchmarks, scaling_benchmarks);
criterion_main!(benches);
