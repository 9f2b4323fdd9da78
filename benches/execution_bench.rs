use criterion::{Criterion, criterion_group, criterion_main};
use regression_runner::core::command::Command;
use regression_runner::core::config::RunOptions;
use regression_runner::core::regression::Regression;
use std::hint::black_box;
use std::time::Duration;
use tokio::runtime::Runtime;

const LINE: &str = "simv +ntb_random_seed=42 --test chip/pcie_link_training --flow gate -l sim.log";

fn bench_parse_command(c: &mut Criterion) {
    c.bench_function("parse_command", |b| {
        b.iter(|| Command::parse(black_box(LINE)));
    });
}

fn bench_run_regression(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let lines: Vec<String> = (0..8).map(|i| format!("true # --test bench/t{i}")).collect();
    let options = RunOptions::default()
        .with_run_limit(4)
        .with_progress_interval(Duration::from_millis(5));

    c.bench_function("run_regression_of_8", |b| {
        b.to_async(&rt).iter(|| async {
            let regression =
                Regression::from_lines_with_options("bench", &lines, options.clone());
            let _ = regression.start().await;
        });
    });
}

criterion_group!(benches, bench_parse_command, bench_run_regression);
criterion_main!(benches);
