//! End-to-end checks across the telemetry components, driven through files.

use std::path::Path;

use flexnn_telemetry::latency::DEFAULT_ZSCORE_THRESHOLD;
use flexnn_telemetry::{
    ConfigAggregator, ConfigId, Configuration, ErrorKind, Experiment, GapPolicy, IdleWindow, LatencyExtraction,
    TimelineFigure, TraceKind, figure, insert_gap_anchors, integrate_energy, latency_series, load_intervals,
    load_trace, peak_delta, subtract_idle_baseline,
};

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn zscore_run_drops_the_stall() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = String::from("load model\n");
    log.push_str("iter 1 loop 12.3 ms\niter 2 loop 999.0 ms\niter 3 loop 11.9 ms\niter 4 loop 12.1 ms\n");
    for i in 0..16 {
        let v = if i % 2 == 0 { 12.0 } else { 12.2 };
        log.push_str(&format!("iter {} loop {v} ms\n", i + 5));
    }
    let path = write(dir.path(), "flexnn.txt", &log);

    let summary = LatencyExtraction::zscore("loop", DEFAULT_ZSCORE_THRESHOLD)
        .summarize_file(&path)
        .unwrap();
    assert_eq!(summary.candidates, 20);
    assert_eq!(summary.dropped(), 1);
    assert!((summary.mean_ms - 12.1).abs() < 1e-9);
}

#[test]
fn trimmed_run_ignores_lines_without_unit() {
    let dir = tempfile::tempdir().unwrap();
    let log = "loop 5 ms\nloop 1 ms\nloop total 100\nloop 9 ms\nloop 3 ms\n";
    let path = write(dir.path(), "vgg19_100M.txt", log);
    let summary = LatencyExtraction::trimmed("loop").summarize_file(&path).unwrap();
    assert_eq!(summary.mean_ms, 4.0);
}

#[test]
fn power_trace_to_energy() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("timestamp(ms),power(mW)\n");
    // 1 s idle at 400 mW, 2 s of inference at 1400 mW, 1 s idle.
    for t in (0..=4000).step_by(100) {
        let p = if (1000..=3000).contains(&t) { 1400 } else { 400 };
        csv.push_str(&format!("{t},{p}\n"));
    }
    let path = write(dir.path(), "vgg19_flexnn_power.csv", &csv);

    let trace = load_trace(&path, TraceKind::Power).unwrap();
    let corrected = subtract_idle_baseline(&trace, IdleWindow::POWER).unwrap();
    assert_eq!(corrected.baseline(), 400.0);
    let report = integrate_energy(&corrected).unwrap();
    // 1000 mW above idle for 2000 ms, plus two 100 ms ramps of half height.
    let expected_uj = 1000.0 * 2000.0 + 2.0 * 0.5 * 1000.0 * 100.0;
    assert!((report.energy_mj - expected_uj / 1000.0).abs() < 1e-6);
}

#[test]
fn memory_peak_delta_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "timestamp(ms),memory(kB)\n0,1000\n1500,1200\n3500,5200\n4000,3000\n";
    let path = write(dir.path(), "vgg19_default_mem.csv", csv);
    let trace = load_trace(&path, TraceKind::Memory).unwrap();
    assert_eq!(peak_delta(&trace, IdleWindow::MEMORY).unwrap(), 4000.0);
}

#[test]
fn adaptive_run_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let time = write(dir.path(), "time.csv", "start(ms),end(ms)\n1000,1010\n1300,1310\n");
    let mem = write(
        dir.path(),
        "mem.csv",
        "timestamp(ms),memory(kB)\n0,2000\n1000,2500\n3000,9000\n",
    );

    let intervals = load_intervals(&time).unwrap();
    let anchored = insert_gap_anchors(&intervals, &GapPolicy::default());
    let latency = latency_series(&anchored);
    let memory = subtract_idle_baseline(&load_trace(&mem, TraceKind::Memory).unwrap(), IdleWindow::MEMORY)
        .unwrap()
        .into_series();

    let config = Configuration::new(ConfigId::new(Experiment::Adaption, "adaptive", "flexnn"))
        .with_series(figure::LATENCY_SERIES, latency)
        .with_series(figure::MEMORY_SERIES, memory);
    let fig = TimelineFigure::build(&config).unwrap();

    let ts: Vec<f64> = fig.latency.samples().iter().map(|s| s.timestamp_ms).collect();
    assert_eq!(ts, [0.0, 55.0, 245.0, 300.0]);
    // Idle peak 2500 kB; only the 3000 ms sample lies after the first latency point.
    assert_eq!(fig.memory_mb.len(), 1);
    assert_eq!(fig.memory_mb.samples()[0].value, 6.5);
}

#[test]
fn sibling_configurations_survive_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "flexnn.txt", "loop 10 ms\nloop 10 ms\nloop 10 ms\n");
    let missing = dir.path().join("wo_mem.txt");

    let extraction = LatencyExtraction::zscore("loop", DEFAULT_ZSCORE_THRESHOLD);
    let mut agg = ConfigAggregator::new();
    for (setting, path) in [("flexnn", &good), ("wo_mem", &missing)] {
        let id = ConfigId::new(Experiment::Ablation, "vgg19", setting).with_budget_mb(100);
        match extraction.summarize_file(path) {
            Ok(summary) => {
                agg.record(Configuration::new(id).with_latency(summary));
            }
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::FileNotFound);
                agg.record_failure(id, err);
            }
        }
    }
    let agg = agg.finish();
    assert_eq!(agg.configurations().len(), 1);
    assert_eq!(agg.failures().len(), 1);
    assert!(agg.failures()[0].error.contains("wo_mem.txt"));
}
