//! Runs the flexplot binary against small results trees.

use std::path::Path;
use std::process::{Command, Output};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn flexplot(root: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flexplot"))
        .arg(root)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn latency_log(values: &[f64]) -> String {
    let mut log = String::from("warmup done\n");
    for (i, v) in values.iter().enumerate() {
        log.push_str(&format!("iter {i} loop {v} ms\n"));
    }
    log
}

fn power_trace(active_mw: u32) -> String {
    let mut csv = String::from("timestamp(ms),power(mW)\n");
    for t in (0..=3000).step_by(250) {
        let p = if (1000..=2000).contains(&t) { active_mw } else { 300 };
        csv.push_str(&format!("{t},{p}\n"));
    }
    csv
}

fn populate(root: &Path) {
    write(root, "flexplot.toml", "verbosity = \"quiet\"\nend2end_models = [\"vgg19\"]\n");

    for setting in ["flexnn", "wo_all", "wo_mem"] {
        write(
            root,
            &format!("ablation/vgg19_100000000/{setting}.txt"),
            &latency_log(&[10.0, 10.5, 9.5, 10.0]),
        );
    }

    write(root, "adaption/time.csv", "start(ms),end(ms)\n1000,1020\n1040,1065\n1400,1420\n");
    write(
        root,
        "adaption/mem.csv",
        "timestamp(ms),memory(kB)\n0,1000\n2000,1100\n3500,40000\n4000,38000\n",
    );

    write(root, "end2end/flexnn/vgg19_flexnn_100M.txt", &latency_log(&[40.0, 42.0, 41.0, 90.0]));
    write(root, "end2end/flexnn/vgg19_flexnn_200M.txt", &latency_log(&[20.0, 22.0, 21.0, 1.0]));
    write(root, "end2end/baselines/vgg19_default_latency.txt", &latency_log(&[15.0, 16.0, 14.0]));
    write(
        root,
        "end2end/baselines/vgg19_default_mem.csv",
        "timestamp(ms),memory(kB)\n0,5000\n3200,205000\n",
    );

    write(root, "overhead/vgg19_flexnn_power.csv", &power_trace(1500));
    write(root, "overhead/vgg19_ncnn_power.csv", &power_trace(1200));
}

#[test]
fn full_results_tree_produces_figures_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    let out = flexplot(dir.path());
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let figures = dir.path().join("figures");
    for svg in [
        "ablation/ablation.svg",
        "adaption/adaption.svg",
        "end2end/vgg19.svg",
        "overhead/power.svg",
    ] {
        let path = figures.join(svg);
        let content = std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing {svg}"));
        assert!(content.contains("<svg"), "{svg} is not an SVG");
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(figures.join("summary.json")).unwrap()).unwrap();
    let failed: Vec<String> = json["failures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| format!("{}/{}", f["id"]["model"].as_str().unwrap(), f["id"]["setting"].as_str().unwrap()))
        .collect();
    // wo_preload was never run; the direct and ondemand baselines are missing.
    assert_eq!(failed, ["vgg19/wo_preload", "vgg19/direct", "vgg19/ondemand"]);

    let configs = json["configurations"].as_array().unwrap();
    let default = configs
        .iter()
        .find(|c| c["id"]["setting"] == "default")
        .unwrap();
    assert_eq!(default["metrics"]["latency"]["mean_ms"], 15.0);
    assert_eq!(default["metrics"]["peak_memory_kb"], 200_000.0);
    assert_eq!(json["figures"].as_array().unwrap().len(), 4);
}

#[test]
fn missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = flexplot(&dir.path().join("nope"));
    assert!(!out.status.success());
}

#[test]
fn empty_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = flexplot(dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no benchmark results"));
}

#[test]
fn every_configuration_failing_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "overhead/vgg19_flexnn_power.csv", "timestamp(ms),voltage(V)\n0,5\n");
    let out = flexplot(dir.path());
    assert!(!out.status.success());
    // The failure is still on record.
    let summary = std::fs::read_to_string(dir.path().join("figures/summary.json")).unwrap();
    assert!(summary.contains("vgg19_flexnn_power.csv"));
}

#[test]
fn invalid_settings_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    write(dir.path(), "flexplot.toml", "gap_margin_ms = \"wide\"\n");
    assert!(!flexplot(dir.path()).status.success());
}
