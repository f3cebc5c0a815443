use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_epistat"))
}

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("epistat_cli_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let out = run(args);
    assert!(
        out.status.success(),
        "epistat {:?} failed:\nstdout={}\nstderr={}",
        args,
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be JSON")
}

#[test]
fn describe_gamma_moments() {
    let v = run_json(&["describe", "--dist", "gamma", "--param", "shape=2", "--param", "rate=1"]);
    assert_eq!(v["kind"], "gamma");
    assert_eq!(v["n_params"], 2);
    let mean = v["moments"]["mean"].as_f64().unwrap();
    let var = v["moments"]["var"].as_f64().unwrap();
    assert!((mean - 2.0).abs() < 1e-12);
    assert!((var - 2.0).abs() < 1e-12);
    assert!((v["moments"]["mode"].as_f64().unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn describe_moment_matching() {
    let v = run_json(&["describe", "--dist", "normal", "--mean", "1.5", "--std", "0.2"]);
    assert!((v["distribution"]["mu"].as_f64().unwrap() - 1.5).abs() < 1e-12);
    assert!((v["distribution"]["sigma"].as_f64().unwrap() - 0.2).abs() < 1e-12);
}

#[test]
fn describe_unknown_distribution_fails() {
    let out = run(&["describe", "--dist", "cauchy-ish", "--param", "x=1"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("cauchy"));
}

#[test]
fn sample_is_reproducible() {
    let args = [
        "sample", "--dist", "normal", "--param", "mu=0", "--param", "sigma=1", "-n", "100",
        "--seed", "42",
    ];
    let a = run_json(&args);
    let b = run_json(&args);
    assert_eq!(a["outputs"], b["outputs"]);
    assert_eq!(a["outputs"][0].as_array().unwrap().len(), 100);
    assert_eq!(a["backend"], "native");
}

#[test]
fn sample_truncated_falls_back_to_statistical() {
    let v = run_json(&[
        "sample", "--dist", "normal", "--param", "mu=0", "--param", "sigma=1", "-n", "200",
        "--seed", "7", "--low", "0", "--high", "1", "--outputs", "3", "--stats",
    ]);
    assert_eq!(v["backend"], "statistical");
    let outputs = v["outputs"].as_array().unwrap();
    assert_eq!(outputs.len(), 3);
    for o in outputs {
        assert!(o.as_array().unwrap().iter().all(|x| {
            let x = x.as_f64().unwrap();
            (0.0..=1.0).contains(&x)
        }));
    }
    assert_eq!(v["stats"].as_array().unwrap().len(), 3);
}

#[test]
fn sample_strict_truncated_native_fails() {
    let out = run(&[
        "sample", "--dist", "normal", "--param", "mu=0", "--param", "sigma=1", "--low", "0",
        "--strict",
    ]);
    assert!(!out.status.success());
}

#[test]
fn priors_default_set() {
    let v = run_json(&["priors", "--n-regions", "3"]);
    let params = v["parameters"].as_array().unwrap();
    let names: Vec<&str> = params.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["x1eq", "K", "tau1", "tau0", "EC", "sig_eq", "eps"]);
    assert_eq!(params[4]["shape"], "(3, 3)");
    assert_eq!(params[1]["distribution"]["type"], "gamma");
}

#[test]
fn priors_with_overrides() {
    let path = tmp_path("overrides.json");
    std::fs::write(&path, r#"{"K": {"mode": 2.0, "std": 0.5, "high": 5.0}}"#).unwrap();
    let v = run_json(&["priors", "--n-regions", "2", "--overrides", path.to_str().unwrap()]);
    let k = &v["parameters"][1];
    assert_eq!(k["high"], 5.0);
    assert!((k["moments"]["mode"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn priors_with_structural_connectivity() {
    let path = tmp_path("sc.yaml");
    std::fs::write(&path, "- [0.0, 1.5]\n- [0.4, 0.0]\n").unwrap();
    let v = run_json(&["priors", "--n-regions", "2", "--connectivity", path.to_str().unwrap()]);
    let ec = &v["parameters"][4];
    let elements = ec["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 4);
    assert!(elements.iter().all(|e| e["type"] == "gamma"));
    assert!(v["parameters"][1].get("elements").is_none());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn pse_params_from_hypothesis() {
    let hyp = tmp_path("hyp.json");
    std::fs::write(
        &hyp,
        r#"{
            "weights": [[0, 1, 1], [1, 0, 1], [1, 1, 0]],
            "region_labels": ["a", "b", "c"],
            "excitability": [{"indices": [1], "values": [0.8]}],
            "epileptogenicity": [{"indices": [2], "values": [0.4]}]
        }"#,
    )
    .unwrap();
    let cfg = tmp_path("run.yaml");
    std::fs::write(
        &cfg,
        "n_samples: 25\nseed: 3\nworkers: 2\ntimeout_ms: 500\nglobal_coupling:\n  - {}\n",
    )
    .unwrap();

    let v = run_json(&[
        "pse-params",
        "--hypothesis",
        hyp.to_str().unwrap(),
        "--config",
        cfg.to_str().unwrap(),
    ]);
    assert_eq!(v["n_samples"], 25);
    assert_eq!(v["service"]["workers"], 2);
    assert_eq!(v["service"]["timeout_ms"], 500);
    assert_eq!(v["service"]["aggregation"], "union");
    assert_eq!(v["kind"], "Excitability_Epileptogenicity");
    let names: Vec<&str> =
        v["names"].as_array().unwrap().iter().map(|n| n.as_str().unwrap()).collect();
    assert_eq!(names, vec!["b Excitability", "c Epileptogenicity", "Global coupling"]);
    assert_eq!(v["entries"][0]["path"], "hypothesis.x0_values");

    let _ = std::fs::remove_file(&hyp);
    let _ = std::fs::remove_file(&cfg);
}

#[test]
fn version_prints() {
    let out = run(&["version"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("epistat "));
}
