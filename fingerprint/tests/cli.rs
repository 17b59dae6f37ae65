use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::{Command, Output};

const SITES: [&str; 3] = ["baidu", "github", "wikipedia"];

fn session_table() -> String {
    let mut table = String::from("site_label,packet_features\n");
    for i in 0..8u32 {
        table.push_str(&format!("0,{}_0;{}_0;{}_1\n", 100 + i, 120 + i, 90 + i));
        table.push_str(&format!(
            "1,{}_1;{}_1;{}_1;{}_1;{}_0\n",
            1400 + i,
            1450 + i,
            1492,
            1300 + i,
            60 + i
        ));
        table.push_str(&format!("2,{}_0;{}_1;{}_0;{}_1\n", 700 + i, 750 + i, 680 + i, 720 + i));
    }
    table
}

fn label_map() -> String {
    let mut map = String::from("label,site_name\n");
    for (label, site) in SITES.iter().enumerate() {
        map.push_str(&format!("{label},{site}\n"));
    }
    map
}

fn run(args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_fingerprint"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "fingerprint {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

#[test]
fn test_train_evaluate_predict() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let sessions = temp.child("sessions.csv");
    sessions.write_str(&session_table())?;
    let labels = temp.child("labels.csv");
    labels.write_str(&label_map())?;
    let config = temp.child("training.json");
    config.write_str(
        r#"{ "epochs": 20, "batch_size": 4, "learning_rate": 0.05, "show_progress": false }"#,
    )?;
    let model = temp.child("model.bin");

    let sessions_arg = sessions.path().to_str().unwrap_or_default();
    let labels_arg = labels.path().to_str().unwrap_or_default();
    let config_arg = config.path().to_str().unwrap_or_default();
    let model_arg = model.path().to_str().unwrap_or_default();

    let train = run(&[
        "train",
        "--sessions",
        sessions_arg,
        "--labels",
        labels_arg,
        "--config",
        config_arg,
        "--model",
        model_arg,
        "--seed",
        "7",
    ]);
    let stdout = String::from_utf8_lossy(&train.stdout);
    assert!(predicate::str::contains("Model saved to").eval(&stdout));

    model.assert(predicate::path::exists());
    temp.child("model.bin.encoder.json").assert(predicate::path::exists());
    temp.child("model.bin.network.json").assert(predicate::path::exists());
    temp.child("model.bin.history.json").assert(predicate::path::exists());

    let evaluate = run(&[
        "evaluate",
        "--sessions",
        sessions_arg,
        "--model",
        model_arg,
        "--labels",
        labels_arg,
    ]);
    let stdout = String::from_utf8_lossy(&evaluate.stdout);
    assert!(predicate::str::contains("Overall accuracy").eval(&stdout));
    assert!(predicate::str::contains("wikipedia").eval(&stdout));

    let predict = run(&[
        "predict",
        "--model",
        model_arg,
        "--labels",
        labels_arg,
        "--top",
        "2",
        "1401_1;1451_1;1492_1;1301_1;61_0",
    ]);
    let stdout = String::from_utf8_lossy(&predict.stdout);
    assert!(predicate::str::contains("Predicted site: ").eval(&stdout));
    assert_eq!(stdout.lines().count(), 3);

    temp.close()?;
    Ok(())
}

#[test]
fn test_predict_without_model_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let model = temp.child("missing.bin");

    let output = Command::new(env!("CARGO_BIN_EXE_fingerprint"))
        .args(["predict", "--model", model.path().to_str().unwrap_or_default(), "100_0"])
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("encoder settings").eval(&stderr));
    Ok(())
}

#[test]
fn test_train_rejects_empty_table() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let sessions = temp.child("sessions.csv");
    sessions.write_str("site_label,packet_features\n")?;

    let output = Command::new(env!("CARGO_BIN_EXE_fingerprint"))
        .args([
            "train",
            "--sessions",
            sessions.path().to_str().unwrap_or_default(),
            "--model",
            temp.child("model.bin").path().to_str().unwrap_or_default(),
        ])
        .output()?;
    assert!(!output.status.success());
    temp.child("model.bin").assert(predicate::path::missing());
    Ok(())
}

#[test]
fn test_labels_from_domain_list() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let domains = temp.child("domains.txt");
    domains.write_str("www.wikipedia.org\nwww.baidu.com\nmap.baidu.com\ngithub.com\n")?;
    let labels = temp.child("site_labels.csv");

    let output = run(&[
        "labels",
        "--domains",
        domains.path().to_str().unwrap_or_default(),
        "--out",
        labels.path().to_str().unwrap_or_default(),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("3 site labels written").eval(&stdout));
    labels.assert("label,site_name\n0,baidu\n1,github\n2,wikipedia\n");

    let sessions = temp.child("sessions.csv");
    sessions.write_str(&session_table())?;
    let config = temp.child("training.json");
    config.write_str(r#"{ "epochs": 2, "batch_size": 8, "show_progress": false }"#)?;
    let model = temp.child("model.bin");
    let model_arg = model.path().to_str().unwrap_or_default();
    let labels_arg = labels.path().to_str().unwrap_or_default();

    run(&[
        "train",
        "--sessions",
        sessions.path().to_str().unwrap_or_default(),
        "--labels",
        labels_arg,
        "--config",
        config.path().to_str().unwrap_or_default(),
        "--model",
        model_arg,
        "--seed",
        "3",
    ]);
    let predict = run(&[
        "predict",
        "--model",
        model_arg,
        "--labels",
        labels_arg,
        "100_0;120_0;90_1",
    ]);
    let stdout = String::from_utf8_lossy(&predict.stdout);
    let first = stdout.lines().next().unwrap_or_default();
    assert!(
        ["baidu", "github", "wikipedia"]
            .iter()
            .any(|site| first.contains(site)),
        "unexpected prediction line: {first}"
    );
    Ok(())
}
