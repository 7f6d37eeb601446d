//! Integration tests for layered configuration loading.

use cellnet_core::config::{load_config, workspace_config_path};
use cellnet_core::{CellnetError, ConfigOverrides};
use tempfile::TempDir;

fn write(path: &std::path::Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

#[test]
fn test_workspace_config_overrides_defaults() {
    let ws = TempDir::new().unwrap();
    write(
        &workspace_config_path(ws.path()),
        r#"
        trials = 2
        dataset = "HeLa_set2_61x61"

        [augmentation]
        shear = true
        "#,
    );

    let cfg = load_config(Some(ws.path()), None, None).unwrap();
    assert_eq!(cfg.trials, 2);
    assert_eq!(cfg.dataset, "HeLa_set2_61x61");
    assert!(cfg.augmentation.shear);
    assert!(cfg.augmentation.rotate);
    assert_eq!(cfg.batch_size, 256);
}

#[test]
fn test_explicit_file_beats_workspace() {
    let ws = TempDir::new().unwrap();
    write(&workspace_config_path(ws.path()), "n_epoch = 10\n");
    let explicit = ws.path().join("short.toml");
    write(&explicit, "n_epoch = 1\n");

    let cfg = load_config(Some(ws.path()), Some(&explicit), None).unwrap();
    assert_eq!(cfg.n_epoch, 1);
}

#[test]
fn test_overrides_win() {
    let ws = TempDir::new().unwrap();
    write(&workspace_config_path(ws.path()), "trials = 7\n");
    let overrides = ConfigOverrides {
        trials: Some(1),
        ..ConfigOverrides::default()
    };

    let cfg = load_config(Some(ws.path()), None, Some(&overrides)).unwrap();
    assert_eq!(cfg.trials, 1);
}

#[test]
fn test_trials_override_keeps_workspace_settings() {
    let ws = TempDir::new().unwrap();
    write(
        &workspace_config_path(ws.path()),
        r#"
        dataset = "HeLa_set2_61x61"
        n_epoch = 3

        [optimizer]
        momentum = 0.5
        "#,
    );
    let overrides = ConfigOverrides {
        trials: Some(2),
        ..ConfigOverrides::default()
    };

    let cfg = load_config(Some(ws.path()), None, Some(&overrides)).unwrap();
    assert_eq!(cfg.trials, 2);
    assert_eq!(cfg.dataset, "HeLa_set2_61x61");
    assert_eq!(cfg.n_epoch, 3);
    assert_eq!(cfg.optimizer.momentum, 0.5);
    assert_eq!(cfg.batch_size, 256);
}

#[test]
fn test_empty_overrides_change_nothing() {
    let ws = TempDir::new().unwrap();
    write(&workspace_config_path(ws.path()), "trials = 7
");

    let cfg = load_config(Some(ws.path()), None, Some(&ConfigOverrides::default())).unwrap();
    assert_eq!(cfg.trials, 7);
}

#[test]
fn test_invalid_layered_value_rejected() {
    let ws = TempDir::new().unwrap();
    write(
        &workspace_config_path(ws.path()),
        "[schedule]\ndecay = 2.0\n",
    );

    let result = load_config(Some(ws.path()), None, None);
    assert!(matches!(result, Err(CellnetError::Config(_))));
}
