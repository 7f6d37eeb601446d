//! Subcommand handlers.

use crate::Commands;
use anyhow::Context;
use cellnet_core::{
    ConfigOverrides, NameScope, PythonBackend, TrainingConfig, TrainingDriver, bn_feature_net_61x61,
};
use std::path::Path;
use tracing::info;

pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let overrides = command_overrides(&command);
    let config = cellnet_core::load_config(Some(workspace), config_file, Some(&overrides))
        .context("Configuration error")?;

    match command {
        Commands::Run { dry_run, .. } => run(config, dry_run).await,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            println!("{rendered}");
            Ok(())
        }
        Commands::Model => {
            let mut names = NameScope::new();
            let net = bn_feature_net_61x61(&config.model, &mut names)?;
            println!("{}", net.summary());
            Ok(())
        }
    }
}

/// Settings given on the command line, layered on top of every config source.
fn command_overrides(command: &Commands) -> ConfigOverrides {
    match command {
        Commands::Run { trials, .. } => ConfigOverrides {
            trials: *trials,
            ..ConfigOverrides::default()
        },
        _ => ConfigOverrides::default(),
    }
}

async fn run(config: TrainingConfig, dry_run: bool) -> anyhow::Result<()> {
    let backend = PythonBackend::from_config(&config.backend);
    let driver = TrainingDriver::new(config, backend)?;

    if dry_run {
        for request in driver.plan() {
            println!("{}", serde_json::to_string(&request)?);
        }
        return Ok(());
    }

    let mut driver = driver.with_persistent_ledger()?;
    let records = driver.run().await?;
    for record in &records {
        info!(
            trial = record.trial,
            weights = %record.artifacts.weights.display(),
            best_loss = ?record.metrics.as_ref().and_then(|m| m.best_loss),
            "Trial artefacts"
        );
    }
    if let Some(path) = driver.ledger().path() {
        println!("Trial ledger: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&TrainingConfig::default()).unwrap();
        assert!(rendered.contains("batch_size = 256"));
        assert!(rendered.contains("[optimizer]"));
        let parsed: TrainingConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.trials, 5);
    }

    #[test]
    fn test_cli_parses_run_overrides() {
        let cli = crate::Cli::try_parse_from(["cellnet", "run", "--trials", "2", "--dry-run"]).unwrap();
        match cli.command {
            Some(Commands::Run { trials, dry_run }) => {
                assert_eq!(trials, Some(2));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_trials_flag_becomes_only_override() {
        let cli = crate::Cli::try_parse_from(["cellnet", "run", "--trials", "2"]).unwrap();
        let overrides = command_overrides(&cli.command.unwrap());
        assert_eq!(overrides.trials, Some(2));
        assert!(overrides.dataset.is_none());
        assert!(overrides.n_epoch.is_none());

        let cli = crate::Cli::try_parse_from(["cellnet", "run"]).unwrap();
        assert!(command_overrides(&cli.command.unwrap()).trials.is_none());
    }
}
