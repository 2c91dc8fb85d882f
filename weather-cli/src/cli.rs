use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, validator::Validation};
use jatim_weather_core::Config;

use crate::{menu, session::Session, view};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "jatim-weather", version, about = "East Java current-weather CLI")]
pub struct Cli {
    /// WeatherAPI.com key; takes precedence over the stored one.
    #[arg(long, env = "WEATHERAPI_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Maximum number of concurrent requests per round.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a WeatherAPI.com key in the config file.
    Configure,

    /// Fetch every district once and print a summary.
    Fetch {
        /// Also export CSV; without a value a timestamped name is used.
        #[arg(long)]
        export: Option<Option<PathBuf>>,

        /// Also render the PNG chart; without a value a timestamped name is used.
        #[arg(long)]
        chart: Option<Option<PathBuf>>,
    },

    /// Interactive menu (the default).
    Menu,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let Cli { api_key, workers, command } = self;
        let mut config = Config::load()?;

        match command.unwrap_or(Command::Menu) {
            Command::Configure => configure(&mut config),
            Command::Fetch { export, chart } => {
                apply_overrides(&mut config, api_key, workers)?;
                let session = Session::from_config(&config)?;

                session.refresh().await;
                view::print_summary(&session.store().get_all());

                if let Some(path) = export {
                    match session.export_csv(path)? {
                        Some(written) => view::print_success(&format!("Exported to {}", written.display())),
                        None => view::print_error("No data to export"),
                    }
                }
                if let Some(path) = chart {
                    match session.export_chart(path)? {
                        Some(written) => view::print_success(&format!("Chart saved to {}", written.display())),
                        None => view::print_error("No data to plot"),
                    }
                }
                Ok(())
            }
            Command::Menu => {
                apply_overrides(&mut config, api_key, workers)?;
                let session = Session::from_config(&config)?;
                menu::run(&session).await
            }
        }
    }
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let api_key = prompt_api_key()?;
    config.set_api_key(api_key);
    config.save()?;

    let path = Config::config_file_path()?;
    view::print_success(&format!("API key saved to {}", path.display()));
    Ok(())
}

/// Resolve the API key (flag/env, then config, then prompt) and apply flag overrides.
fn apply_overrides(
    config: &mut Config,
    api_key: Option<String>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let flag_key = api_key.filter(|k| !k.trim().is_empty());
    match flag_key {
        Some(key) => config.set_api_key(key),
        None if config.api_key().is_some() => {}
        None => config.set_api_key(prompt_api_key()?),
    }

    if let Some(workers) = workers {
        config.api.max_workers = workers;
    }
    Ok(())
}

fn prompt_api_key() -> anyhow::Result<String> {
    view::print_info("This tool needs an API key from WeatherAPI.com");
    view::print_info("Sign up for free at https://www.weatherapi.com/");

    Password::new("WeatherAPI.com API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Ok(Validation::Invalid("API key must not be empty".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()
        .map(|key| key.trim().to_string())
        .context("No API key entered")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["jatim-weather"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn fetch_flags_take_optional_paths() {
        let cli =
            Cli::try_parse_from(["jatim-weather", "fetch", "--export", "--chart", "out.png"]).unwrap();

        match cli.command {
            Some(Command::Fetch { export, chart }) => {
                assert_eq!(export, Some(None));
                assert_eq!(chart, Some(Some(PathBuf::from("out.png"))));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "jatim-weather",
            "fetch",
            "--api-key",
            "KEY",
            "--workers",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.api_key.as_deref(), Some("KEY"));
        assert_eq!(cli.workers, Some(8));
    }

    #[test]
    fn flag_key_and_workers_override_config() {
        let mut config = Config::default();
        config.set_api_key("STORED".into());

        apply_overrides(&mut config, Some("FLAG".into()), Some(2)).unwrap();

        assert_eq!(config.api_key(), Some("FLAG"));
        assert_eq!(config.api.max_workers, 2);
    }

    #[test]
    fn stored_key_used_when_flag_blank() {
        let mut config = Config::default();
        config.set_api_key("STORED".into());

        apply_overrides(&mut config, Some("  ".into()), None).unwrap();

        assert_eq!(config.api_key(), Some("STORED"));
        assert_eq!(config.api.max_workers, 5);
    }
}
