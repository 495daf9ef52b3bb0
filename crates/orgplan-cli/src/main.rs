mod config;
mod plan_cmd;
mod show_cmd;

#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use orgplan_core::PlannerConfig;
use orgplan_core::planner::design::design_response_schema;

#[derive(Parser)]
#[command(name = "orgplan", version, about = "Plan an organization of AI agents from a PRD and a budget")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an orgplan config file
    Init {
        /// Chat-completions endpoint URL
        #[arg(long, default_value = PlannerConfig::DEFAULT_ENDPOINT)]
        endpoint: String,
        /// Model name sent to the endpoint
        #[arg(long, default_value = PlannerConfig::DEFAULT_MODEL)]
        model: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Plan an organization and write it as OAG JSON
    Plan {
        /// Path to the PRD JSON file
        #[arg(long)]
        prd: PathBuf,
        /// Budget hard cap in USD
        #[arg(long)]
        budget: f64,
        /// Output path for the OAG document
        #[arg(long, default_value = "oag.json")]
        out: PathBuf,
        /// Skip the reasoning service and plan deterministically
        #[arg(long)]
        offline: bool,
        /// Treat unknown role or task references in the design as failures
        #[arg(long)]
        strict_refs: bool,
    },
    /// Print a saved OAG document
    Show {
        /// Path to the OAG JSON file
        file: PathBuf,
    },
    /// Print the JSON schema the reasoning service must answer with
    Schema,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Execute the `orgplan init` command: write config file.
fn cmd_init(endpoint: &str, model: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        reasoning: config::ReasoningSection {
            endpoint: Some(endpoint.to_string()),
            model: Some(model.to_string()),
            ..config::ReasoningSection::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  reasoning.endpoint = {endpoint}");
    println!("  reasoning.model = {model}");
    println!();
    println!("Next: set ORGPLAN_API_KEY (or reasoning.api_key) to enable the reasoning planner.");

    Ok(())
}

fn cmd_schema() -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&design_response_schema())?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            endpoint,
            model,
            force,
        } => {
            cmd_init(&endpoint, &model, force)?;
        }
        Commands::Plan {
            prd,
            budget,
            out,
            offline,
            strict_refs,
        } => {
            let options = plan_cmd::PlanOptions {
                prd,
                budget,
                out,
                offline,
                strict_refs,
            };
            plan_cmd::run_plan(&options).await?;
        }
        Commands::Show { file } => {
            show_cmd::run_show(&file)?;
        }
        Commands::Schema => {
            cmd_schema()?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "orgplan", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_arguments_parse() {
        let cli = Cli::try_parse_from([
            "orgplan", "plan", "--prd", "prd.json", "--budget", "120.5", "--offline",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                prd,
                budget,
                out,
                offline,
                strict_refs,
            } => {
                assert_eq!(prd, PathBuf::from("prd.json"));
                assert_eq!(budget, 120.5);
                assert_eq!(out, PathBuf::from("oag.json"));
                assert!(offline);
                assert!(!strict_refs);
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn plan_requires_budget() {
        assert!(Cli::try_parse_from(["orgplan", "plan", "--prd", "prd.json"]).is_err());
    }
}
