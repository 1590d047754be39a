use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use murtel_core::{inspect_file, run_all, run_job, FileInspection, Job, MurtelConfig, OutputSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Murtel rock glacier data preparation", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration file (defaults to ./murtel.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the dataset folders; overrides MURTEL_DATA_ROOT
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,
    /// Print results as JSON instead of a table
    #[arg(long, global = true)]
    summary_json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Gap-fill and clip the borehole temperature records
    Temperature,
    /// Reduce SAA exports to deformation series
    Displacement,
    /// Merge station feeds into daily series
    Meteo,
    /// Run every job in order
    All,
    /// Print the effective configuration as TOML
    ShowConfig,
    /// Detect the format of input files
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.global.log_format);

    let mut config = MurtelConfig::load(cli.global.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(root) = cli.global.data_root {
        config = config.with_data_root(root);
    }
    let as_json = cli.global.summary_json;

    match cli.command {
        Command::Temperature => run_single(Job::Temperature, &config, as_json),
        Command::Displacement => run_single(Job::Displacement, &config, as_json),
        Command::Meteo => run_single(Job::Meteo, &config, as_json),
        Command::All => {
            let outputs = run_all(&config).context("batch run failed")?;
            info!(outputs = outputs.len(), "all jobs finished");
            print_outputs(&outputs, as_json)
        }
        Command::ShowConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Inspect { files } => {
            let mut inspections = Vec::with_capacity(files.len());
            for path in &files {
                let inspection = inspect_file(path)
                    .with_context(|| format!("failed to inspect {}", path.display()))?;
                inspections.push(inspection);
            }
            print_inspections(&inspections, as_json)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn run_single(job: Job, config: &MurtelConfig, as_json: bool) -> Result<()> {
    let outputs = run_job(job, config).with_context(|| format!("{job} job failed"))?;
    print_outputs(&outputs, as_json)
}

fn print_outputs(outputs: &[OutputSummary], as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(outputs)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["job", "output", "rows", "columns"]);
    for output in outputs {
        table.add_row(vec![
            output.job.clone(),
            output.path.display().to_string(),
            output.rows.to_string(),
            output.columns.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn print_inspections(inspections: &[FileInspection], as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(inspections)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["file", "format", "station", "rows", "columns"]);
    for inspection in inspections {
        table.add_row(vec![
            inspection.path.display().to_string(),
            inspection.format.to_string(),
            inspection.station.clone().unwrap_or_default(),
            inspection.rows.to_string(),
            inspection.columns.join(", "),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "murtel",
            "meteo",
            "--data-root",
            "/data",
            "--log-format",
            "text",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Meteo));
        assert_eq!(cli.global.data_root, Some(PathBuf::from("/data")));
        assert_eq!(cli.global.log_format, LogFormat::Text);
        assert!(!cli.global.summary_json);
    }

    #[test]
    fn inspect_requires_files() {
        assert!(Cli::try_parse_from(["murtel", "inspect"]).is_err());
    }
}
