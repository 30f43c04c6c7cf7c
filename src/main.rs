use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use signalement::plan::ExportFileType;
use signalement::plan_execution::{self, AnalyzeOptions};
use signalement::{common, generate_commands, plan};
use std::path::PathBuf;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[clap(short, long)]
        plan: String,
        #[clap(short, long)]
        watch: bool,
    },
    Init {
        #[clap(short, long)]
        plan: String,
    },
    /// Load one file and print its report
    Analyze {
        file: PathBuf,
        /// Banner rows above the header row
        #[clap(short, long, default_value = "3")]
        skip_rows: usize,
        /// First day of the report window (YYYY-MM-DD)
        #[clap(long)]
        from: Option<NaiveDate>,
        /// Last day of the report window, included (YYYY-MM-DD)
        #[clap(long)]
        to: Option<NaiveDate>,
        #[clap(long, default_value = "10")]
        top: usize,
        #[clap(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
        #[clap(long, default_value = ";")]
        separator: char,
        #[clap(long, default_value = "erreur_log.txt")]
        diagnostic_log: PathBuf,
    },
    Generate {
        #[clap(subcommand)]
        command: GenerateCommands,
    },
}

#[derive(Subcommand, Debug)]
enum GenerateCommands {
    Template { name: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
    Csv,
}

impl From<OutputFormat> for ExportFileType {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ExportFileType::ReportJson,
            OutputFormat::Markdown => ExportFileType::Markdown,
            OutputFormat::Csv => ExportFileType::EnrichedCsv,
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Run { plan, watch } => {
            info!("Running plan: {}", plan);
            plan_execution::execute_plan(plan, watch)?;
        }
        Commands::Init { plan } => {
            info!("Initializing plan: {}", plan);
            let plan_file_path = plan;
            let plan = plan::Plan::default();
            let serialized_plan = serde_yaml::to_string(&plan)?;
            common::write_string_to_file(&plan_file_path, &serialized_plan)?;
        }
        Commands::Analyze {
            file,
            skip_rows,
            from,
            to,
            top,
            format,
            separator,
            diagnostic_log,
        } => {
            info!("Analyzing file: {}", file.display());
            if !separator.is_ascii() {
                anyhow::bail!("Separator '{}' is not a single-byte character", separator);
            }
            let options = AnalyzeOptions {
                skip_rows,
                separator: separator as u8,
                diagnostic_log: Some(diagnostic_log),
                from,
                to,
                top_natures: top,
                exporter: format.into(),
            };
            let output = plan_execution::analyze_file(&file, &options)?;
            println!("{}", output);
        }
        Commands::Generate { command } => match command {
            GenerateCommands::Template { name } => {
                info!("Generating template: {}", name);
                generate_commands::generate_template(name);
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("handlebars=off,{}", log_level)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
