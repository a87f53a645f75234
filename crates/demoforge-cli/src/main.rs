//! Demoforge CLI
//!
//! Command-line interface for:
//! - Validating a demo-spec JSON file against the schema planner
//! - Running the full orchestration pipeline as a dry run (SQL script +
//!   run-record JSON)
//! - Previewing resolved resource names for an organization
//! - Emitting the built-in sample spec for offline experiments

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use demoforge_engine::{
    resolve_names, run_demo, ContentOracle, MockOracle, OrgBrief, RunConfig, SqlScriptPlatform,
};
use demoforge_spec::DemoSpec;

mod report;

#[derive(Parser)]
#[command(name = "demoforge")]
#[command(
    author,
    version,
    about = "Demoforge: industry-tailored demo data environments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a demo-spec JSON file against the schema planner.
    Validate {
        /// Demo spec JSON file
        spec: PathBuf,
    },

    /// Run the full pipeline as a dry run: generate data and render the
    /// provisioning calls into a SQL script.
    Run {
        /// Demo spec JSON file (omit to use the built-in sample spec)
        #[arg(long)]
        spec: Option<PathBuf>,
        /// Organization name (drives resource naming)
        #[arg(long)]
        org: String,
        /// Rows per table, clamped to [20, 10000]
        #[arg(long, default_value_t = 100)]
        records: usize,
        /// Target join-key overlap ratio in [0, 1]
        #[arg(long, default_value_t = 0.70)]
        overlap: f64,
        /// Skip the semantic view stage
        #[arg(long)]
        no_semantic_view: bool,
        /// Skip the search index stage
        #[arg(long)]
        no_search_index: bool,
        /// Skip the agent stage
        #[arg(long)]
        no_agent: bool,
        /// Language tag for generated text
        #[arg(long, default_value = "en")]
        language: String,
        /// Output path for the rendered SQL script
        #[arg(long)]
        script: Option<PathBuf>,
        /// Output path for the run-record JSON
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Preview the resolved resource names for an organization.
    Names {
        /// Organization name
        org: String,
    },

    /// Write the built-in sample demo spec to a file (or stdout).
    SampleSpec {
        /// Organization the sample is tailored to
        #[arg(long, default_value = "Acme-Corp")]
        org: String,
        /// Output path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { spec } => validate(&spec),
        Commands::Run {
            spec,
            org,
            records,
            overlap,
            no_semantic_view,
            no_search_index,
            no_agent,
            language,
            script,
            record,
        } => {
            let config = RunConfig {
                overlap_ratio: overlap,
                records_per_table: records,
                enable_semantic_view: !no_semantic_view,
                enable_search_index: !no_search_index,
                enable_agent: !no_agent,
                language_code: language,
            };
            run(spec.as_deref(), &org, &config, script.as_deref(), record.as_deref())
        }
        Commands::Names { org } => {
            let names = resolve_names(&org, Utc::now());
            println!("schema:        {}", names.schema);
            println!("semantic view: {}", names.semantic_view);
            println!("search index:  {}", names.search_index);
            println!("agent:         {}", names.agent);
            Ok(())
        }
        Commands::SampleSpec { org, out } => sample_spec(&org, out.as_deref()),
    }
}

fn load_spec(path: &std::path::Path) -> Result<DemoSpec> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read demo spec: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parse demo spec: {}", path.display()))
}

fn validate(path: &std::path::Path) -> Result<()> {
    let spec = load_spec(path)?;
    match demoforge_spec::plan(&spec) {
        Ok(schema) => {
            println!(
                "{} {} tables, {} relationships",
                "valid:".green().bold(),
                schema.tables.len(),
                schema.relationships.len()
            );
            Ok(())
        }
        Err(err) => {
            println!("{} {err}", "invalid:".red().bold());
            std::process::exit(1);
        }
    }
}

fn run(
    spec_path: Option<&std::path::Path>,
    org: &str,
    config: &RunConfig,
    script_path: Option<&std::path::Path>,
    record_path: Option<&std::path::Path>,
) -> Result<()> {
    let spec = match spec_path {
        Some(path) => load_spec(path)?,
        None => MockOracle
            .demo_spec(&OrgBrief {
                organization: org.to_string(),
                description: format!("sample environment for {org}"),
                industry_hint: None,
                language_code: config.language_code.clone(),
            })
            .context("build sample spec")?,
    };

    let mut platform = SqlScriptPlatform::new();
    let record = run_demo(&spec, config, org, Utc::now(), &mut platform)
        .context("orchestration run failed before provisioning")?;

    report::print_run(&record);

    if let Some(path) = script_path {
        fs::write(path, platform.script())
            .with_context(|| format!("write SQL script: {}", path.display()))?;
        println!("\nSQL script written to {}", path.display());
    }
    if let Some(path) = record_path {
        let json = serde_json::to_string_pretty(&record).context("serialize run record")?;
        fs::write(path, json)
            .with_context(|| format!("write run record: {}", path.display()))?;
        println!("run record written to {}", path.display());
    }

    if !record.mandatory_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn sample_spec(org: &str, out: Option<&std::path::Path>) -> Result<()> {
    let spec = MockOracle
        .demo_spec(&OrgBrief {
            organization: org.to_string(),
            description: format!("sample environment for {org}"),
            industry_hint: None,
            language_code: "en".to_string(),
        })
        .context("build sample spec")?;
    let json = serde_json::to_string_pretty(&spec).context("serialize sample spec")?;
    match out {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("write sample spec: {}", path.display()))?;
            println!("sample spec written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
