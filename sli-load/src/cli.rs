//! Command line interface for sli-load: argument parsing and command routing.
//!
//! All load logic lives in `sli-load-core`. This module wires the concrete HTTP and FTPS
//! clients into it, and prints results for the user.
//!
//! For programmatic and integration use, call [`run`] with a constructed [`Cli`].
use crate::ftp::FtpsTransfer;
use crate::http::GdcHttpClient;
use crate::input::read_rows;
use crate::load_config::{load_config, CliConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use sli_load_core::ingest::IngestionTrigger;
use sli_load_core::load::{load_dataset, LoadReport, LoadRequest};
use sli_load_core::manifest::{DatasetManifest, ManifestStore};
use sli_load_core::metadata::MetadataResolver;
use sli_load_core::session::SessionContext;
use std::path::PathBuf;

/// CLI for sli-load: load CSV data into analytics platform datasets.
#[derive(Parser)]
#[clap(
    name = "sli-load",
    version,
    about = "Load tabular data into analytics platform datasets through the Single Load Interface"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the projects available to the configured user
    Projects,
    /// List the datasets of the configured project
    Datasets,
    /// Show the columns of a dataset's SLI template
    Describe {
        /// Dataset identifier; defaults to `load.dataset` from the config
        #[clap(long)]
        dataset: Option<String>,
    },
    /// Load the configured data file into the configured dataset
    Load,
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Projects => {
            tracing::info!(command = "projects", "Listing projects");
            let ctx = open_session(&config).await?;
            for project in MetadataResolver::new(&ctx).list_projects().await? {
                println!("{}\t{}", project.identifier, project.title);
            }
        }
        Commands::Datasets => {
            let project = config.require_project()?;
            tracing::info!(command = "datasets", project, "Listing datasets");
            let ctx = open_session(&config).await?;
            let datasets = MetadataResolver::new(&ctx).list_datasets(project).await?;
            for (identifier, set) in &datasets {
                let title = set
                    .pointer("/meta/title")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default();
                println!("{identifier}\t{title}");
            }
        }
        Commands::Describe { dataset } => {
            let dataset = match dataset {
                Some(dataset) => dataset,
                None => config.require_load()?.dataset.clone(),
            };
            config.require_project()?;
            tracing::info!(command = "describe", dataset = %dataset, "Describing dataset");
            let ctx = open_session(&config).await?;
            let mut store = ManifestStore::new();
            let manifest = store.read_sli_template(&ctx, &dataset).await?;
            print_manifest(manifest);
        }
        Commands::Load => {
            let load = config.require_load()?;
            config.require_project()?;
            tracing::info!(command = "load", dataset = %load.dataset, "Starting load");
            let encoder = config.csv.encoder()?;
            let rows = read_rows(&load.data, encoder.delimiter(), load.has_header)?;

            let ctx = open_session(&config).await?;
            let mut store = ManifestStore::new();
            let trigger = IngestionTrigger::new(FtpsTransfer::default(), &config.platform.upload_host);
            let request = LoadRequest {
                dataset: load.dataset.clone(),
                rows,
                incremental: load.incremental,
            };
            match load_dataset(&ctx, &mut store, &encoder, &trigger, &request).await {
                Ok(report) => {
                    tracing::info!(command = "load", ?report, "Load complete");
                    print_report(&report);
                }
                Err(e) => {
                    tracing::error!(command = "load", stage = e.kind(), error = %e, "Load failed");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

async fn open_session(config: &CliConfig) -> Result<SessionContext<GdcHttpClient>> {
    let transport = GdcHttpClient::new(&config.platform.server)?;
    let mut ctx = SessionContext::new(transport);
    ctx.login(&config.credentials.username, &config.credentials.secret)
        .await?;
    if let Some(project) = &config.project {
        ctx.set_project(project.as_str());
    }
    Ok(ctx)
}

fn print_manifest(manifest: &DatasetManifest) {
    println!("dataset: {}", manifest.dataset_id);
    for column in manifest.parts() {
        let (title, category) = column
            .resolved_meta
            .as_ref()
            .map(|meta| (meta.title.as_str(), meta.category.as_str()))
            .unwrap_or_default();
        println!(
            "{}\t{:?}\t{}\t{}\t{}",
            column.column_name,
            column.mode,
            category,
            title,
            column.populates.join(",")
        );
    }
    if !manifest.is_complete() {
        println!("warning: template is incomplete; it cannot be loaded");
    }
}

fn print_report(report: &LoadReport) {
    println!("project: {}", report.project);
    println!("dataset: {}", report.dataset);
    println!("accepted rows: {}", report.accepted);
    println!("skipped rows: {}", report.skipped);
    for warning in &report.warnings {
        println!(
            "  row {}: {} fields: {}",
            warning.row, warning.field_count, warning.raw
        );
    }
    println!("archive: {}", report.archive_path.display());
    println!("remote directory: {}", report.remote_directory);
}
