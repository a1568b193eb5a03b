use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use conflict_analysis::pipeline::{run_with_progress, PipelineConfig};
use conflict_data::export::{
    write_batch_metrics, write_batch_metrics_to, write_block_metrics, write_block_metrics_to,
};
use conflict_data::grouper::group_by_block;
use conflict_data::ingest::{load_transfer_files, BlockRange};
use conflict_data::store::{AnalysisRun, NewRun, Store};
use conflict_data::types::{BatchMetrics, BlockMetrics};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct AppContext {
    db_path: String,
}

#[derive(Parser, Debug)]
#[command(name = "token-conflict")]
#[command(about = "Intra-block token transfer conflict analysis")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[arg(
        long,
        global = true,
        env = "CONFLICT_DB_PATH",
        default_value = "data/conflict.sqlite"
    )]
    db_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build conflict graphs per block and aggregate them into weighted batches.
    Analyze(AnalyzeArgs),
    /// Print the result tables of a stored run.
    Report(ReportArgs),
    /// List stored runs.
    Status,
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Transfer export CSV; repeat to concatenate several (e.g. ERC-20 and ERC-721).
    #[arg(long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Lowest block number to keep (inclusive).
    #[arg(long)]
    start_block: Option<u64>,

    /// Highest block number to keep (inclusive).
    #[arg(long)]
    end_block: Option<u64>,

    /// Block rows per weighted batch.
    #[arg(long, default_value_t = conflict_analysis::batch::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Worker threads for per-block analysis (0 = all cores).
    #[arg(long, default_value_t = 0)]
    threads: usize,

    #[arg(long, default_value = "token_conflict_combined.csv")]
    block_output: PathBuf,

    #[arg(long, default_value = "weighted_token_conflict_combined.csv")]
    batch_output: PathBuf,

    /// Also store the run in the SQLite database.
    #[arg(long)]
    persist: bool,

    /// Summary format: table (default), json, or csv.
    #[arg(long, default_value = "table")]
    output: String,
}

/// Arguments for the `report` subcommand.
#[derive(Args, Debug)]
struct ReportArgs {
    /// Run to show; defaults to the latest.
    #[arg(long)]
    run_id: Option<i64>,

    /// Include the per-block table. With json or csv output it replaces the
    /// batch table, so stdout always holds a single document.
    #[arg(long)]
    blocks: bool,

    /// Output format: table (default), json, or csv.
    #[arg(long, default_value = "table")]
    output: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        db_path: cli.db_path,
    };

    match cli.command {
        Commands::Analyze(args) => handle_analyze(&ctx, args),
        Commands::Report(args) => handle_report(&ctx, args),
        Commands::Status => handle_status(&ctx),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn handle_analyze(ctx: &AppContext, args: AnalyzeArgs) -> Result<()> {
    check_output_format(&args.output)?;

    let config = PipelineConfig {
        batch_size: args.batch_size,
        threads: args.threads,
    };
    config.validate()?;

    let range = BlockRange::new(args.start_block, args.end_block);
    let records = load_transfer_files(&args.inputs, range)
        .wrap_err("failed to load transfer exports")?;
    let groups = group_by_block(records);

    if groups.is_empty() {
        tracing::warn!(
            start_block = ?args.start_block,
            end_block = ?args.end_block,
            "no transfer records in range"
        );
    }

    let pb = ProgressBar::new(groups.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} blocks")
            .wrap_err("failed to create progress style")?
            .progress_chars("#>-"),
    );

    let output = run_with_progress(&groups, &config, || pb.inc(1))
        .wrap_err("conflict analysis failed")?;
    pb.finish_and_clear();

    ensure_parent_dir(&args.block_output)?;
    ensure_parent_dir(&args.batch_output)?;
    write_block_metrics(&args.block_output, &output.blocks)?;
    write_batch_metrics(&args.batch_output, &output.batches)?;

    let run_id = if args.persist {
        ensure_parent_dir(Path::new(&ctx.db_path))?;
        let store = Store::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
        let run_id = store
            .insert_run(&NewRun {
                input_files: args
                    .inputs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
                start_block: args.start_block,
                end_block: args.end_block,
                batch_size: config.batch_size as u64,
                block_count: output.blocks.len() as u64,
                batch_count: output.batches.len() as u64,
            })
            .wrap_err("failed to insert analysis run")?;
        store
            .insert_block_metrics(run_id, &output.blocks)
            .wrap_err("failed to insert block metrics")?;
        store
            .insert_batch_metrics(run_id, &output.batches)
            .wrap_err("failed to insert batch metrics")?;
        Some(run_id)
    } else {
        None
    };

    print_batches(&output.batches, &args.output)?;

    info!(
        blocks = output.blocks.len(),
        batches = output.batches.len(),
        block_output = %args.block_output.display(),
        batch_output = %args.batch_output.display(),
        run_id = ?run_id,
        "analyze command completed"
    );

    Ok(())
}

fn handle_report(ctx: &AppContext, args: ReportArgs) -> Result<()> {
    check_output_format(&args.output)?;

    let store = Store::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
    let run = match args.run_id {
        Some(id) => store
            .get_run(id)
            .wrap_err("failed to query analysis run")?
            .ok_or_else(|| eyre!("run {id} not found in database"))?,
        None => store
            .latest_run()
            .wrap_err("failed to query latest run")?
            .ok_or_else(|| eyre!("no analysis runs stored in {}", ctx.db_path))?,
    };

    let sections = ReportSections::select(args.blocks, &args.output);

    if sections.blocks {
        let blocks = store
            .get_block_metrics(run.id)
            .wrap_err("failed to query block metrics")?;
        print_blocks(&blocks, &args.output)?;
    }
    if sections.batches {
        let batches = store
            .get_batch_metrics(run.id)
            .wrap_err("failed to query batch metrics")?;
        print_batches(&batches, &args.output)?;
    }

    if args.output == "table" {
        print_runs(std::slice::from_ref(&run));
    }

    info!(
        run_id = run.id,
        blocks = sections.blocks,
        batches = sections.batches,
        "report command completed"
    );
    Ok(())
}

/// Which stored tables `report` prints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ReportSections {
    blocks: bool,
    batches: bool,
}

impl ReportSections {
    /// json and csv write one table only; terminal output may stack both.
    fn select(include_blocks: bool, output: &str) -> Self {
        let machine = matches!(output, "json" | "csv");
        Self {
            blocks: include_blocks,
            batches: !(include_blocks && machine),
        }
    }
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    let store = Store::new(&ctx.db_path).wrap_err("failed to open SQLite store")?;
    let runs = store.list_runs().wrap_err("failed to query analysis runs")?;

    if runs.is_empty() {
        println!("No analysis runs stored in {}", ctx.db_path);
    } else {
        print_runs(&runs);
    }

    info!(runs = runs.len(), db_path = %ctx.db_path, "status command completed");
    Ok(())
}

fn check_output_format(output: &str) -> Result<()> {
    match output {
        "table" | "json" | "csv" => Ok(()),
        _ => Err(eyre!(
            "unknown output format '{}'; use 'table', 'json', or 'csv'",
            output
        )),
    }
}

/// Undefined ratios render as `n/a` in terminal tables.
fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

fn print_batches(batches: &[BatchMetrics], output: &str) -> Result<()> {
    match output {
        "json" => {
            let json =
                serde_json::to_string_pretty(batches).wrap_err("failed to serialize JSON")?;
            println!("{json}");
        }
        "csv" => write_batch_metrics_to(std::io::stdout().lock(), batches)?,
        _ => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec![
                "Batch",
                "G1 Depth Ratio",
                "G2 Depth Ratio",
                "G1 Edge Ratio",
                "G2 Edge Ratio",
                "G1 Nodes",
                "G2 Nodes",
            ]);

            for b in batches {
                table.add_row(vec![
                    b.batch_index.to_string(),
                    fmt_ratio(b.graph1_weighted_avg),
                    fmt_ratio(b.graph2_weighted_avg),
                    fmt_ratio(b.graph1_single_weighted_avg),
                    fmt_ratio(b.graph2_single_weighted_avg),
                    b.total_nodes_g1.to_string(),
                    b.total_nodes_g2.to_string(),
                ]);
            }

            println!("\n{table}\n");
        }
    }
    Ok(())
}

fn print_blocks(blocks: &[BlockMetrics], output: &str) -> Result<()> {
    match output {
        "json" => {
            let json =
                serde_json::to_string_pretty(blocks).wrap_err("failed to serialize JSON")?;
            println!("{json}");
        }
        "csv" => write_block_metrics_to(std::io::stdout().lock(), blocks)?,
        _ => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec![
                "Block", "G1 Nodes", "G1 Depth", "G2 Nodes", "G2 Depth", "G1 Edge", "G2 Edge",
                "G1 Ratio", "G2 Ratio",
            ]);

            for m in blocks {
                table.add_row(vec![
                    m.block_number.to_string(),
                    m.graph1_nodes.to_string(),
                    m.graph1_max_depth.to_string(),
                    m.graph2_nodes.to_string(),
                    m.graph2_max_depth.to_string(),
                    format!("{:.4}", m.graph1_single_ratio),
                    format!("{:.4}", m.graph2_single_ratio),
                    fmt_ratio(m.graph1_ratio),
                    fmt_ratio(m.graph2_ratio),
                ]);
            }

            println!("\n{table}\n");
        }
    }
    Ok(())
}

fn print_runs(runs: &[AnalysisRun]) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Run", "Created", "Inputs", "Range", "Batch Size", "Blocks", "Batches",
    ]);

    for run in runs {
        let range = format!(
            "{} - {}",
            run.start_block.map_or("*".to_string(), |b| b.to_string()),
            run.end_block.map_or("*".to_string(), |b| b.to_string()),
        );
        table.add_row(vec![
            run.id.to_string(),
            run.created_at.clone(),
            run.input_files.clone(),
            range,
            run.batch_size.to_string(),
            run.block_count.to_string(),
            run.batch_count.to_string(),
        ]);
    }

    println!("{table}\n");
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create directory {}", parent.display())),
        _ => Ok(()),
    }
}
