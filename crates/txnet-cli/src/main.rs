use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use txnet_analysis::balance::balance_profile;
use txnet_analysis::cycles::CycleFinder;
use txnet_analysis::export::GraphExport;
use txnet_analysis::regression::{degree_balance_pairs, fit_degree_model, RegressionOptions};
use txnet_analysis::subnetwork::{largest_subnetwork, rank_future_partners};
use txnet_analysis::units::format_units;
use txnet_analysis::{
    BuildOptions, BuildStats, DuplicatePolicy, EndpointPolicy, GraphError, TransactionGraph,
};
use txnet_data::{load_accounts, load_transfers};

#[derive(Parser, Debug)]
#[command(name = "txnet")]
#[command(about = "Reconstruct and analyse an account transaction network")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Accounts table (`balance,address`). Falls back to TXNET_ACCOUNTS.
    #[arg(long, global = true)]
    accounts: Option<PathBuf>,

    /// Transfers table (`sequence,from,to,value,...`). Falls back to TXNET_TRANSFERS.
    #[arg(long, global = true)]
    transfers: Option<PathBuf>,

    /// Handling of transfers that reference an unknown account.
    #[arg(long, value_enum, default_value_t = DanglingArg::Reject, global = true)]
    on_dangling: DanglingArg,

    /// Handling of an address listed twice with different balances.
    #[arg(long, value_enum, default_value_t = DuplicateArg::Reject, global = true)]
    on_duplicate: DuplicateArg,

    /// Decimal places between the atomic unit and the base unit.
    #[arg(long, default_value_t = 18, global = true)]
    unit_decimals: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the graph and print construction statistics.
    Summary,
    /// Search for transfers that flow back to their sender.
    Cycles(CyclesArgs),
    /// Find the largest subnetwork and rank future partners of its center.
    Subnetwork(SubnetworkArgs),
    /// Balance statistics and high-balance affinity.
    Balance(BalanceArgs),
    /// Fit degree against balance and report R² and RMSE.
    Regression(RegressionArgs),
    /// Write nodes and edges as JSON for a renderer.
    Export(ExportArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DanglingArg {
    Reject,
    Drop,
    Create,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DuplicateArg {
    Reject,
    LastWriteWins,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug)]
struct CyclesArgs {
    /// Search every seed account instead of stopping at the first witness.
    #[arg(long)]
    all: bool,

    /// Longest cycle, in transfers, to look for.
    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct SubnetworkArgs {
    /// Include members with no shared neighbours in the ranking.
    #[arg(long)]
    full: bool,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct BalanceArgs {
    /// High-balance threshold in base units (defaults to the average balance).
    #[arg(long)]
    threshold: Option<f64>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct RegressionArgs {
    /// Seed for the train/test split.
    #[arg(long, default_value_t = 1212)]
    seed: u64,

    /// Share of accounts held out for scoring.
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Destination file; prints to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct AppContext {
    accounts: PathBuf,
    transfers: PathBuf,
    options: BuildOptions,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        accounts: input_path(cli.accounts, "TXNET_ACCOUNTS", "--accounts")?,
        transfers: input_path(cli.transfers, "TXNET_TRANSFERS", "--transfers")?,
        options: build_options(cli.on_dangling, cli.on_duplicate, cli.unit_decimals)?,
    };

    match cli.command {
        Commands::Summary => handle_summary(&ctx),
        Commands::Cycles(args) => handle_cycles(&ctx, args),
        Commands::Subnetwork(args) => handle_subnetwork(&ctx, args),
        Commands::Balance(args) => handle_balance(&ctx, args),
        Commands::Regression(args) => handle_regression(&ctx, args),
        Commands::Export(args) => handle_export(&ctx, args),
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

fn input_path(flag: Option<PathBuf>, env_var: &str, flag_name: &str) -> Result<PathBuf> {
    flag.or_else(|| std::env::var_os(env_var).map(PathBuf::from))
        .ok_or_else(|| eyre!("{flag_name} or {env_var} is required"))
}

fn build_options(
    dangling: DanglingArg,
    duplicate: DuplicateArg,
    unit_decimals: u32,
) -> Result<BuildOptions> {
    let unit_scale = 10u128
        .checked_pow(unit_decimals)
        .ok_or_else(|| eyre!("--unit-decimals {unit_decimals} overflows a 128-bit amount"))?;

    let endpoint_policy = match dangling {
        DanglingArg::Reject => EndpointPolicy::Reject,
        DanglingArg::Drop => EndpointPolicy::Drop,
        DanglingArg::Create => EndpointPolicy::CreateVertex,
    };
    let duplicate_policy = match duplicate {
        DuplicateArg::Reject => DuplicatePolicy::Reject,
        DuplicateArg::LastWriteWins => DuplicatePolicy::LastWriteWins,
    };

    Ok(BuildOptions::default()
        .with_unit_scale(unit_scale)
        .with_endpoint_policy(endpoint_policy)
        .with_duplicate_policy(duplicate_policy))
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn load_graph(ctx: &AppContext) -> Result<(TransactionGraph, BuildStats)> {
    let pb = spinner("loading records")?;

    let accounts = load_accounts(&ctx.accounts)
        .wrap_err_with(|| format!("failed to load accounts from {}", ctx.accounts.display()))?;
    let transfers = load_transfers(&ctx.transfers)
        .wrap_err_with(|| format!("failed to load transfers from {}", ctx.transfers.display()))?;

    pb.set_message("building transaction graph");
    let built = TransactionGraph::build(&accounts, &transfers, &ctx.options)
        .wrap_err("failed to build transaction graph");
    pb.finish_and_clear();

    built
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).wrap_err("failed to serialize results to JSON")?;
    println!("{json}");
    Ok(())
}

/// Turns "no applicable accounts" into a printed notice instead of a failure.
fn no_seed_notice<T>(result: std::result::Result<T, GraphError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(GraphError::NoCandidateSeed) => {
            println!("No account has both incoming and outgoing transfers; nothing to search.");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn handle_summary(ctx: &AppContext) -> Result<()> {
    let (graph, stats) = load_graph(ctx)?;

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Accounts".to_string(), graph.node_count().to_string()]);
    table.add_row(vec!["Transfers".to_string(), graph.edge_count().to_string()]);
    table.add_row(vec![
        "Seed accounts".to_string(),
        graph.seed_accounts().len().to_string(),
    ]);
    table.add_row(vec!["Account rows read".to_string(), stats.accounts_read.to_string()]);
    table.add_row(vec![
        "Duplicate account rows".to_string(),
        stats.duplicate_accounts.to_string(),
    ]);
    table.add_row(vec!["Transfer rows read".to_string(), stats.transfers_read.to_string()]);
    table.add_row(vec![
        "Transfers dropped".to_string(),
        stats.transfers_dropped.to_string(),
    ]);
    table.add_row(vec![
        "Implicit accounts".to_string(),
        stats.implicit_vertices.to_string(),
    ]);
    table.add_row(vec!["Self transfers".to_string(), stats.self_transfers.to_string()]);

    let transferred = graph
        .edges()
        .fold(0u128, |sum, edge| sum.saturating_add(edge.transfer.amount_atomic));
    let held = graph
        .nodes()
        .fold(0u128, |sum, node| sum.saturating_add(node.balance_atomic));
    table.add_row(vec![
        "Total transferred".to_string(),
        format_units(transferred, ctx.options.unit_scale),
    ]);
    table.add_row(vec![
        "Total held".to_string(),
        format_units(held, ctx.options.unit_scale),
    ]);
    println!("{table}");

    Ok(())
}

fn handle_cycles(ctx: &AppContext, args: CyclesArgs) -> Result<()> {
    let (graph, _) = load_graph(ctx)?;

    let mut finder = CycleFinder::new(&graph);
    if let Some(max_depth) = args.max_depth {
        finder = finder.with_max_depth(max_depth);
    }

    let pb = spinner("searching for return cycles")?;
    let searched = if args.all {
        finder.report()
    } else {
        finder.first_report()
    };
    pb.finish_and_clear();

    let Some(report) = no_seed_notice(searched)? else {
        return Ok(());
    };

    info!(
        seeds = report.seeds_searched,
        cycles = report.cycles.len(),
        "cycle search finished"
    );

    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if report.cycles.is_empty() {
                println!("No return cycle found.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["#", "Seed", "Transfers", "Path"]);
            for (i, cycle) in report.cycles.iter().enumerate() {
                table.add_row(vec![
                    (i + 1).to_string(),
                    cycle.seed.clone(),
                    cycle.edge_count().to_string(),
                    cycle.path.join(" -> "),
                ]);
            }
            println!("{table}");
            println!("Cycles found: {}", report.cycles.len());
        }
    }

    Ok(())
}

fn handle_subnetwork(ctx: &AppContext, args: SubnetworkArgs) -> Result<()> {
    let (graph, _) = load_graph(ctx)?;

    let pb = spinner("discovering subnetworks")?;
    let searched = largest_subnetwork(&graph);
    pb.finish_and_clear();

    let Some(subnetwork) = no_seed_notice(searched)? else {
        return Ok(());
    };

    let mut ranked = rank_future_partners(&graph, &subnetwork)
        .wrap_err("failed to rank future partners")?;
    if !args.full {
        ranked.retain(|partner| partner.shared_neighbors > 0);
    }

    #[derive(serde::Serialize)]
    struct SubnetworkResult<'a> {
        center: &'a str,
        size: usize,
        members: &'a [String],
        partners: &'a [txnet_analysis::subnetwork::PartnerScore],
    }

    match args.output {
        OutputFormat::Json => print_json(&SubnetworkResult {
            center: subnetwork.center(),
            size: subnetwork.len(),
            members: subnetwork.members(),
            partners: &ranked,
        })?,
        OutputFormat::Table => {
            println!("Central account: {}", subnetwork.center());
            println!("Subnetwork size: {}", subnetwork.len());

            if ranked.is_empty() {
                println!(
                    "No member shares a neighbour with the central account; \
                     no future partner can be suggested."
                );
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["Rank", "Account", "Shared neighbours"]);
            for (i, partner) in ranked.iter().enumerate() {
                table.add_row(vec![
                    (i + 1).to_string(),
                    partner.address.clone(),
                    partner.shared_neighbors.to_string(),
                ]);
            }
            println!("{table}");
        }
    }

    Ok(())
}

fn handle_balance(ctx: &AppContext, args: BalanceArgs) -> Result<()> {
    let (graph, _) = load_graph(ctx)?;

    let profile = balance_profile(&graph, args.threshold).wrap_err("failed to profile balances")?;

    match args.output {
        OutputFormat::Json => print_json(&profile)?,
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["Metric", "Value"]);
            table.add_row(vec!["Accounts".to_string(), profile.accounts.to_string()]);
            table.add_row(vec![
                "Average balance".to_string(),
                format!("{:.6}", profile.average_balance),
            ]);
            table.add_row(vec!["Threshold".to_string(), format!("{:.6}", profile.threshold)]);
            table.add_row(vec![
                "High-balance accounts".to_string(),
                profile.high_balance_accounts.to_string(),
            ]);
            table.add_row(vec![
                "High-balance share".to_string(),
                format!("{:.4}", profile.high_balance_fraction),
            ]);
            table.add_row(vec![
                "High-balance affinity".to_string(),
                format!("{:.4}", profile.affinity),
            ]);
            println!("{table}");
        }
    }

    Ok(())
}

fn handle_regression(ctx: &AppContext, args: RegressionArgs) -> Result<()> {
    if !(args.test_fraction > 0.0 && args.test_fraction < 1.0) {
        return Err(eyre!(
            "--test-fraction must be between 0 and 1, got {}",
            args.test_fraction
        ));
    }

    let (graph, _) = load_graph(ctx)?;

    let pairs = degree_balance_pairs(&graph);
    let options = RegressionOptions {
        test_fraction: args.test_fraction,
    };
    let mut rng = StdRng::seed_from_u64(args.seed);
    let report =
        fit_degree_model(&pairs, &options, &mut rng).wrap_err("failed to fit degree model")?;

    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["Metric", "Value"]);
            table.add_row(vec!["Slope".to_string(), format!("{:.6}", report.fit.slope)]);
            table.add_row(vec![
                "Intercept".to_string(),
                format!("{:.6}", report.fit.intercept),
            ]);
            table.add_row(vec!["Train samples".to_string(), report.train_samples.to_string()]);
            table.add_row(vec!["Test samples".to_string(), report.test_samples.to_string()]);
            table.add_row(vec!["R²".to_string(), format!("{:.4}", report.r_squared)]);
            table.add_row(vec!["RMSE".to_string(), format!("{:.4}", report.rmse)]);
            println!("{table}");
        }
    }

    Ok(())
}

fn handle_export(ctx: &AppContext, args: ExportArgs) -> Result<()> {
    let (graph, _) = load_graph(ctx)?;
    let export = GraphExport::from_graph(&graph);

    match args.out {
        Some(path) => {
            ensure_parent_dir(&path)?;
            let json =
                serde_json::to_string(&export).wrap_err("failed to serialize graph export")?;
            std::fs::write(&path, json)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(
                nodes = export.nodes.len(),
                edges = export.edges.len(),
                path = %path.display(),
                "graph exported"
            );
        }
        None => print_json(&export)?,
    }

    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
