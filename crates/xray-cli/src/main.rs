use alloy::primitives::{Address, B256};
use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use xray_abi::{parse_index, ContractReader, TypeRegistry};
use xray_analysis::analyzer::DEFAULT_RECEIPT_CONCURRENCY;
use xray_analysis::economics::{BASE_TX_GAS, DEFAULT_RATING_DIVISOR};
use xray_analysis::{records, AnalyzerConfig, BlockAnalyzer, BlockSummary, RatingPolicy};
use xray_data::units::{format_ether, format_gwei, format_units, DISPLAY_PRECISION, WEI_DECIMALS};
use xray_data::{LogFilter, NodeClient, NodeConfig, DEFAULT_TIMEOUT, MAINNET_CHAIN_ID};
use xray_server::AppState;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

const DEFAULT_TIMEOUT_SECS: NonZeroU64 = match NonZeroU64::new(DEFAULT_TIMEOUT.as_secs()) {
    Some(secs) => secs,
    None => panic!("default timeout is at least one second"),
};

#[derive(Debug, Clone)]
struct AppContext {
    rpc_url: String,
    timeout: Duration,
}

impl AppContext {
    fn node(&self) -> Result<NodeClient> {
        let config = NodeConfig {
            rpc_url: self.rpc_url.clone(),
            timeout: self.timeout,
        };
        NodeClient::new(&config).wrap_err("failed to create node client")
    }
}

#[derive(Parser, Debug)]
#[command(name = "xray")]
#[command(about = "Ethereum block economics and contract field inspector")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// JSON-RPC endpoint; falls back to XRAY_RPC_URL, then a local node.
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Per-request deadline for node calls, in seconds.
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: NonZeroU64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Annotate every transaction of a block with cost and rating.
    Block(BlockArgs),
    /// Read a view field from a contract.
    Call(CallArgs),
    /// Query event logs.
    Logs(LogsArgs),
    /// Summarize the node's pending transaction pool.
    Pool(PoolArgs),
    /// Show nonce and balance of an address.
    Account(AccountArgs),
    /// Show node connectivity, head block and gas price.
    Status,
}

#[derive(Args, Debug, Clone)]
struct AnalyzerArgs {
    /// Chain id used for sender recovery.
    #[arg(long, default_value_t = MAINNET_CHAIN_ID)]
    chain_id: u64,

    /// Gas units of one rating step before scaling.
    #[arg(long, default_value_t = BASE_TX_GAS)]
    base_gas: NonZeroU64,

    #[arg(long, default_value_t = DEFAULT_RATING_DIVISOR)]
    rating_divisor: NonZeroU64,

    /// Receipts fetched in parallel per block.
    #[arg(long, default_value_t = DEFAULT_RECEIPT_CONCURRENCY)]
    receipt_concurrency: usize,
}

impl AnalyzerArgs {
    fn config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            chain_id: self.chain_id,
            rating: RatingPolicy::new(self.base_gas, self.rating_divisor),
            receipt_concurrency: self.receipt_concurrency,
        }
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, short = 'p', default_value_t = 8080)]
    port: u16,

    #[command(flatten)]
    analyzer: AnalyzerArgs,
}

#[derive(Args, Debug)]
struct BlockArgs {
    #[arg(long)]
    block: u64,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,

    #[command(flatten)]
    analyzer: AnalyzerArgs,
}

#[derive(Args, Debug)]
struct CallArgs {
    #[arg(long)]
    contract: Address,

    /// Getter name, e.g. `symbol` or `allPairs`.
    #[arg(long)]
    field: String,

    /// Expected return type, e.g. `uint256`, `string`, `address[]`.
    #[arg(long = "type", default_value = "uint256")]
    type_name: String,

    /// Reads `field(uint256)` at this index instead of `field()`.
    #[arg(long)]
    index: Option<String>,

    /// Historical block height; latest when omitted.
    #[arg(long)]
    height: Option<u64>,
}

#[derive(Args, Debug)]
struct LogsArgs {
    #[arg(long)]
    from_block: u64,

    #[arg(long)]
    to_block: u64,

    /// Event signature hash to match against topic0 (repeatable).
    #[arg(long)]
    topic: Vec<B256>,

    /// Emitting contract (repeatable).
    #[arg(long)]
    address: Vec<Address>,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,
}

#[derive(Args, Debug)]
struct PoolArgs {
    /// Senders listed in the table.
    #[arg(long, default_value_t = 20)]
    top: usize,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,
}

#[derive(Args, Debug)]
struct AccountArgs {
    #[arg(long)]
    address: Address,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        rpc_url: cli
            .rpc_url
            .or_else(|| std::env::var("XRAY_RPC_URL").ok())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
        timeout: Duration::from_secs(cli.timeout_secs.get()),
    };

    match cli.command {
        Commands::Serve(args) => handle_serve(&ctx, args).await,
        Commands::Block(args) => handle_block(&ctx, args).await,
        Commands::Call(args) => handle_call(&ctx, args).await,
        Commands::Logs(args) => handle_logs(&ctx, args).await,
        Commands::Pool(args) => handle_pool(&ctx, args).await,
        Commands::Account(args) => handle_account(&ctx, args).await,
        Commands::Status => handle_status(&ctx).await,
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

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn check_output(output: &str) -> Result<()> {
    match output {
        "table" | "json" => Ok(()),
        other => Err(eyre!("unknown output format '{other}'; use 'table' or 'json'")),
    }
}

async fn handle_serve(ctx: &AppContext, args: ServeArgs) -> Result<()> {
    let node = ctx.node()?;
    let state = AppState {
        analyzer: BlockAnalyzer::new(node.clone(), args.analyzer.config()),
        reader: ContractReader::new(node, Arc::new(TypeRegistry::standard())),
    };

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .wrap_err_with(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    info!(rpc_url = %ctx.rpc_url, "starting server");
    xray_server::serve(listener, Arc::new(state), xray_server::shutdown_signal())
        .await
        .wrap_err("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn handle_block(ctx: &AppContext, args: BlockArgs) -> Result<()> {
    check_output(&args.output)?;
    let analyzer = BlockAnalyzer::new(ctx.node()?, args.analyzer.config());

    let pb = spinner("fetching block and receipts")?;
    let transactions = analyzer
        .analyze_block(args.block)
        .await
        .wrap_err_with(|| format!("failed to analyze block {}", args.block));
    pb.finish_and_clear();
    let transactions = transactions?;

    if args.output == "json" {
        let json = serde_json::to_string_pretty(&records(&transactions))
            .wrap_err("failed to serialize transactions")?;
        println!("{json}");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "#",
        "Tx Hash",
        "From",
        "To",
        "Gas Used",
        "Gas Price (gwei)",
        "Cost (ETH)",
        "Value (ETH)",
        "Rating",
        "Status",
    ]);

    for annotated in &transactions {
        let tx = &annotated.tx;
        table.add_row(vec![
            annotated.index.to_string(),
            truncate_hash(&format!("{:#x}", tx.hash)),
            tx.from
                .map_or_else(|| "-".to_string(), |a| truncate_hash(&a.to_checksum(None))),
            tx.to
                .map_or_else(|| "create".to_string(), |a| truncate_hash(&a.to_checksum(None))),
            tx.gas_used.to_string(),
            format_gwei(tx.gas_price),
            format_units(annotated.gas_cost, WEI_DECIMALS, DISPLAY_PRECISION),
            format_ether(tx.value),
            annotated.rating.to_string(),
            if tx.success { "ok" } else { "failed" }.to_string(),
        ]);
    }

    println!("{table}\n");

    let summary = BlockSummary::from_transactions(&transactions);
    let mut totals = Table::new();
    totals.load_preset(UTF8_BORDERS_ONLY);
    totals.set_header(vec!["Metric", "Value"]);
    totals.add_row(vec!["Block".to_string(), args.block.to_string()]);
    totals.add_row(vec!["Transactions".to_string(), summary.tx_count.to_string()]);
    totals.add_row(vec!["Failed".to_string(), summary.failed_count.to_string()]);
    totals.add_row(vec!["Gas used".to_string(), summary.total_gas_used.to_string()]);
    totals.add_row(vec![
        "Total cost (ETH)".to_string(),
        format_units(summary.total_gas_cost, WEI_DECIMALS, DISPLAY_PRECISION),
    ]);
    totals.add_row(vec!["Max rating".to_string(), summary.max_rating.to_string()]);
    println!("{totals}");

    info!(
        block_number = args.block,
        tx_count = summary.tx_count,
        "block command completed"
    );
    Ok(())
}

async fn handle_call(ctx: &AppContext, args: CallArgs) -> Result<()> {
    let reader = ContractReader::new(ctx.node()?, Arc::new(TypeRegistry::standard()));

    let value = match args.index.as_deref() {
        Some(index) => {
            let index = parse_index(index).wrap_err("invalid --index")?;
            reader
                .read_indexed(args.contract, &args.field, index, &args.type_name, args.height)
                .await
        }
        None => {
            reader
                .read_field(args.contract, &args.field, &args.type_name, args.height)
                .await
        }
    }
    .wrap_err_with(|| format!("failed to read {} from {}", args.field, args.contract))?;

    println!("{value}");
    Ok(())
}

async fn handle_logs(ctx: &AppContext, args: LogsArgs) -> Result<()> {
    check_output(&args.output)?;
    if args.from_block > args.to_block {
        return Err(eyre!(
            "invalid range: from-block {} is greater than to-block {}",
            args.from_block,
            args.to_block
        ));
    }

    let filter = LogFilter::range(args.from_block, args.to_block)
        .with_topics(args.topic)
        .with_addresses(args.address);

    let pb = spinner("querying logs")?;
    let logs = ctx.node()?.get_logs(&filter).await.wrap_err("failed to query logs");
    pb.finish_and_clear();
    let logs = logs?;

    if args.output == "json" {
        let json = serde_json::to_string_pretty(&logs).wrap_err("failed to serialize logs")?;
        println!("{json}");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Block", "Tx Hash", "Contract", "Topic0", "Data Bytes"]);
    for log in &logs {
        table.add_row(vec![
            log.block_number.clone().unwrap_or_default(),
            truncate_hash(log.transaction_hash.as_deref().unwrap_or("-")),
            truncate_hash(&log.address),
            truncate_hash(log.topics.first().map_or("-", String::as_str)),
            (log.data.trim_start_matches("0x").len() / 2).to_string(),
        ]);
    }
    println!("{table}");

    info!(log_count = logs.len(), "logs command completed");
    Ok(())
}

async fn handle_pool(ctx: &AppContext, args: PoolArgs) -> Result<()> {
    check_output(&args.output)?;
    let pending = ctx
        .node()?
        .pending_pool()
        .await
        .wrap_err("failed to read txpool_content")?;

    if args.output == "json" {
        let json = serde_json::to_string_pretty(&pending).wrap_err("failed to serialize pool")?;
        println!("{json}");
        return Ok(());
    }

    let mut senders: Vec<(&str, usize)> = pending
        .as_object()
        .map(|by_sender| {
            by_sender
                .iter()
                .map(|(sender, txs)| (sender.as_str(), txs.as_object().map_or(0, |t| t.len())))
                .collect()
        })
        .unwrap_or_default();
    senders.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let total: usize = senders.iter().map(|(_, count)| count).sum();

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Sender", "Pending Txs"]);
    for (sender, count) in senders.iter().take(args.top) {
        table.add_row(vec![sender.to_string(), count.to_string()]);
    }
    println!("{table}\n");
    println!("Senders: {}, pending transactions: {total}", senders.len());
    Ok(())
}

async fn handle_account(ctx: &AppContext, args: AccountArgs) -> Result<()> {
    let node = ctx.node()?;
    let nonce = node.nonce(args.address).await.wrap_err("failed to read nonce")?;
    let pending_nonce = node
        .pending_nonce(args.address)
        .await
        .wrap_err("failed to read pending nonce")?;
    let balance = node
        .balance(args.address)
        .await
        .wrap_err("failed to read balance")?;

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Address".to_string(), args.address.to_checksum(None)]);
    table.add_row(vec!["Nonce".to_string(), nonce.to_string()]);
    table.add_row(vec!["Pending nonce".to_string(), pending_nonce.to_string()]);
    table.add_row(vec!["Balance (ETH)".to_string(), format_ether(balance)]);
    println!("{table}");
    Ok(())
}

async fn handle_status(ctx: &AppContext) -> Result<()> {
    let node = ctx.node()?;
    let head = node
        .block_number()
        .await
        .wrap_err_with(|| format!("failed to reach node at {}", ctx.rpc_url))?;
    let gas_price = node.gas_price().await.wrap_err("failed to read gas price")?;

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["RPC URL".to_string(), ctx.rpc_url.clone()]);
    table.add_row(vec!["Head block".to_string(), head.to_string()]);
    table.add_row(vec!["Gas price (gwei)".to_string(), format_gwei(gas_price)]);
    println!("{table}");
    Ok(())
}

/// Truncate a hex hash/address for compact table display.
fn truncate_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() > 14 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}…{tail}")
    } else {
        hash.to_string()
    }
}
