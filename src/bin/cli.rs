use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use multichain_balances::format::{format_quantity, format_usd};
use multichain_balances::{
    BalanceClient, ChainRegistry, ClientConfig, MultiChainResult, NativeBalanceResult,
    TokenBalanceEntry,
};

#[derive(Parser, Debug)]
#[command(name = "multichain-balances")]
#[command(about = "Query native and ERC-20 balances across EVM chains", long_about = None)]
struct Args {
    /// The address to query (0x + 40 hex digits)
    #[arg(short, long)]
    address: String,

    /// Chain to query (ethereum, polygon, base or a chain id); all chains when omitted
    #[arg(short, long)]
    chain: Option<String>,

    /// Look up a single token by symbol instead of listing every token
    #[arg(short, long, requires = "chain")]
    token: Option<String>,

    /// Print the structured result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = ClientConfig::from_env()?;
    let client = BalanceClient::new(config)?;
    let registry = ChainRegistry::load()?;

    if let Some(symbol) = &args.token {
        let chain_key = args.chain.as_deref().ok_or_else(|| anyhow!("--token needs --chain"))?;
        let chain = registry.require_chain(chain_key)?;
        let entry = client.get_token_balance(&args.address, chain, symbol).await;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&entry)?);
        } else {
            print_token_lookup(&entry);
        }
        if let Some(err) = entry.error {
            bail!(err);
        }
        return Ok(());
    }

    let chains = match &args.chain {
        Some(key) => vec![registry.require_chain(key)?.clone()],
        None => registry.chains().to_vec(),
    };

    println!("Querying balances for address: {}\n", args.address);
    let result = client
        .get_multi_chain_balances(&args.address, &chains)
        .await
        .context("balance query failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if result.native_balances.is_empty() && !result.warnings.is_empty() {
        bail!("no chain returned balances");
    }
    Ok(())
}

fn print_result(result: &MultiChainResult) {
    println!("Native balances");
    println!("{}", "=".repeat(60));
    for native in &result.native_balances {
        print_native(native);
    }
    println!("{}", "=".repeat(60));

    println!("\nTokens ({})", result.tokens.len());
    if result.tokens.is_empty() {
        println!("No tokens found for this address.");
    } else {
        println!(
            "{:<10} {:<28} {:<10} {:>25} {:>14}",
            "Chain", "Token Name", "Symbol", "Balance", "Value (USD)"
        );
        println!("{}", "-".repeat(91));
        for token in &result.tokens {
            let name: String = token.token_name.chars().take(28).collect();
            println!(
                "{:<10} {:<28} {:<10} {:>25} {:>14}",
                token.chain_name,
                name,
                token.token_symbol,
                format_quantity(&token.balance),
                format_usd(token.usd_value())
            );
        }
        println!("{}", "-".repeat(91));
        println!("{:<75} {:>15}", "TOTAL USD VALUE", format_usd(result.total_usd_value()));
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings");
        for warning in &result.warnings {
            println!("  {} ({}): {}", warning.chain_name, warning.chain_id, warning.message);
        }
    }
}

fn print_native(native: &NativeBalanceResult) {
    match &native.error {
        Some(err) => println!(
            "{:<10} {:6} | ERROR: {}",
            native.chain_name, native.token_symbol, err
        ),
        None => println!(
            "{:<10} {:6} | {:>24} (raw: {})",
            native.chain_name,
            native.token_symbol,
            format_quantity(&native.balance),
            native.balance_raw
        ),
    }
}

fn print_token_lookup(entry: &TokenBalanceEntry) {
    match &entry.error {
        Some(err) => println!(
            "{} on {}: ERROR: {}",
            entry.token_symbol, entry.chain_name, err
        ),
        None => {
            println!("Chain: {} ({})", entry.chain_name, entry.chain_id);
            println!("Token: {} ({})", entry.token_symbol, entry.token_name);
            println!("Contract: {}", entry.contract_address);
            println!("Balance: {} {}", format_quantity(&entry.balance), entry.token_symbol);
            println!("Raw Balance: {} ({} decimals)", entry.amount_raw, entry.decimals);
            println!("USD Value: {}", format_usd(entry.usd_value()));
        }
    }
}
