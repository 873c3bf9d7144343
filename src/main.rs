//! `blue-carbon`: command-line front end for the Blue Carbon MRV contracts.
//!
//! Results are printed to stdout as pretty JSON; logs go to stderr.

use std::path::PathBuf;

use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use blue_carbon_mrv::blockchain::format_address;
use blue_carbon_mrv::credits::{calculate_credits, format_token_amount, EcosystemType};
use blue_carbon_mrv::lifecycle::{bootstrap, signals};
use blue_carbon_mrv::AppContext;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "blue-carbon")]
#[command(about = "Blue Carbon MRV: plantations, verification and carbon credits", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the wallet and show the account
    Connect,
    /// Show carbon credit and native balances
    Balance {
        /// Account to query (defaults to the connected wallet)
        address: Option<Address>,
    },
    /// Show the total carbon credit supply
    Supply,
    /// Transfer carbon credits
    Transfer {
        to: Address,
        /// Decimal amount, e.g. 12.5
        amount: String,
    },
    /// Register a new plantation
    Register {
        #[arg(long)]
        location: String,
        /// Area in square metres
        #[arg(long)]
        area: u64,
        /// mangroves, seagrass or saltmarsh
        #[arg(long)]
        ecosystem: String,
        #[arg(long, default_value = "")]
        ipfs_hash: String,
    },
    /// Show one plantation
    Plantation { id: U256 },
    /// List registered plantations
    Plantations {
        /// Only plantations awaiting verification
        #[arg(long)]
        unverified: bool,
        /// Serve from the incremental plantation index
        #[arg(long)]
        indexed: bool,
    },
    /// List plantation IDs registered by an account
    Mine {
        /// Implementer (defaults to the connected wallet)
        address: Option<Address>,
    },
    /// Verify a plantation and mint its credits (admin only)
    Verify { id: U256 },
    /// Recent credit transfers of an account
    History {
        /// Account (defaults to the connected wallet)
        address: Option<Address>,
    },
    /// Follow contract events until interrupted
    Watch {
        /// Replay events after this block instead of starting at the head
        #[arg(long)]
        from_block: Option<u64>,
    },
    /// Check RPC reachability and that the endpoint serves the configured chain
    Health,
    /// Ask the wallet to switch networks
    SwitchNetwork {
        /// Target chain ID (defaults to the configured network)
        chain_id: Option<u64>,
    },
    /// Monitoring reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Estimate the credits a plantation would earn
    Estimate {
        #[arg(long)]
        area: u64,
        #[arg(long)]
        ecosystem: String,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Submit a monitoring report
    Submit {
        #[arg(long)]
        plantation_id: U256,
        /// Survival rate in percent
        #[arg(long)]
        survival_rate: u64,
        #[arg(long)]
        biomass: u64,
        #[arg(long)]
        data_source: String,
        #[arg(long, default_value = "")]
        ipfs_hash: String,
    },
    /// Verify a monitoring report (admin only)
    Verify { id: U256 },
    /// Show a monitoring report
    Get { id: U256 },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    // Pure computation needs neither config nor wallet.
    if let Commands::Estimate { area, ecosystem } = &cli.command {
        return estimate(*area, ecosystem);
    }

    let ctx = bootstrap(cli.config.as_deref())?;
    let result = run(&ctx, cli.command).await;
    ctx.shutdown.trigger();
    result
}

async fn run(ctx: &AppContext, command: Commands) -> CliResult<()> {
    match command {
        Commands::Connect => {
            let account = ctx.session.connect().await?;
            let native = ctx.session.get_balance(account).await;
            print_json(&json!({
                "account": account,
                "short": format_address(&account),
                "chainId": ctx.config.network.chain_id,
                "explorer": ctx.config.network.address_url(&account),
                "nativeBalance": native,
                "isAdmin": ctx.is_admin(&account),
            }))
        }

        Commands::Balance { address } => {
            let account = resolve_account(ctx, address).await?;
            let (credits, native) = tokio::join!(
                ctx.contracts.get_carbon_credit_balance(account),
                ctx.session.get_balance(account)
            );
            print_json(&json!({
                "account": account,
                "carbonCredits": credits,
                "carbonCreditsFormatted": format_token_amount(&credits),
                "native": native,
                "nativeSymbol": ctx.config.network.currency_symbol,
            }))
        }

        Commands::Supply => {
            let supply = ctx.contracts.get_total_supply().await;
            print_json(&json!({
                "totalSupply": supply,
                "formatted": format_token_amount(&supply),
            }))
        }

        Commands::Transfer { to, amount } => {
            ctx.session.connect().await?;
            if !ctx.contracts.transfer_carbon_credits(to, &amount).await {
                return Err(format!("Failed to transfer {} credits to {}", amount, to).into());
            }
            print_json(&json!({ "transferred": amount, "to": to }))
        }

        Commands::Register {
            location,
            area,
            ecosystem,
            ipfs_hash,
        } => {
            ctx.session.connect().await?;
            let id = ctx
                .contracts
                .register_plantation(&location, area, &ecosystem, &ipfs_hash)
                .await
                .ok_or("Plantation registration failed")?;
            print_json(&json!({
                "plantationId": id,
                "estimatedCredits": calculate_credits(area, &ecosystem),
            }))
        }

        Commands::Plantation { id } => {
            let plantation = ctx
                .contracts
                .get_plantation(id)
                .await
                .ok_or_else(|| format!("Plantation {} not found", id))?;
            let credits = ctx.contracts.calculate_carbon_credits_for_plantation(&plantation);
            print_json(&json!({ "plantation": plantation, "estimatedCredits": credits }))
        }

        Commands::Plantations { unverified, indexed } => {
            let plantations = if indexed {
                ctx.index.refresh(ctx.contracts.gateway().as_ref()).await?;
                if unverified {
                    ctx.index.unverified()
                } else {
                    ctx.index.all()
                }
            } else if unverified {
                ctx.contracts.get_unverified_plantations().await
            } else {
                ctx.contracts.get_all_plantations().await
            };
            print_json(&plantations)
        }

        Commands::Mine { address } => {
            let account = resolve_account(ctx, address).await?;
            let ids = ctx.contracts.get_user_plantations(account).await;
            print_json(&json!({ "implementer": account, "plantations": ids }))
        }

        Commands::Verify { id } => {
            require_admin(ctx).await?;
            let credits = ctx
                .contracts
                .verify_plantation(id)
                .await
                .ok_or_else(|| format!("Verification of plantation {} failed", id))?;
            print_json(&json!({ "plantationId": id.to_string(), "creditsMinted": credits }))
        }

        Commands::History { address } => {
            let account = resolve_account(ctx, address).await?;
            let records = ctx
                .contracts
                .get_transaction_history(account, &ctx.config.history)
                .await;
            print_json(&records)
        }

        Commands::Watch { from_block } => watch(ctx, from_block).await,

        Commands::Health => health(ctx).await,

        Commands::SwitchNetwork { chain_id } => {
            let target = chain_id.unwrap_or(ctx.config.network.chain_id);
            ctx.session.switch_network(target).await?;
            print_json(&json!({ "chainId": target }))
        }

        Commands::Report { command } => run_report(ctx, command).await,

        Commands::Estimate { area, ecosystem } => estimate(area, &ecosystem),
    }
}

async fn run_report(ctx: &AppContext, command: ReportCommands) -> CliResult<()> {
    match command {
        ReportCommands::Submit {
            plantation_id,
            survival_rate,
            biomass,
            data_source,
            ipfs_hash,
        } => {
            ctx.session.connect().await?;
            let submitted = ctx
                .contracts
                .submit_monitoring_report(plantation_id, survival_rate, biomass, &data_source, &ipfs_hash)
                .await;
            if !submitted {
                return Err("Monitoring report submission failed".into());
            }
            print_json(&json!({ "submitted": true, "plantationId": plantation_id.to_string() }))
        }
        ReportCommands::Verify { id } => {
            require_admin(ctx).await?;
            if !ctx.contracts.verify_monitoring_report(id).await {
                return Err(format!("Verification of report {} failed", id).into());
            }
            print_json(&json!({ "verified": true, "reportId": id.to_string() }))
        }
        ReportCommands::Get { id } => {
            let report = ctx
                .contracts
                .get_monitoring_report(id)
                .await
                .ok_or_else(|| format!("Monitoring report {} not found", id))?;
            print_json(&report)
        }
    }
}

/// Stream events as JSON lines until Ctrl-C.
async fn watch(ctx: &AppContext, from_block: Option<u64>) -> CliResult<()> {
    let (tx, mut rx) = mpsc::channel(64);
    let mut monitor = ctx.feed_monitor().with_sink(tx);
    if let Some(block) = from_block {
        monitor = monitor.starting_after(block);
    }

    let monitor_task = tokio::spawn(monitor.run(ctx.shutdown.subscribe()));
    signals::spawn_signal_handler(ctx.shutdown.clone());

    while let Some(event) = rx.recv().await {
        let summary = event.describe(&ctx.config.network);
        println!("{}", serde_json::to_string(&json!({ "event": event, "summary": summary }))?);
    }

    monitor_task.await?;
    Ok(())
}

async fn health(ctx: &AppContext) -> CliResult<()> {
    let client = ctx.session.read_client()?;
    let healthy = client.is_healthy().await;
    let chain = if healthy { client.verify_chain_id().await } else { Ok(()) };

    print_json(&json!({
        "rpcUrl": client.rpc_url(),
        "providers": client.provider_count(),
        "healthy": healthy,
        "chainId": client.chain_id(),
        "chainError": chain.as_ref().err().map(|e| e.to_string()),
    }))?;

    if !healthy {
        return Err("RPC endpoint unreachable".into());
    }
    chain?;
    Ok(())
}

fn estimate(area: u64, ecosystem: &str) -> CliResult<()> {
    print_json(&json!({
        "area": area,
        "ecosystemType": EcosystemType::parse(ecosystem).to_string(),
        "credits": calculate_credits(area, ecosystem),
    }))
}

async fn resolve_account(ctx: &AppContext, explicit: Option<Address>) -> CliResult<Address> {
    match explicit {
        Some(address) => Ok(address),
        None => Ok(ctx.session.connect().await?),
    }
}

async fn require_admin(ctx: &AppContext) -> CliResult<Address> {
    let account = ctx.session.connect().await?;
    if !ctx.is_admin(&account) {
        return Err(format!("{} is not the contract owner or admin", format_address(&account)).into());
    }
    Ok(account)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
