//! Lucky Suits command line
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│  Wallet  │───▶│  Dealer  │───▶│  Session │
//! │  (YAML)  │    │(JSON-RPC)│    │ (hashes) │    │ (credits)│
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;

use lucky_suits::config::AppConfig;
use lucky_suits::dealer::{CardDealer, RoundSeed};
use lucky_suits::entropy::BlockEntropySource;
use lucky_suits::funding::{FundTransferGateway, TransferDirection};
use lucky_suits::game::{Bet, GameSession};
use lucky_suits::ledger::LedgerReconciler;
use lucky_suits::wallet::{RpcWalletClient, WalletService};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(name = "lucky_suits", version = VERSION, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, default_value = "config/dev.yaml")]
    config: String,

    /// Override `rpc.user`
    #[arg(long, env = "LUCKY_SUITS_RPC_USER")]
    rpc_user: Option<String>,

    /// Override `rpc.password`
    #[arg(long, env = "LUCKY_SUITS_RPC_PASSWORD", hide_env_values = true)]
    rpc_password: Option<String>,

    /// Override `rpc.host`
    #[arg(long, env = "LUCKY_SUITS_RPC_HOST")]
    rpc_host: Option<String>,

    /// Override `rpc.port`
    #[arg(long, env = "LUCKY_SUITS_RPC_PORT")]
    rpc_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

/// Player and pool addresses, falling back to the `game` config section
#[derive(clap::Args, Debug)]
struct Addresses {
    #[arg(long)]
    player: Option<String>,

    #[arg(long)]
    pool: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deal one card from the chain
    Deal {
        /// 64 hex chars; replays the draw against the same chain tip
        #[arg(long)]
        seed: Option<RoundSeed>,
    },
    /// Balances and unspent outputs of the player and pool wallets
    Balances {
        #[command(flatten)]
        addresses: Addresses,

        /// Keep dust outputs and skip the watch-only import
        #[arg(long)]
        raw: bool,
    },
    /// Wallet addresses holding more than the minimum player balance
    Addresses {
        #[arg(long)]
        min_balance: Option<Decimal>,
    },
    /// Total ever received by an address
    Received { address: String },
    /// Pay `amount` from the player to the pool
    BuyIn {
        amount: Decimal,

        #[command(flatten)]
        addresses: Addresses,
    },
    /// Pay `amount` from the pool to the player
    CashOut {
        amount: Decimal,

        #[command(flatten)]
        addresses: Addresses,
    },
    /// Buy in, play rounds with a fixed bet, then cash out what is left
    Play {
        #[arg(long)]
        buy_in: Decimal,

        /// A suit (hearts, diamonds, clubs, spades), red or black
        #[arg(long)]
        bet: Bet,

        #[arg(long, default_value_t = Decimal::ONE)]
        wager: Decimal,

        #[arg(long, default_value_t = 1)]
        rounds: u32,

        /// Leave the remaining credits unpaid
        #[arg(long)]
        no_cash_out: bool,

        #[command(flatten)]
        addresses: Addresses,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    if let Some(user) = &cli.rpc_user {
        config.rpc.user = user.clone();
    }
    if let Some(password) = &cli.rpc_password {
        config.rpc.password = password.clone();
    }
    if let Some(host) = &cli.rpc_host {
        config.rpc.host = host.clone();
    }
    if let Some(port) = cli.rpc_port {
        config.rpc.port = port;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

struct App {
    config: AppConfig,
    wallet: Arc<dyn WalletService>,
    reconciler: Arc<LedgerReconciler>,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        let client = RpcWalletClient::new(&config.rpc).context("Failed to build wallet client")?;
        tracing::info!(url = client.url(), "Wallet client ready");
        let wallet: Arc<dyn WalletService> = Arc::new(client);
        let reconciler = Arc::new(LedgerReconciler::new(wallet.clone()));
        Ok(Self {
            config,
            wallet,
            reconciler,
        })
    }

    fn dealer(&self) -> Arc<CardDealer> {
        let entropy = Arc::new(BlockEntropySource::from_config(
            self.wallet.clone(),
            &self.config.entropy,
        ));
        Arc::new(CardDealer::new(entropy, self.config.entropy.max_draw_attempts))
    }

    fn gateway(&self) -> Arc<FundTransferGateway> {
        Arc::new(FundTransferGateway::new(self.wallet.clone()))
    }

    /// Explicit flag, then config, then the richest spendable wallet address.
    async fn player_address(&self, flag: &Option<String>) -> Result<String> {
        if let Some(address) = flag.as_ref().or(self.config.game.player_address.as_ref()) {
            return Ok(address.clone());
        }
        let candidates = self
            .reconciler
            .player_addresses(self.config.game.min_player_balance)
            .await;
        match candidates.into_iter().max_by(|a, b| a.1.cmp(&b.1)) {
            Some((address, balance)) => {
                tracing::info!(%address, %balance, "Using discovered player address");
                Ok(address)
            }
            None => bail!("No player address configured and none discovered in the wallet"),
        }
    }

    fn pool_address(&self, flag: &Option<String>) -> Result<String> {
        flag.as_ref()
            .or(self.config.game.pool_address.as_ref())
            .cloned()
            .context("No pool address: pass --pool or set game.pool_address")
    }

    async fn route(&self, addresses: &Addresses) -> Result<(String, String)> {
        let pool = self.pool_address(&addresses.pool)?;
        let player = self.player_address(&addresses.player).await?;
        Ok((player, pool))
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Deal { seed } => {
                let dealer = self.dealer();
                let deal = match seed {
                    Some(seed) => dealer.deal_with_seed(seed).await?,
                    None => dealer.deal_with_seed(RoundSeed::random()).await?,
                };
                print_json(&deal)
            }
            Command::Balances { addresses, raw } => {
                let (player, pool) = self.route(&addresses).await?;
                let report = if raw {
                    self.reconciler.balances_and_utxos(&player, &pool).await
                } else {
                    self.reconciler
                        .filtered_balances_and_utxos(&player, &pool)
                        .await
                };
                print_json(&report)
            }
            Command::Addresses { min_balance } => {
                let min_balance = min_balance.unwrap_or(self.config.game.min_player_balance);
                let found = self.reconciler.player_addresses(min_balance).await;
                let rows: Vec<_> = found
                    .into_iter()
                    .map(|(address, balance)| serde_json::json!({ "address": address, "balance": balance }))
                    .collect();
                print_json(&rows)
            }
            Command::Received { address } => {
                match self.reconciler.received_by_address(&address).await {
                    Some(total) => print_json(&serde_json::json!({ "address": address, "received": total })),
                    None => bail!("Wallet could not report received total for {}", address),
                }
            }
            Command::BuyIn { amount, addresses } => {
                let (player, pool) = self.route(&addresses).await?;
                let receipt = self
                    .gateway()
                    .transfer(TransferDirection::BuyIn, &player, &pool, amount)
                    .await?;
                print_json(&receipt)
            }
            Command::CashOut { amount, addresses } => {
                let (player, pool) = self.route(&addresses).await?;
                let receipt = self
                    .gateway()
                    .transfer(TransferDirection::CashOut, &player, &pool, amount)
                    .await?;
                print_json(&receipt)
            }
            Command::Play {
                buy_in,
                bet,
                wager,
                rounds,
                no_cash_out,
                addresses,
            } => {
                let (player, pool) = self.route(&addresses).await?;
                let mut session = GameSession::new(
                    &player,
                    &pool,
                    self.dealer(),
                    self.reconciler.clone(),
                    self.gateway(),
                );
                session.refresh_balances().await;
                print_json(&session.buy_in(buy_in).await?)?;

                for round in 1..=rounds {
                    match session.play_round(bet, wager).await {
                        Ok(result) => print_json(&result)?,
                        Err(e) => {
                            tracing::warn!(round, error = %e, "Stopping play");
                            break;
                        }
                    }
                }

                if no_cash_out || session.credits().is_zero() {
                    println!("Credits left: {}", session.credits());
                    return Ok(());
                }
                print_json(&session.cash_out().await?)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _log_guard = lucky_suits::logging::init_logging(&config);

    tracing::info!(version = VERSION, config = %cli.config, "Starting Lucky Suits");

    let app = App::new(config)?;
    app.run(cli.command).await
}
