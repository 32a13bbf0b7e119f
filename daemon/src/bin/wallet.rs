//! denaro wallet: key file management and payments through a node.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use denaro_node::{init_logging, LogFormat};
use denaro_wallet_core::{NodeClient, Wallet};

#[derive(Parser)]
#[command(name = "denaro-wallet", about = "denaro command-line wallet")]
struct Cli {
    /// Wallet file holding the private keys.
    #[arg(long, default_value = "./wallet.json", env = "DENARO_WALLET_FILE")]
    wallet: PathBuf,

    /// Node RPC base URL.
    #[arg(long, default_value = "http://127.0.0.1:3006", env = "DENARO_NODE_URL")]
    node: String,

    #[arg(long, default_value = "warn", env = "DENARO_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a fresh key to the wallet and print its address.
    #[command(name = "createwallet")]
    CreateWallet,

    /// Show the balance of every address, with the pending delta.
    Balance,

    /// Pay an address.
    Send {
        /// Recipient address.
        #[arg(long = "to", short = 't')]
        to: String,

        /// Amount in denari, e.g. "12.5".
        #[arg(long = "amount", short = 'd')]
        amount: String,

        /// Optional message stored in the transaction.
        #[arg(long, short = 'm')]
        message: Option<String>,

        /// Where change goes. Defaults to the first wallet address.
        #[arg(long)]
        change_to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LogFormat::Human, &cli.log_level)?;

    let mut wallet = Wallet::open(&cli.wallet, NodeClient::new(cli.node)?)?;
    match cli.command {
        Command::CreateWallet => {
            let address = wallet.create_address()?;
            println!("{address}");
        }
        Command::Balance => {
            for entry in wallet.balances().await? {
                let delta = entry.pending_balance.raw() as i128 - entry.balance.raw() as i128;
                if delta == 0 {
                    println!("{}: {}", entry.address, entry.balance);
                } else {
                    let sign = if delta > 0 { '+' } else { '-' };
                    let delta = denaro_types::Amount::new(delta.unsigned_abs() as u64);
                    println!("{}: {} ({sign}{delta} pending)", entry.address, entry.balance);
                }
            }
        }
        Command::Send {
            to,
            amount,
            message,
            change_to,
        } => {
            let sent = wallet
                .send(&to, &amount, message.as_deref(), change_to.as_deref())
                .await?;
            println!("{}", sent.hash);
        }
    }
    Ok(())
}
