use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trmp_types::constants::Network;
use trmp_wallet::{PaymentOutput, SendConfig};

mod commands;

/// TrumPOW wallet command-line interface.
#[derive(Parser)]
#[command(name = "trmp-wallet-cli")]
#[command(about = "Command-line wallet for the TrumPOW network")]
#[command(version)]
struct Cli {
    /// Network to use.
    #[arg(long, default_value = "mainnet")]
    network: Network,

    /// Wallet API base URL (overrides default for the selected network).
    #[arg(long)]
    api_url: Option<String>,

    /// Wallet file path.
    #[arg(long)]
    wallet_file: Option<String>,

    /// JSON file with send settings (fee tiers, fee address, output headroom).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log engine progress to stderr.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// `ADDRESS:AMOUNT`, amount in coins.
fn parse_recipient(s: &str) -> Result<PaymentOutput, String> {
    let (address, amount) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ADDRESS:AMOUNT, got {}", s))?;
    PaymentOutput::parse(address, amount).map_err(|e| e.to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet.
    Create,

    /// Restore a wallet from a BIP39 mnemonic.
    Restore,

    /// Show the wallet address.
    Address,

    /// Show the mnemonic seed phrase.
    Seed,

    /// Re-encrypt the wallet under a new password.
    ChangePassword,

    /// Decode a raw transaction (amounts shown as raw little-endian bytes).
    Decode {
        /// Raw transaction hex.
        hex: String,
    },

    /// Structurally verify a raw transaction and print its txid.
    Verify {
        /// Raw transaction hex.
        hex: String,

        /// Fail on non-standard scriptSig shapes instead of warning.
        #[arg(long)]
        strict: bool,
    },

    /// Select inputs and price a payment without sending it.
    Quote {
        /// Recipient as ADDRESS:AMOUNT (repeatable).
        #[arg(long = "to", required = true, value_parser = parse_recipient)]
        to: Vec<PaymentOutput>,

        /// Take the fee out of the recipient amounts.
        #[arg(long)]
        deduct_fee: bool,

        /// Quote for this address instead of opening the wallet.
        #[arg(long)]
        from: Option<String>,
    },

    /// Send a payment.
    Send {
        /// Recipient as ADDRESS:AMOUNT (repeatable).
        #[arg(long = "to", required = true, value_parser = parse_recipient)]
        to: Vec<PaymentOutput>,

        /// Take the fee out of the recipient amounts.
        #[arg(long)]
        deduct_fee: bool,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Show the balance of the wallet (or any address).
    Balance {
        #[arg(long)]
        address: Option<String>,
    },

    /// Show confirmation status of a transaction.
    Status {
        txid: String,
    },
}

/// Application context shared across commands.
pub struct AppContext {
    network: Network,
    api_url: String,
    wallet_path: PathBuf,
    send_config: SendConfig,
}

impl AppContext {
    fn from_cli(cli: &Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let network = cli.network;
        let api_url = cli
            .api_url
            .clone()
            .unwrap_or_else(|| network.config().default_api_url.to_string());

        let wallet_path = match cli.wallet_file {
            Some(ref path) => PathBuf::from(path),
            None => default_wallet_dir(network).join("wallet.json"),
        };

        let send_config = match cli.config {
            Some(ref path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                let cfg: SendConfig = serde_json::from_str(&text)
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                if cfg.network != network {
                    return Err(format!(
                        "config is for {} but --network is {}",
                        cfg.network, network
                    )
                    .into());
                }
                cfg
            }
            None => SendConfig::for_network(network),
        };

        Ok(Self {
            network,
            api_url,
            wallet_path,
            send_config,
        })
    }
}

fn default_wallet_dir(network: Network) -> PathBuf {
    let base = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trumpow");
    match network {
        Network::Mainnet => base,
        Network::Testnet => base.join("testnet"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let ctx = match AppContext::from_cli(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Create => commands::create_wallet(&ctx),
        Commands::Restore => commands::restore_wallet(&ctx),
        Commands::Address => commands::show_address(&ctx),
        Commands::Seed => commands::show_seed(&ctx),
        Commands::ChangePassword => commands::change_wallet_password(&ctx),
        Commands::Decode { hex } => commands::decode(&hex),
        Commands::Verify { hex, strict } => commands::verify(&hex, strict),
        Commands::Quote {
            to,
            deduct_fee,
            from,
        } => commands::quote(&ctx, to, deduct_fee, from).await,
        Commands::Send {
            to,
            deduct_fee,
            yes,
        } => commands::send(&ctx, to, deduct_fee, yes).await,
        Commands::Balance { address } => commands::show_balance(&ctx, address).await,
        Commands::Status { txid } => commands::show_status(&ctx, &txid).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient() {
        let out = parse_recipient("TGjyWQ1rG3ty6W4LkEByDNk3S5xFtYeGV4:1.25").unwrap();
        assert_eq!(out.address, "TGjyWQ1rG3ty6W4LkEByDNk3S5xFtYeGV4");
        assert_eq!(out.amount, 125_000_000);
        assert!(parse_recipient("no-amount").is_err());
        assert!(parse_recipient("T:abc").is_err());
    }

    #[test]
    fn test_cli_parses_send() {
        let cli = Cli::try_parse_from([
            "trmp-wallet-cli",
            "--network",
            "testnet",
            "send",
            "--to",
            "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r:0.5",
            "--to",
            "mnHioPj6vMDGiSUKsXWdX9GEPHoeapF8oi:1",
            "--deduct-fee",
        ])
        .unwrap();
        assert_eq!(cli.network, Network::Testnet);
        match cli.command {
            Commands::Send {
                to,
                deduct_fee,
                yes,
            } => {
                assert_eq!(to.len(), 2);
                assert_eq!(to[1].amount, 100_000_000);
                assert!(deduct_fee);
                assert!(!yes);
            }
            _ => panic!("expected send"),
        }
    }
}
