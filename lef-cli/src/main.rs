use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use lef_crypto::signatures::{address_of, generate_keypair, keypair_from_hex, sign, SigningKey};
use lef_types::address::{parse_address, Address};
use lef_types::amount::parse_token_amount;
use lef_types::instruction::{DestinationCategory, LedgerInstruction};
use lef_types::transaction::Transaction;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about = "LefCoin CLI: interact with a LefCoin ledger node")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, default_value = "http://localhost:3000")]
    node_url: String,
    #[arg(short, long, default_value = "wallet.json")]
    wallet_path: PathBuf,
}

fn address_arg(raw: &str) -> Result<Address, String> {
    parse_address(raw).map_err(|e| format!("invalid address: {}", e))
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a new wallet
    Init,
    /// Show current wallet info
    Show,

    // ── Token ──
    /// Send tokens; amounts are in whole tokens, e.g. 12.5
    Transfer {
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long, value_parser = parse_token_amount)]
        amount: u128,
    },
    Approve {
        #[arg(long, value_parser = address_arg)]
        spender: Address,
        #[arg(long, value_parser = parse_token_amount)]
        amount: u128,
    },
    TransferFrom {
        #[arg(long, value_parser = address_arg)]
        from: Address,
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long, value_parser = parse_token_amount)]
        amount: u128,
    },
    Burn {
        #[arg(long, value_parser = parse_token_amount)]
        amount: u128,
    },
    /// Claim accrued rewards
    Claim,

    // ── Index ──
    /// Report a subindex score (reporters only)
    Report {
        #[arg(long)]
        id: u8,
        #[arg(long)]
        score: u16,
    },

    // ── Registry ──
    Register {
        #[arg(long, value_parser = address_arg)]
        destination: Address,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: DestinationCategory,
    },
    Unregister {
        #[arg(long, value_parser = address_arg)]
        destination: Address,
    },
    TransferRegistryAuthority {
        #[arg(long, value_parser = address_arg)]
        to: Address,
    },

    // ── Governance ──
    ProposeAdd {
        #[arg(long, value_parser = address_arg)]
        destination: Address,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: DestinationCategory,
        #[arg(long, default_value = "")]
        description: String,
    },
    ProposeRemove {
        #[arg(long, value_parser = address_arg)]
        destination: Address,
        #[arg(long, default_value = "")]
        description: String,
    },
    Vote {
        #[arg(long)]
        proposal: u64,
        /// Vote against instead of for
        #[arg(long)]
        against: bool,
    },
    Execute {
        #[arg(long)]
        proposal: u64,
    },

    // ── Administration ──
    Mint {
        #[arg(long, value_parser = address_arg)]
        to: Address,
        #[arg(long, value_parser = parse_token_amount)]
        amount: u128,
    },
    GrantReporter {
        #[arg(long, value_parser = address_arg)]
        reporter: Address,
    },
    RevokeReporter {
        #[arg(long, value_parser = address_arg)]
        reporter: Address,
    },
    TransferAdmin {
        #[arg(long, value_parser = address_arg)]
        to: Address,
    },
    SetFeeRate {
        #[arg(long)]
        bps: u16,
    },
    SetGoodSpendBonus {
        #[arg(long)]
        bps: u16,
    },
    SetFeeExempt {
        #[arg(long, value_parser = address_arg)]
        account: Address,
        #[arg(long)]
        exempt: bool,
    },
    SetGoodSpendTarget {
        #[arg(long, value_parser = parse_token_amount)]
        volume: u128,
    },
    SetProposalThreshold {
        #[arg(long, value_parser = parse_token_amount)]
        amount: u128,
    },
    SetVotingPeriod {
        #[arg(long)]
        secs: u64,
    },
    SetQuorum {
        #[arg(long)]
        bps: u16,
    },

    // ── Queries ──
    /// Get account balance, nonce and pending rewards
    Balance {
        /// Defaults to the wallet address
        #[arg(long)]
        address: Option<String>,
    },
    /// Query the composite index
    Index,
    SubIndices,
    Destinations,
    Destination {
        #[arg(long)]
        address: String,
    },
    Proposal {
        #[arg(long)]
        id: u64,
    },
    /// Supply, pool and parameters
    Ledger,
    Batch {
        #[arg(long)]
        height: u64,
    },
}

impl Commands {
    /// The ledger instruction a command submits, `None` for local and read-only commands.
    fn instruction(&self) -> Option<LedgerInstruction> {
        use LedgerInstruction as I;
        let ix = match self {
            Commands::Transfer { to, amount } => I::Transfer { to: *to, amount: *amount },
            Commands::Approve { spender, amount } => I::Approve { spender: *spender, amount: *amount },
            Commands::TransferFrom { from, to, amount } => I::TransferFrom { from: *from, to: *to, amount: *amount },
            Commands::Burn { amount } => I::Burn { amount: *amount },
            Commands::Claim => I::ClaimRewards,
            Commands::Report { id, score } => I::SubmitSubIndex { id: *id, score: *score },
            Commands::Register { destination, name, category } => I::RegisterDestination {
                destination: *destination,
                name: name.clone(),
                category: *category,
            },
            Commands::Unregister { destination } => I::RemoveDestination { destination: *destination },
            Commands::TransferRegistryAuthority { to } => I::TransferRegistryAuthority { new_authority: *to },
            Commands::ProposeAdd { destination, name, category, description } => I::ProposeAddDestination {
                destination: *destination,
                name: name.clone(),
                category: *category,
                description: description.clone(),
            },
            Commands::ProposeRemove { destination, description } => I::ProposeRemoveDestination {
                destination: *destination,
                description: description.clone(),
            },
            Commands::Vote { proposal, against } => I::Vote { proposal_id: *proposal, support: !*against },
            Commands::Execute { proposal } => I::Execute { proposal_id: *proposal },
            Commands::Mint { to, amount } => I::Mint { to: *to, amount: *amount },
            Commands::GrantReporter { reporter } => I::GrantReporter { reporter: *reporter },
            Commands::RevokeReporter { reporter } => I::RevokeReporter { reporter: *reporter },
            Commands::TransferAdmin { to } => I::TransferAdmin { new_admin: *to },
            Commands::SetFeeRate { bps } => I::SetFeeRate { bps: *bps },
            Commands::SetGoodSpendBonus { bps } => I::SetGoodSpendBonus { bps: *bps },
            Commands::SetFeeExempt { account, exempt } => I::SetFeeExempt { account: *account, exempt: *exempt },
            Commands::SetGoodSpendTarget { volume } => I::SetGoodSpendTarget { volume: *volume },
            Commands::SetProposalThreshold { amount } => I::SetProposalThreshold { amount: *amount },
            Commands::SetVotingPeriod { secs } => I::SetVotingPeriod { secs: *secs },
            Commands::SetQuorum { bps } => I::SetQuorum { bps: *bps },
            _ => return None,
        };
        Some(ix)
    }

    fn query_path(&self) -> Option<String> {
        let path = match self {
            Commands::Index => "/index".to_string(),
            Commands::SubIndices => "/index/subindices".to_string(),
            Commands::Destinations => "/destinations".to_string(),
            Commands::Destination { address } => format!("/destinations/{}", address),
            Commands::Proposal { id } => format!("/proposals/{}", id),
            Commands::Ledger => "/ledger".to_string(),
            Commands::Batch { height } => format!("/batch/{}", height),
            _ => return None,
        };
        Some(path)
    }
}

#[derive(Serialize, Deserialize)]
struct Wallet {
    secret_key: String,
    public_key: String,
}

impl Wallet {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("reading wallet {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn to_keypair(&self) -> Result<SigningKey> {
        keypair_from_hex(&self.secret_key)
    }
}

async fn get_json(client: &Client, url: &str) -> Result<serde_json::Value> {
    let res = client.get(url).send().await?;
    if !res.status().is_success() {
        bail!("{}: {}", res.status(), res.text().await?);
    }
    Ok(res.json().await?)
}

async fn submit(client: &Client, node_url: &str, key: &SigningKey, instruction: LedgerInstruction) -> Result<()> {
    let sender = address_of(key);
    let account = get_json(client, &format!("{}/account/{}", node_url, hex::encode(sender))).await?;
    let nonce = account["nonce"]
        .as_u64()
        .ok_or_else(|| anyhow!("node returned no nonce for {}", hex::encode(sender)))?;

    let mut tx = Transaction {
        sender,
        nonce,
        instruction,
        signature: vec![],
    };
    tx.signature = sign(key, &tx.signing_bytes());

    let res = client.post(format!("{}/tx", node_url)).json(&tx).send().await?;
    println!("Response: {}", res.text().await?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    if let Some(instruction) = cli.command.instruction() {
        let kp = Wallet::load(&cli.wallet_path)?.to_keypair()?;
        return submit(&client, &cli.node_url, &kp, instruction).await;
    }
    if let Some(path) = cli.command.query_path() {
        let body = get_json(&client, &format!("{}{}", cli.node_url, path)).await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match &cli.command {
        Commands::Init => {
            let kp = generate_keypair();
            let wallet = Wallet {
                secret_key: hex::encode(kp.to_bytes()),
                public_key: hex::encode(address_of(&kp)),
            };
            wallet.save(&cli.wallet_path)?;
            println!("Wallet initialized at {:?}", cli.wallet_path);
            println!("Address: {}", wallet.public_key);
        }
        Commands::Show => {
            let wallet = Wallet::load(&cli.wallet_path)?;
            println!("Wallet: {:?}", cli.wallet_path);
            println!("Address: {}", wallet.public_key);
        }
        Commands::Balance { address } => {
            let address = match address {
                Some(a) => a.clone(),
                None => Wallet::load(&cli.wallet_path)?.public_key,
            };
            let body = get_json(&client, &format!("{}/account/{}", cli.node_url, address)).await?;
            println!("Account Info:\n{}", serde_json::to_string_pretty(&body)?);
        }
        other => bail!("unhandled command {:?}", other),
    }

    Ok(())
}
