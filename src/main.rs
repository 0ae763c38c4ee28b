use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use serde_json::Value;

use ledger_pilot::config::{EnvSettings, SettingsSource};
use ledger_pilot::error::{LedgerPilotError, Result};
use ledger_pilot::interfaces::actions::{Action, ActionReply, Message, Plugin, State};
use ledger_pilot::keys::Address;
use ledger_pilot::plugins::{ActionRegistry, WalletPlugin};
use ledger_pilot::runtime::WalletRuntime;
use ledger_pilot::units;

#[derive(Parser, Debug)]
#[command(name = "ledger-pilot")]
#[command(about = "Wallet actions for conversational agents")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LEDGER_PILOT_GIT_SHA"), ")"))]
struct Cli {
    /// Path to a JSON settings file, used instead of the process environment.
    #[arg(long, env = "LEDGER_PILOT_SETTINGS")]
    settings: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the configured wallet address and network.
    Address,
    /// Print a balance without going through the language model.
    Balance {
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Print holdings and their USD value.
    Portfolio {
        #[arg(long)]
        address: Option<String>,
    },
    /// List registered actions.
    Actions,
    /// Run one action against a chat message.
    Run {
        #[arg(long)]
        action: String,
        #[arg(long)]
        text: String,
        /// Earlier conversation lines, oldest first.
        #[arg(long = "recent")]
        recent: Vec<String>,
        #[arg(long, default_value = "user")]
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    ledger_pilot::logging::init_tracing("ledger_pilot_cli");
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref())?;
    let runtime = Arc::new(WalletRuntime::open(settings).await?);

    match cli.command {
        Command::Address => {
            let config = runtime.config()?;
            println!("{} ({})", config.keypair()?.address(), config.network.network);
        }
        Command::Balance { address, token } => {
            let config = runtime.config()?;
            let wallet = runtime.wallet(&config)?;
            let address = parse_or(address.as_deref(), wallet.address())?;
            let token = token.as_deref().map(str::parse::<Address>).transpose()?;
            let decimals = wallet.decimals_for(token.as_ref()).await?;
            let raw = wallet.get_balance(&address, token.as_ref()).await?;
            println!("{}", units::display(units::to_human(raw, decimals)));
        }
        Command::Portfolio { address } => {
            let config = runtime.config()?;
            let wallet = runtime.wallet(&config)?;
            let address = parse_or(address.as_deref(), wallet.address())?;
            println!("{}", wallet.fetch_portfolio(&address).await?.summary());
        }
        Command::Actions => {
            let plugin = WalletPlugin::new(runtime.clone());
            for action in plugin.actions() {
                println!(
                    "{:<18} {} (also: {})",
                    action.name(),
                    action.description(),
                    action.similes().join(", ")
                );
            }
        }
        Command::Run {
            action,
            text,
            recent,
            user_id,
        } => {
            let registry = ActionRegistry::new();
            WalletPlugin::new(runtime.clone()).initialize(&registry).await;

            let replies: Arc<Mutex<Option<ActionReply>>> = Arc::new(Mutex::new(None));
            let sink = replies.clone();
            let handled = registry
                .dispatch(
                    &action,
                    &Message::new(user_id, text),
                    &State::with_recent(recent),
                    Box::new(move |reply| {
                        if let Ok(mut slot) = sink.lock() {
                            *slot = Some(reply);
                        }
                    }),
                )
                .await?;

            let reply = replies.lock().ok().and_then(|mut slot| slot.take());
            match reply {
                Some(reply) => {
                    println!("{}", reply.text);
                    let content = serde_json::to_string_pretty(&reply.content)
                        .map_err(|e| LedgerPilotError::Serialization(e.to_string()))?;
                    println!("{content}");
                }
                None => eprintln!("{action} declined the message"),
            }
            if !handled {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn load_settings(path: Option<&str>) -> Result<Arc<dyn SettingsSource>> {
    let Some(path) = path else {
        return Ok(Arc::new(EnvSettings));
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LedgerPilotError::Config(format!("failed to read {path}: {e}")))?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| LedgerPilotError::Config(format!("{path} is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(LedgerPilotError::Config(format!(
            "{path} must contain a JSON object"
        )));
    }
    Ok(Arc::new(value))
}

fn parse_or(value: Option<&str>, fallback: Address) -> Result<Address> {
    value.map(str::parse::<Address>).transpose().map(|v| v.unwrap_or(fallback))
}
