//! `claw-console`: play a claw machine from the terminal.
//!
//! ```text
//! claw-console --user u1 --secret s1 --endpoint wss://arcade.example/ws
//! claw-console --user u1 --secret s1 --simulate      # no server needed
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod commands;
mod simulator;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use clawlink::prelude::*;
use clawlink::protocol::ProtobufCodec;
use clawlink::transport::{Connector, LoopbackConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::commands::Input;

#[derive(Parser, Debug)]
#[command(name = "claw-console")]
#[command(about = "Drive a remote claw machine from the terminal")]
struct Args {
    /// Player id issued by the account system
    #[arg(short, long)]
    user: String,

    /// Session secret issued at sign-in
    #[arg(short, long)]
    secret: String,

    /// Machine server URL (overrides the config file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// JSON client configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Machine to pre-select
    #[arg(short, long)]
    machine: Option<String>,

    /// Play against an in-process machine simulator instead of a server
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }

    if args.simulate {
        let (connector, acceptor) = LoopbackConnector::pair();
        tokio::spawn(simulator::run(acceptor));
        config.endpoint = "loop://simulator".to_string();
        run(ClawClient::with_parts(config, connector, ProtobufCodec), &args).await
    } else {
        run(ClawClient::new(config), &args).await
    }
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

async fn run<C: Connector, K: Codec>(client: ClawClient<C, K>, args: &Args) -> Result<()> {
    install_handlers(&client);

    tracing::info!(endpoint = %client.config().endpoint, user_id = %args.user, "connecting");
    client
        .connect(
            args.user.as_str(),
            args.secret.as_str(),
            args.machine.as_deref().map(MachineId::from),
        )
        .await
        .context("could not start a session")?;

    println!("{}", commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match commands::parse(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        let result = match input {
            Input::Quit => break,
            Input::Help => {
                println!("{}", commands::HELP);
                Ok(())
            }
            Input::Status => {
                let machine = client.active_machine().await;
                println!("status: {}, machine: {machine:?}", client.status());
                Ok(())
            }
            Input::Enter(machine) => client.enter_room(machine.as_str()).await,
            Input::Exit => client.exit_room().await,
            Input::Start => client.start_game().await,
            Input::Move(direction) => client.send_move(direction).await,
            Input::Arm(side) => client.send_arm_move(side).await,
            Input::Say(text) => client.send_to_roommate(text).await,
        };
        if let Err(e) = result {
            eprintln!("error: {e}");
            if e.is_terminal() {
                break;
            }
        }
    }

    client.disconnect().await;
    Ok(())
}

fn install_handlers<C: Connector, K: Codec>(client: &ClawClient<C, K>) {
    client.on_open(|| tracing::info!("ready"));
    client.on_close(|event| {
        tracing::info!(
            reason = ?event.reason,
            detail = ?event.detail,
            will_reconnect = event.will_reconnect,
            "connection closed"
        );
    });
    client.on_error(|error| tracing::warn!(%error, "client error"));
    client.on_enter_room_result(|result| {
        if result.accepted {
            println!("entered {} (stream: {})", result.machine, result.stream_url);
        } else {
            println!("machine {} refused entry", result.machine);
        }
    });
    client.on_player_count(|count| println!("players in room: {count}"));
    client.on_game_result(|result| match result {
        GameResult::Catch(outcome) => match outcome.prize_bucket {
            Some(bucket) => println!("caught a prize from bucket {bucket}!"),
            None => println!("missed"),
        },
        GameResult::Settlement(settlement) => println!(
            "round over: gold {}, score {}",
            settlement.total_gold, settlement.total_score
        ),
    });
}
