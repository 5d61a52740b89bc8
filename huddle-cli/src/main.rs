use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_client::{
    MediaConstraints, RtcTransportFactory, Session, SessionConfig, SessionPhase, SessionSnapshot,
    SyntheticDevices, TransportConfig, WsConnector,
};
use huddle_core::{IceServerConfig, NetworkQuality};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Headless mesh meeting participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and stay until Ctrl-C.
    Join {
        #[arg(long, default_value = "ws://127.0.0.1:3001/ws")]
        url: String,

        #[arg(short, long)]
        room: String,

        /// Display name; prompted for when omitted.
        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        no_video: bool,

        #[arg(long)]
        no_audio: bool,

        /// Extra STUN/TURN urls, replacing the defaults.
        #[arg(long = "ice")]
        ice: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Join {
            url,
            room,
            name,
            no_video,
            no_audio,
            ice,
        } => {
            let name = match name {
                Some(name) => name,
                None => dialoguer::Input::<String>::new()
                    .with_prompt("Display name")
                    .interact_text()
                    .context("Failed to read display name")?,
            };

            let mut config = SessionConfig {
                signaling_url: url,
                constraints: MediaConstraints {
                    audio: !no_audio,
                    video: !no_video,
                },
                ..Default::default()
            };
            if !ice.is_empty() {
                config.ice_servers = vec![IceServerConfig {
                    urls: ice,
                    username: None,
                    credential: None,
                }];
            }

            join(config, room, name).await
        }
    }
}

async fn join(config: SessionConfig, room: String, name: String) -> Result<()> {
    let factory = RtcTransportFactory::new(TransportConfig {
        ice_servers: config.ice_servers.clone(),
    });
    let handle = Session::new(
        config,
        Arc::new(WsConnector::default()),
        Arc::new(factory),
        Arc::new(SyntheticDevices::new()),
    )
    .spawn();

    println!("{}", format!("📞 Joining '{room}' as {name}...").green().bold());
    handle
        .join_room(room.clone(), name)
        .await
        .context("Failed to join room")?;

    let mut updates = handle.subscribe();
    let mut last_summary = String::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Leaving...".cyan());
                handle.leave_room().await?;
                break;
            }

            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();

                let summary = summarize(&snapshot);
                if summary != last_summary {
                    println!("{summary}");
                    last_summary = summary;
                }

                if snapshot.phase == SessionPhase::Idle {
                    if let Some(error) = snapshot.error {
                        println!("{} {}", "✖ Session ended:".red().bold(), error);
                        anyhow::bail!("session ended: {error}");
                    }
                    break;
                }
            }
        }
    }

    info!("Left room {}", room);
    Ok(())
}

fn summarize(snapshot: &SessionSnapshot) -> String {
    let quality = match snapshot.network_quality {
        NetworkQuality::Excellent => "excellent".green(),
        NetworkQuality::Good => "good".green(),
        NetworkQuality::Poor => "poor".yellow(),
        NetworkQuality::Disconnected => "disconnected".red(),
    };
    let mut out = format!(
        "{} [{:?}] network: {}",
        "●".cyan(),
        snapshot.connection_state,
        quality
    );
    if let Some(error) = &snapshot.error {
        out.push_str(&format!("  {}", error.yellow()));
    }
    for participant in std::iter::once(&snapshot.local).chain(&snapshot.participants) {
        let mut flags = Vec::new();
        if participant.is_host {
            flags.push("host");
        }
        if participant.is_muted {
            flags.push("muted");
        }
        if participant.is_video_off {
            flags.push("video off");
        }
        if participant.is_raise_hand {
            flags.push("✋");
        }
        if !participant.is_online() {
            flags.push("offline");
        }
        let label = if participant.is_local {
            format!("{} (you)", participant.name).bold()
        } else {
            participant.name.normal()
        };
        out.push_str(&format!("\n   {} {}", label, flags.join(", ").dimmed()));
        if let Some(reaction) = &participant.active_reaction {
            out.push_str(&format!(" {}", reaction.symbol));
        }
    }
    out
}
