use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidroom::config::SessionConfig;
use vidroom::events::{EventBus, SessionEvent};
use vidroom::render::{Container, MemorySurface};
use vidroom::service::{DeviceDescriptor, DeviceKind, LoopbackService, TrackKind};
use vidroom::session::SessionManager;
use vidroom::token::{HttpTokenClient, StaticTokenProvider, TokenProvider};

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// vidroom command line arguments
#[derive(Parser, Debug)]
#[command(name = "vidroom")]
#[command(version, about = "Session state manager demo for video rooms", long_about = None)]
struct CliArgs {
    /// Page URL carrying the ?room=<room-name> parameter
    #[arg(long, value_name = "URL")]
    page_url: Option<String>,

    /// Room name (overrides the page URL parameter)
    #[arg(short, long, value_name = "NAME")]
    room: Option<String>,

    /// Token endpoint URL; a static development token is used when absent
    #[arg(long, value_name = "URL")]
    token_url: Option<String>,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    let mut config = match &args.page_url {
        Some(url) => SessionConfig::from_page_url(url)?,
        None => SessionConfig::default(),
    };
    if let Some(room) = &args.room {
        config.room = Some(room.clone());
    } else if args.page_url.is_none() {
        config.room = Some("demo".to_string());
    }
    if let Some(url) = &args.token_url {
        config.token_url = url.clone();
    }

    // In-process service with two cameras so the switch path is exercised
    let service = LoopbackService::with_devices(vec![
        DeviceDescriptor::new("cam-front", DeviceKind::VideoInput, "Default Camera"),
        DeviceDescriptor::new("cam-back", DeviceKind::VideoInput, "Back Camera"),
        DeviceDescriptor::new("mic-0", DeviceKind::AudioInput, "Microphone"),
        DeviceDescriptor::new("speaker-0", DeviceKind::AudioOutput, "Speakers"),
    ]);
    let surface = Arc::new(MemorySurface::new());
    let tokens: Arc<dyn TokenProvider> = if args.token_url.is_some() {
        Arc::new(HttpTokenClient::new(config.token_url.clone()))
    } else {
        Arc::new(StaticTokenProvider::new("dev-token", "guest"))
    };
    let events = Arc::new(EventBus::new());

    // Print the activity log the way the page's log panel would
    let mut activity_rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = activity_rx.recv().await {
            if let SessionEvent::Activity { message, .. } = event {
                println!("> {message}");
            }
        }
    });

    let manager = SessionManager::new(
        service.clone(),
        tokens,
        surface.clone(),
        events.clone(),
        config.room.clone(),
    );

    let cameras = manager.refresh_video_devices().await?;
    info!(?cameras, "video inputs");

    manager.preview().await?;
    manager.join().await?;

    let room_handle = service
        .last_room()
        .ok_or_else(|| anyhow::anyhow!("connect did not produce a room"))?;

    // Remote side of the conversation
    room_handle.simulate_participant_connected("alice");
    room_handle.simulate_track_added("alice", TrackKind::Audio);
    room_handle.simulate_track_added("alice", TrackKind::Video);
    room_handle.simulate_participant_connected("bob");
    room_handle.simulate_track_added("bob", TrackKind::Video);
    settle().await;

    manager.toggle_mute().await;
    manager.switch_camera().await?;
    settle().await;

    room_handle.simulate_participant_disconnected("alice");
    settle().await;

    info!(
        local = surface.count_in(Container::LocalMedia),
        remote = surface.count_in(Container::RemoteMedia),
        "render nodes before leaving"
    );

    manager.leave().await;
    settle().await;
    manager.shutdown().await;

    let phase = manager.phase().await;
    info!(nodes = surface.count(), %phase, "session finished");
    Ok(())
}

/// Give the event pump a beat to drain
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "vidroom=error",
        LogLevel::Warn => "vidroom=warn",
        LogLevel::Info => "vidroom=info",
        LogLevel::Verbose => "vidroom=debug",
        LogLevel::Debug => "vidroom=debug,reqwest=debug",
        LogLevel::Trace => "vidroom=trace,reqwest=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
