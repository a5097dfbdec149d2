mod cli;

use midnight_signal::{config, pipeline::Orchestrator, server};
use signal_player::{GuardState, LiveGuard, ManifestFollower, SimulatedElement};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::time::{Duration, Instant};

async fn start_broadcast(
    host: Option<String>,
    port: Option<u16>,
    skip_curation: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file and PORT
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if skip_curation {
        config.curator.enabled = false;
    }
    config::validate_config(&config)?;

    tracing::info!("Midnight Signal Broadcast Engine starting");
    tracing::info!(
        "Content: {:?}, stream: {:?}",
        config.paths.content_dir,
        config.paths.stream_dir
    );

    Orchestrator::new(config).run().await
}

async fn serve_stream(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Publishing {:?} without a pipeline", config.paths.stream_dir);
    server::start_server(config).await
}

async fn watch_stream(url: String, duration: Option<u64>, max_failures: u32) -> Result<()> {
    let follower = ManifestFollower::new(max_failures);
    let mut guard = LiveGuard::new(url.clone(), follower, SimulatedElement::default());
    guard.mount();

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let shutdown = server::shutdown_signal();
    tokio::pin!(shutdown);

    let mut last_tick = Instant::now();
    let mut corrections = 0u64;
    tracing::info!("Watching {}", url);

    loop {
        let Some(follower) = guard.handler_mut() else {
            break;
        };
        follower.poll().await;
        let events = follower.drain_events();
        for event in events {
            guard.handle_event(event);
        }

        let now = Instant::now();
        guard
            .media_mut()
            .advance(now.duration_since(last_tick).as_secs_f64());
        last_tick = now;

        if let Some(position) = guard.sync() {
            corrections += 1;
            tracing::info!("Snapped back to live edge at {:.2}s", position);
        }
        tracing::debug!("{:?}", guard.session());

        if guard.state() == GuardState::Error {
            let cause = guard.session().error.clone().unwrap_or_default();
            guard.unmount();
            anyhow::bail!("{}", cause);
        }
        if deadline.is_some_and(|d| now >= d) {
            break;
        }

        let interval = guard
            .handler()
            .map(ManifestFollower::poll_interval)
            .unwrap_or(Duration::from_secs(1));
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => break,
        }
    }

    let session = guard.session().clone();
    guard.unmount();
    println!(
        "state: {}, position: {:.2}s, live edge corrections: {}",
        session.state, session.position, corrections
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "midnight_signal=trace,signal_av=trace,signal_media=debug,signal_player=trace,ffmpeg=debug,curator=debug,tower_http=debug".to_string()
        } else {
            "midnight_signal=debug,signal_av=debug,signal_player=info,ffmpeg=info,curator=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            skip_curation,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_broadcast(
                host,
                port,
                skip_curation,
                cli.config.as_deref(),
            ))
        }
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve_stream(host, port, cli.config.as_deref()))
        }
        Commands::Watch {
            url,
            duration,
            max_failures,
        } => {
            // The guard is single-threaded; so is its runtime.
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(watch_stream(url, duration, max_failures))
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("midnight-signal {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = signal_av::check_tools();
    for tool in &tools {
        let status = if tool.available { "✓" } else { "✗" };
        print!("{} {} [{}]", status, tool.name(), tool.spec.purpose);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        if !tool.spec.required {
            print!(" (optional)");
        }
        println!();
    }

    println!();
    if tools.iter().any(|t| t.is_blocking()) {
        println!("ffmpeg is missing; the broadcast cannot start.");
    } else {
        println!("All required tools are available!");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::load_config_or_default(None)?
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Content dir: {:?}", config.paths.content_dir);
    println!("  Stream dir: {:?}", config.paths.stream_dir);
    println!(
        "  Curator: {}",
        if config.curator.enabled {
            format!("{} {}", config.curator.command, config.curator.args.join(" "))
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Segments: {}s x {} (gain {})",
        config.transcode.segment_seconds, config.transcode.window_size, config.transcode.gain
    );

    Ok(())
}
