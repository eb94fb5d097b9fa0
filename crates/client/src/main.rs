mod app;
mod frontend;
mod hud;
mod input;
pub mod net;
mod stats;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use ridgeline::{
    HeightField, MovementController, MovementTuning, SimulationContext, parse_server_address,
};
use ridgeline_server::{GameServer, ServerConfig};

use app::App;
use frontend::{Frontend, HeadlessFrontend};
use hud::TerminalFrontend;
use net::{ClientConfig, DEFAULT_FRAME_RATE, NetworkClient};

const HEIGHTMAP_CELL_SIZE: f32 = 1.0;
const HEIGHTMAP_MAX_HEIGHT: f32 = 10.0;

#[derive(Parser)]
#[command(name = "ridgeline")]
#[command(about = "Walk a heightfield alone or with others")]
struct Args {
    #[arg(long, conflicts_with = "client", help = "Run as the server")]
    server: bool,

    #[arg(long, help = "Run as a client (server defaults to 127.0.0.1)")]
    client: bool,

    #[arg(value_name = "SERVER_IP", help = "Server IPv4 address; implies --client")]
    server_ip: Option<String>,

    #[arg(short, long, default_value_t = ridgeline::DEFAULT_PORT)]
    port: u16,

    #[arg(long, help = "No terminal UI; log instead")]
    headless: bool,

    #[arg(long, value_name = "N", help = "Stop after N frames")]
    frames: Option<u64>,

    #[arg(long, value_name = "PATH", help = "Grayscale image to build terrain from")]
    heightmap: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "JSON movement tuning overrides")]
    tuning: Option<PathBuf>,

    #[arg(long, default_value_t = ridgeline::DEFAULT_TICK_RATE, help = "Server tick rate")]
    tick_rate: u32,

    #[arg(long, default_value_t = ridgeline::MAX_CLIENTS, help = "Server client limit")]
    max_clients: usize,

    #[arg(long, default_value_t = 10, help = "Seconds of silence before a peer is dropped")]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }

    if args.server {
        run_server(&args);
    }

    let network = if args.client || args.server_ip.is_some() {
        let ip = args.server_ip.as_deref().unwrap_or("127.0.0.1");
        let server_addr = parse_server_address(ip, args.port)?;
        let config = ClientConfig {
            server_timeout: Duration::from_secs(args.timeout_secs),
            ..Default::default()
        };
        let client = NetworkClient::new(&config, server_addr)
            .with_context(|| format!("failed to open socket on {}", config.bind_addr))?;
        Some(client)
    } else {
        None
    };

    let sim = build_simulation(&args)?;

    if args.headless {
        run_app(sim, network, HeadlessFrontend::new(), args.frames)
    } else {
        let frontend = TerminalFrontend::new().context("failed to set up terminal")?;
        run_app(sim, network, frontend, args.frames)
    }
}

fn run_server(args: &Args) -> ! {
    let bind_addr = format!("0.0.0.0:{}", args.port);
    let config = ServerConfig {
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        disconnect_timeout: Duration::from_secs(args.timeout_secs),
    };

    let mut server = match GameServer::new(&bind_addr, config) {
        Ok(server) => server,
        Err(e) => {
            if args.headless {
                log::error!("failed to bind {}: {}", bind_addr, e);
            } else {
                eprintln!("failed to bind {}: {}", bind_addr, e);
            }
            std::process::exit(1);
        }
    };

    if args.headless {
        ridgeline_server::run_headless(&mut server);
    } else if let Err(e) = ridgeline_server::run_with_tui(&mut server) {
        eprintln!("terminal error: {}", e);
        std::process::exit(1);
    }

    std::process::exit(0);
}

fn build_simulation(args: &Args) -> Result<SimulationContext<HeightField>> {
    let terrain = match &args.heightmap {
        Some(path) => HeightField::from_image(path, HEIGHTMAP_CELL_SIZE, HEIGHTMAP_MAX_HEIGHT)
            .with_context(|| format!("failed to load heightmap {}", path.display()))?,
        None => HeightField::rolling_hills(129, 129, 1.0, 12.0)?,
    };
    log::info!(
        "terrain {}x{} cells of {} ({:.0} x {:.0} units)",
        terrain.width(),
        terrain.depth(),
        terrain.cell_size(),
        terrain.extent().x,
        terrain.extent().y
    );

    let tuning = match &args.tuning {
        Some(path) => MovementTuning::load(path)
            .with_context(|| format!("failed to load tuning {}", path.display()))?,
        None => MovementTuning::default(),
    };

    let spawn = app::spawn_state(&terrain);
    Ok(SimulationContext::new(
        terrain,
        MovementController::new(tuning),
        spawn,
        DEFAULT_FRAME_RATE,
    ))
}

fn run_app<F: Frontend>(
    sim: SimulationContext<HeightField>,
    network: Option<NetworkClient>,
    frontend: F,
    frames: Option<u64>,
) -> Result<()> {
    let mut app = App::new(sim, network, frontend, DEFAULT_FRAME_RATE);
    let frames = app.run(frames)?;
    log::info!("stopped after {} frames", frames);
    Ok(())
}
