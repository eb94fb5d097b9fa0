use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use ridgeline_server::{GameServer, ServerConfig};

#[derive(Parser)]
#[command(name = "ridgeline-server")]
#[command(about = "Ridgeline dedicated server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = ridgeline::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = ridgeline::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = ridgeline::MAX_CLIENTS)]
    max_clients: usize,

    #[arg(long, default_value_t = 10, help = "Seconds of silence before a client is dropped")]
    timeout_secs: u64,

    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

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
    } else {
        ridgeline_server::run_with_tui(&mut server)?;
    }

    Ok(())
}
