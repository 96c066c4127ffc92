//! # XVC Simulator
//!
//! Serves a simulated JTAG device over XVC until interrupted with Ctrl-C.
use std::error::Error;
use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use clap_num::maybe_hex;
use env_logger::Env;
use tokio_util::sync::CancellationToken;
use xvc_server::server::{Config, Server};
use xvc_sim::chain::{Chain, UpdatePolicy};

#[derive(Parser)]
#[command(about = "Simulated JTAG device served over Xilinx Virtual Cable (XVC)", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "2542")]
    port: u16,

    #[arg(short, long, default_value = "127.0.0.1")]
    ip: IpAddr,

    #[arg(short, long, help = "Make more noise", conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long, help = "Make less noise")]
    quiet: bool,

    #[arg(
        long,
        help = "The IDCODE of the simulated device",
        value_parser = maybe_hex::<u32>,
        default_value = "0x0364c093"
    )]
    idcode: u32,

    #[arg(
        long,
        help = "Keep data shifted into a register on Update-DR instead of discarding it"
    )]
    persist_writes: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level())).init();
    log::info!("Starting XVC simulator");

    let update_policy = if args.persist_writes {
        UpdatePolicy::Persistent
    } else {
        UpdatePolicy::Volatile
    };
    let chain = Chain::builder()
        .idcode(args.idcode)
        .update_policy(update_policy)
        .build();
    log::debug!(
        "Simulating device with IDCODE 0x{:08x}, {:?} registers",
        args.idcode,
        update_policy
    );

    let config = Config::default();
    log::debug!(
        "Server config: max_vector_len={}, max_shift_bytes={:?}",
        config.max_vector_len,
        config.max_shift_bytes
    );

    let addr = SocketAddr::new(args.ip, args.port);
    log::info!("Binding to address: {}", addr);

    let shutdown = CancellationToken::new();
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupted, no longer accepting connections");
                on_interrupt.cancel();
            }
            Err(e) => log::error!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let server = Server::new(chain, config);
    server.listen(addr, shutdown).await?;
    log::info!("Done");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::Args;
    use clap::Parser;
    use xvc_sim::chain::DEFAULT_IDCODE;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["xvc-sim"]).unwrap();
        assert_eq!(args.port, 2542);
        assert_eq!(args.ip.to_string(), "127.0.0.1");
        assert_eq!(args.idcode, DEFAULT_IDCODE);
        assert_eq!(args.log_level(), "info");
        assert!(!args.persist_writes);
    }

    #[test]
    fn idcode_accepts_hex_and_decimal() {
        let args = Args::try_parse_from(["xvc-sim", "--idcode", "0x13631093"]).unwrap();
        assert_eq!(args.idcode, 0x1363_1093);
        let args = Args::try_parse_from(["xvc-sim", "--idcode", "42"]).unwrap();
        assert_eq!(args.idcode, 42);
    }

    #[test]
    fn verbosity_flags() {
        let args = Args::try_parse_from(["xvc-sim", "-v"]).unwrap();
        assert_eq!(args.log_level(), "debug");
        let args = Args::try_parse_from(["xvc-sim", "--quiet"]).unwrap();
        assert_eq!(args.log_level(), "warn");
        assert!(Args::try_parse_from(["xvc-sim", "-v", "-q"]).is_err());
    }
}
