//! Assuan Demo Server Binary
//!
//! Serves a small demonstration protocol over TCP, a Unix socket or stdio.
//!
//! ```text
//! SETDESC <text>   remember a description
//! GETDESC          return it as data
//! ECHO <text>      return the parameters as data
//! ASK <keyword>    inquire <keyword> from the client and return the answer
//! GETINFO version|pid
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use assuan::network::Server;
use assuan::server::serve_stdio;
use assuan::{Config, ErrorCode, ErrorSource, HandlerResult, ProtoInfo, Responder, WireError};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// Assuan Demo Server
#[derive(Parser, Debug)]
#[command(name = "assuan-server")]
#[command(about = "Demonstration server for the Assuan IPC protocol")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Listen on a Unix domain socket instead of TCP
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Serve a single session on stdin/stdout
    #[arg(long)]
    stdio: bool,

    /// Maximum concurrent connections
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Greeting sent to clients
    #[arg(short, long)]
    greeting: Option<String>,
}

/// Per-connection state of the demo protocol
#[derive(Debug, Default)]
struct DemoState {
    desc: String,
    ttyname: Option<String>,
}

fn demo_error(code: ErrorCode, message: impl Into<String>) -> WireError {
    WireError::new(ErrorSource::Unknown, code, "demo", message)
}

fn set_option(state: &mut DemoState, key: &str, value: &str) -> HandlerResult {
    match key {
        "ttyname" => {
            state.ttyname = Some(value.to_string());
            Ok(())
        }
        key if key.starts_with("default-") => Ok(()),
        key => Err(demo_error(ErrorCode::UnknownOption, format!("unknown option: {}", key)).into()),
    }
}

fn get_info(responder: &mut dyn Responder, state: &mut DemoState, what: &str) -> HandlerResult {
    match what {
        "version" => responder.write_data(assuan::VERSION.as_bytes())?,
        "pid" => responder.write_data(std::process::id().to_string().as_bytes())?,
        "ttyname" => match &state.ttyname {
            Some(name) => responder.write_data(name.as_bytes())?,
            None => return Err(demo_error(ErrorCode::NotFound, "no ttyname set").into()),
        },
        _ => {
            return Err(WireError::assuan(ErrorCode::AssuanParameter, "unknown GETINFO item").into())
        }
    }
    Ok(())
}

fn demo_protocol(greeting: &str) -> ProtoInfo<DemoState> {
    ProtoInfo::<DemoState>::builder(greeting)
        .handler("SETDESC", |_, state: &mut DemoState, params| {
            state.desc = params.to_string();
            Ok(())
        })
        .handler("GETDESC", |responder, state: &mut DemoState, _| {
            responder.write_data(state.desc.as_bytes())?;
            Ok(())
        })
        .handler("ECHO", |responder, _, params| {
            responder.write_data(params.as_bytes())?;
            Ok(())
        })
        .handler("ASK", |responder, _, params| {
            let keyword = if params.is_empty() { "VALUE" } else { params };
            responder.write_status("INQUIRING", keyword)?;
            let answer = responder.inquire(keyword)?;
            responder.write_data(&answer)?;
            Ok(())
        })
        .handler("GETINFO", get_info)
        .help("SETDESC", ["SETDESC <text>", "Remember a description for this session"])
        .help("GETDESC", ["Return the description set with SETDESC"])
        .help("ECHO", ["ECHO <text>", "Return the parameters as data"])
        .help("ASK", ["ASK [keyword]", "Inquire <keyword> from the client and return it"])
        .help("GETINFO", ["GETINFO version|pid|ttyname"])
        .option_setter(set_option)
        .build()
}

fn build_config(args: &Args) -> assuan::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // CLI flags take precedence over the file
    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    if let Some(socket) = &args.socket {
        config.socket_path = Some(socket.clone());
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    if let Some(greeting) = &args.greeting {
        config.greeting = Some(greeting.clone());
    }

    Ok(config)
}

fn main() {
    // Logs go to stderr so stdout stays free for the protocol in --stdio mode
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,assuan=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let greeting = config
        .greeting
        .clone()
        .unwrap_or_else(|| format!("assuan demo server {}", assuan::VERSION));
    let proto = demo_protocol(&greeting);

    if args.stdio {
        if let Err(e) = serve_stdio(&proto) {
            if !e.is_disconnect() {
                tracing::error!("Session failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    tracing::info!("Assuan demo server v{}", assuan::VERSION);

    let server = match Server::bind(config, Arc::new(proto)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
