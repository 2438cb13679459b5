//! Assuan CLI Client
//!
//! Sends one command to an Assuan server and prints the returned data.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;

use assuan::{AssuanError, InquireData, Session};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// Assuan CLI
#[derive(Parser, Debug)]
#[command(name = "assuan-cli")]
#[command(about = "Send a command to an Assuan server")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7300")]
    server: String,

    /// Connect to a Unix domain socket instead of TCP
    #[arg(short = 'S', long)]
    socket: Option<PathBuf>,

    /// Answer for an inquiry, as KEYWORD=VALUE (repeatable)
    #[arg(short, long = "inquire", value_parser = parse_pair)]
    inquire: Vec<(String, String)>,

    /// Option to set before the command, as NAME=VALUE (repeatable)
    #[arg(short, long = "option", value_parser = parse_pair)]
    option: Vec<(String, String)>,

    /// Command verb
    command: String,

    /// Command parameters
    params: Vec<String>,
}

fn parse_pair(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", text)),
    }
}

fn run<S: Read + Write>(stream: S, args: &Args) -> assuan::Result<Vec<u8>> {
    let mut session = Session::connect(stream)?;
    tracing::debug!("Connected: {}", session.greeting());

    for (name, value) in &args.option {
        session.option(name, value)?;
    }

    let answers: HashMap<String, InquireData> = args
        .inquire
        .iter()
        .map(|(keyword, value)| (keyword.clone(), InquireData::from(value.as_str())))
        .collect();

    let data = session.transact(&args.command, args.params.join(" "), answers)?;
    session.close()?;
    Ok(data)
}

fn connect_and_run(args: &Args) -> assuan::Result<Vec<u8>> {
    match &args.socket {
        #[cfg(unix)]
        Some(path) => run(std::os::unix::net::UnixStream::connect(path)?, args),
        #[cfg(not(unix))]
        Some(_) => Err(AssuanError::Config(
            "unix sockets are not supported on this platform".to_string(),
        )),
        None => run(TcpStream::connect(&args.server)?, args),
    }
}

/// Write returned data followed by a newline; nothing for empty data
fn print_data<W: Write>(out: &mut W, data: &[u8]) -> std::io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    out.write_all(data)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    match connect_and_run(&args) {
        Ok(data) => {
            if let Err(e) = print_data(&mut std::io::stdout().lock(), &data) {
                eprintln!("error: cannot write output: {}", e);
                std::process::exit(2);
            }
        }
        Err(AssuanError::Peer(err)) => {
            eprintln!("ERR {} {}", err.wire_code(), err);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}
