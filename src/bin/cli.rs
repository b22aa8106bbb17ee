use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{self, AsyncBufReadExt, BufReader};

use redline::{
    conf::Configuration,
    telemetry::{get_subscriber, init_subscriber},
    Command, Connection,
};

/// A minimal client for RESP servers.
#[derive(Parser)]
#[clap(name = "redline-cli", version, author, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    cmd: Commands,

    /// Path to a configuration file.
    #[clap(long)]
    config: Option<PathBuf>,

    /// The host address of the server.
    #[clap(long)]
    host: Option<String>,

    /// The port number of the server.
    #[clap(long)]
    port: Option<u16>,

    /// Capacity of the read and write buffers, in bytes.
    #[clap(long)]
    buffer_size: Option<usize>,

    /// Log filter, e.g. `debug`.
    #[clap(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one command and print its reply.
    Call {
        #[clap(name = "ARG", required = true)]
        args: Vec<String>,
    },

    /// Read one command per line from stdin, send them all, then print the replies.
    Pipe,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let mut conf = Configuration::get(cli.config.as_deref()).context("invalid configuration")?;
    if let Some(host) = cli.host {
        conf.client.host = host;
    }
    if let Some(port) = cli.port {
        conf.client.port = port;
    }
    if let Some(buffer_size) = cli.buffer_size {
        conf.client.buffer_size = buffer_size;
    }
    if let Some(level) = cli.log_level {
        conf.log.level = level;
    }

    // Logs go to stderr, replies go to stdout
    let subscriber = get_subscriber("redline-cli".into(), &conf.log.level, std::io::stderr);
    init_subscriber(subscriber)?;

    let mut conn = Connection::from_config(&conf.client)
        .await
        .with_context(|| format!("could not connect to {}:{}", conf.client.host, conf.client.port))?;

    match cli.cmd {
        Commands::Call { args } => {
            let res = conn.call(args.into_iter().collect::<Command>()).await;
            println!("{}", res);
        }
        Commands::Pipe => {
            let mut lines = BufReader::new(io::stdin()).lines();
            let mut pipeline = conn.pipeline();
            while let Some(line) = lines.next_line().await? {
                let command: Command = line.split_whitespace().collect();
                if command.is_empty() {
                    continue;
                }
                pipeline.call(command).await?;
            }
            for res in pipeline.read().await {
                println!("{}", res);
            }
        }
    }

    conn.close().await?;
    Ok(())
}
