use std::net::SocketAddr;
use std::path::PathBuf;

use aleph_client::DEFAULT_PEER_URL;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aleph", about = "Aleph peer node and admin client", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the node's administrative API.
    #[arg(long, global = true, default_value = DEFAULT_PEER_URL)]
    pub peer_url: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a node: fetch server plus admin API
    Serve(ServeArgs),
    /// Print the node's peer id
    Id,
    /// Check that the node can reach a peer
    Ping(PingArgs),
    /// Publish a statement
    Publish(PublishArgs),
    /// Show a statement by id
    Stmt(StmtArgs),
    /// Store JSON data objects on the node and print their content ids
    PutData(PutDataArgs),
    /// Fetch data objects straight from a peer's fetch server
    Fetch(FetchArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML node configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct PingArgs {
    pub peer: String,
}

#[derive(Args)]
pub struct PublishArgs {
    pub namespace: String,
    #[arg(long)]
    pub object: String,
    #[arg(long = "ref")]
    pub refs: Vec<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long = "dep")]
    pub deps: Vec<String>,
}

#[derive(Args)]
pub struct StmtArgs {
    pub id: String,
}

#[derive(Args)]
pub struct PutDataArgs {
    /// One JSON document per object.
    #[arg(required = true)]
    pub objects: Vec<String>,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Fetch server address of the remote peer.
    pub addr: SocketAddr,
    #[arg(required = true)]
    pub ids: Vec<String>,
}
