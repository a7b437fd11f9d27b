use std::sync::Arc;

use aleph_client::{ClientConfig, RestClient};
use aleph_crypto::SigningKey;
use aleph_fetch::{PeerHandle, RemoteFetchClient};
use aleph_node::{AlephNode, NodeConfig};
use aleph_server::{AdminServer, ServerConfig};
use aleph_types::{ContentId, PeerId, SimpleStatement, StatementId};
use anyhow::Context;
use colored::Colorize;
use tracing::info;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Id => cmd_id(&rest_client(&cli.peer_url)?).await,
        Command::Ping(args) => cmd_ping(&rest_client(&cli.peer_url)?, args).await,
        Command::Publish(args) => cmd_publish(&rest_client(&cli.peer_url)?, args).await,
        Command::Stmt(args) => cmd_stmt(&rest_client(&cli.peer_url)?, args).await,
        Command::PutData(args) => cmd_put_data(&rest_client(&cli.peer_url)?, args).await,
        Command::Fetch(args) => cmd_fetch(args).await,
    }
}

fn rest_client(peer_url: &str) -> anyhow::Result<RestClient> {
    Ok(RestClient::new(&ClientConfig::new(peer_url))?)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    let admin_addr = config.admin_addr;

    let node = Arc::new(AlephNode::new(config)?);
    let fetch_addr = node.start().await?;

    let server = AdminServer::new(ServerConfig::new(admin_addr), Arc::clone(&node));
    let listener = server.bind().await?;
    let admin_addr = listener.local_addr()?;

    println!("{} Node {}", "✓".green().bold(), node.id().to_string().cyan());
    println!("  Admin API: {}", format!("http://{admin_addr}").bold());
    println!("  Fetch server: {}", fetch_addr.to_string().bold());

    server
        .serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    node.shutdown().await?;
    println!("{} Stopped.", "✓".green());
    Ok(())
}

async fn cmd_id(client: &RestClient) -> anyhow::Result<()> {
    println!("{}", client.id().await?);
    Ok(())
}

async fn cmd_ping(client: &RestClient, args: PingArgs) -> anyhow::Result<()> {
    let peer = PeerId::from(args.peer);
    if client.ping(&peer).await? {
        println!("{} {} is reachable", "✓".green().bold(), peer.to_string().cyan());
        Ok(())
    } else {
        anyhow::bail!("{peer} is unreachable")
    }
}

async fn cmd_publish(client: &RestClient, args: PublishArgs) -> anyhow::Result<()> {
    let mut body = SimpleStatement::new(args.object);
    for r in args.refs {
        body = body.with_ref(r);
    }
    for t in args.tags {
        body = body.with_tag(t);
    }
    for d in args.deps {
        body = body.with_dep(d);
    }

    let id = client.publish(&args.namespace, &body).await?;
    println!("{} Published {}", "✓".green().bold(), id.to_string().yellow());
    Ok(())
}

async fn cmd_stmt(client: &RestClient, args: StmtArgs) -> anyhow::Result<()> {
    let statement = client.statement(&StatementId::from(args.id)).await?;
    println!("{}", serde_json::to_string_pretty(&statement)?);
    Ok(())
}

async fn cmd_put_data(client: &RestClient, args: PutDataArgs) -> anyhow::Result<()> {
    let objects = parse_objects(&args.objects)?;
    let ids = client.put_data(&objects).await?;
    for id in ids {
        println!("{}", id.to_string().yellow());
    }
    Ok(())
}

fn parse_objects(texts: &[String]) -> anyhow::Result<Vec<serde_json::Value>> {
    texts
        .iter()
        .map(|text| {
            serde_json::from_str::<serde_json::Value>(text)
                .with_context(|| format!("invalid JSON object: {text}"))
        })
        .collect()
}

async fn cmd_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let local = SigningKey::generate().peer_id();
    let client = RemoteFetchClient::new(local);
    let ids: Vec<ContentId> = args.ids.into_iter().map(ContentId::from).collect();

    let results = client
        .remote_data(&PeerHandle::new(args.addr), &ids)
        .await
        .with_context(|| format!("fetching from {}", args.addr))?;

    for result in results {
        match result.value.as_bytes() {
            Some(bytes) => println!(
                "{} {}",
                result.key.to_string().yellow(),
                String::from_utf8_lossy(bytes)
            ),
            None => println!("{} {}", result.key.to_string().yellow(), "missing".dimmed()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_parsed_as_json() {
        let objects = parse_objects(&[r#"{"foo":"bar"}"#.into(), "[1,2]".into()]).unwrap();
        assert_eq!(objects[0], serde_json::json!({"foo": "bar"}));
        assert_eq!(objects[1], serde_json::json!([1, 2]));
    }

    #[test]
    fn invalid_json_object_rejected() {
        let err = parse_objects(&["{not json".into()]).unwrap_err();
        assert!(err.to_string().contains("{not json"));
    }

    #[tokio::test]
    async fn put_data_against_running_node() {
        let node = Arc::new(AlephNode::new(NodeConfig::ephemeral()).unwrap());
        let server = AdminServer::new(
            ServerConfig::new("127.0.0.1:0".parse().unwrap()),
            Arc::clone(&node),
        );
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve_with_shutdown(listener, std::future::pending()));

        let client = rest_client(&format!("http://{addr}")).unwrap();
        let args = PutDataArgs {
            objects: vec![r#"{"foo":"bar"}"#.into()],
        };
        cmd_put_data(&client, args).await.unwrap();
        let id = aleph_crypto::ContentHasher::DATA.hash(br#"{"foo":"bar"}"#);
        assert!(node.data(&id).unwrap().is_some());
    }
}
