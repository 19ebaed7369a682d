use anyhow::{bail, Context};
use q3query::{QueryClient, QueryRequest};
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("usage: q3query [--raw] <protocol-id> <host> <port> <command> [rcon-password]");
    eprintln!("  protocol ids: 1 = Medal of Honor, 2 = Call of Duty");
    eprintln!("  commands: getinfo (CoD only), getstatus, \"rcon <command>\"");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let raw = if args.first().map(String::as_str) == Some("--raw") {
        args.remove(0);
        true
    } else {
        false
    };
    if args.len() < 4 || args.len() > 5 {
        usage();
    }

    let protocol: i32 = args[0].parse().context("protocol id must be a number")?;
    let port: u16 = args[2].parse().context("port must be in 1-65535")?;
    let request = QueryRequest {
        protocol,
        raw,
        host: args[1].clone(),
        port,
        command: args[3].clone(),
        rcon_password: args.get(4).cloned(),
    };

    let client = QueryClient::new().context("failed to set up resolver")?;
    let response = client.query_text(&request).await;
    println!("{}", response);

    if response.starts_with("error=") {
        bail!("query failed");
    }
    Ok(())
}
