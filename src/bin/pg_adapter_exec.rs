use std::process::ExitCode;

use clap::Parser;
use pg_sql_adapter::prelude::*;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one SQL statement through pg-sql-adapter and print the rows as JSON")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long)]
    database: String,
    #[arg(long)]
    user: String,
    #[arg(long, env = "PGPASSWORD", hide_env_values = true, default_value = "")]
    password: String,
    #[arg(long, default_value_t = 5432)]
    port: u16,
    /// Extra connection URI parameter as key=value; repeatable
    #[arg(long = "param", value_parser = parse_key_value)]
    params: Vec<(String, String)>,
    #[arg(long, default_value_t = 1)]
    max_connections: u32,
    /// Log at DEBUG, including the statement text
    #[arg(short, long)]
    verbose: bool,
    statement: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

async fn run(args: Args) -> Result<String, Box<dyn std::error::Error>> {
    let config = ConnectionConfig::new(args.host, args.database)
        .with_port(args.port)
        .with_query_parameters(args.params)
        .with_pool_size(args.max_connections.min(1), args.max_connections);

    let mut adapter = SqlConnectionAdapter::new(config);
    adapter
        .open(Credentials::network(args.user, args.password))
        .await?;
    let rs = adapter.execute_sql(&args.statement).await?;
    adapter.close();

    Ok(serde_json::to_string_pretty(&rs.to_json()?)?)
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
