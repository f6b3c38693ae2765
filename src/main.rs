use std::env;

use clap::Parser;
use horizon::api::{Cli, init_tracing, run_cli, run_http_server};

#[tokio::main]
async fn main() {
    init_tracing();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = run_http_server(port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let cli = Cli::parse();
    if let Err(e) = run_cli(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
