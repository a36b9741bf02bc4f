use std::env;
use std::path::PathBuf;

use tcgrules_cli::{base_dir, init_tracing, load_settings, print_report, run_ingest};
use tcgrules_tools::QueryTool;
use tcgrules_vector::RetrievalService;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|query|status> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = load_settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let report = run_ingest(&settings, args.first().map(PathBuf::from)).await?;
            print_report(&report);
        }
        "query" => {
            let query_text = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: tcgrules query \"<query>\"");
                std::process::exit(1)
            });
            let tool = QueryTool::from_settings(&settings, &base_dir()?)?;
            println!("{}", tool.query(&query_text).await.to_json());
        }
        "status" => {
            let service = RetrievalService::from_settings(&settings, &base_dir()?)?;
            // Status is lazy; force one load-or-build so the report is meaningful.
            if let Err(e) = service.store().await {
                eprintln!("⚠️  {}", e);
            }
            println!("{}", serde_json::to_string_pretty(&service.status().await)?);
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
