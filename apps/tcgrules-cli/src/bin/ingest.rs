use std::{env, path::PathBuf};

use tcgrules_cli::{init_tracing, load_settings, print_report, run_ingest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = load_settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut corpus_dir = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--fake-embeddings" => env::set_var(tcgrules_embed::FAKE_EMBEDDINGS_ENV, "1"),
            _ if !args[i].starts_with('-') => corpus_dir = Some(PathBuf::from(&args[i])),
            other => {
                eprintln!("Unknown flag: {}", other);
                eprintln!("Usage: tcgrules-ingest [corpus_dir] [--fake-embeddings]");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    println!("tcgrules indexer\n================");
    let report = run_ingest(&settings, corpus_dir).await?;
    print_report(&report);
    println!("\n💡 To search, use: cargo run --bin tcgrules-search '<query>'");
    Ok(())
}
