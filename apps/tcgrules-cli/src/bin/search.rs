use std::env;

use tcgrules_cli::{base_dir, init_tracing, load_settings};
use tcgrules_tools::QueryTool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [--limit N] [--json]", args[0]);
        eprintln!("Example: {} 'How many Energy cards per turn?' --limit 3", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let settings = load_settings()?;
    let mut limit = settings.retrieval.top_k;
    let mut as_json = false;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => match args.get(i + 1).and_then(|s| s.parse::<usize>().ok()) {
                Some(l) if l > 0 => {
                    limit = l;
                    i += 1;
                }
                _ => {
                    eprintln!("Error: --limit requires a positive number");
                    std::process::exit(1);
                }
            },
            "--json" => as_json = true,
            _ => {}
        }
        i += 1;
    }

    let tool = QueryTool::from_settings(&settings, &base_dir()?)?.with_top_k(limit);
    let response = tool.query(query_text).await;
    if as_json {
        println!("{}", response.to_json());
        return Ok(());
    }
    println!("🔍 tcgrules-search\n==================");
    println!("Query: {}", query_text);
    if let Some(error) = &response.error {
        println!("\n⚠️  {}", error);
        return Ok(());
    }
    println!("\n🔍 Found {} results", response.results.len());
    for (i, p) in response.results.iter().enumerate() {
        println!("\n  {}. score={:.4}  category={}  source={}", i + 1, p.score, p.category, p.source_id);
        println!("     📝 {}", p.passage_text.trim());
    }
    Ok(())
}
