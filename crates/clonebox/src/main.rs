use clap::Parser;
use clonebox::{Cli, Clonebox, CloneboxConfig, Commands, init_logging};
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CloneboxConfig::from_file(path)?,
        None => CloneboxConfig::load()?,
    };
    init_logging(&config.logging)?;

    if let Err(e) = run(cli, config).await {
        tracing::error!(error = %e, "Command failed");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli, config: CloneboxConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => {
            clonebox::migrate(&config)?;
            println!("Migrations applied");
        }

        Commands::Shorten { url } => {
            let app = Clonebox::connect(config)?;
            let shortened = app.links().shorten_link(&url).await?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "identifier": shortened.identifier(),
                        "content": shortened.record.content,
                        "was_existing": shortened.was_existing,
                    })
                );
            } else {
                let status = if shortened.was_existing { "existing" } else { "new" };
                println!("{}  {} ({})", shortened.identifier(), shortened.record.content, status);
            }
        }

        Commands::Resolve { identifier } => {
            let app = Clonebox::connect(config)?;
            match app.links().resolve_link(&identifier).await? {
                Some(record) if cli.json => println!("{}", serde_json::to_string(&record)?),
                Some(record) => println!("{}", record.content),
                None => return Err(format!("No link for identifier '{}'", identifier).into()),
            }
        }

        Commands::Latest { limit } => {
            let app = Clonebox::connect(config)?;
            let limit = limit.unwrap_or(app.config().links.latest_limit);
            let records = app.links().latest_links(limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in records {
                    println!(
                        "{}  {}  {}",
                        record.identifier,
                        record.created_at.format("%Y-%m-%d %H:%M:%S"),
                        record.content
                    );
                }
            }
        }

        Commands::Upload { path, name } => {
            let app = Clonebox::connect(config)?;
            let name = name.unwrap_or_else(|| display_name(&path));
            let file = tokio::fs::File::open(&path).await?;
            let declared_size = file.metadata().await.ok().map(|m| m.len());

            let outcome = app.files().upload_file(file, &name, declared_size).await?;
            if let Some(leak) = &outcome.leak {
                eprintln!("warning: {}", leak);
            }
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "file": outcome.file,
                        "was_duplicate": outcome.was_duplicate,
                    })
                );
            } else {
                let status = if outcome.was_duplicate { "duplicate" } else { "new" };
                println!(
                    "{}  {}  {} bytes ({})",
                    outcome.file.storage_handle, outcome.file.digest, outcome.file.size, status
                );
            }
        }

        Commands::Download { handle, dest } => {
            let app = Clonebox::connect(config)?;
            let (file, mut reader) = app.files().open_file(&handle).await?;
            let mut out = tokio::fs::File::create(&dest).await?;
            let copied = tokio::io::copy(&mut reader, &mut out).await?;
            println!(
                "{} -> {} ({} bytes)",
                file.original_name,
                dest.display(),
                copied
            );
        }

        Commands::Sweep { older_than } => {
            let app = Clonebox::connect(config)?;
            let ttl = older_than
                .map(Duration::from_secs)
                .unwrap_or_else(|| app.config().files.staging_ttl());
            let removed = app.files().sweep(ttl).await?;
            println!("Removed {} staged blob(s)", removed);
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
