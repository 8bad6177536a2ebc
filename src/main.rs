use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubesplit::cli::{Cli, Commands};
use tubesplit::config::Config;
use tubesplit::media::Probed;
use tubesplit::pipeline::{classify_with_override, DownloadPipeline, DownloadRequest};
use tubesplit::{output, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "tubesplit=debug" } else { "tubesplit=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Downloads must not touch the disk before their input is validated
    let config = match cli.command {
        Commands::Download { .. } => Config::read()?,
        _ => Config::load().await?,
    };

    match cli.command {
        Commands::Download {
            url,
            quality,
            mp3,
            mp3_bitrate,
            mode,
            start,
            end,
            chapters,
            items,
            treat_as,
            output_dir,
            format,
            report,
        } => {
            let request = DownloadRequest {
                url,
                quality,
                convert_to_mp3: mp3,
                mp3_bitrate,
                mode,
                start: start.unwrap_or_default(),
                end: end.unwrap_or_default(),
                chapters,
                items,
                treat_as,
                output_dir,
            };

            let pipeline = DownloadPipeline::new(config.clone(), !cli.quiet);
            let prepared = pipeline.prepare(&request)?;
            warn_missing_dependencies(&config).await;
            let results = pipeline
                .execute(&prepared, request.output_dir.as_deref())
                .await?;

            output::print_to_console(&results, format)?;
            if let Some(path) = report {
                output::save_to_file(&results, &path, format)?;
                println!("Report saved to: {}", path.display());
            }

            let failed = results.iter().filter(|r| !r.succeeded()).count();
            if failed > 0 {
                anyhow::bail!("{} of {} items failed", failed, results.len());
            }
        }
        Commands::Info { url, treat_as } => {
            let target = classify_with_override(&url, treat_as)?;
            println!("Type: {}", target.kind());

            let pipeline = DownloadPipeline::new(config, !cli.quiet);
            match pipeline.probe(&target).await? {
                Probed::Item(item) => {
                    println!("Video: {}", style(item.display_title()).bold());
                    if let Some(duration) = item.duration {
                        println!("Duration: {}", utils::format_duration(duration));
                    }
                    if item.chapters.is_empty() {
                        println!("Chapters: none");
                    } else {
                        println!("Chapters:");
                        for (i, chapter) in item.chapters.iter().enumerate() {
                            println!(
                                "  {:>2}. [{}] {}",
                                i + 1,
                                tubesplit::TimeSpec::At(chapter.start),
                                chapter.title
                            );
                        }
                    }
                }
                Probed::Collection(collection) => {
                    println!(
                        "Playlist: {} ({} videos)",
                        style(&collection.title).bold(),
                        collection.len()
                    );
                    for (i, item) in collection.items.iter().enumerate() {
                        let duration = item
                            .duration
                            .map(|d| format!(" ({})", utils::format_duration(d)))
                            .unwrap_or_default();
                        println!("  {:>3}. {}{}", i + 1, item.display_title(), duration);
                    }
                }
            }
        }
        Commands::Config { show, path } => {
            if path {
                println!("{}", Config::config_path()?.display());
            }
            if show || !path {
                config.display();
            }
        }
    }

    Ok(())
}

/// Missing tools are only warned about; the tool itself reports the real failure
async fn warn_missing_dependencies(config: &Config) {
    let missing = utils::check_dependencies(config).await;
    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}
