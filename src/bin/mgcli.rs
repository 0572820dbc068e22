use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};
use mgcli::interactive::{self, write_chapters, write_report, write_results};
use mgcli::{parse_manga_id, DownloadOptions, MangadexCatalog, SelectionSpec, Session};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mgcli",
    version,
    author,
    about = "Search, list and download manga chapters from mangadex",
    long_about = "Search, list and download manga chapters from mangadex.\n\n\
                  Without --search or --manga-id an interactive prompt is started."
)]
struct Arguments {
    #[arg(short, long, value_name = "TITLE", help = "search manga based on title pattern")]
    search: Option<String>,
    #[arg(
        short,
        long,
        value_name = "MANGA",
        conflicts_with = "search",
        help = "manga id or url to list or download chapters from"
    )]
    manga_id: Option<String>,
    #[arg(
        short,
        long,
        value_name = "SELECTION",
        requires = "manga_id",
        help = "chapters to download: '-' for all, a position ('3'), a comma-separated list ('1,2,5') or a dash-range ('2-7')"
    )]
    download: Option<SelectionSpec>,
    #[arg(short, long, default_value = ".", help = "destination folder")]
    output: PathBuf,
    #[arg(
        long,
        help = "download all chapters in parallel (may lead to errors for too much requests)"
    )]
    all_together: bool,
    #[arg(
        long,
        requires = "all_together",
        help = "maximum number of chapters downloaded at once with --all-together"
    )]
    max_concurrency: Option<NonZeroUsize>,
    #[arg(long, help = "ignore download errors and keep going")]
    ignore_errors: bool,
    #[arg(short, long, default_value_t = String::from("en"), help = "translation language")]
    language: String,
    #[arg(
        short = 'r',
        long = "raw",
        action = ArgAction::SetFalse,
        default_value_t = true,
        help = "download uncompressed images"
    )]
    data_saver: bool,
    #[arg(long, default_value = "https://api.mangadex.org", help = "catalog api url")]
    api_url: String,
    #[arg(short, long, help = "log progress and requests")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if args.verbose => EnvFilter::new("mgcli=debug"),
        Err(_) => EnvFilter::new("warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let catalog = MangadexCatalog::new()
        .base_url(&args.api_url)
        .language(&args.language)
        .data_saver(args.data_saver);
    let options = DownloadOptions::new(&args.output)
        .sequential(!args.all_together)
        .ignore_errors(args.ignore_errors)
        .max_concurrency(args.max_concurrency);
    let mut session = Session::new(Arc::new(catalog), options);

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| String::from("mgcli"));
    let mut out = std::io::stdout();

    if let Some(title) = &args.search {
        let results = session.search(title).await?;
        write_results(&mut out, results)?;
        println!("\nTo list manga chapters run '{program} --manga-id MANGAID', where MANGAID is the value between square braces in the list above");
    } else if let Some(manga) = &args.manga_id {
        let manga_id = parse_manga_id(manga)?;
        match &args.download {
            Some(selection) => {
                let report = session
                    .download(&manga_id, selection)
                    .await
                    .with_context(|| format!("download of manga {manga_id} failed"))?;
                write_report(&mut out, &report)?;
            }
            None => {
                let chapters = session.chapters(&manga_id).await?;
                write_chapters(&mut out, chapters)?;
                println!("\nTo download chapters run '{program} --manga-id {manga_id} --download SELECTION', where SELECTION is a list or single value from those between square braces in the list above");
            }
        }
    } else {
        interactive::run(&mut session).await?;
    }

    Ok(())
}
