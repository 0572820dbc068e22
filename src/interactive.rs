//! Line based interactive mode.
//!
//! Every input line is parsed into a [`Command`] and dispatched to the
//! [`Session`]. Failures are printed and the loop keeps going.

use super::catalog::{Chapter, MangaDetails, MangaSummary};
use super::mangadex::parse_manga_id;
use super::orchestrator::DownloadReport;
use super::selection::{ParseError, SelectionSpec};
use super::session::Session;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  latest              list recently updated manga
  search <title>      search manga by title
  open <n|manga-id>   show details and chapters of the n-th listed manga or of a manga id
  chapters            list chapters of the opened manga again
  get <selection>     download chapters of the opened manga ('-', '3', '1,2,5', '2-7')
  help                show this message
  quit                leave";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Latest,
    Search(String),
    Open(String),
    Chapters,
    Get(SelectionSpec),
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'help' for the list of commands")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid selection: {0}")]
    Selection(#[from] ParseError),
}

impl Command {
    /// Parses one input line, `None` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };
        let required = |name: &'static str| {
            if arg.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(arg.to_string())
            }
        };

        let command = match name {
            "latest" | "l" => Self::Latest,
            "search" | "s" => Self::Search(required("search")?),
            "open" | "o" => Self::Open(required("open")?),
            "chapters" | "c" => Self::Chapters,
            "get" | "g" => Self::Get(required("get")?.parse()?),
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub async fn dispatch(
    session: &mut Session,
    command: Command,
    out: &mut impl Write,
) -> anyhow::Result<Flow> {
    match command {
        Command::Latest => {
            let results = session.latest().await?;
            write_results(out, results)?;
        }
        Command::Search(title) => {
            let results = session.search(&title).await?;
            write_results(out, results)?;
        }
        Command::Open(target) => {
            let manga_id = match target.parse::<usize>() {
                Ok(n) => session
                    .results()
                    .get(n.wrapping_sub(1))
                    .map(|m| m.id().clone())
                    .ok_or_else(|| anyhow::anyhow!("no listed manga number {n}"))?,
                Err(_) => parse_manga_id(&target)?,
            };
            let details = session.details(&manga_id).await?;
            write_details(out, &details)?;
            let chapters = session.chapters(&manga_id).await?;
            write_chapters(out, chapters)?;
        }
        Command::Chapters => match session.opened() {
            Some((_, chapters)) => write_chapters(out, chapters)?,
            None => writeln!(out, "no manga opened, use 'open' first")?,
        },
        Command::Get(selection) => {
            let Some((manga_id, _)) = session.opened() else {
                anyhow::bail!("no manga opened, use 'open' first");
            };
            let manga_id = manga_id.to_string();
            let report = session.download(&manga_id, &selection).await?;
            write_report(out, &report)?;
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(session: &mut Session) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = std::io::stdout();
    writeln!(out, "{HELP}")?;
    if let Err(e) = dispatch(session, Command::Latest, &mut out).await {
        writeln!(out, "Error: {e:#}")?;
    }
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "Error: {e}")?;
                continue;
            }
        };
        match dispatch(session, command, &mut out).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => writeln!(out, "Error: {e:#}")?,
        }
    }
    Ok(())
}

pub fn write_results(out: &mut impl Write, results: &[MangaSummary]) -> std::io::Result<()> {
    if results.is_empty() {
        return writeln!(out, "no manga found");
    }
    for manga in results {
        writeln!(out, "[{}] {}", manga.id(), manga.title())?;
    }
    Ok(())
}

pub fn write_details(out: &mut impl Write, details: &MangaDetails) -> std::io::Result<()> {
    writeln!(out, "{} [{}]", details.title(), details.id())?;
    match (details.status(), details.year()) {
        (Some(status), Some(year)) => writeln!(out, "status: {status}, {year}")?,
        (Some(status), None) => writeln!(out, "status: {status}")?,
        (None, Some(year)) => writeln!(out, "year: {year}")?,
        (None, None) => {}
    }
    if !details.description().is_empty() {
        writeln!(out, "{}", details.description())?;
    }
    writeln!(out)
}

pub fn write_chapters(out: &mut impl Write, chapters: &[Chapter]) -> std::io::Result<()> {
    if chapters.is_empty() {
        return writeln!(out, "no chapters available");
    }
    for (i, chapter) in chapters.iter().enumerate() {
        match chapter.title() {
            Some(title) => writeln!(out, "[{}] Chapter {} {}", i + 1, chapter.number(), title)?,
            None => writeln!(out, "[{}] Chapter {}", i + 1, chapter.number())?,
        }
    }
    Ok(())
}

pub fn write_report(out: &mut impl Write, report: &DownloadReport) -> std::io::Result<()> {
    writeln!(
        out,
        "downloaded {} chapters ({} pages)",
        report.succeeded_count(),
        report.total_pages()
    )?;
    if !report.is_success() {
        writeln!(out, "failed {} chapters:", report.failed_count())?;
        for failed in &report.failed {
            writeln!(
                out,
                "  Chapter {} [{}]: {}",
                failed.chapter.number(),
                failed.chapter.id(),
                failed.cause
            )?;
        }
    }
    Ok(())
}
