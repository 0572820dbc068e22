mod catalog;
mod fetcher;
pub mod interactive;
mod mangadex;
mod orchestrator;
mod selection;
mod session;

pub use catalog::{Catalog, Chapter, ImageRef, MangaDetails, MangaSummary};
pub use fetcher::{ChapterDownload, ChapterFetcher, FetchFailure};
pub use mangadex::{parse_manga_id, MangadexCatalog};
pub use orchestrator::{
    DownloadOptions, DownloadReport, DownloadTask, FailedChapter, FatalError, Orchestrator,
};
pub use selection::{parse_selection, ChapterSelection, ParseError, SelectionSpec};
pub use session::Session;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Deserialize(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid url '{0}'")]
    UrlParse(String),
    #[error("'{0}' not found in catalog")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

/// Everything a [`Session`] operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("invalid selection: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Fatal(#[from] FatalError),
}
