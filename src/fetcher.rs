use super::catalog::{Catalog, ImageRef};
use super::orchestrator::DownloadTask;
use super::CatalogError;
use futures::future::BoxFuture;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::Service;
use tracing::debug;
use tracing::debug_span;
use tracing::Instrument;

/// Downloads every page of one chapter into the task's destination directory.
///
/// Clones share the same catalog, so the orchestrator can hand one clone to
/// each spawned chapter task.
#[derive(Clone)]
pub struct ChapterFetcher {
    catalog: Arc<dyn Catalog>,
}

impl fmt::Debug for ChapterFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChapterFetcher").finish_non_exhaustive()
    }
}

impl ChapterFetcher {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDownload {
    pub chapter_id: String,
    pub pages: usize,
    pub path: PathBuf,
}

/// Why a single chapter could not be downloaded.
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    #[error("could not list pages: {source}")]
    PageList {
        #[source]
        source: CatalogError,
    },
    #[error("chapter has no pages")]
    NoPages,
    #[error("could not download page {page}: {source}")]
    Image {
        page: usize,
        #[source]
        source: CatalogError,
    },
    #[error("could not write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download task stopped before completion: {0}")]
    Interrupted(String),
}

impl Service<DownloadTask> for ChapterFetcher {
    type Response = ChapterDownload;
    type Error = FetchFailure;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, task: DownloadTask) -> Self::Future {
        let catalog = self.catalog.clone();
        let span = debug_span!("chapter_fetcher", chapter = %task.chapter.id());
        let fut = async move {
            debug!(?task);
            let pages = catalog
                .fetch_chapter_pages(task.chapter.id())
                .await
                .map_err(|source| FetchFailure::PageList { source })?;
            if pages.is_empty() {
                return Err(FetchFailure::NoPages);
            }
            download_chapter(catalog.as_ref(), &pages, &task.destination).await?;
            Ok(ChapterDownload {
                chapter_id: task.chapter.id().clone(),
                pages: pages.len(),
                path: task.destination,
            })
        };

        Box::pin(fut.instrument(span))
    }
}

async fn download_chapter(
    catalog: &dyn Catalog,
    pages: &[ImageRef],
    path: &Path,
) -> Result<(), FetchFailure> {
    async fn download_one(
        catalog: &dyn Catalog,
        page: usize,
        image: &ImageRef,
        file: PathBuf,
    ) -> Result<(), FetchFailure> {
        debug!("Download {}", file.display());
        let bytes = catalog
            .download_image(image)
            .await
            .map_err(|source| FetchFailure::Image { page, source })?;
        fs::write(&file, &bytes).map_err(|source| FetchFailure::Write { path: file, source })?;
        Ok(())
    }

    fs::create_dir_all(path).map_err(|source| FetchFailure::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let width = pages.len().checked_ilog10().unwrap_or(0) as usize + 1;
    let futures = pages.iter().enumerate().map(|(i, image)| {
        let file = path.join(format!("page_{i:0width$}.{}", image.extension()));
        download_one(catalog, i, image, file)
    });
    futures::future::try_join_all(futures).await?;
    Ok(())
}
