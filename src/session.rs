use super::catalog::{Catalog, Chapter, MangaDetails, MangaSummary};
use super::orchestrator::{DownloadOptions, DownloadReport, Orchestrator};
use super::selection::SelectionSpec;
use super::Error;
use std::sync::Arc;
use tracing::debug;

/// State shared by every mode of the client: the catalog, the orchestrator
/// built on top of it and what was last shown to the user.
pub struct Session {
    catalog: Arc<dyn Catalog>,
    orchestrator: Orchestrator,
    options: DownloadOptions,
    results: Vec<MangaSummary>,
    opened: Option<(String, Vec<Chapter>)>,
}

impl Session {
    pub fn new(catalog: Arc<dyn Catalog>, options: DownloadOptions) -> Self {
        Self {
            orchestrator: Orchestrator::new(catalog.clone()),
            catalog,
            options,
            results: Vec::new(),
            opened: None,
        }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    pub fn results(&self) -> &[MangaSummary] {
        &self.results
    }

    /// Id and chapters of the manga opened last, if any.
    pub fn opened(&self) -> Option<(&str, &[Chapter])> {
        self.opened
            .as_ref()
            .map(|(id, chapters)| (id.as_str(), chapters.as_slice()))
    }

    pub async fn search(&mut self, title: &str) -> Result<&[MangaSummary], Error> {
        self.results = self.catalog.search(title).await?;
        Ok(&self.results)
    }

    /// Replaces the current results with the recently updated manga.
    pub async fn latest(&mut self) -> Result<&[MangaSummary], Error> {
        self.results = self.catalog.latest().await?;
        Ok(&self.results)
    }

    pub async fn details(&self, manga_id: &str) -> Result<MangaDetails, Error> {
        Ok(self.catalog.manga_details(manga_id).await?)
    }

    /// Lists the chapters of `manga_id`, reusing the last listing when the
    /// same manga is asked again.
    pub async fn chapters(&mut self, manga_id: &str) -> Result<&[Chapter], Error> {
        let cached = matches!(&self.opened, Some((id, _)) if id == manga_id);
        if !cached {
            let chapters = self.catalog.list_chapters(manga_id).await?;
            debug!(manga_id, chapters = chapters.len(), "opened manga");
            self.opened = Some((manga_id.to_string(), chapters));
        }
        Ok(self.opened.as_ref().map(|(_, c)| c.as_slice()).unwrap_or_default())
    }

    /// Downloads the chapters of `manga_id` picked by `selection`.
    pub async fn download(
        &mut self,
        manga_id: &str,
        selection: &SelectionSpec,
    ) -> Result<DownloadReport, Error> {
        let options = self.options.clone();
        self.download_with(manga_id, selection, &options).await
    }

    pub async fn download_with(
        &mut self,
        manga_id: &str,
        selection: &SelectionSpec,
        options: &DownloadOptions,
    ) -> Result<DownloadReport, Error> {
        let chapters = self.chapters(manga_id).await?;
        let selection = selection.resolve(chapters)?;
        Ok(self
            .orchestrator
            .download(manga_id, selection, options)
            .await?)
    }
}
