use super::catalog::{Catalog, Chapter, ImageRef, MangaDetails, MangaSummary};
use super::CatalogError;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use tracing::instrument;

const DEFAULT_API_URL: &str = "https://api.mangadex.org";
const SEARCH_LIMIT: usize = 20;

/// [`Catalog`] backed by the public mangadex JSON API.
#[derive(Debug, Clone)]
pub struct MangadexCatalog {
    client: reqwest::Client,
    base_url: String,
    translated_language: Vec<String>,
    data_saver: bool,
}

impl Default for MangadexCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MangadexCatalog {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_API_URL.to_string(),
            translated_language: Vec::new(),
            data_saver: true,
        }
    }

    pub fn base_url(mut self, base_url: impl ToString) -> Self {
        self.base_url = base_url.to_string().trim_end_matches('/').to_string();
        self
    }

    pub fn language(mut self, language: impl ToString) -> Self {
        self.translated_language.push(language.to_string());
        self
    }

    pub fn data_saver(mut self, data_saver: bool) -> Self {
        self.data_saver = data_saver;
        self
    }

    async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, CatalogError>
    where
        T: for<'de> Deserialize<'de>,
        Q: serde::Serialize + ?Sized,
    {
        let bytes = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Accepts either a bare manga id or a `https://mangadex.org/title/<id>/...` url.
pub fn parse_manga_id(input: &str) -> Result<String, CatalogError> {
    if !input.contains("mangadex.org") {
        return Ok(input.trim().to_string());
    }
    let url = Url::parse(input.trim())
        .map_err(|_e| CatalogError::UrlParse(input.to_string()))?;
    if !url.domain().is_some_and(|x| x == "mangadex.org") {
        return Err(CatalogError::UrlParse(url.to_string()));
    }
    let mut segments = url
        .path_segments()
        .ok_or_else(|| CatalogError::UrlParse(url.to_string()))?;
    match (segments.next(), segments.next()) {
        (Some("title"), Some(id)) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(CatalogError::UrlParse(url.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<MangaData>,
}

#[derive(Debug, Deserialize)]
struct MangaData {
    id: String,
    attributes: MangaAttributes,
}

#[derive(Debug, Deserialize)]
struct MangaResponse {
    data: MangaData,
}

#[derive(Debug, Deserialize)]
struct MangaAttributes {
    title: HashMap<String, String>,
    #[serde(default)]
    description: HashMap<String, String>,
    status: Option<String>,
    year: Option<u32>,
}

/// English text if present, otherwise the first language in alphabetical order.
fn localized(mut texts: HashMap<String, String>) -> String {
    texts.remove("en").unwrap_or_else(|| {
        let mut rest: Vec<_> = texts.into_iter().collect();
        rest.sort();
        rest.into_iter().next().map(|(_, t)| t).unwrap_or_default()
    })
}

impl From<MangaData> for MangaSummary {
    fn from(manga: MangaData) -> Self {
        MangaSummary::new(manga.id, localized(manga.attributes.title))
    }
}

impl From<MangaData> for MangaDetails {
    fn from(manga: MangaData) -> Self {
        let attributes = manga.attributes;
        let mut details = MangaDetails::new(manga.id, localized(attributes.title))
            .with_description(localized(attributes.description).trim());
        if let Some(status) = attributes.status {
            details = details.with_status(status);
        }
        if let Some(year) = attributes.year {
            details = details.with_year(year);
        }
        details
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AggregateResponse {
    #[allow(dead_code)]
    Empty { volumes: [EmptyType; 0] },
    NonEmpty { volumes: HashMap<String, Volume> },
}

#[derive(Debug, Deserialize)]
struct EmptyType;

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(default)]
    chapters: HashMap<String, AggregateChapter>,
}

#[derive(Debug, Deserialize)]
struct AggregateChapter {
    chapter: String,
    id: String,
}

impl AggregateChapter {
    fn number(&self) -> Option<f32> {
        self.chapter.parse::<f32>().ok()
    }
}

fn sort_chapters(mut chapters: Vec<AggregateChapter>) -> Vec<Chapter> {
    chapters.sort_by(|x, y| match (x.number(), y.number()) {
        (None, None) => x.chapter.cmp(&y.chapter),
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(c1), Some(c2)) => c1.total_cmp(&c2),
    });
    chapters
        .into_iter()
        .map(|c| Chapter::new(c.id, c.chapter))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterData {
    base_url: String,
    chapter: ChapterDownloadData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterDownloadData {
    hash: String,
    data: Vec<String>,
    data_saver: Vec<String>,
}

impl ChapterData {
    fn pages(&self, data_saver: bool) -> Vec<ImageRef> {
        let (quality, files) = if data_saver {
            ("data-saver", &self.chapter.data_saver)
        } else {
            ("data", &self.chapter.data)
        };
        files
            .iter()
            .map(|x| {
                ImageRef::new(format!(
                    "{}/{}/{}/{}",
                    self.base_url, quality, self.chapter.hash, x
                ))
            })
            .collect()
    }
}

#[async_trait]
impl Catalog for MangadexCatalog {
    #[instrument(skip(self))]
    async fn search(&self, title: &str) -> Result<Vec<MangaSummary>, CatalogError> {
        let limit = SEARCH_LIMIT.to_string();
        let mut query = vec![("title", title), ("limit", limit.as_str())];
        for language in &self.translated_language {
            query.push(("availableTranslatedLanguage[]", language.as_str()));
        }
        let response: SearchResponse = self.get_json("/manga", &query).await?;
        debug!(results = response.data.len());
        Ok(response.data.into_iter().map(MangaSummary::from).collect())
    }

    #[instrument(skip(self))]
    async fn latest(&self) -> Result<Vec<MangaSummary>, CatalogError> {
        let limit = SEARCH_LIMIT.to_string();
        let mut query = vec![
            ("order[latestUploadedChapter]", "desc"),
            ("limit", limit.as_str()),
        ];
        for language in &self.translated_language {
            query.push(("availableTranslatedLanguage[]", language.as_str()));
        }
        let response: SearchResponse = self.get_json("/manga", &query).await?;
        debug!(results = response.data.len());
        Ok(response.data.into_iter().map(MangaSummary::from).collect())
    }

    #[instrument(skip(self))]
    async fn manga_details(&self, manga_id: &str) -> Result<MangaDetails, CatalogError> {
        let response: MangaResponse = self
            .get_json(&format!("/manga/{manga_id}"), &[] as &[(&str, &str)])
            .await?;
        Ok(response.data.into())
    }

    #[instrument(skip(self))]
    async fn list_chapters(&self, manga_id: &str) -> Result<Vec<Chapter>, CatalogError> {
        let query: Vec<_> = self
            .translated_language
            .iter()
            .map(|language| ("translatedLanguage[]", language))
            .collect();
        let response: AggregateResponse = self
            .get_json(&format!("/manga/{manga_id}/aggregate"), &query)
            .await?;
        let chapters = match response {
            AggregateResponse::Empty { .. } => Vec::new(),
            AggregateResponse::NonEmpty { volumes } => volumes
                .into_values()
                .flat_map(|v| v.chapters.into_values())
                .collect(),
        };
        debug!(chapters = chapters.len());
        Ok(sort_chapters(chapters))
    }

    #[instrument(skip(self))]
    async fn fetch_chapter_pages(&self, chapter_id: &str) -> Result<Vec<ImageRef>, CatalogError> {
        let chapter_data: ChapterData = self
            .get_json(&format!("/at-home/server/{chapter_id}"), &[] as &[(&str, &str)])
            .await?;
        Ok(chapter_data.pages(self.data_saver))
    }

    async fn download_image(&self, image: &ImageRef) -> Result<Vec<u8>, CatalogError> {
        let bytes = self
            .client
            .get(image.url())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
