use super::CatalogError;
use async_trait::async_trait;
use getset::Getters;

/// Remote catalog the client browses and downloads from.
///
/// Implementations must be shareable across tasks: in parallel mode every
/// chapter download runs on its own spawned task with a clone of the same
/// `Arc<dyn Catalog>`.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search(&self, title: &str) -> Result<Vec<MangaSummary>, CatalogError>;

    /// Manga with the most recently uploaded chapters first.
    async fn latest(&self) -> Result<Vec<MangaSummary>, CatalogError>;

    async fn manga_details(&self, manga_id: &str) -> Result<MangaDetails, CatalogError>;

    /// Chapters of a manga in ascending catalog order.
    async fn list_chapters(&self, manga_id: &str) -> Result<Vec<Chapter>, CatalogError>;

    async fn fetch_chapter_pages(&self, chapter_id: &str) -> Result<Vec<ImageRef>, CatalogError>;

    async fn download_image(&self, image: &ImageRef) -> Result<Vec<u8>, CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct MangaSummary {
    id: String,
    title: String,
}

impl MangaSummary {
    pub fn new(id: impl ToString, title: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct MangaDetails {
    id: String,
    title: String,
    description: String,
    status: Option<String>,
    year: Option<u32>,
}

impl MangaDetails {
    pub fn new(id: impl ToString, title: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            status: None,
            year: None,
        }
    }

    pub fn with_description(mut self, description: impl ToString) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Chapter {
    id: String,
    /// Chapter number as displayed by the catalog, e.g. `"12"` or `"12.5"`.
    number: String,
    title: Option<String>,
}

impl Chapter {
    pub fn new(id: impl ToString, number: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            number: number.to_string(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl ToString) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Directory name used for this chapter below the output path.
    pub fn dir_name(&self) -> String {
        let name: String = self
            .id
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        match name.as_str() {
            "" | "." | ".." => format!("chapter_{name}"),
            _ => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct ImageRef {
    url: String,
}

impl ImageRef {
    pub fn new(url: impl ToString) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// File extension for the page, taken from the last url segment.
    pub fn extension(&self) -> &'static str {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        match file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
            Some(ext) if ext == "png" => "png",
            Some(ext) if ext == "jpeg" => "jpeg",
            Some(ext) if ext == "webp" => "webp",
            Some(ext) if ext == "gif" => "gif",
            _ => "jpg",
        }
    }
}
