#![allow(dead_code)]

use async_trait::async_trait;
use mgcli::{Catalog, CatalogError, Chapter, ImageRef, MangaDetails, MangaSummary};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory catalog with one manga, `M1`, whose chapters have ids `c1`, `c2`...
#[derive(Default)]
pub struct MockCatalog {
    chapters: Vec<Chapter>,
    pages: usize,
    failing: HashSet<String>,
    broken_images: HashSet<String>,
    without_pages: HashSet<String>,
    delays: HashMap<String, Duration>,
    fetch_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCatalog {
    pub fn new(chapters: usize, pages: usize) -> Self {
        Self {
            chapters: (1..=chapters)
                .map(|i| Chapter::new(format!("c{i}"), i))
                .collect(),
            pages,
            ..Default::default()
        }
    }

    /// Makes the page listing of chapter `n` fail.
    pub fn failing(mut self, n: usize) -> Self {
        self.failing.insert(format!("c{n}"));
        self
    }

    /// Makes every image download of chapter `n` fail.
    pub fn broken_images(mut self, n: usize) -> Self {
        self.broken_images.insert(format!("c{n}"));
        self
    }

    /// Gives chapter `n` an empty page list.
    pub fn without_pages(mut self, n: usize) -> Self {
        self.without_pages.insert(format!("c{n}"));
        self
    }

    /// Delays the page listing of chapter `n`.
    pub fn delay(mut self, n: usize, millis: u64) -> Self {
        self.delays.insert(format!("c{n}"), Duration::from_millis(millis));
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn search(&self, title: &str) -> Result<Vec<MangaSummary>, CatalogError> {
        if title.to_lowercase().contains("cafe") {
            Ok(vec![
                MangaSummary::new("M1", "The Cafe Terrace"),
                MangaSummary::new("M2", "Cafe Stories"),
            ])
        } else {
            Ok(Vec::new())
        }
    }

    async fn latest(&self) -> Result<Vec<MangaSummary>, CatalogError> {
        Ok(vec![
            MangaSummary::new("M2", "Cafe Stories"),
            MangaSummary::new("M1", "The Cafe Terrace"),
        ])
    }

    async fn manga_details(&self, manga_id: &str) -> Result<MangaDetails, CatalogError> {
        match manga_id {
            "M1" => Ok(MangaDetails::new("M1", "The Cafe Terrace")
                .with_status("ongoing")
                .with_description("A cafe by the sea.")),
            other => Err(CatalogError::NotFound(other.to_string())),
        }
    }

    async fn list_chapters(&self, manga_id: &str) -> Result<Vec<Chapter>, CatalogError> {
        match manga_id {
            "M1" => Ok(self.chapters.clone()),
            other => Err(CatalogError::NotFound(other.to_string())),
        }
    }

    async fn fetch_chapter_pages(&self, chapter_id: &str) -> Result<Vec<ImageRef>, CatalogError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(chapter_id.to_string());
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(chapter_id) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(chapter_id) {
            return Err(CatalogError::Other(format!("{chapter_id} is unavailable")));
        }
        if self.without_pages.contains(chapter_id) {
            return Ok(Vec::new());
        }
        Ok((0..self.pages)
            .map(|i| ImageRef::new(format!("https://img.test/{chapter_id}/{i}.png")))
            .collect())
    }

    async fn download_image(&self, image: &ImageRef) -> Result<Vec<u8>, CatalogError> {
        let broken = self
            .broken_images
            .iter()
            .any(|id| image.url().contains(&format!("/{id}/")));
        if broken {
            return Err(CatalogError::Other(format!("{} is gone", image.url())));
        }
        Ok(image.url().as_bytes().to_vec())
    }
}

/// Number of files directly inside `dir`, 0 when it does not exist.
pub fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter(|e| e.as_ref().is_ok_and(|e| e.path().is_file())).count())
        .unwrap_or(0)
}
