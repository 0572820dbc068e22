use super::catalog::{Catalog, Chapter};
use super::fetcher::{ChapterDownload, ChapterFetcher, FetchFailure};
use super::selection::ChapterSelection;
use futures::stream::{FuturesUnordered, StreamExt};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower::{Service, ServiceExt};
use tracing::{debug, info, instrument, warn};

/// One selected chapter on its way to disk.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub manga_id: String,
    pub chapter: Chapter,
    /// Position inside the selection, starting at 0.
    pub sequence: usize,
    pub destination: PathBuf,
}

impl DownloadTask {
    pub fn new(manga_id: &str, chapter: Chapter, sequence: usize, output: &Path) -> Self {
        let destination = output.join(chapter.dir_name());
        Self {
            manga_id: manga_id.to_string(),
            chapter,
            sequence,
            destination,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output: PathBuf,
    pub sequential: bool,
    pub ignore_errors: bool,
    /// Upper bound of chapters in flight in parallel mode, unbounded if `None`.
    pub max_concurrency: Option<NonZeroUsize>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from("."),
            sequential: true,
            ignore_errors: false,
            max_concurrency: None,
        }
    }
}

impl DownloadOptions {
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: Option<NonZeroUsize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }
}

#[derive(Debug)]
pub struct FailedChapter {
    pub chapter: Chapter,
    pub cause: FetchFailure,
}

/// Outcome of a whole run, succeeded and failed chapters both in selection order.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub succeeded: Vec<(Chapter, ChapterDownload)>,
    pub failed: Vec<FailedChapter>,
}

impl DownloadReport {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total_pages(&self) -> usize {
        self.succeeded.iter().map(|(_, d)| d.pages).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, chapter: Chapter, result: Result<ChapterDownload, FetchFailure>) {
        match result {
            Ok(download) => self.succeeded.push((chapter, download)),
            Err(cause) => self.failed.push(FailedChapter { chapter, cause }),
        }
    }
}

/// First failure of a run that does not ignore errors.
#[derive(Debug, thiserror::Error)]
#[error("failed to download chapter {} ({}): {cause}", .chapter.number(), .chapter.id())]
pub struct FatalError {
    pub chapter: Chapter,
    #[source]
    pub cause: FetchFailure,
}

struct Progress {
    done: AtomicUsize,
    total: usize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
        }
    }

    fn complete(&self, task: &DownloadTask, result: &Result<ChapterDownload, FetchFailure>) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        match result {
            Ok(download) => info!(
                chapter = %task.chapter.number(),
                pages = download.pages,
                "downloaded chapter ({done}/{})",
                self.total
            ),
            Err(cause) => warn!(
                chapter = %task.chapter.number(),
                %cause,
                "failed chapter ({done}/{})",
                self.total
            ),
        }
    }
}

/// Drives the chapter downloads of one selection.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    fetcher: ChapterFetcher,
}

impl Orchestrator {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            fetcher: ChapterFetcher::new(catalog),
        }
    }

    #[instrument(skip(self, selection), fields(chapters = selection.len()))]
    pub async fn download(
        &self,
        manga_id: &str,
        selection: ChapterSelection<Chapter>,
        options: &DownloadOptions,
    ) -> Result<DownloadReport, FatalError> {
        let tasks: Vec<DownloadTask> = selection
            .into_iter()
            .enumerate()
            .map(|(sequence, chapter)| {
                DownloadTask::new(manga_id, chapter, sequence, &options.output)
            })
            .collect();

        if options.sequential {
            self.download_sequential(tasks, options.ignore_errors).await
        } else {
            self.download_parallel(tasks, options).await
        }
    }

    async fn download_sequential(
        &self,
        tasks: Vec<DownloadTask>,
        ignore_errors: bool,
    ) -> Result<DownloadReport, FatalError> {
        let progress = Progress::new(tasks.len());
        let mut report = DownloadReport::default();
        for task in tasks {
            let result = run_task(self.fetcher.clone(), &progress, task.clone()).await;
            match result {
                Err(cause) if !ignore_errors => {
                    return Err(FatalError {
                        chapter: task.chapter,
                        cause,
                    })
                }
                result => report.record(task.chapter, result),
            }
        }
        Ok(report)
    }

    async fn download_parallel(
        &self,
        tasks: Vec<DownloadTask>,
        options: &DownloadOptions,
    ) -> Result<DownloadReport, FatalError> {
        let progress = Arc::new(Progress::new(tasks.len()));
        let limit = options
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.get())));

        let abort_on_failure = !options.ignore_errors;

        let chapters: Vec<Chapter> = tasks.iter().map(|t| t.chapter.clone()).collect();
        let mut running: FuturesUnordered<_> = tasks
            .into_iter()
            .map(|task| {
                let sequence = task.sequence;
                let fetcher = self.fetcher.clone();
                let progress = progress.clone();
                let limit = limit.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match &limit {
                        Some(limit) => match limit.clone().acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(e) => return Err(FetchFailure::Interrupted(e.to_string())),
                        },
                        None => None,
                    };
                    let result = run_task(fetcher, &progress, task).await;
                    // Closed while the permit is still held, so no queued
                    // chapter can start once the run is aborting.
                    if result.is_err() && abort_on_failure {
                        if let Some(limit) = &limit {
                            limit.close();
                        }
                    }
                    result
                });
                async move {
                    let result = handle
                        .await
                        .unwrap_or_else(|e| Err(FetchFailure::Interrupted(e.to_string())));
                    (sequence, result)
                }
            })
            .collect();
        debug!(tasks = chapters.len(), "dispatched all chapters");

        let mut results: Vec<Option<Result<ChapterDownload, FetchFailure>>> =
            chapters.iter().map(|_| None).collect();
        while let Some((sequence, result)) = running.next().await {
            match result {
                Err(cause) if abort_on_failure => {
                    if let Some(limit) = &limit {
                        limit.close();
                    }
                    // Chapters already fetching finish writing before the
                    // error is handed back, queued ones fail to get a permit.
                    let unfinished = running.len();
                    while running.next().await.is_some() {}
                    debug!(unfinished, "drained chapters after failure");
                    return Err(FatalError {
                        chapter: chapters[sequence].clone(),
                        cause,
                    });
                }
                result => results[sequence] = Some(result),
            }
        }

        let mut report = DownloadReport::default();
        for (chapter, result) in chapters.into_iter().zip(results) {
            if let Some(result) = result {
                report.record(chapter, result);
            }
        }
        Ok(report)
    }
}

async fn run_task(
    mut fetcher: ChapterFetcher,
    progress: &Progress,
    task: DownloadTask,
) -> Result<ChapterDownload, FetchFailure> {
    debug!(chapter = %task.chapter.number(), sequence = task.sequence, "fetching chapter");
    let result = match fetcher.ready().await {
        Ok(service) => service.call(task.clone()).await,
        Err(e) => Err(e),
    };
    progress.complete(&task, &result);
    result
}
