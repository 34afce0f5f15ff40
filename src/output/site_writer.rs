use crate::output::rewrite::{LinkMap, LinkRewriter};
use crate::state::{CrawlState, PageRecord};
use crate::storage::write_atomic_async;
use crate::url::to_local_path;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Suffix of the un-rewritten copy kept beside each page in incremental mode
pub const PRISTINE_SUFFIX: &str = ".orig";

/// `<path>.orig`
pub fn pristine_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PRISTINE_SUFFIX);
    PathBuf::from(name)
}

/// Reads the stored markup of a page, preferring the pristine copy
///
/// Returns None when neither file can be read.
pub async fn load_local_page(output_dir: &Path, local_path: &Path) -> Option<String> {
    let page = output_dir.join(local_path);
    let pristine = pristine_path(&page);

    match tokio::fs::read(&pristine).await {
        Ok(bytes) => return Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            tracing::debug!("Could not read {}: {}", pristine.display(), e);
        }
        Err(_) => {}
    }

    match tokio::fs::read(&page).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::debug!("Could not read {}: {}", page.display(), e);
            None
        }
    }
}

/// Result of writing the page store
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub written: usize,
    /// (url, cause) for pages that could not be written
    pub failed: Vec<(String, String)>,
}

/// Writes crawled pages into the mirror with references rewritten
#[derive(Debug, Clone)]
pub struct SiteWriter {
    output_dir: PathBuf,
    keep_pristine: bool,
    rewriter: LinkRewriter,
}

impl SiteWriter {
    /// `keep_pristine` stores the original markup as `<page>.orig` as well
    pub fn new(output_dir: impl Into<PathBuf>, keep_pristine: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            keep_pristine,
            rewriter: LinkRewriter::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Everything the mirror contains after this run
    ///
    /// Pages from this run, the downloaded-file manifest, and pages visited
    /// by earlier runs whose file is still on disk.
    pub async fn link_map(&self, pages: &[PageRecord], state: &CrawlState) -> LinkMap {
        let mut links = LinkMap::new();

        let candidates: Vec<(String, PathBuf)> = state
            .visited_urls
            .iter()
            .filter_map(|visited| {
                let url = Url::parse(visited).ok()?;
                Some((visited.clone(), to_local_path(&url)))
            })
            .collect();
        let output_dir = self.output_dir.clone();
        let on_disk = tokio::task::spawn_blocking(move || {
            candidates
                .into_iter()
                .filter(|(_, local)| output_dir.join(local).is_file())
                .collect::<Vec<_>>()
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Checking earlier pages on disk failed: {}", e);
            Vec::new()
        });
        links.extend(on_disk);

        links.extend(
            state
                .downloaded_files
                .iter()
                .map(|(url, path)| (url.clone(), path.clone())),
        );
        for page in pages {
            links.insert(page.url.as_str(), page.local_path.clone());
        }

        links
    }

    /// Rewrites and writes one page, plus its pristine copy when enabled
    pub async fn write_page(&self, page: &PageRecord, links: &LinkMap) -> io::Result<()> {
        let target = self.output_dir.join(&page.local_path);
        let rewritten = self
            .rewriter
            .rewrite(&page.content, &page.final_url, &page.local_path, links)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        if self.keep_pristine {
            write_atomic_async(pristine_path(&target), page.content.clone().into_bytes()).await?;
        }
        write_atomic_async(target, rewritten.into_bytes()).await
    }

    /// Writes every page; a failed page is reported and the rest still written
    pub async fn write_all(&self, pages: &[PageRecord], links: &LinkMap) -> WriteSummary {
        let mut summary = WriteSummary::default();

        for page in pages {
            match self.write_page(page, links).await {
                Ok(()) => {
                    summary.written += 1;
                    tracing::debug!("Wrote {}", page.local_path_str());
                }
                Err(e) => {
                    tracing::error!("Failed to write {} for {}: {}", page.local_path_str(), page.url, e);
                    summary.failed.push((page.url.to_string(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "Wrote {} pages to {}",
            summary.written,
            self.output_dir.display()
        );
        summary
    }
}
