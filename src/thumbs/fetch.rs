/// Remote-source thumbnails
///
/// For catalogs without local artwork: download each record's `URL`, render
/// one square thumbnail, and point `thumbnailURL` at it. Files are named from
/// the mint address and a hash of the URL so a changed URL gets a new file.

use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use super::render::Renderer;
use super::THUMBNAIL_URL_ROOT;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::write_atomic;

/// Largest response body accepted, in bytes
const MAX_DOWNLOAD: u64 = 64 * 1024 * 1024;

const USER_AGENT: &str = concat!("gallery-thumbs/", env!("CARGO_PKG_VERSION"));

/// Something that turns a URL into encoded image bytes
pub trait ImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP source with bounded timeouts
pub struct HttpSource {
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10).min(timeout))
            .timeout_read(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }
}

impl ImageSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_err = |reason: String| Error::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self.agent.get(url).call().map_err(|error| match error {
            ureq::Error::Status(code, _) => fetch_err(format!("HTTP {code}")),
            ureq::Error::Transport(transport) => fetch_err(transport.to_string()),
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_DOWNLOAD)
            .read_to_end(&mut bytes)
            .map_err(|e| fetch_err(format!("read failed: {e}")))?;
        if bytes.is_empty() {
            return Err(fetch_err("empty response".to_string()));
        }
        Ok(bytes)
    }
}

/// `<first 8 chars of mint>_<first 8 hex digits of md5(url)>.jpg`
pub fn fetch_file_name(mint: &str, url: &str) -> String {
    let prefix: String = mint.chars().take(8).collect();
    let digest = format!("{:x}", md5::compute(url.as_bytes()));
    format!("{}_{}.jpg", prefix, &digest[..8])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    /// Records with both `URL` and `mintAddress`
    pub processed: usize,
    /// Records now pointing at a local thumbnail (fresh or reused)
    pub updated: usize,
    /// Records that already had sized thumbnails
    pub skipped: usize,
    pub failed: usize,
}

/// Fetch and render one thumbnail per eligible record.
///
/// Per-record failures fall back to the remote URL and are counted; only a
/// missing thumbnail directory that cannot be created is fatal.
pub fn fetch_catalog(
    catalog: &mut Catalog,
    config: &Config,
    source: &dyn ImageSource,
    limit: Option<usize>,
) -> Result<FetchReport> {
    let dir = config.fetch_dir();
    std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    let renderer = Renderer::new(config.quality, config.background);
    let edge = config.fetch.size.max(1);
    let total = catalog.len();
    let mut report = FetchReport::default();

    for (i, record) in catalog
        .records_mut()
        .iter_mut()
        .enumerate()
        .take(limit.unwrap_or(usize::MAX))
    {
        if i % 100 == 0 {
            log::info!("Processing {}/{}...", i, total);
        }

        let url = record.remote_url().to_string();
        let mint = record.mint_address().to_string();
        if url.is_empty() || mint.is_empty() {
            continue;
        }
        report.processed += 1;

        // Sized thumbnails win; overwriting thumbnailURL would break the pair
        if record.has_thumbnail_urls() {
            report.skipped += 1;
            continue;
        }

        let file_name = fetch_file_name(&mint, &url);
        let target = dir.join(&file_name);
        let local_url = format!("{}/{}", THUMBNAIL_URL_ROOT, file_name);

        if target.is_file() {
            record.set_thumbnail_url(local_url);
            report.updated += 1;
            continue;
        }

        match fetch_one(source, &renderer, &url, &target, edge) {
            Ok(()) => {
                record.set_thumbnail_url(local_url);
                report.updated += 1;
            }
            Err(e) => {
                log::warn!("{}", e);
                record.set_thumbnail_url(url);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn fetch_one(
    source: &dyn ImageSource,
    renderer: &Renderer,
    url: &str,
    target: &Path,
    edge: u32,
) -> Result<()> {
    let bytes = source.fetch(url)?;
    let jpeg = renderer.render_bytes(&bytes, (edge, edge), Path::new(url))?;
    write_atomic(target, &jpeg)
}
