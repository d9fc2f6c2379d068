//! Raster fallback pipeline: office document -> PDF -> one PNG per slide.
//!
//! Every run works in its own temporary directory, which is removed on every
//! exit path when the [`TempDir`] guard drops.

use crate::cache::ImageCache;
use crate::tools::run_tool;
use chrono::Utc;
use deck_core::{validate_owner_id, Config, Error, RasterJobResult, Result};
use regex::Regex;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tempfile::TempDir;

/// Time bound for each conversion stage.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Rasterization resolution.
pub const DEFAULT_DPI: u32 = 150;

const SOFFICE_TOOL: &str = "LibreOffice (soffice)";
const PDFTOPPM_TOOL: &str = "pdftoppm";

const INPUT_NAME: &str = "deck.pptx";
const PDF_NAME: &str = "deck.pdf";
const PAGE_PREFIX: &str = "page";

/// pdftoppm names pages `{prefix}-{n}.png`, zero-padded to the page count width.
static PAGE_FILE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^page-(\d+)\.png$").unwrap());

/// External tool locations and limits.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub soffice_bin: PathBuf,
    pub pdftoppm_bin: PathBuf,
    pub timeout: Duration,
    pub dpi: u32,
    /// Parent of per-job temporary directories.
    pub temp_root: PathBuf,
}

impl ToolConfig {
    /// Tool paths from configuration, default limits, system temp directory.
    pub fn from_config(config: &Config) -> Self {
        Self {
            soffice_bin: config.soffice_bin.clone(),
            pdftoppm_bin: config.pdftoppm_bin.clone(),
            timeout: DEFAULT_TIMEOUT,
            dpi: DEFAULT_DPI,
            temp_root: std::env::temp_dir(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.max(1);
        self
    }

    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }
}

/// Converts an uploaded deck into cached slide images.
#[derive(Debug, Clone)]
pub struct RasterPipeline {
    tools: ToolConfig,
    cache: ImageCache,
}

impl RasterPipeline {
    pub fn new(tools: ToolConfig, cache: ImageCache) -> Self {
        Self { tools, cache }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn tools(&self) -> &ToolConfig {
        &self.tools
    }

    /// Run a job and fold any failure into a [`RasterJobResult`].
    pub fn run(&self, owner_id: &str, bytes: &[u8]) -> RasterJobResult {
        match self.render(owner_id, bytes) {
            Ok(count) => RasterJobResult::Rendered { count },
            Err(e) => {
                log::error!("Raster job for {} failed: {}", owner_id, e);
                RasterJobResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Render `bytes` into the image cache for `owner_id`.
    ///
    /// Blocks for up to two tool timeouts; run it on a worker that tolerates
    /// blocking. Returns the number of images stored.
    pub fn render(&self, owner_id: &str, bytes: &[u8]) -> Result<usize> {
        validate_owner_id(owner_id)?;

        fs::create_dir_all(&self.tools.temp_root)?;
        let workdir = tempfile::Builder::new()
            .prefix(&format!(
                "raster-{}-{}-",
                owner_id,
                Utc::now().format("%Y%m%d%H%M%S%3f")
            ))
            .tempdir_in(&self.tools.temp_root)?;
        log::debug!("Raster job for {} in {}", owner_id, workdir.path().display());

        let count = self.render_in(&workdir, owner_id, bytes)?;

        if let Err(e) = workdir.close() {
            log::warn!("Failed to remove raster temp directory: {}", e);
        }
        Ok(count)
    }

    fn render_in(&self, workdir: &TempDir, owner_id: &str, bytes: &[u8]) -> Result<usize> {
        let input = workdir.path().join(INPUT_NAME);
        fs::write(&input, bytes)?;

        let pdf = self.convert_to_pdf(workdir.path(), &input)?;
        let pages = self.convert_to_images(workdir.path(), &pdf)?;

        self.cache.store(owner_id, &pages)
    }

    fn convert_to_pdf(&self, workdir: &Path, input: &Path) -> Result<PathBuf> {
        // A private profile lets concurrent conversions run without LibreOffice's profile lock
        let profile_dir = fs::canonicalize(workdir)?.join("profile");
        let profile = format!("-env:UserInstallation={}", file_url(&profile_dir));

        run_tool(
            SOFFICE_TOOL,
            &self.tools.soffice_bin,
            &[
                OsStr::new("--headless"),
                OsStr::new(&profile),
                OsStr::new("--convert-to"),
                OsStr::new("pdf"),
                OsStr::new("--outdir"),
                workdir.as_os_str(),
                input.as_os_str(),
            ],
            self.tools.timeout,
        )?;

        // A zero exit code is not proof that a PDF was written
        let pdf = workdir.join(PDF_NAME);
        match fs::metadata(&pdf) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(pdf),
            _ => Err(Error::NoOutputProduced(format!(
                "{} exited successfully but wrote no PDF",
                SOFFICE_TOOL
            ))),
        }
    }

    fn convert_to_images(&self, workdir: &Path, pdf: &Path) -> Result<Vec<PathBuf>> {
        let dpi = self.tools.dpi.to_string();
        let prefix = workdir.join(PAGE_PREFIX);

        run_tool(
            PDFTOPPM_TOOL,
            &self.tools.pdftoppm_bin,
            &[
                OsStr::new("-png"),
                OsStr::new("-r"),
                OsStr::new(&dpi),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
            self.tools.timeout,
        )?;

        let pages = collect_pages(workdir)?;
        if pages.is_empty() {
            return Err(Error::NoOutputProduced(format!(
                "{} exited successfully but wrote no images",
                PDFTOPPM_TOOL
            )));
        }

        log::debug!("{} rendered {} pages", PDFTOPPM_TOOL, pages.len());
        Ok(pages)
    }
}

/// `file://` URL for an absolute path, percent-encoding each segment.
fn file_url(path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::Normal(part) => Some(urlencoding::encode(&part.to_string_lossy()).into_owned()),
            _ => None,
        })
        .collect();
    format!("file:///{}", segments.join("/"))
}

/// Page images in `dir`, sorted by the page number in their names.
fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<(u64, PathBuf)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(caps) = PAGE_FILE_REGEX.captures(name) {
            if let Ok(number) = caps[1].parse::<u64>() {
                pages.push((number, entry.path()));
            }
        }
    }

    pages.sort();
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}
