//! The application-shell object: owns the live dataset and drives loads,
//! cache maintenance, lookups and export.

use crate::cache::CacheStore;
use crate::cache::DuckDbCacheStore;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::dataset::Row;
use crate::dataset::SourceKind;
use crate::error::ErrorKind;
use crate::error::LookupError;
use crate::lookup::LookupEngine;
use crate::source::cache_busted;
use crate::source::provenance_label;
use crate::source::DatasetSource;
use crate::source::HttpSource;
use crate::spreadsheet;
use log::error;
use log::info;
use log::warn;
use std::fmt;
use std::fmt::Display;
use std::io::BufRead;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// Load state of a session, as shown to the user.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadStatus {
    /// Nothing loaded yet, or state was reset
    Idle,
    Loading { source: SourceKind },
    Loaded { label: String, kind: SourceKind, rows: usize },
    Failed { kind: ErrorKind, source: SourceKind, message: String },
}

impl LoadStatus {
    /// Export is only offered while a dataset is loaded
    pub fn export_enabled(&self) -> bool {
        matches!(self, LoadStatus::Loaded { .. })
    }
}

impl Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Idle => write!(f, "No data loaded."),
            LoadStatus::Loading { source: SourceKind::LocalUpload } => write!(f, "Loading local file..."),
            LoadStatus::Loading { .. } => write!(f, "Loading data from remote source..."),
            LoadStatus::Loaded { label, kind: SourceKind::Remote, .. } => write!(f, "Loaded File (from remote): {}", label),
            LoadStatus::Loaded { label, kind: SourceKind::LocalUpload, .. } => {
                write!(f, "Loaded File (from local upload): {}", label)
            }
            LoadStatus::Loaded { label, kind: SourceKind::Cache, .. } => write!(f, "Loaded from cache: {}", label),
            LoadStatus::Failed { source: SourceKind::LocalUpload, message, .. } => {
                write!(f, "Failed to read local file: {}", message)
            }
            LoadStatus::Failed { message, .. } => write!(f, "Failed to load from remote source: {}", message),
        }
    }
}

/// Supplies decoded codes from a scanning device.
pub trait ScanInput {
    /// Next decoded code, or `None` once the input is exhausted.
    fn next_code(&mut self) -> Result<Option<String>, LookupError>;
}

/// Treats each non-blank line of a reader as one scanned code.
///
/// Hardware barcode scanners in keyboard mode produce exactly this.
pub struct LineScanner<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineScanner<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> ScanInput for LineScanner<R> {
    fn next_code(&mut self) -> Result<Option<String>, LookupError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).map_err(|e| LookupError::io("scan input", e))?;
            if read == 0 {
                return Ok(None);
            }
            let code = line.trim();
            if !code.is_empty() {
                return Ok(Some(code.to_owned()));
            }
        }
    }
}

/// A scanned code and the row it resolved to
#[derive(Debug)]
pub struct ScanOutcome<'a> {
    pub code: String,
    pub row: Option<&'a Row>,
}

type StatusListener = Box<dyn FnMut(&LoadStatus)>;

/// Owns the live dataset and orchestrates source, decoder, cache and lookup.
pub struct LoaderSession {
    config: Config,
    engine: LookupEngine,
    source: Box<dyn DatasetSource>,
    cache: Box<dyn CacheStore>,
    dataset: Arc<Dataset>,
    status: LoadStatus,
    listener: Option<StatusListener>,
}

impl LoaderSession {
    pub fn new(config: Config, source: Box<dyn DatasetSource>, cache: Box<dyn CacheStore>) -> Self {
        Self {
            engine: LookupEngine::from_config(&config),
            config,
            source,
            cache,
            dataset: Arc::new(Dataset::empty(SourceKind::Remote)),
            status: LoadStatus::Idle,
            listener: None,
        }
    }

    /// Builds a session with the HTTP source and the on-disk cache named by `config`
    pub fn from_config(config: Config) -> Result<Self, LookupError> {
        let source = HttpSource::new(config.timeout())?;
        let cache = DuckDbCacheStore::open(&config.cache_file())?;
        Ok(Self::new(config, Box::new(source), Box::new(cache)))
    }

    /// Registers a callback invoked on every status change
    pub fn with_status_listener(mut self, listener: impl FnMut(&LoadStatus) + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Restores the cached dataset, or loads from the remote source on a miss.
    ///
    /// A pending force-reload request skips the cache once.
    pub fn startup(&mut self) -> &LoadStatus {
        let force_reload = self.cache.take_reload_request().unwrap_or_else(|e| {
            warn!("Cannot read reload flag: {}", e);
            false
        });
        let cached = if force_reload {
            info!("Reload requested, skipping cache");
            None
        } else {
            self.cache.load()
        };

        match cached {
            Some(dataset) => self.install(dataset),
            // The failure is recorded in the status
            None => {
                let _ = self.load_remote();
            }
        }
        &self.status
    }

    /// Fetches and decodes the configured remote spreadsheet
    pub fn load_remote(&mut self) -> Result<(), LookupError> {
        let url = self.config.remote_url.clone();
        self.load_remote_url(&url)
    }

    /// Fetches and decodes a remote spreadsheet, replacing the live dataset on success
    pub fn load_remote_url(&mut self, url: &str) -> Result<(), LookupError> {
        self.set_status(LoadStatus::Loading { source: SourceKind::Remote });
        let result = cache_busted(url)
            .and_then(|request_url| self.source.fetch_remote(&request_url))
            .and_then(|bytes| {
                let label = provenance_label(url, &self.config.default_file_name);
                decode(&bytes, label, SourceKind::Remote)
            });
        self.finish_load(result, SourceKind::Remote)
    }

    /// Reads and decodes a local spreadsheet, replacing the live dataset on success
    pub fn load_local(&mut self, path: &Path) -> Result<(), LookupError> {
        self.set_status(LoadStatus::Loading { source: SourceKind::LocalUpload });
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = provenance_label(&file_name, &self.config.default_file_name);
        let result = self
            .source
            .read_local(path)
            .and_then(|bytes| decode(&bytes, label, SourceKind::LocalUpload));
        self.finish_load(result, SourceKind::LocalUpload)
    }

    /// Drops the cached record, then reloads from the remote source
    pub fn clear_cache(&mut self) -> Result<(), LookupError> {
        self.cache.clear()?;
        self.load_remote()
    }

    /// Removes all cached state and asks the next startup to reload from the remote source
    pub fn reset(&mut self) -> Result<(), LookupError> {
        self.cache.reset()?;
        self.cache.request_reload()?;
        self.dataset = Arc::new(Dataset::empty(SourceKind::Remote));
        self.set_status(LoadStatus::Idle);
        Ok(())
    }

    /// Exact lookup of a coil number in the live dataset
    pub fn lookup(&self, query: &str) -> Option<&Row> {
        self.engine.lookup(&self.dataset, query)
    }

    /// Suggestions for a partial coil number; `limit` overrides the configured one
    pub fn suggest(&self, partial: &str, limit: Option<usize>) -> Vec<String> {
        self.engine.suggest(&self.dataset, partial, limit)
    }

    /// Reads one code from a scanner and looks it up like typed input
    pub fn scan_with(&self, input: &mut dyn ScanInput) -> Result<Option<ScanOutcome<'_>>, LookupError> {
        let Some(code) = input.next_code()? else {
            return Ok(None);
        };
        let row = self.lookup(&code);
        Ok(Some(ScanOutcome { code, row }))
    }

    /// Writes the live dataset as xlsx into `dir`, named after its label.
    ///
    /// # Returns
    /// Path of the written file
    pub fn export(&self, dir: &Path) -> Result<PathBuf, LookupError> {
        let bytes = spreadsheet::encode(&self.dataset, &self.config.export_sheet_name)
            .map_err(LookupError::EncodeError)?;
        // Labels may come from the cache database; keep the file inside `dir`
        let file_name = provenance_label(self.dataset.label(), &self.config.export_file_name);
        let path = dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| LookupError::io(path.display(), e))?;
        info!("Exported {} rows to '{}'", self.dataset.len(), path.display());
        Ok(path)
    }

    /// Snapshot of the live dataset
    pub fn dataset(&self) -> Arc<Dataset> {
        Arc::clone(&self.dataset)
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn finish_load(&mut self, result: Result<Dataset, LookupError>, source: SourceKind) -> Result<(), LookupError> {
        match result {
            Ok(dataset) => {
                if let Err(e) = self.cache.save(&dataset) {
                    warn!("Cannot cache '{}': {}", dataset.label(), e);
                }
                self.install(dataset);
                Ok(())
            }
            Err(e) => {
                error!("Load failed: {}", e);
                self.dataset = Arc::new(Dataset::empty(source));
                self.set_status(LoadStatus::Failed {
                    kind: e.kind(),
                    source,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn install(&mut self, dataset: Dataset) {
        let status = LoadStatus::Loaded {
            label: dataset.label().to_owned(),
            kind: dataset.kind(),
            rows: dataset.len(),
        };
        self.dataset = Arc::new(dataset);
        self.set_status(status);
    }

    fn set_status(&mut self, status: LoadStatus) {
        info!("{}", status);
        if let Some(listener) = self.listener.as_mut() {
            listener(&status);
        }
        self.status = status;
    }
}

fn decode(bytes: &[u8], label: String, kind: SourceKind) -> Result<Dataset, LookupError> {
    spreadsheet::decode(bytes, &label, kind).map_err(|source| LookupError::DecodeError { label, source })
}

/// Renders a row as `Field: Value` lines with trimmed field names
pub fn format_row(row: &Row) -> String {
    row.iter()
        .map(|(name, value)| format!("{}: {}", name.trim(), value))
        .collect::<Vec<_>>()
        .join("\n")
}
