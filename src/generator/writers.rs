//! Output writers and the per-run writer cache.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::encoding::Encoding;

/// A buffered text file writer that encodes on write.
#[derive(Debug)]
pub struct TextWriter {
    path: PathBuf,
    encoding: Encoding,
    inner: Option<BufWriter<File>>,
}

impl TextWriter {
    /// Create (or truncate) `path`, creating missing parent directories.
    pub fn create(path: &Path, encoding: Encoding) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        tracing::debug!("Opened {} for writing ({})", path.display(), encoding.name());
        Ok(Self {
            path: path.to_path_buf(),
            encoding,
            inner: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        let encoded = self.encoding.encode(text);
        match self.inner.as_mut() {
            Some(writer) => writer.write_all(&encoded),
            None => Err(io::Error::other(format!("{} is already closed", self.path.display()))),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Flush and release the file. Closing twice is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut writer) => {
                writer.flush()?;
                writer.get_ref().sync_all()
            }
            None => Ok(()),
        }
    }
}

/// A cached writer shared by every render targeting the same path.
pub type SharedWriter = Arc<Mutex<TextWriter>>;

/// One output path bound to its open writer.
#[derive(Debug, Clone)]
pub struct OutputBinding {
    pub path: PathBuf,
    pub encoding: Encoding,
    writer: SharedWriter,
}

impl OutputBinding {
    pub fn writer(&self) -> SharedWriter {
        Arc::clone(&self.writer)
    }
}

/// Output path to open writer, for the lifetime of one run.
#[derive(Debug, Default)]
pub struct WriterCache {
    bindings: Mutex<HashMap<PathBuf, OutputBinding>>,
}

impl WriterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The writer for `path`, opening it on first use.
    ///
    /// Lookup and creation happen under one lock, so a path is opened at
    /// most once however many renders ask for it. A later request with a
    /// different encoding gets the existing writer.
    pub fn resolve(&self, path: &Path, encoding: Encoding) -> io::Result<SharedWriter> {
        let mut bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(binding) = bindings.get(path) {
            if binding.encoding != encoding {
                tracing::debug!(
                    "{} already open as {}, ignoring {}",
                    path.display(),
                    binding.encoding.name(),
                    encoding.name()
                );
            }
            return Ok(binding.writer());
        }

        let writer = Arc::new(Mutex::new(TextWriter::create(path, encoding)?));
        bindings.insert(
            path.to_path_buf(),
            OutputBinding {
                path: path.to_path_buf(),
                encoding,
                writer: Arc::clone(&writer),
            },
        );
        Ok(writer)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner).contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every cached writer and empty the cache.
    ///
    /// A writer that fails to flush or close is logged and skipped. Returns
    /// the paths that were open, sorted.
    pub fn shutdown(&self) -> Vec<PathBuf> {
        let drained: Vec<OutputBinding> = {
            let mut bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
            bindings.drain().map(|(_, binding)| binding).collect()
        };

        let mut paths = Vec::with_capacity(drained.len());
        for binding in drained {
            let mut writer = binding.writer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(err) = writer.close() {
                tracing::warn!("Failed to close {}: {}", binding.path.display(), err);
            }
            paths.push(binding.path.clone());
        }
        paths.sort();
        paths
    }
}
