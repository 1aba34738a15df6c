//! FileTransport - appends batches to a JSON-lines file

use contracts::{Batch, BatchTransport, ContractError};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Transport that writes one JSON document per line
pub struct FileTransport {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileTransport {
    /// Open (or create) the output file in append mode
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_batch(&mut self, batch: &Batch) -> Result<(), ContractError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            ContractError::transport_unavailable(&self.name, "transport already closed")
        })?;

        serde_json::to_writer(&mut *writer, batch)
            .map_err(|e| ContractError::Encode(e.to_string()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl BatchTransport for FileTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_transport_send",
        skip(self, batch),
        fields(transport = %self.name, number = batch.number())
    )]
    async fn send(&mut self, batch: &Batch) -> Result<(), ContractError> {
        self.append_batch(batch).map_err(|e| {
            error!(transport = %self.name, number = batch.number(), error = %e, "Write failed");
            ContractError::transport_send(&self.name, batch.number(), e.to_string())
        })
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    #[instrument(name = "file_transport_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        debug!(transport = %self.name, path = %self.path.display(), "FileTransport closed");
        Ok(())
    }
}
