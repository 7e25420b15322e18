//! FileSink - appends frames to a JSON lines file

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use contracts::{ContractError, DataFrame, FrameSink};
use tracing::{debug, error, info, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Sink that writes one JSON object per line
///
/// The file is named after the first frame's source and the time it
/// arrived, e.g. `acc-20260101-120000.jsonl`.
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: None,
            path: None,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    /// Path of the file being written, once the first frame arrived
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn writer_for(&mut self, frame: &DataFrame) -> std::io::Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let file_name = format!("{}-{}.jsonl", frame.name, Utc::now().format("%Y%m%d-%H%M%S"));
            let path = self.config.base_path.join(file_name);
            let file = File::options().create(true).append(true).open(&path)?;
            info!(sink = %self.name, path = %path.display(), "output file opened");
            self.path = Some(path);
            self.writer = Some(BufWriter::new(file));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("writer unavailable"))
    }

    fn write_line(&mut self, frame: &DataFrame) -> std::io::Result<()> {
        let line = serde_json::to_vec(frame)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let writer = self.writer_for(frame)?;
        writer.write_all(&line)?;
        writer.write_all(b"\n")
    }
}

impl FrameSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_send",
        skip(self, frame),
        fields(sink = %self.name, source = %frame.name)
    )]
    async fn send(&mut self, frame: &DataFrame) -> Result<(), ContractError> {
        self.write_line(frame).map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.writer = None;
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_writes_json_lines() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            base_path: dir.path().to_path_buf(),
        };

        let mut sink = FileSink::new("test_file", config).unwrap();
        assert!(sink.path().is_none());

        let frame = DataFrame::new("outgauge", Utc::now());
        sink.send(&frame).await.unwrap();
        sink.send(&frame).await.unwrap();
        sink.close().await.unwrap();

        let path = sink.path().unwrap().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("outgauge-"));
        assert!(name.ends_with(".jsonl"));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["name"], "outgauge");
    }

    #[test]
    fn test_file_sink_default_base_path() {
        let config = FileSinkConfig::from_params(&HashMap::new());
        assert_eq!(config.base_path, PathBuf::from("./output"));
    }
}
