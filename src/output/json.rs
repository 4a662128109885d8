use super::OutputHandler;
use crate::error::Result;
use crate::snapshot::StatusSnapshot;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes every snapshot of a session into one JSON array, one snapshot per
/// line. Each write is flushed, so an interrupted session leaves every
/// snapshot it saw on disk with only the closing bracket missing.
pub struct JsonOutput {
    writer: BufWriter<File>,
    written: usize,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        write!(writer, "[")?;
        writer.flush()?;

        Ok(Self { writer, written: 0 })
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn write(&mut self, snapshot: &StatusSnapshot) -> Result<()> {
        let separator = if self.written == 0 { "\n" } else { ",\n" };
        self.writer.write_all(separator.as_bytes())?;
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        writeln!(self.writer, "\n]")?;
        self.writer.flush()?;
        log::debug!("Wrote {} snapshots", self.written);
        Ok(())
    }
}
