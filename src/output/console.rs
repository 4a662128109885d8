use super::OutputHandler;
use crate::error::{Error, Result};
use crate::snapshot::StatusSnapshot;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }

    /// Single line describing a snapshot.
    pub fn render(snapshot: &StatusSnapshot) -> String {
        let time = snapshot.timestamp.format("%H:%M:%S");
        match (&snapshot.payload, snapshot.server_info()) {
            (None, _) => format!(
                "[{}] unavailable: failed to reach backend ({}ms)",
                time, snapshot.duration_ms
            ),
            (Some(_), Some(info)) => format!("[{}] {} ({}ms)", time, info.summary(), snapshot.duration_ms),
            (Some(payload), None) => format!("[{}] {} ({}ms)", time, payload, snapshot.duration_ms),
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl OutputHandler for ConsoleOutput {
    async fn write(&mut self, snapshot: &StatusSnapshot) -> Result<()> {
        let line = Self::render(snapshot);

        if let Some(multi) = &self.multi {
            multi
                .println(line)
                .map_err(|e| Error::Internal(e.to_string()))?;
        } else {
            println!("{}", line);
        }
        Ok(())
    }
}
