use crate::error::Result;
use crate::snapshot::StatusSnapshot;
use async_trait::async_trait;

pub mod console;
pub mod json;

#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, snapshot: &StatusSnapshot) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
