use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

use crate::errors::CoreError;

/// Opens a URL outside the panel, normally in the user's browser.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self, url: &str) -> Result<(), CoreError>;
}

/// Runs `<program> <url>`.
///
/// The call returns once the program has started. A background task waits
/// for it to exit so no zombie is left behind.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandLauncher {
    fn default() -> Self {
        Self::new("xdg-open")
    }
}

#[async_trait]
impl BrowserLauncher for CommandLauncher {
    async fn open(&self, url: &str) -> Result<(), CoreError> {
        let mut child = Command::new(&self.program).arg(url).spawn()?;
        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("{program} exited"),
                Ok(status) => warn!("{program} exited with {status}"),
                Err(e) => warn!("failed to wait for {program}: {e}"),
            }
        });
        Ok(())
    }
}
