//! The desktop the agent operates.
//!
//! The agent never owns the desktop's lifecycle; it only drives it through
//! this trait. [`local::LocalSandbox`] drives an X11 display on this machine.
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

pub mod local;

/// Captured output of a finished shell command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Both streams joined with a newline, or whichever one has content
    pub fn combined(&self) -> Option<String> {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => Some(format!("{}\n{}", self.stdout, self.stderr)),
            (false, true) => Some(self.stdout.clone()),
            (true, false) => Some(self.stderr.clone()),
            (true, true) => None,
        }
    }
}

#[async_trait]
pub trait Sandbox: Send + Sync {
    /// PNG (or JPEG) bytes of the whole screen
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn run_command(&self, command: &str, timeout: Duration) -> Result<CommandOutput>;

    /// Start a command and return without waiting for it
    async fn run_background_command(&self, command: &str) -> Result<()>;

    async fn move_mouse(&self, x: i64, y: i64) -> Result<()>;

    async fn left_click(&self) -> Result<()>;

    async fn double_click(&self) -> Result<()>;

    async fn right_click(&self) -> Result<()>;

    /// Type `text` in chunks of `chunk_size` characters, `delay_ms` apart
    async fn type_text(&self, text: &str, chunk_size: usize, delay_ms: u64) -> Result<()>;

    async fn press_key(&self, name: &str) -> Result<()>;

    /// Keep the sandbox alive for at least another `seconds`
    async fn set_timeout(&self, seconds: u64) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let output = |stdout: &str, stderr: &str| CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };

        assert_eq!(output("out", "err").combined().as_deref(), Some("out\nerr"));
        assert_eq!(output("out", "").combined().as_deref(), Some("out"));
        assert_eq!(output("", "err").combined().as_deref(), Some("err"));
        assert_eq!(output("", "").combined(), None);
    }
}
