use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{CommandOutput, Sandbox};

/// Drives an X11 display on this machine with `sh`, `xdotool` and
/// ImageMagick's `import`.
#[derive(Debug, Clone)]
pub struct LocalSandbox {
    display: String,
}

impl LocalSandbox {
    pub fn new<S: Into<String>>(display: S) -> Self {
        Self {
            display: display.into(),
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    fn command(&self, program: &str) -> Command {
        let mut command = Command::new(program);
        command.env("DISPLAY", &self.display);
        command
    }

    async fn xdotool(&self, args: &[&str]) -> Result<()> {
        let output = self
            .command("xdotool")
            .args(args)
            .output()
            .await
            .context("Failed to run xdotool")?;

        if !output.status.success() {
            bail!(
                "xdotool {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Translate key names like `Ctl-C` or `ctrl+alt+Delete` into xdotool's
/// `ctrl+c` form. Single characters pass through untouched.
fn xdotool_key(name: &str) -> String {
    if name.chars().count() <= 1 {
        return name.to_string();
    }

    name.split(['+', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| match part.to_lowercase().as_str() {
            "ctl" | "ctrl" | "control" => "ctrl".to_string(),
            "alt" | "option" => "alt".to_string(),
            "shift" => "shift".to_string(),
            "super" | "win" | "cmd" | "meta" => "super".to_string(),
            "enter" | "return" => "Return".to_string(),
            "esc" | "escape" => "Escape".to_string(),
            "tab" => "Tab".to_string(),
            "space" => "space".to_string(),
            "backspace" => "BackSpace".to_string(),
            "del" | "delete" => "Delete".to_string(),
            _ if part.len() == 1 => part.to_lowercase(),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join("+")
}

fn chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[async_trait]
impl Sandbox for LocalSandbox {
    async fn screenshot(&self) -> Result<Vec<u8>> {
        let output = self
            .command("import")
            .args(["-window", "root", "png:-"])
            .output()
            .await
            .context("Failed to run import for a screenshot")?;

        if !output.status.success() || output.stdout.is_empty() {
            bail!(
                "Screenshot of display {} failed: {}",
                self.display,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.stdout)
    }

    async fn run_command(&self, command: &str, timeout: Duration) -> Result<CommandOutput> {
        let mut child = self.command("sh");
        child
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, child.output())
            .await
            .map_err(|_| anyhow!("Command timed out after {}s", timeout.as_secs()))?
            .context("Failed to execute command")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn run_background_command(&self, command: &str) -> Result<()> {
        self.command("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to start background command")?;
        Ok(())
    }

    async fn move_mouse(&self, x: i64, y: i64) -> Result<()> {
        self.xdotool(&["mousemove", &x.to_string(), &y.to_string()])
            .await
    }

    async fn left_click(&self) -> Result<()> {
        self.xdotool(&["click", "1"]).await
    }

    async fn double_click(&self) -> Result<()> {
        self.xdotool(&["click", "--repeat", "2", "1"]).await
    }

    async fn right_click(&self) -> Result<()> {
        self.xdotool(&["click", "3"]).await
    }

    async fn type_text(&self, text: &str, chunk_size: usize, delay_ms: u64) -> Result<()> {
        let delay = delay_ms.to_string();
        for chunk in chunks(text, chunk_size) {
            self.xdotool(&["type", "--delay", &delay, "--", &chunk])
                .await?;
        }
        Ok(())
    }

    async fn press_key(&self, name: &str) -> Result<()> {
        self.xdotool(&["key", "--", &xdotool_key(name)]).await
    }

    async fn set_timeout(&self, _seconds: u64) -> Result<()> {
        // a local display does not expire
        Ok(())
    }
}
