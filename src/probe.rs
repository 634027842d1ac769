//! Foreground application probe.
//!
//! Asks the platform which application is currently visible. The production
//! probe shells out to `dumpsys` under root and scrapes the package name out
//! of the visible-activity line.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Marker for the line in `dumpsys` output naming the visible process
const VISIBLE_MARKER: &str = "visibleactivityprocess";

/// Source of the currently foregrounded package name
#[async_trait]
pub trait ForegroundProbe: Send + Sync {
    /// Return the foreground package, or None when it cannot be determined.
    /// Probe failures are never errors; unknown and "nothing tracked" are
    /// treated the same by the coordinator.
    async fn current_app(&self) -> Option<String>;
}

/// Production probe backed by `su -c "dumpsys activity activities"`
pub struct DumpsysProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    package_regex: Regex,
}

impl DumpsysProbe {
    pub fn new(timeout: Duration) -> Self {
        Self::with_command("su", &["-c", "dumpsys activity activities"], timeout)
    }

    fn with_command(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
            package_regex: package_regex(),
        }
    }
}

#[async_trait]
impl ForegroundProbe for DumpsysProbe {
    async fn current_app(&self) -> Option<String> {
        // kill_on_drop: a timed-out probe must not leave the platform
        // command running, or every poll cycle leaks one child
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let output = match output {
            Ok(Ok(o)) => o,
            Ok(Err(e)) => {
                warn!("foreground probe failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!("foreground probe timed out after {:?}", self.timeout);
                return None;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let package = parse_foreground_package(&stdout, &self.package_regex);
        debug!("foreground probe result: {:?}", package);
        package
    }
}

/// Pattern extracting the package name after the colon in the marker line
fn package_regex() -> Regex {
    Regex::new(r":([a-zA-Z.]+)").expect("invalid package regex")
}

/// Scan probe output for the visible-activity line and extract the package
fn parse_foreground_package(output: &str, package_regex: &Regex) -> Option<String> {
    let line = output
        .lines()
        .find(|line| line.to_lowercase().contains(VISIBLE_MARKER))?;

    package_regex
        .captures(line)
        .map(|caps| caps[1].to_string())
}
