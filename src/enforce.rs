//! Enforcement actions: killing a package's process and toasting the user.
//!
//! Both are best-effort platform commands. A failed kill or toast is logged
//! and otherwise ignored; the limit/ban bookkeeping in the record stays
//! authoritative either way.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Side-effecting actions taken when a limit is hit or a ban is re-entered
#[async_trait]
pub trait Enforcer: Send + Sync {
    /// Terminate the package's process
    async fn kill(&self, package: &str);
    /// Show a short message to the user
    async fn notify(&self, message: &str);
    /// Show a short message anchored to the bottom of the screen, for
    /// status toasts that should not cover what the user is doing
    async fn notify_bottom(&self, message: &str);
}

/// Production enforcer using `sudo pkill` and `termux-toast`
pub struct TermuxEnforcer;

#[async_trait]
impl Enforcer for TermuxEnforcer {
    async fn kill(&self, package: &str) {
        debug!("killing {}", package);
        match Command::new("sudo").args(["pkill", package]).output().await {
            Ok(output) if !output.status.success() => {
                warn!("pkill {} exited with {:?}", package, output.status.code());
            }
            Ok(_) => {}
            Err(e) => warn!("failed to run pkill for {}: {}", package, e),
        }
    }

    async fn notify(&self, message: &str) {
        toast(&[], message).await;
    }

    async fn notify_bottom(&self, message: &str) {
        toast(&["-g", "bottom"], message).await;
    }
}

async fn toast(extra_args: &[&str], message: &str) {
    let result = Command::new("termux-toast")
        .args(["-b", "black", "-c", "white"])
        .args(extra_args)
        .arg(message)
        .output()
        .await;

    if let Err(e) = result {
        warn!("failed to show toast: {}", e);
    }
}
