use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// A usage record shared between the coordinator and a monitor task
pub type SharedRecord = Arc<Mutex<UsageRecord>>;

/// Timing and ban state for one tracked package.
///
/// Records are created the first time a package is seen in the foreground
/// and live for the lifetime of the process. The coordinator owns the
/// record table; a monitor task borrows one record while the package is
/// foreground and mutates its timing fields under the lock.
#[derive(Debug)]
pub struct UsageRecord {
    /// Package name, unique per record
    pub package: String,
    /// When the current session began; None after a limit was hit
    pub session_start: Option<Instant>,
    /// Active (non-paused) time accumulated this session
    pub accumulated_active: Duration,
    /// Whether a monitor task is currently running for this record
    pub is_active: bool,
    /// Whether the session hit the limit; gates tracking until the ban clears
    pub is_limited: bool,
    /// Last moment activity was observed; basis for pause-gap folding
    pub last_paused_at: Option<Instant>,
    /// Cumulative paused time this session
    pub total_paused: Duration,
    /// When the limit was hit; None when not banned
    pub ban_started_at: Option<Instant>,
    /// How long this package stays banned after hitting the limit
    pub ban_duration: Duration,
    /// Pause longer than this discards the session
    pub idle_reset_threshold: Duration,
}

impl UsageRecord {
    pub fn new(package: impl Into<String>, ban_duration: Duration, idle_reset_threshold: Duration) -> Self {
        Self {
            package: package.into(),
            session_start: Some(Instant::now()),
            accumulated_active: Duration::ZERO,
            is_active: false,
            is_limited: false,
            last_paused_at: None,
            total_paused: Duration::ZERO,
            ban_started_at: None,
            ban_duration,
            idle_reset_threshold,
        }
    }

    /// Restart the session from zero.
    ///
    /// This is a session restart, not a pardon: `is_limited` and
    /// `ban_started_at` are left untouched.
    pub fn reset(&mut self) {
        self.session_start = Some(Instant::now());
        self.accumulated_active = Duration::ZERO;
        self.last_paused_at = None;
        self.total_paused = Duration::ZERO;
    }

    /// Recompute `accumulated_active` from the session start and paused time
    pub fn recompute_active(&mut self, now: Instant) {
        if let Some(start) = self.session_start {
            self.accumulated_active = now.saturating_duration_since(start)
                .saturating_sub(self.total_paused);
        }
    }

    /// Fold the gap since the last observed activity into `total_paused`.
    /// Returns true if the gap tripped the idle threshold and the session
    /// was reset.
    pub fn fold_pause_gap(&mut self, now: Instant) -> bool {
        if let Some(paused_at) = self.last_paused_at {
            self.total_paused += now.saturating_duration_since(paused_at);
            if self.total_paused.as_secs() >= self.idle_reset_threshold.as_secs() {
                self.reset();
                return true;
            }
        }
        false
    }

    /// Whether enough time has passed since the limit was hit to lift the ban
    pub fn ban_expired(&self, now: Instant) -> bool {
        match self.ban_started_at {
            Some(started) => {
                now.saturating_duration_since(started).as_secs() >= self.ban_duration.as_secs()
            }
            None => true,
        }
    }

    /// Lift the ban so the record can be tracked again
    pub fn clear_ban(&mut self) {
        self.is_limited = false;
        self.ban_started_at = None;
    }
}

/// Format a duration as zero-padded HH:MM:SS for status output
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
