//! The tracking coordinator: the top-level polling loop.
//!
//! Each cycle it reloads the blocklist, asks the probe which application is
//! foreground, and drives the state transitions: creating records, starting
//! and pausing monitor tasks, and applying the ban window of a limited
//! record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::blocklist::Blocklist;
use crate::config::Config;
use crate::enforce::Enforcer;
use crate::error::{Result, WardenError};
use crate::monitor::spawn_monitor;
use crate::probe::ForegroundProbe;
use crate::record::{format_hms, SharedRecord, UsageRecord};

/// Top-level control loop owning the record table and monitor task handles
pub struct Coordinator<P: ForegroundProbe> {
    config: Arc<Config>,
    probe: P,
    enforcer: Arc<dyn Enforcer>,
    blocklist: Blocklist,
    /// One record per package ever seen foreground while listed
    records: HashMap<String, SharedRecord>,
    /// Package the coordinator currently points tracking at; pausing does
    /// not clear this, only a switch moves it
    tracking: Option<String>,
    /// Live monitor task handles, reaped each cycle and joined on shutdown
    tasks: HashMap<String, JoinHandle<()>>,
}

impl<P: ForegroundProbe> Coordinator<P> {
    /// Create a coordinator. Fails if the blocklist cannot be read, since
    /// running with a silently empty list would track nothing.
    pub fn new(config: Config, probe: P, enforcer: Arc<dyn Enforcer>) -> Result<Self> {
        let blocklist = Blocklist::load(&config.blocklist_path)?;
        Ok(Self {
            config: Arc::new(config),
            probe,
            enforcer,
            blocklist,
            records: HashMap::new(),
            tracking: None,
            tasks: HashMap::new(),
        })
    }

    /// Run cycles until a shutdown signal arrives, then stop all monitor
    /// tasks gracefully and return `ShutdownRequested`.
    pub async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!(
            "watching {} package(s) from {}",
            self.blocklist.len(),
            self.config.blocklist_path.display()
        );

        loop {
            self.cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
                _ = shutdown_rx.recv() => {
                    info!("shutdown requested, stopping monitors");
                    self.shutdown().await;
                    return Err(WardenError::ShutdownRequested);
                }
            }
        }
    }

    /// Run one polling cycle
    pub async fn cycle(&mut self) {
        self.blocklist.reload();
        self.tasks.retain(|_, handle| !handle.is_finished());

        let foreground = self.probe.current_app().await;
        let Some(package) = foreground.filter(|p| self.blocklist.contains(p)) else {
            // Nothing tracked is foreground; pause whatever was running
            self.pause_tracking().await;
            return;
        };

        // First sighting of this package: register a record and retarget
        // tracking at it, stopping any previously running monitor first.
        if !self.records.contains_key(&package) {
            debug!("new tracked package {}", package);
            self.pause_tracking().await;
            let record = UsageRecord::new(
                package.clone(),
                self.config.ban_duration(),
                self.config.idle_reset_threshold(),
            );
            self.records
                .insert(package.clone(), Arc::new(Mutex::new(record)));
            self.tracking = Some(package.clone());
        } else if self.tracking.is_none() {
            self.tracking = Some(package.clone());
        }

        let tracked_pkg = match &self.tracking {
            Some(pkg) => pkg.clone(),
            None => return,
        };
        let Some(tracked) = self.records.get(&tracked_pkg).map(Arc::clone) else {
            self.tracking = None;
            return;
        };

        // Ban gate: a limited tracked record either gets its ban lifted or
        // is re-enforced, ending the cycle.
        {
            let mut rec = tracked.lock().await;
            if rec.is_limited {
                rec.is_active = false;
                if rec.ban_expired(Instant::now()) {
                    info!("ban lifted for {}", rec.package);
                    rec.clear_ban();
                } else {
                    drop(rec);
                    info!("{} is still banned, enforcing", tracked_pkg);
                    self.enforcer.kill(&tracked_pkg).await;
                    self.enforcer.notify("Banned for 30 minutes.").await;
                    return;
                }
            }
        }

        if tracked_pkg == package {
            self.start_monitor_if_idle(&package).await;
        } else {
            // A different listed package came foreground: pause the old
            // record and move the tracking pointer. Its monitor starts on
            // the next cycle.
            tracked.lock().await.is_active = false;
            debug!("switching tracking from {} to {}", tracked_pkg, package);
            self.tracking = Some(package);
        }

        self.log_tracking_status().await;
    }

    /// Stop all monitor tasks and wait for them to finish
    pub async fn shutdown(&mut self) {
        for record in self.records.values() {
            record.lock().await.is_active = false;
        }
        for (package, handle) in self.tasks.drain() {
            if let Err(e) = handle.await {
                warn!("monitor for {} did not stop cleanly: {}", package, e);
            }
        }
    }

    /// Number of live monitor tasks (reaped lazily each cycle)
    pub fn running_tasks(&self) -> usize {
        self.tasks
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn record(&self, package: &str) -> Option<SharedRecord> {
        self.records.get(package).map(Arc::clone)
    }

    async fn pause_tracking(&mut self) {
        if let Some(pkg) = &self.tracking {
            if let Some(record) = self.records.get(pkg) {
                let mut rec = record.lock().await;
                if rec.is_active {
                    debug!("pausing tracking for {}", pkg);
                    rec.is_active = false;
                }
            }
        }
    }

    /// Start a monitor task for the record unless one is running or the
    /// record is limited. `is_active` is flipped before spawning; the task
    /// clears it on exit.
    async fn start_monitor_if_idle(&mut self, package: &str) {
        let Some(record) = self.records.get(package).map(Arc::clone) else {
            return;
        };

        let resumed_from = {
            let mut rec = record.lock().await;
            if rec.is_active || rec.is_limited {
                return;
            }
            // A finished task may not be reaped yet; never run two monitors
            // for one record.
            if self.tasks.get(package).is_some_and(|h| !h.is_finished()) {
                warn!("monitor for {} still winding down, deferring start", package);
                return;
            }
            // A record that hit its limit has no session start; a fresh
            // session begins now.
            if rec.session_start.is_none() {
                rec.session_start = Some(Instant::now());
            }
            rec.is_active = true;
            rec.accumulated_active
        };

        self.enforcer
            .notify_bottom(&format!("Starting from {}", format_hms(resumed_from)))
            .await;

        let handle = spawn_monitor(
            record,
            self.config.limit(),
            self.config.monitor_tick(),
            Arc::clone(&self.enforcer),
        );
        self.tasks.insert(package.to_string(), handle);
        info!("started monitor for {}", package);
    }

    async fn log_tracking_status(&self) {
        if let Some(pkg) = &self.tracking {
            if let Some(record) = self.records.get(pkg) {
                let rec = record.lock().await;
                info!(
                    "tracking {} at {}",
                    rec.package,
                    format_hms(rec.accumulated_active)
                );
            }
        }
    }
}
