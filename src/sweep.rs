//! Weekly re-check of every registered plate.
//!
//! Plates are checked one at a time in stored order with a fixed pause between
//! lookups. Per-plate failures are logged and skipped; nothing is checkpointed,
//! so an interrupted sweep starts over from the first record next time.
use crate::delivery::{DeliveryError, Messenger};
use crate::lookup::{LookupOutcome, ViolationLookup};
use crate::registry::{Registration, SharedRegistry};
use crate::reply::report_card;
use crate::schedule::WeeklySchedule;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::thread;
use std::time::Duration;

/// Waits between consecutive lookups.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// False when the sweep was skipped because today is not the sweep day.
    pub ran: bool,
    pub checked: usize,
    pub clean: usize,
    pub reported: usize,
    pub delivered: usize,
    pub refused: usize,
    pub failed_lookups: usize,
    pub failed_deliveries: usize,
}

pub struct SweepContext<'a> {
    pub lookup: &'a dyn ViolationLookup,
    pub messenger: &'a dyn Messenger,
    pub pacer: &'a dyn Pacer,
    pub pause: Duration,
}

/// Run one sweep over `entries` if `today` is the scheduled weekday.
pub fn run_sweep(
    entries: &[Registration],
    today: NaiveDate,
    schedule: &WeeklySchedule,
    ctx: &SweepContext<'_>,
) -> SweepSummary {
    let mut summary = SweepSummary::default();
    if !schedule.is_due_on(today) {
        tracing::debug!(%today, scheduled = ?schedule.weekday, "not sweep day; skipping");
        return summary;
    }
    summary.ran = true;
    tracing::info!(plates = entries.len(), "starting violation sweep");

    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            ctx.pacer.pause(ctx.pause);
        }
        summary.checked += 1;
        match ctx.lookup.lookup(&entry.plate) {
            LookupOutcome::Report(report) => {
                summary.reported += 1;
                let card = report_card(&report);
                match ctx.messenger.send_direct(entry.owner, &card) {
                    Ok(()) => {
                        summary.delivered += 1;
                        tracing::info!(
                            plate = %entry.plate,
                            owner = %entry.owner,
                            unresolved = report.unresolved_count(),
                            "violation report delivered"
                        );
                    }
                    Err(DeliveryError::Refused) => {
                        summary.refused += 1;
                        tracing::warn!(owner = %entry.owner, "cannot send direct message to user");
                    }
                    Err(err) => {
                        summary.failed_deliveries += 1;
                        tracing::warn!(owner = %entry.owner, error = %err, "direct message failed");
                    }
                }
            }
            LookupOutcome::Clean { .. } => {
                summary.clean += 1;
                tracing::debug!(plate = %entry.plate, "no violations");
            }
            LookupOutcome::Failed { failure, .. } => {
                summary.failed_lookups += 1;
                tracing::warn!(plate = %entry.plate, error = %failure, "violation lookup failed");
            }
        }
    }

    tracing::info!(
        checked = summary.checked,
        reported = summary.reported,
        delivered = summary.delivered,
        failed = summary.failed_lookups,
        "violation sweep finished"
    );
    summary
}

/// Sleep until each scheduled fire time and sweep, forever.
///
/// The registry is reloaded from disk before every sweep so registrations made
/// by other processes are included. A registry that fails to reload skips that
/// week's sweep.
pub fn serve(
    registry: &SharedRegistry,
    schedule: &WeeklySchedule,
    ctx: &SweepContext<'_>,
) -> Result<()> {
    loop {
        let now = Local::now().naive_local();
        let next = schedule.next_fire_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(next_fire = %next, wait_secs = wait.as_secs(), "waiting for next sweep");
        thread::sleep(wait);

        if let Err(err) = registry.reload() {
            tracing::error!(error = %format!("{err:#}"), "registry reload failed; sweep skipped");
            continue;
        }
        let today = Local::now().date_naive();
        run_sweep(&registry.snapshot(), today, schedule, ctx);
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
