// service/background_jobs.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use tokio::sync::mpsc;

use super::report_service::ReportService;

/// Hour of day (UTC) at which pending-request reminders go out.
pub const REMINDER_HOUR: u32 = 18;

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    PendingReminders,
    MonthlyReports { now: DateTime<Utc> },
    ExportServiceRequests,
}

impl Job {
    pub fn name(&self) -> &str {
        match self {
            Job::PendingReminders => "pending_reminders",
            Job::MonthlyReports { .. } => "monthly_reports",
            Job::ExportServiceRequests => "export_service_requests",
        }
    }
}

/// Fire-and-forget handle onto the worker.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (JobQueue { sender }, receiver)
    }

    /// Returns false when the worker has stopped.
    pub fn enqueue(&self, job: Job) -> bool {
        let name = job.name().to_string();
        match self.sender.send(job) {
            Ok(()) => {
                tracing::debug!("Queued job {}", name);
                true
            }
            Err(_) => {
                tracing::error!("Job worker is gone; dropped {}", name);
                false
            }
        }
    }
}

pub async fn run_job(reports: &ReportService, job: Job) {
    tracing::info!("Running {} job at {}", job.name(), Utc::now());
    let result = match job {
        Job::PendingReminders => reports.send_pending_reminders().await.map(|n| format!("{} email(s)", n)),
        Job::MonthlyReports { now } => reports.send_monthly_reports(now).await.map(|n| format!("{} email(s)", n)),
        Job::ExportServiceRequests => reports
            .export_completed_requests()
            .await
            .map(|summary| format!("{} row(s) in {}", summary.count, summary.filename)),
    };
    match result {
        Ok(detail) => tracing::info!("Job completed: {}", detail),
        Err(e) => tracing::error!("Job failed: {}", e),
    }
}

/// Drains the queue one job at a time until every sender is dropped.
pub async fn run_worker(reports: Arc<ReportService>, mut receiver: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = receiver.recv().await {
        run_job(&reports, job).await;
    }
    tracing::info!("Job worker stopped");
}

/// Next `hour:00` UTC strictly after `now`.
pub fn next_daily_run(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let today = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, 0, 0)
        .single()
        .unwrap_or(now);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Midnight UTC on the first day of the month after `now`.
pub fn next_monthly_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now + Duration::days(28))
}

async fn sleep_until(at: DateTime<Utc>) {
    let wait = (at - Utc::now()).to_std().unwrap_or_default();
    tokio::time::sleep(wait).await;
}

/// Enqueues pending-request reminders every day at 18:00 UTC.
pub async fn start_daily_reminder_job(queue: JobQueue) {
    loop {
        let next = next_daily_run(Utc::now(), REMINDER_HOUR);
        tracing::debug!("Next reminder run at {}", next);
        sleep_until(next).await;
        if !queue.enqueue(Job::PendingReminders) {
            break;
        }
    }
}

/// Enqueues monthly activity reports on the first of each month.
pub async fn start_monthly_report_job(queue: JobQueue) {
    loop {
        let next = next_monthly_run(Utc::now());
        tracing::debug!("Next monthly report run at {}", next);
        sleep_until(next).await;
        if !queue.enqueue(Job::MonthlyReports { now: Utc::now() }) {
            break;
        }
    }
}
