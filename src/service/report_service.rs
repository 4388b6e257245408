use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use uuid::Uuid;

use super::{error::ServiceError, storage::secure_filename};
use crate::{
    config::Config,
    db::Store,
    mail::{mails, sendmail::Mailer},
    models::{reportmodel::*, requestmodel::ServiceRequest, usermodel::UserRole},
};

const GROWTH_WEEKS: i64 = 4;

const CSV_HEADER: &str = "service_id,customer_id,pro_id,request_date,status,notes";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub filename: String,
    pub path: PathBuf,
    pub count: usize,
}

/// Half-open window `[from, to)` covering the calendar month before `now`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub label: String,
}

pub fn previous_month(now: DateTime<Utc>) -> Option<MonthWindow> {
    let (year, month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };
    let from = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
    let to = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()?;
    Some(MonthWindow {
        label: from.format("%B %Y").to_string(),
        from,
        to,
    })
}

/// Quotes a field when it holds a comma, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_csv(requests: &[ServiceRequest]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in requests {
        let row = [
            r.service_id.map(|id| id.to_string()).unwrap_or_default(),
            r.customer_id.to_string(),
            r.pro_id.map(|id| id.to_string()).unwrap_or_default(),
            r.request_date.to_rfc3339(),
            r.status.to_str().to_string(),
            r.notes.clone().unwrap_or_default(),
        ];
        let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone)]
pub struct ReportService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    config: Config,
}

impl ReportService {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Emails every professional with requests still awaiting them. Returns the number of emails sent.
    pub async fn send_pending_reminders(&self) -> Result<usize, ServiceError> {
        let lines = self.store.get_pending_reminders().await?;
        let groups = group_by_recipient(lines, |l| {
            (l.pro_id, l.pro_username.clone(), l.pro_email.clone())
        });
        let dashboard = format!("{}/professional/dashboard", self.config.app_url);

        let mut sent = 0;
        for (recipient, lines) in groups {
            match mails::send_pending_requests_email(
                self.mailer.as_ref(),
                &recipient.email,
                &recipient.username,
                &lines,
                &dashboard,
            )
            .await
            {
                Ok(()) => sent += 1,
                Err(e) => tracing::error!("Reminder to {} failed: {}", recipient.username, e),
            }
        }
        tracing::info!("📬 Sent {} pending-request reminder(s)", sent);
        Ok(sent)
    }

    /// Sends each customer a summary of the previous calendar month.
    pub async fn send_monthly_reports(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let window = previous_month(now)
            .ok_or_else(|| ServiceError::Other(format!("No previous month for {}", now)))?;
        let lines = self
            .store
            .get_customer_activity(window.from, window.to)
            .await?;
        let groups = group_by_recipient(lines, |l| {
            (l.customer_id, l.customer_username.clone(), l.customer_email.clone())
        });

        let mut sent = 0;
        for (recipient, lines) in groups {
            match mails::send_monthly_report_email(
                self.mailer.as_ref(),
                &recipient.email,
                &recipient.username,
                &window.label,
                &lines,
            )
            .await
            {
                Ok(()) => sent += 1,
                Err(e) => tracing::error!("Monthly report to {} failed: {}", recipient.username, e),
            }
        }
        tracing::info!("📊 Sent {} monthly report(s) for {}", sent, window.label);
        Ok(sent)
    }

    /// Writes completed requests to a CSV file and emails the admin a link to it.
    pub async fn export_completed_requests(&self) -> Result<ExportSummary, ServiceError> {
        let requests = self.store.get_completed_requests().await?;
        let filename = format!("service_requests_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
        let dir = PathBuf::from(&self.config.export_dir);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::Other(format!("Cannot create export directory: {}", e)))?;
        let path = dir.join(&filename);
        tokio::fs::write(&path, render_csv(&requests))
            .await
            .map_err(|e| ServiceError::Other(format!("Cannot write export: {}", e)))?;

        let link = format!("{}/api/admin/exports/{}", self.config.app_url, filename);
        if let Err(e) = mails::send_export_ready_email(
            self.mailer.as_ref(),
            &self.config.admin_email,
            &filename,
            requests.len(),
            &link,
        )
        .await
        {
            tracing::error!("Export {} written but notification failed: {}", filename, e);
        }

        tracing::info!("Exported {} completed request(s) to {}", requests.len(), path.display());
        Ok(ExportSummary {
            filename,
            path,
            count: requests.len(),
        })
    }

    /// Reads back a previously written export by its bare file name.
    pub async fn open_export(&self, filename: &str) -> Result<Vec<u8>, ServiceError> {
        if secure_filename(filename) != filename || !filename.ends_with(".csv") {
            return Err(ServiceError::not_found("Export"));
        }
        let path = PathBuf::from(&self.config.export_dir).join(filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::not_found("Export")),
            Err(e) => Err(ServiceError::Other(e.to_string())),
        }
    }

    pub async fn customer_stats(&self, customer_id: Uuid) -> Result<CustomerStats, ServiceError> {
        Ok(self.store.get_customer_stats(customer_id).await?)
    }

    pub async fn professional_stats(&self, pro_id: Uuid) -> Result<ProfessionalStats, ServiceError> {
        Ok(self.store.get_professional_stats(pro_id).await?)
    }

    /// Revenue per service over the last `days` days, or all time.
    pub async fn revenue(&self, days: Option<i64>) -> Result<Vec<RevenueLine>, ServiceError> {
        let since = days.map(|d| Utc::now() - Duration::days(d));
        Ok(self.store.get_revenue_by_service(since).await?)
    }

    /// Total revenue from requests completed within the timeframe ending at `now`.
    pub async fn revenue_for(
        &self,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<TimeframeRevenue, ServiceError> {
        let since = now - Duration::days(timeframe.days());
        let lines = self.store.get_revenue_by_service(Some(since)).await?;
        Ok(TimeframeRevenue {
            timeframe,
            since,
            completed_requests: lines.iter().map(|l| l.completed_requests).sum(),
            revenue: lines.iter().map(|l| l.revenue).sum(),
        })
    }

    fn month_window(now: DateTime<Utc>) -> Result<MonthWindow, ServiceError> {
        previous_month(now)
            .ok_or_else(|| ServiceError::Other(format!("No calendar month before {}", now)))
    }

    /// Active services plus this month's additions against last month's.
    pub async fn catalog_stats(&self, now: DateTime<Utc>) -> Result<CatalogStats, ServiceError> {
        let window = Self::month_window(now)?;
        let total_active_services = self.store.count_active_services().await?;
        let new_services_this_month = self.store.count_services_created(window.to, None).await?;
        let services_last_month = self
            .store
            .count_services_created(window.from, Some(window.to))
            .await?;

        Ok(CatalogStats {
            total_active_services,
            new_services_this_month,
            services_last_month,
            service_growth: growth_percent(new_services_this_month, services_last_month),
        })
    }

    pub async fn user_stats(&self, now: DateTime<Utc>) -> Result<UserStats, ServiceError> {
        let window = Self::month_window(now)?;
        let mut counts = Vec::with_capacity(2);
        for role in [UserRole::Professional, UserRole::Customer] {
            let total = self.store.count_users_created(role, None, None).await?;
            let current = self
                .store
                .count_users_created(role, Some(window.to), None)
                .await?;
            let previous = self
                .store
                .count_users_created(role, Some(window.from), Some(window.to))
                .await?;
            counts.push((total, current, growth_percent(current, previous)));
        }
        let (pros, customers) = (counts[0], counts[1]);

        Ok(UserStats {
            total_professionals: pros.0,
            new_professionals_this_month: pros.1,
            professional_growth: pros.2,
            total_customers: customers.0,
            new_customers_this_month: customers.1,
            customer_growth: customers.2,
        })
    }

    /// Signups in each of the last four weeks; the newest week runs up to now.
    pub async fn user_growth(&self, now: DateTime<Utc>) -> Result<UserGrowth, ServiceError> {
        let mut growth = UserGrowth {
            labels: Vec::new(),
            customers: Vec::new(),
            professionals: Vec::new(),
        };
        for week in 0..GROWTH_WEEKS {
            let from = now - Duration::weeks(GROWTH_WEEKS - week);
            let to = (week + 1 < GROWTH_WEEKS).then(|| from + Duration::weeks(1));
            growth.labels.push(format!("Week {}", week + 1));
            growth.customers.push(
                self.store
                    .count_users_created(UserRole::Customer, Some(from), to)
                    .await?,
            );
            growth.professionals.push(
                self.store
                    .count_users_created(UserRole::Professional, Some(from), to)
                    .await?,
            );
        }
        Ok(growth)
    }

    pub async fn services_usage(&self) -> Result<Vec<UsageLine>, ServiceError> {
        Ok(self.store.get_service_usage().await?)
    }
}
