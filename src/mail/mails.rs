use chrono::{DateTime, Utc};

use super::sendmail::{MailError, Mailer};
use crate::models::reportmodel::{ActivityLine, ReminderLine, StatusCounts};

const PENDING_REQUESTS_TEMPLATE: &str = include_str!("templates/Pending-requests-email.html");
const MONTHLY_REPORT_TEMPLATE: &str = include_str!("templates/Monthly-report-email.html");
const EXPORT_READY_TEMPLATE: &str = include_str!("templates/Export-ready-email.html");

fn render(template: &str, placeholders: &[(&str, String)]) -> String {
    let mut html = template.to_string();
    for (key, value) in placeholders {
        html = html.replace(key, value);
    }
    html
}

/// Escapes user-supplied text for inclusion in an HTML cell.
fn cell(value: &str) -> String {
    format!(
        r#"<td style="border: 1px solid #ddd; padding: 8px;">{}</td>"#,
        ammonia::clean_text(value)
    )
}

fn date(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

pub async fn send_pending_requests_email(
    mailer: &dyn Mailer,
    to_email: &str,
    username: &str,
    lines: &[ReminderLine],
    dashboard_link: &str,
) -> Result<(), MailError> {
    let subject = "Pending Service Requests Reminder";
    let rows: String = lines
        .iter()
        .map(|line| {
            format!(
                "<tr>{}{}{}{}</tr>",
                cell(line.service_name.as_deref().unwrap_or("-")),
                cell(&line.customer_name),
                cell(&date(line.request_date)),
                cell(line.notes.as_deref().unwrap_or("")),
            )
        })
        .collect();

    let html = render(
        PENDING_REQUESTS_TEMPLATE,
        &[
            ("{{username}}", ammonia::clean_text(username)),
            ("{{count}}", lines.len().to_string()),
            ("{{rows}}", rows),
            ("{{dashboard_link}}", dashboard_link.to_string()),
        ],
    );

    mailer.send(to_email, subject, &html).await
}

pub async fn send_monthly_report_email(
    mailer: &dyn Mailer,
    to_email: &str,
    username: &str,
    month: &str,
    lines: &[ActivityLine],
) -> Result<(), MailError> {
    let subject = format!("Your HouseCare Activity Report for {}", month);

    let mut counts = StatusCounts::default();
    for line in lines {
        counts.add(line.status, 1);
    }

    let rows: String = lines
        .iter()
        .map(|line| {
            format!(
                "<tr>{}{}{}{}</tr>",
                cell(line.service_name.as_deref().unwrap_or("-")),
                cell(line.professional_name.as_deref().unwrap_or("Unassigned")),
                cell(line.status.to_str()),
                cell(&date(line.request_date)),
            )
        })
        .collect();

    let html = render(
        MONTHLY_REPORT_TEMPLATE,
        &[
            ("{{username}}", ammonia::clean_text(username)),
            ("{{month}}", month.to_string()),
            ("{{total}}", counts.total().to_string()),
            ("{{requested}}", counts.requested.to_string()),
            ("{{assigned}}", counts.assigned.to_string()),
            ("{{completed}}", counts.completed.to_string()),
            ("{{cancelled}}", counts.cancelled.to_string()),
            ("{{rows}}", rows),
        ],
    );

    mailer.send(to_email, &subject, &html).await
}

pub async fn send_export_ready_email(
    mailer: &dyn Mailer,
    to_email: &str,
    filename: &str,
    count: usize,
    download_link: &str,
) -> Result<(), MailError> {
    let subject = "Service Request Export Completed";
    let html = render(
        EXPORT_READY_TEMPLATE,
        &[
            ("{{count}}", count.to_string()),
            ("{{filename}}", ammonia::clean_text(filename)),
            ("{{download_link}}", download_link.to_string()),
        ],
    );

    mailer.send(to_email, subject, &html).await
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::mail::sendmail::testing::RecordingMailer;

    #[tokio::test]
    async fn reminder_escapes_customer_text() {
        let mailer = RecordingMailer::default();
        let lines = vec![ReminderLine {
            pro_id: Uuid::new_v4(),
            pro_username: "pro".to_string(),
            pro_email: Some("pro@example.com".to_string()),
            request_id: Uuid::new_v4(),
            service_name: Some("Plumbing".to_string()),
            customer_name: "Carol".to_string(),
            request_date: Utc::now(),
            notes: Some("<script>alert(1)</script>".to_string()),
        }];

        send_pending_requests_email(&mailer, "pro@example.com", "pro", &lines, "http://localhost/pro")
            .await
            .unwrap();

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "pro@example.com");
        assert!(sent[0].html.contains("Plumbing"));
        assert!(sent[0].html.contains("1 service request(s)"));
        assert!(!sent[0].html.contains("<script>"));
        assert!(!sent[0].html.contains("{{"));
    }
}
