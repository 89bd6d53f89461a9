//! Submission notifications
//!
//! Renders a created request into a message for the operational mailbox
//! and hands it to a [`Notifier`]. Delivery itself belongs to an external
//! relay:
//! - [`OutboxNotifier`]: pickup directory of JSON messages
//! - [`WebhookNotifier`]: HTTP relay endpoint
//! - [`LogNotifier`]: tracing output only

mod outbox;
mod webhook;

pub use outbox::OutboxNotifier;
pub use webhook::WebhookNotifier;

use crate::error::NotificationError;
use crate::store::encode_csv;
use crate::types::{AdmissionRequest, ProtocolId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Write as _};

/// File name of the record store snapshot attachment
pub const SNAPSHOT_FILENAME: &str = "solicitacoes_admissao.csv";

/// Rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Request this message reports
    pub protocol_id: ProtocolId,
    /// Recipient mailbox
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: String,
    /// HTML body
    pub html_body: String,
    /// Optional record store snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// File attached to a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name shown to the recipient
    pub filename: String,
    /// MIME type
    pub content_type: String,
    /// File contents
    pub content: String,
}

impl Attachment {
    /// Snapshot of all stored requests as a CSV table with header row
    ///
    /// # Errors
    /// Returns error if the records cannot be encoded
    pub fn snapshot(records: &[AdmissionRequest]) -> Result<Self, NotificationError> {
        Ok(Self {
            filename: SNAPSHOT_FILENAME.to_string(),
            content_type: "text/csv".to_string(),
            content: encode_csv(records, true)?,
        })
    }
}

/// Delivery contract for rendered notifications
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Deliver one notification
    ///
    /// # Errors
    /// Returns error if the message was not accepted for delivery
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            attachment = notification.attachment.is_some(),
            "notification logged"
        );
        Ok(())
    }
}

/// Render the notification for a created request
#[must_use]
pub fn render_notification(
    request: &AdmissionRequest,
    recipient: &str,
    attachment: Option<Attachment>,
) -> Notification {
    Notification {
        protocol_id: request.protocol_id,
        to: recipient.to_string(),
        subject: format!("Nova solicitação de admissão - {}", request.protocol_id),
        text_body: render_text(request),
        html_body: render_html(request),
        attachment,
    }
}

fn summary_fields(request: &AdmissionRequest) -> [(&'static str, String); 11] {
    [
        ("Protocolo", request.protocol_id.to_string()),
        ("Empresa", request.employer_name.clone()),
        ("CNPJ", request.employer_tax_id.clone()),
        ("Gestor", request.manager_name.clone()),
        ("E-mail do gestor", request.manager_email.clone()),
        ("Colaborador", request.employee_name.clone()),
        ("E-mail do colaborador", request.employee_email.clone()),
        ("Cargo", request.job_title.clone()),
        ("Salário", format_brl(request.monthly_salary)),
        ("Data de admissão", request.admission_date.format("%d/%m/%Y").to_string()),
        (
            "Data da solicitação",
            request.submitted_at.format("%d/%m/%Y %H:%M:%S").to_string(),
        ),
    ]
}

fn render_text(request: &AdmissionRequest) -> String {
    let mut body = String::from("Nova solicitação de admissão recebida.\n\n");
    for (label, value) in summary_fields(request) {
        let _ = writeln!(body, "{label}: {value}");
    }
    body
}

fn render_html(request: &AdmissionRequest) -> String {
    let mut body = String::from(
        "<html><body>\n<h2>Nova solicitação de admissão</h2>\n<table>\n",
    );
    for (label, value) in summary_fields(request) {
        let _ = writeln!(
            body,
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
            escape_html(label),
            escape_html(&value)
        );
    }
    body.push_str("</table>\n</body></html>\n");
    body
}

/// Escape text for inclusion in HTML
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format an amount as Brazilian reais, e.g. `R$ 1.234,56`
#[must_use]
pub fn format_brl(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2).abs());
    let (units, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (index, digit) in units.chars().enumerate() {
        if index > 0 && (units.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{sign}R$ {grouped},{cents}")
}
