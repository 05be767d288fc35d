use std::future::Future;

use serde::Serialize;
use tracing::warn;

use crate::services::registration_service::AttendeeForm;

/// Seam for the "email the admin about a new registration" side effect, so
/// the registration service can be exercised without a mail endpoint.
pub trait AdminNotifier: Send + Sync {
    fn notify_registration(
        &self,
        activity_title: &str,
        attendee: &AttendeeForm,
    ) -> impl Future<Output = Result<(), ()>> + Send;
}

#[derive(Debug, Serialize)]
struct SendEmailBody {
    to: String,
    subject: String,
    html: String,
}

/// Posts to the send-email endpoint configured via SEND_EMAIL_URL and
/// ADMIN_NOTIFY_EMAIL. When either is missing the notifier is a no-op, which
/// keeps local setups working without a mail service.
#[derive(Clone)]
pub struct EmailNotifier {
    client: reqwest::Client,
    endpoint: Option<String>,
    admin_email: String,
}

impl EmailNotifier {
    pub fn from_env() -> Self {
        let endpoint = std::env::var("SEND_EMAIL_URL").ok();
        let admin_email = std::env::var("ADMIN_NOTIFY_EMAIL").unwrap_or_default();

        if endpoint.is_none() || admin_email.is_empty() {
            warn!("📧 SEND_EMAIL_URL / ADMIN_NOTIFY_EMAIL not set, admin emails disabled");
        }

        Self {
            client: reqwest::Client::new(),
            endpoint,
            admin_email,
        }
    }
}

impl AdminNotifier for EmailNotifier {
    async fn notify_registration(
        &self,
        activity_title: &str,
        attendee: &AttendeeForm,
    ) -> Result<(), ()> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Ok(());
        };
        if self.admin_email.is_empty() {
            return Ok(());
        }

        let html = format!(
            "<p>Nouvelle inscription à l'activité \"{}\" :</p>\
             <ul>\
             <li><strong>Nom :</strong> {}</li>\
             <li><strong>Prénom :</strong> {}</li>\
             <li><strong>Email :</strong> {}</li>\
             <li><strong>Téléphone :</strong> {}</li>\
             </ul>",
            activity_title, attendee.last_name, attendee.first_name, attendee.email, attendee.phone
        );

        let body = SendEmailBody {
            to: self.admin_email.clone(),
            subject: format!("Nouvelle inscription à \"{}\"", activity_title),
            html,
        };

        let resp = match self.client.post(endpoint).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("📧 send-email endpoint unreachable: {}", e);
                return Err(());
            }
        };

        if !resp.status().is_success() {
            warn!("📧 send-email endpoint non-OK: {}", resp.status());
            return Err(());
        }

        Ok(())
    }
}
