//! Email delivery service using lettre/SMTP.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;

/// Email delivery service.
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl EmailService {
    /// Create a new email service.
    ///
    /// `encryption` controls the SMTP transport mode:
    /// - `"starttls"` (default): Opportunistic STARTTLS on port 587
    /// - `"tls"`: Implicit TLS (SMTPS) on port 465
    /// - `"none"`: Unencrypted (for local dev only)
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        smtp_username: Option<&str>,
        smtp_password: Option<&str>,
        encryption: &str,
        from_email: String,
    ) -> Result<Self> {
        let mut builder = match encryption {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .context("failed to create SMTP relay transport")?
                .port(smtp_port),
            "none" => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(smtp_port)
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .context("failed to create SMTP STARTTLS transport")?
                .port(smtp_port),
        };

        if let (Some(user), Some(pass)) = (smtp_username, smtp_password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        let transport = builder.build();

        Ok(Self {
            transport,
            from_email,
        })
    }

    /// Send a plain-text email.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .context("invalid from email address")?,
            )
            .to(to.parse().context("invalid recipient email address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("failed to send email")?;

        Ok(())
    }

    /// Notify a tenant about a new lead.
    pub async fn send_lead_notification(
        &self,
        to: &str,
        site_name: &str,
        lead_data: &Value,
    ) -> Result<()> {
        let subject = format!("Nueva consulta en {site_name}");
        let body = format!(
            "Recibiste una nueva consulta desde el sitio {site_name}.\n\n{}\n",
            format_lead_lines(lead_data)
        );
        self.send(to, &subject, &body).await
    }
}

/// Render submitted lead fields as "campo: valor" lines.
fn format_lead_lines(data: &Value) -> String {
    let Some(map) = data.as_object() else {
        return data.to_string();
    };
    map.iter()
        .map(|(field, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{field}: {value}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lead_lines_render_each_field() {
        let lines = format_lead_lines(&json!({
            "nombre": "Ana",
            "email": "ana@example.com",
            "edad": 30
        }));
        assert!(lines.contains("nombre: Ana"));
        assert!(lines.contains("email: ana@example.com"));
        assert!(lines.contains("edad: 30"));
    }

    #[test]
    fn transport_modes_build() {
        for mode in ["starttls", "tls", "none"] {
            let service = EmailService::new(
                "smtp.example.com",
                587,
                Some("user"),
                Some("pass"),
                mode,
                "noreply@example.com".to_string(),
            );
            assert!(service.is_ok(), "mode {mode} should build");
        }
    }
}
