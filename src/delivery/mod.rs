//! E-mail delivery of finished documents.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::PipelineError;

/// Sends a rendered PDF to a recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentDelivery: Send + Sync {
    async fn deliver(&self, recipient: &str, title: &str, file_name: &str, pdf: &[u8]) -> Result<(), PipelineError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, PipelineError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| PipelineError::Delivery("SMTP host is not configured".to_string()))?;
        let from = config
            .from
            .as_deref()
            .ok_or_else(|| PipelineError::Delivery("sender address is not configured".to_string()))?
            .parse::<Mailbox>()
            .map_err(|e| PipelineError::Delivery(format!("invalid sender address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| PipelineError::Delivery(format!("SMTP relay {}: {}", host, e)))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl DocumentDelivery for SmtpMailer {
    async fn deliver(&self, recipient: &str, title: &str, file_name: &str, pdf: &[u8]) -> Result<(), PipelineError> {
        let message = compose_message(&self.from, recipient, title, file_name, pdf)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| PipelineError::Delivery(format!("SMTP send failed: {}", e)))?;

        tracing::info!("Sent \"{}\" to {}", title, recipient);
        Ok(())
    }
}

/// Build the notification mail with the PDF attached.
pub fn compose_message(
    from: &Mailbox,
    recipient: &str,
    title: &str,
    file_name: &str,
    pdf: &[u8],
) -> Result<Message, PipelineError> {
    let to = recipient
        .parse::<Mailbox>()
        .map_err(|e| PipelineError::Delivery(format!("invalid recipient {}: {}", recipient, e)))?;

    let pdf_type = ContentType::parse("application/pdf")
        .map_err(|e| PipelineError::Delivery(format!("content type: {}", e)))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(format!("Your PDF is Ready - {}", title))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(html_body(title)))
                .singlepart(Attachment::new(file_name.to_string()).body(pdf.to_vec(), pdf_type)),
        )
        .map_err(|e| PipelineError::Delivery(format!("could not build message: {}", e)))
}

fn html_body(title: &str) -> String {
    let escaped = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    format!(
        "<html><body>\
         <h2>Your transcript is ready</h2>\
         <p>The PDF transcript for <strong>{}</strong> is attached to this message.</p>\
         </body></html>",
        escaped
    )
}
