//! Notification collaborator.
//!
//! Sends an order confirmation to the buyer and an alert to store staff over
//! SMTP via lettre, with Askama HTML/text templates. Delivery is strictly
//! best-effort: failures are logged and never roll back or fail the order
//! that triggered them.

use std::sync::Arc;

use askama::Template;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use maplemart_core::Email;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EmailConfig;
use crate::models::Order;

/// Errors that can occur when building or sending email.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build the email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// A configured address does not parse.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// One rendered line of an order email.
struct OrderLineView {
    title: String,
    quantity: i32,
    price: String,
}

/// HTML template for the buyer's order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml {
    order_id: String,
    total: String,
    lines: Vec<OrderLineView>,
}

/// Plain text template for the buyer's order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText {
    order_id: String,
    total: String,
    lines: Vec<OrderLineView>,
}

/// HTML template for the staff new-order alert.
#[derive(Template)]
#[template(path = "email/order_alert.html")]
struct OrderAlertHtml {
    order_id: String,
    buyer_email: String,
    buyer_phone: String,
    total: String,
    lines: Vec<OrderLineView>,
}

/// Plain text template for the staff new-order alert.
#[derive(Template)]
#[template(path = "email/order_alert.txt")]
struct OrderAlertText {
    order_id: String,
    buyer_email: String,
    buyer_phone: String,
    total: String,
    lines: Vec<OrderLineView>,
}

fn line_views(order: &Order) -> Vec<OrderLineView> {
    order
        .lines
        .iter()
        .map(|line| OrderLineView {
            title: line.title.clone(),
            quantity: line.quantity,
            price: format!("\u{20b9}{}", line.unit_price.round_dp(2)),
        })
        .collect()
}

fn total_view(order: &Order) -> String {
    format!("\u{20b9}{}", order.totals.total_price.round_dp(2))
}

struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    staff: Mailbox,
}

/// Outbound notification sender; a disabled instance silently drops sends.
#[derive(Clone)]
pub struct Notifier {
    inner: Option<Arc<Mailer>>,
}

impl Notifier {
    /// Create a notifier from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or configured addresses are
    /// invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from = parse_mailbox(&config.from_address)?;
        let staff = parse_mailbox(&config.staff_address)?;

        Ok(Self {
            inner: Some(Arc::new(Mailer {
                transport,
                from,
                staff,
            })),
        })
    }

    /// A notifier that drops every send (no SMTP configured).
    #[must_use]
    pub const fn disabled() -> Self {
        Self { inner: None }
    }

    /// Notify the buyer and store staff about a freshly placed order.
    ///
    /// Both sends are best-effort; failures are logged and swallowed.
    pub async fn order_placed(&self, order: &Order, buyer: &Email) {
        let Some(mailer) = &self.inner else {
            debug!(order = %order.id, "email disabled, skipping order notifications");
            return;
        };

        if let Err(e) = mailer.send_confirmation(order, buyer).await {
            warn!(order = %order.id, error = %e, "failed to send order confirmation");
        }
        if let Err(e) = mailer.send_staff_alert(order, buyer).await {
            warn!(order = %order.id, error = %e, "failed to send staff order alert");
        }
    }
}

impl Mailer {
    async fn send_confirmation(&self, order: &Order, buyer: &Email) -> Result<(), NotifyError> {
        let html = OrderConfirmationHtml {
            order_id: order.id.to_string(),
            total: total_view(order),
            lines: line_views(order),
        }
        .render()?;
        let text = OrderConfirmationText {
            order_id: order.id.to_string(),
            total: total_view(order),
            lines: line_views(order),
        }
        .render()?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(buyer.as_str())?)
            .subject("Order Confirmation")
            .multipart(MultiPart::alternative_plain_html(text, html))?;
        self.transport.send(message).await?;
        Ok(())
    }

    async fn send_staff_alert(&self, order: &Order, buyer: &Email) -> Result<(), NotifyError> {
        let html = OrderAlertHtml {
            order_id: order.id.to_string(),
            buyer_email: buyer.to_string(),
            buyer_phone: order.shipping_address.phone.clone(),
            total: total_view(order),
            lines: line_views(order),
        }
        .render()?;
        let text = OrderAlertText {
            order_id: order.id.to_string(),
            buyer_email: buyer.to_string(),
            buyer_phone: order.shipping_address.phone.clone(),
            total: total_view(order),
            lines: line_views(order),
        }
        .render()?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(self.staff.clone())
            .subject("New Order Received")
            .multipart(MultiPart::alternative_plain_html(text, html))?;
        self.transport.send(message).await?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress(format!("{address}: {e}")))
}
