//! Email message and send outcome value types.

use serde::{Deserialize, Serialize};

/// An outgoing email message.
///
/// Produced by the caller and left untouched by the pipeline. Providers
/// may substitute their configured default sender when `from` is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Sender; falls back to the provider's default sender
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Named template to render instead of `body`
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub is_html: bool,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<EmailAttachment>,
}

impl EmailMessage {
    /// Start building a message.
    ///
    /// ```rust
    /// use mailroute::EmailMessage;
    ///
    /// let message = EmailMessage::builder()
    ///     .to("user@example.com")
    ///     .subject("Welcome")
    ///     .body("Hello!")
    ///     .build();
    /// assert_eq!(message.to, "user@example.com");
    /// ```
    pub fn builder() -> EmailMessageBuilder {
        EmailMessageBuilder::default()
    }

    /// Sender address, or `default_from` when none was set.
    pub fn sender_or<'a>(&'a self, default_from: &'a str) -> &'a str {
        self.from.as_deref().unwrap_or(default_from)
    }

    /// Every recipient: `to`, then cc, then bcc. Blank entries are skipped.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.to.as_str())
            .chain(self.cc.iter().map(String::as_str))
            .chain(self.bcc.iter().map(String::as_str))
            .filter(|addr| !addr.trim().is_empty())
    }
}

/// Fluent builder for `EmailMessage`.
#[derive(Debug, Default)]
pub struct EmailMessageBuilder {
    message: EmailMessage,
}

impl EmailMessageBuilder {
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.message.from = Some(from.into());
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.message.to = to.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.message.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.message.body = Some(body.into());
        self
    }

    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.message.body = Some(body.into());
        self.message.is_html = true;
        self
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.message.template_name = Some(name.into());
        self
    }

    pub fn cc(mut self, addr: impl Into<String>) -> Self {
        self.message.cc.push(addr.into());
        self
    }

    pub fn bcc(mut self, addr: impl Into<String>) -> Self {
        self.message.bcc.push(addr.into());
        self
    }

    pub fn attachment(mut self, attachment: EmailAttachment) -> Self {
        self.message.attachments.push(attachment);
        self
    }

    /// Finish the message. Validation happens in the pipeline, not here.
    pub fn build(self) -> EmailMessage {
        self.message
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl EmailAttachment {
    pub fn new(
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            content_type: content_type.into(),
        }
    }
}

/// Outcome of a single delivery attempt.
///
/// `message_id` is meaningful on success, `error` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn success(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}
