use serde::{Deserialize, Serialize};

/// A fully rendered message ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    /// Recipient address (email adapters) or display handle (chat adapters).
    pub recipient: String,

    /// Rendered subject line.
    pub subject: String,

    /// Rendered plain-text body.
    pub body: String,
}
