use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to be sent to the agent endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    /// The user message to answer.
    pub query: String,
    /// The opaque visitor identifier, included verbatim in every
    /// request.
    pub visitor_id: String,
    /// The channel this conversation originates from, if any.
    pub channel: Option<Channel>,
    /// Caller-supplied fields merged into the outbound request body.
    ///
    /// Endpoint implementations must let the canonical fields (`query`,
    /// `visitorId`, etc.) overwrite colliding extension fields.
    pub extension: Map<String, Value>,
}

/// The surface a conversation originates from.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The web dashboard.
    Dashboard,
    /// A public website widget.
    Website,
    /// A Slack integration.
    Slack,
    /// A Crisp integration.
    Crisp,
}

impl Channel {
    /// Returns the wire tag for this channel.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Dashboard => "dashboard",
            Channel::Website => "website",
            Channel::Slack => "slack",
            Channel::Crisp => "crisp",
        }
    }
}
