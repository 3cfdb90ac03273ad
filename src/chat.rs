use crate::assistant::{AssistantBackend, GatewayError};
use crate::catalog::Product;

/// Shown in place of a reply when the gateway call fails outright.
pub const CONNECTION_FALLBACK: &str = "Sorry, I had trouble connecting. Please try again.";

const GENERIC_GREETING: &str =
    "Hi! I'm PricePulse AI. Need help finding a product or comparing prices?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// One chat session: an append-only transcript plus a single-request guard.
///
/// Failures never escape this type. Every outcome of a submission, success
/// or not, becomes a model message in the transcript.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Seeds the greeting the first time the chat panel opens. Product-aware
    /// when the user is on a product page. Calling again is a no-op while
    /// the transcript is non-empty.
    pub fn open(&mut self, product: Option<&Product>) {
        if !self.messages.is_empty() {
            return;
        }

        let greeting = match product {
            Some(p) => format!(
                "Hi! I'm PricePulse AI. I've analyzed the {}. Ask me about specs, value for money, or comparisons!",
                p.title
            ),
            None => GENERIC_GREETING.to_string(),
        };

        self.messages.push(ChatMessage { role: ChatRole::Model, text: greeting });
    }

    /// Validates and records a submission. Returns the accepted query text,
    /// or `None` when the input is blank or a request is already in flight
    /// (rejected, not queued).
    pub fn begin_submit(&mut self, query: &str) -> Option<String> {
        if self.pending || query.trim().is_empty() {
            return None;
        }

        let query = query.to_string();
        self.messages.push(ChatMessage { role: ChatRole::User, text: query.clone() });
        self.pending = true;
        Some(query)
    }

    /// Records the outcome of the in-flight request. Gateway failures become
    /// the fixed connection fallback; the pending flag clears either way.
    pub fn complete(&mut self, result: Result<String, GatewayError>) {
        let text = result.unwrap_or_else(|_| CONNECTION_FALLBACK.to_string());
        self.messages.push(ChatMessage { role: ChatRole::Model, text });
        self.pending = false;
    }

    /// Full submission cycle against a backend: user message in, one ask,
    /// model message out. The TUI drives the same two phases around a
    /// spawned task instead so the event loop stays responsive.
    pub async fn submit<G: AssistantBackend>(
        &mut self,
        gateway: &G,
        query: &str,
        product: Option<&Product>,
    ) {
        let Some(accepted) = self.begin_submit(query) else {
            return;
        };
        let result = gateway.ask(&accepted, product).await;
        self.complete(result);
    }
}
