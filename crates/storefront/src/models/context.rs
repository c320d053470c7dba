//! Request-scoped context handed to services.
//!
//! Handlers build a [`RequestContext`] from the session, pass it by `&mut`
//! into a service, then persist any queued flash messages back to the
//! session.

use serde::{Deserialize, Serialize};

use super::session::CurrentUser;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, text)
    }
}

/// The acting user plus messages queued during the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: CurrentUser,
    messages: Vec<FlashMessage>,
}

impl RequestContext {
    #[must_use]
    pub const fn new(user: CurrentUser) -> Self {
        Self {
            user,
            messages: Vec::new(),
        }
    }

    pub fn flash(&mut self, message: FlashMessage) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    /// Drain queued messages.
    pub fn take_messages(&mut self) -> Vec<FlashMessage> {
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use grocer_core::{Email, UserId, UserRole};

    use super::*;

    #[test]
    fn test_context_queues_and_drains_messages() {
        let user = CurrentUser {
            id: UserId::new(1),
            username: "ana".to_string(),
            email: Email::parse("ana@example.com").unwrap(),
            role: UserRole::User,
            reset_required: false,
        };
        let mut ctx = RequestContext::new(user);
        ctx.flash(FlashMessage::info("one"));
        ctx.flash(FlashMessage::error("two"));
        assert_eq!(ctx.messages().len(), 2);

        let drained = ctx.take_messages();
        assert_eq!(drained[0].level, FlashLevel::Info);
        assert_eq!(drained[1].text, "two");
        assert!(ctx.messages().is_empty());
    }
}
