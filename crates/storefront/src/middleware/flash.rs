//! Flash messages kept in the session until the next page reads them.

use tower_sessions::Session;

use crate::models::context::FlashMessage;
use crate::models::session_keys;

/// Append messages to the session's pending flash list.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push_flash(
    session: &Session,
    messages: impl IntoIterator<Item = FlashMessage>,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<FlashMessage> = session
        .get(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    let before = pending.len();
    pending.extend(messages);

    if pending.len() != before {
        session.insert(session_keys::FLASH, pending).await?;
    }
    Ok(())
}

/// [`push_flash`] for paths that must not fail once their work is done.
///
/// Returns whether the messages were stored; a failure is logged.
pub async fn push_flash_or_log(
    session: &Session,
    messages: impl IntoIterator<Item = FlashMessage>,
) -> bool {
    match push_flash(session, messages).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to store flash messages");
            false
        }
    }
}

/// Remove and return all pending flash messages.
///
/// A session read failure yields no messages; flash is best effort.
pub async fn take_flash(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(session_keys::FLASH).await {
        Ok(messages) => messages.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}
