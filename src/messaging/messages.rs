use axum::{debug_handler, extract::{Path, State}, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    gateway::{Backend, Conversation, ConversationId, Gateway, Message, NewMessage},
    session::CurrentUser,
    AppResult, Error, Result,
};

use super::Messenger;

/// Longest message body accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// What happened to the conversation after a message was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Touch {
    Updated { conversation_id: ConversationId },
    /// The message is stored but the conversation's activity time was not
    /// moved; the next send corrects it.
    Stale { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
    pub message: Message,
    pub conversation: Touch,
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::invalid("message content is empty"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(Error::invalid(format!("message content is longer than {MAX_MESSAGE_CHARS} characters")));
    }
    Ok(())
}

impl<G: Gateway> Messenger<'_, G> {
    /// History of a conversation taken from `known`, oldest message first.
    ///
    /// An id that is not in `known` yields no messages.
    pub async fn fetch_messages(&self, conversation_id: ConversationId, known: &[Conversation]) -> Result<Vec<Message>> {
        let Some(conversation) = known.iter().find(|c| c.id == conversation_id) else {
            tracing::debug!(%conversation_id, "conversation not among known ones");
            return Ok(Vec::new());
        };

        self.gateway
            .messages_between(&conversation.participant1_id, &conversation.participant2_id)
            .await
    }

    /// Stores a message, then makes sure its conversation exists and is
    /// marked as active.
    ///
    /// Only storing the message can fail the call. Trouble with the
    /// conversation afterwards is logged and reported as [`Touch::Stale`].
    pub async fn send_message(&self, sender_id: &str, recipient_id: &str, content: &str) -> Result<SentMessage> {
        if sender_id == recipient_id {
            return Err(Error::invalid("cannot send a message to yourself"));
        }
        validate_content(content)?;

        let message = self.gateway
            .insert_message(&NewMessage::unread(sender_id, recipient_id, content))
            .await?;
        tracing::info!(id = %message.id, "message {sender_id} -> {recipient_id} stored");

        let conversation = match self.touch(sender_id, recipient_id).await {
            Ok(conversation_id) => Touch::Updated { conversation_id },
            Err(err) => {
                tracing::warn!(id = %message.id, "message stored but conversation not updated: {err}");
                Touch::Stale { reason: err.to_string() }
            }
        };

        Ok(SentMessage { message, conversation })
    }

    async fn touch(&self, sender_id: &str, recipient_id: &str) -> Result<ConversationId> {
        let conversation_id = self.get_or_create_conversation(sender_id, recipient_id).await?;
        self.gateway
            .touch_conversation(conversation_id, OffsetDateTime::now_utc())
            .await?;
        Ok(conversation_id)
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Path(conversation_id): Path<ConversationId>,
) -> AppResult<Json<Vec<Message>>> {
    let gateway = gateway.authorized(user.token());
    let messenger = Messenger::new(&gateway);

    let known = messenger.fetch_conversations(&user.user_id).await?;
    Ok(Json(messenger.fetch_messages(conversation_id, &known).await?))
}

#[derive(Deserialize)]
pub(crate) struct SendMessage {
    recipient_id: String,
    content: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Json(SendMessage { recipient_id, content }): Json<SendMessage>,
) -> AppResult<Json<SentMessage>> {
    let gateway = gateway.authorized(user.token());
    let sent = Messenger::new(&gateway)
        .send_message(&user.user_id, &recipient_id, &content)
        .await?;

    Ok(Json(sent))
}
