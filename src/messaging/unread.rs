use std::collections::HashMap;

use axum::{debug_handler, extract::{Path, State}, http::StatusCode};

use crate::{
    gateway::{Backend, Conversation, ConversationId, Gateway},
    session::CurrentUser,
    AppResult, Result,
};

use super::Messenger;

impl<G: Gateway> Messenger<'_, G> {
    /// Unread messages addressed to `user_id`, per conversation.
    ///
    /// Every conversation `user_id` takes part in gets an entry, 0 included.
    /// One count round trip per conversation, issued one after another.
    pub async fn fetch_unread_counts(&self, conversations: &[Conversation], user_id: &str) -> Result<HashMap<ConversationId, u64>> {
        let mut counts = HashMap::with_capacity(conversations.len());
        for conversation in conversations {
            let Some(other) = conversation.other_participant(user_id) else {
                continue;
            };
            let count = self.gateway.count_unread(other, user_id).await?;
            counts.insert(conversation.id, count);
        }
        Ok(counts)
    }

    /// Marks everything the other participant sent to `user_id` as read.
    pub async fn mark_messages_as_read(&self, conversation_id: ConversationId, user_id: &str, conversations: &[Conversation]) -> Result<()> {
        let Some(other) = conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .and_then(|c| c.other_participant(user_id))
        else {
            tracing::debug!(%conversation_id, "nothing to mark, conversation unknown to {user_id}");
            return Ok(());
        };

        self.gateway.mark_read(other, user_id).await
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Path(conversation_id): Path<ConversationId>,
) -> AppResult<StatusCode> {
    let gateway = gateway.authorized(user.token());
    let messenger = Messenger::new(&gateway);

    let conversations = messenger.fetch_conversations(&user.user_id).await?;
    messenger.mark_messages_as_read(conversation_id, &user.user_id, &conversations).await?;

    Ok(StatusCode::NO_CONTENT)
}
