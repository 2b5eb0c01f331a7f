use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    gateway::{Backend, Conversation, ConversationId, Gateway},
    session::CurrentUser,
    AppResult, Error, Result,
};

use super::Messenger;

impl<G: Gateway> Messenger<'_, G> {
    /// The one conversation for `{user_a, user_b}`, created on first use.
    pub async fn get_or_create_conversation(&self, user_a: &str, user_b: &str) -> Result<ConversationId> {
        if user_a == user_b {
            return Err(Error::invalid("a conversation needs two different users"));
        }

        self.gateway.get_or_create_conversation(user_a, user_b).await
    }

    /// Every conversation `user_id` takes part in, most recently active first.
    pub async fn fetch_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        self.gateway.conversations_for(user_id).await
    }
}

#[derive(Serialize)]
pub(crate) struct ConversationSummary {
    #[serde(flatten)]
    conversation: Conversation,
    other_user_id: String,
    unread: u64,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(
    State(gateway): State<Backend>,
    user: CurrentUser,
) -> AppResult<Json<Vec<ConversationSummary>>> {
    let gateway = gateway.authorized(user.token());
    let messenger = Messenger::new(&gateway);

    let conversations = messenger.fetch_conversations(&user.user_id).await?;
    let mut unread = messenger.fetch_unread_counts(&conversations, &user.user_id).await?;

    let summaries = conversations
        .into_iter()
        .filter_map(|conversation| {
            let other_user_id = conversation.other_participant(&user.user_id)?.to_owned();
            let unread = unread.remove(&conversation.id).unwrap_or(0);
            Some(ConversationSummary { conversation, other_user_id, unread })
        })
        .collect();

    Ok(Json(summaries))
}

#[derive(Deserialize)]
pub(crate) struct OpenConversation {
    user_id: String,
}

#[derive(Serialize)]
pub(crate) struct Opened {
    id: ConversationId,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn open(
    State(gateway): State<Backend>,
    user: CurrentUser,
    Json(OpenConversation { user_id }): Json<OpenConversation>,
) -> AppResult<Json<Opened>> {
    let gateway = gateway.authorized(user.token());
    let id = Messenger::new(&gateway)
        .get_or_create_conversation(&user.user_id, &user_id)
        .await?;

    Ok(Json(Opened { id }))
}
