//! Chat application endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{InputFile, ResponseMode, ResultResponse};
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::request::Request;

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /chat-messages`
#[derive(Debug, Clone, Serialize)]
pub struct SendChatMessage {
    query: String,
    user: String,
    inputs: Map<String, Value>,
    response_mode: ResponseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    files: Vec<InputFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_generate_name: Option<bool>,
}

impl SendChatMessage {
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user: user.into(),
            inputs: Map::new(),
            response_mode: ResponseMode::Blocking,
            conversation_id: None,
            files: Vec::new(),
            auto_generate_name: None,
        }
    }

    /// Continue an existing conversation.
    pub fn conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Set an app input variable.
    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn file(mut self, file: InputFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn auto_generate_name(mut self, enabled: bool) -> Self {
        self.auto_generate_name = Some(enabled);
        self
    }

    /// Ask for server-sent events instead of one buffered answer.
    pub fn streaming(mut self) -> Self {
        self.response_mode = ResponseMode::Streaming;
        self
    }
}

impl Endpoint for SendChatMessage {
    type Output = ChatMessageResponse;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::post("/chat-messages").json(self)?.build())
    }
}

/// Answer of a blocking chat call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageResponse {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub message_id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub mode: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub created_at: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversations
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /conversations`
#[derive(Debug, Clone)]
pub struct ListConversations {
    user: String,
    last_id: Option<String>,
    limit: Option<u32>,
    sort_by: Option<String>,
}

impl ListConversations {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            last_id: None,
            limit: None,
            sort_by: None,
        }
    }

    /// Page after this conversation id.
    pub fn last_id(mut self, last_id: impl Into<String>) -> Self {
        self.last_id = Some(last_id.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort key such as `-updated_at`.
    pub fn sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }
}

impl Endpoint for ListConversations {
    type Output = ConversationList;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::get("/conversations")
            .query("user", &self.user)
            .query_opt("last_id", self.last_id.as_ref())
            .query_opt("limit", self.limit)
            .query_opt("sort_by", self.sort_by.as_ref())
            .build())
    }
}

/// A chat conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Page of conversations.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationList {
    pub data: Vec<Conversation>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub limit: u32,
}

/// `POST /conversations/:conversation_id/name`
#[derive(Debug, Clone)]
pub struct RenameConversation {
    conversation_id: String,
    user: String,
    name: Option<String>,
    auto_generate: bool,
}

impl RenameConversation {
    /// Rename to an explicit name.
    pub fn new(
        conversation_id: impl Into<String>,
        user: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
            name: Some(name.into()),
            auto_generate: false,
        }
    }

    /// Let the server generate a name.
    pub fn auto_generate(conversation_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
            name: None,
            auto_generate: true,
        }
    }
}

impl Endpoint for RenameConversation {
    type Output = Conversation;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::post("/conversations/:conversation_id/name")
            .path("conversation_id", &self.conversation_id)
            .field_opt("name", self.name.clone())
            .field("auto_generate", self.auto_generate)
            .field("user", self.user.clone())
            .build())
    }
}

/// `DELETE /conversations/:conversation_id`
#[derive(Debug, Clone)]
pub struct DeleteConversation {
    conversation_id: String,
    user: String,
}

impl DeleteConversation {
    pub fn new(conversation_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
        }
    }
}

impl Endpoint for DeleteConversation {
    type Output = ResultResponse;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::delete("/conversations/:conversation_id")
            .path("conversation_id", &self.conversation_id)
            .field("user", self.user.clone())
            .build())
    }
}
