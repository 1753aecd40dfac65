use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A note attached to a user turn by an auxiliary agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub name: String,
    pub note: String,
    /// Opaque to the relay, only `name` and `note` reach the model
    #[serde(default)]
    pub payload: Value,
}

impl AgentResponse {
    pub fn new<S: Into<String>, T: Into<String>>(name: S, note: T) -> Self {
        Self {
            name: name.into(),
            note: note.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A chat message as sent by the interface
pub struct Message {
    pub id: String,
    pub text: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_finished: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents_response: Option<Vec<AgentResponse>>,
}

impl Message {
    fn new<S: Into<String>>(role: Role, text: S) -> Self {
        Message {
            id: format!("msg_{}", Utc::now().timestamp_nanos_opt().unwrap_or_default()),
            text: text.into(),
            role,
            is_finished: None,
            agents_response: None,
        }
    }

    /// Create a new user message with a timestamp derived id
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, text)
    }

    /// Create a new assistant message with a timestamp derived id
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    /// Attach an agent annotation, keeping insertion order
    pub fn with_agent_response(mut self, response: AgentResponse) -> Self {
        self.agents_response
            .get_or_insert_with(Vec::new)
            .push(response);
        self
    }
}

/// Roles a provider turn can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    Developer,
    User,
    Assistant,
}

impl From<Role> for TurnRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => TurnRole::User,
            Role::Assistant => TurnRole::Assistant,
        }
    }
}

/// Provider neutral role/content pair accepted by every chat completion API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedTurn {
    pub role: TurnRole,
    pub content: String,
}

impl FormattedTurn {
    pub fn new<S: Into<String>>(role: TurnRole, content: S) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
