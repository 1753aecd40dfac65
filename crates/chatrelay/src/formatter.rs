//! Conversation formatting shared by every provider
use crate::models::message::{AgentResponse, FormattedTurn, Message, Role, TurnRole};

/// Convert messages to provider turns, folding agent annotations into user turns
pub fn build_messages_with_agents(messages: &[Message]) -> Vec<FormattedTurn> {
    messages
        .iter()
        .map(|message| match message.role {
            Role::Assistant => FormattedTurn::new(TurnRole::Assistant, &message.text),
            Role::User => FormattedTurn::new(
                TurnRole::User,
                user_content(&message.text, message.agents_response.as_deref()),
            ),
        })
        .collect()
}

/// Convert messages to provider turns without any agent context
pub fn build_messages(messages: &[Message]) -> Vec<FormattedTurn> {
    messages
        .iter()
        .map(|message| FormattedTurn::new(message.role.into(), &message.text))
        .collect()
}

fn user_content(text: &str, agents: Option<&[AgentResponse]>) -> String {
    let agent_blocks = agents
        .unwrap_or_default()
        .iter()
        .map(|agent| format!("<agent name=\"{}\">\n{}\n</agent>", agent.name, agent.note))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("<user>\n{}\n</user>\n---\n{}\n", text, agent_blocks)
        .trim()
        .to_string()
}
