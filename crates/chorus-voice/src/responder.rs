use crate::config::ResponderConfig;
use crate::error::VoiceError;
use crate::{build_http_client, require_api_key, Responder};
use async_trait::async_trait;
use chorus_types::{ChatMessage, ChatRole, Persona};
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "chat completion";

/// OpenAI chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiResponder {
    config: ResponderConfig,
    client: reqwest::Client,
}

/// A message in the provider's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Builds the message list sent to the model.
///
/// A system message describing the character comes first; every history
/// entry keeps its role and is prefixed with the speaker's name so the
/// model can tell participants apart.
pub fn build_prompt(persona: &Persona, history: &[ChatMessage]) -> Vec<PromptMessage> {
    let system = format!(
        "You are acting as a character in an online Discord chatroom.\n\n\
         Character Name: {}\n\n\
         Character Description:\n{}\n\n\
         Example Speech:\n{}\n",
        persona.name, persona.character_description, persona.example_speech
    );

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(PromptMessage {
        role: ChatRole::System.as_str(),
        content: system,
    });
    messages.extend(history.iter().map(|message| PromptMessage {
        role: message.role.as_str(),
        content: format!("{}: {}", message.speaker, message.content),
    }));
    messages
}

impl OpenAiResponder {
    pub fn new(config: ResponderConfig) -> Result<Self, VoiceError> {
        let client = build_http_client(config.timeout_seconds)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Responder for OpenAiResponder {
    async fn complete(
        &self,
        persona: &Persona,
        history: &[ChatMessage],
    ) -> Result<Option<String>, VoiceError> {
        require_api_key(PROVIDER, &self.config.api_key)?;

        let messages = build_prompt(persona, history);
        let request = CompletionRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "completion request rejected");
            return Err(VoiceError::Provider {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Decode(e.to_string()))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        if reply.is_none() {
            tracing::warn!(bot = %persona.name, "model returned an empty completion");
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_starts_with_character_sheet() {
        let persona = Persona {
            name: "Pepper Flakes".to_string(),
            character_description: "A blank slate.".to_string(),
            example_speech: "I've never been to an amusement park.".to_string(),
        };
        let history = vec![
            ChatMessage::user("Alice", "hello"),
            ChatMessage::assistant("Pepper Flakes", "Hi!"),
        ];

        let prompt = build_prompt(&persona, &history);
        assert_eq!(prompt.len(), 3);
        assert_eq!(prompt[0].role, "system");
        assert!(prompt[0]
            .content
            .starts_with("You are acting as a character in an online Discord chatroom."));
        assert!(prompt[0].content.contains("Character Name: Pepper Flakes"));
        assert!(prompt[0].content.contains("A blank slate."));
        assert!(prompt[0]
            .content
            .contains("I've never been to an amusement park."));

        assert_eq!(prompt[1].role, "user");
        assert_eq!(prompt[1].content, "Alice: hello");
        assert_eq!(prompt[2].role, "assistant");
        assert_eq!(prompt[2].content, "Pepper Flakes: Hi!");
    }

    #[test]
    fn empty_history_yields_only_system_message() {
        let prompt = build_prompt(&Persona::default(), &[]);
        assert_eq!(prompt.len(), 1);
    }
}
