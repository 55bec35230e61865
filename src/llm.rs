use std::time::Duration;

use async_trait::async_trait;
use chatgpt::{client::ChatGPT, config::ChatGPTEngine, types::CompletionResponse};
use log::{debug, error};

use crate::{
    config::{Config, API_KEY_VAR},
    error::GenerationError,
};

/// A hosted text model that turns one prompt into one completion.
///
/// Implementations make a single attempt. Retrying is left to whoever
/// triggered the call.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model(&self) -> &str;
}

pub struct ChatGptGenerator {
    chat_gpt: ChatGPT,
    model: String,
}

impl ChatGptGenerator {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let mut chat_gpt = ChatGPT::new(api_key)
            .map_err(|e| GenerationError::Configuration(format!("OpenAI client: {e}")))?;

        chat_gpt.config.engine = engine_for(model);
        chat_gpt.config.timeout = timeout;

        Ok(Self {
            chat_gpt,
            model: model.to_string(),
        })
    }
}

fn engine_for(model: &str) -> ChatGPTEngine {
    match model {
        "gpt-3.5-turbo" => ChatGPTEngine::Gpt35Turbo,
        "gpt-4" => ChatGPTEngine::Gpt4,
        "gpt-4-32k" => ChatGPTEngine::Gpt4_32k,
        // Custom engines need a 'static name; this runs once at startup.
        other => ChatGPTEngine::Custom(Box::leak(other.to_string().into_boxed_str())),
    }
}

#[async_trait]
impl TextGenerator for ChatGptGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("Sending prompt to {}: {prompt:?}", self.model);

        let response: CompletionResponse =
            self.chat_gpt.send_message(prompt).await.map_err(|e| {
                error!("Generation request to {} failed: {e}", self.model);
                GenerationError::Provider(e.to_string())
            })?;
        let content = response.message().content.clone();

        debug!("Completion: {content:?}");

        if content.trim().is_empty() {
            return Err(GenerationError::Provider(
                "model returned an empty completion".to_string(),
            ));
        }
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Stands in for the real client when no API key is configured, so that
/// every generation attempt fails loudly instead of reaching the network.
pub struct MissingApiKey {
    model: String,
}

impl MissingApiKey {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for MissingApiKey {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Configuration(format!(
            "{API_KEY_VAR} is not set"
        )))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

pub fn generator_from_config(config: &Config) -> Result<Box<dyn TextGenerator>, GenerationError> {
    match &config.api_key {
        Some(key) => Ok(Box::new(ChatGptGenerator::new(
            key.clone(),
            &config.model,
            config.generation_timeout,
        )?)),
        None => Ok(Box::new(MissingApiKey::new(&config.model))),
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    /// Replays canned completions and records every prompt it was given.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn replying(
            replies: impl IntoIterator<Item = Result<String, GenerationError>>,
        ) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                prompts: Mutex::default(),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Provider("no scripted reply".into())))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }
}
