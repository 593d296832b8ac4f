//! Language model access
//!
//! The pipeline only needs `complete(system, user) -> text`; anything that
//! speaks that contract can stand in for the hosted model.

mod openai_compat;

pub use openai_compat::ChatCompletionsModel;

use crate::config::LlmConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for text completion providers
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a conversation made of one system and one user message
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create the configured language model client
pub fn create_language_model(
    config: &LlmConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn LanguageModel>> {
    Ok(Arc::new(ChatCompletionsModel::new(config, api_key)?))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    /// Returns a fixed reply and records every prompt it receives.
    pub struct ScriptedModel {
        reply: std::result::Result<String, String>,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedModel {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn last_user_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().map(|(_, u)| u.clone())
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, system: &str, user: &str) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.reply.clone().map_err(Error::Llm)
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }
}
