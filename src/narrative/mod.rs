//! Narrative Assembler — turns a correlated profile into a plain-language
//! summary via a chain of language-model providers.
//!
//! **Design**: the narrative is strictly additive. Providers are tried in
//! order and the first non-empty response wins; when every provider fails
//! the caller gets [`NarrativeError::Exhausted`] and falls back to showing
//! the structured profile on its own. No retrieval or correlation state is
//! ever affected by narrative failures.

mod prompt;
mod provider;

pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use provider::{NarrativeProvider, OpenRouterProvider, OPENROUTER_BASE_URL};

use thiserror::Error;
use tracing::{info, warn};

use crate::profile::DeviceProfile;

/// Errors from narrative generation.
#[derive(Debug, Error)]
pub enum NarrativeError {
    /// One provider failed (transport, HTTP, or malformed body).
    #[error("narrative provider {name} failed: {message}")]
    Provider { name: String, message: String },

    /// A provider answered successfully but with no usable text.
    #[error("narrative provider {name} returned an empty response")]
    EmptyResponse { name: String },

    /// Every provider in the chain failed.
    #[error("all {attempted} narrative providers failed")]
    Exhausted { attempted: usize },
}

/// Free-tier models tried first, then paid models.
pub const FALLBACK_MODELS: [&str; 3] = [
    "meta-llama/llama-3.1-8b-instruct:free",
    "google/gemma-2-9b-it:free",
    "mistralai/mistral-7b-instruct:free",
];

pub const PREFERRED_MODELS: [&str; 3] = [
    "openai/gpt-4o-mini",
    "anthropic/claude-3-haiku",
    "google/gemini-flash-1.5",
];

/// An ordered chain of providers with first-success semantics.
pub struct NarrativeChain {
    providers: Vec<Box<dyn NarrativeProvider>>,
}

impl NarrativeChain {
    pub fn new(providers: Vec<Box<dyn NarrativeProvider>>) -> Self {
        Self { providers }
    }

    /// The default OpenRouter chain: free-tier models first, paid models as
    /// the backstop.
    pub fn openrouter(api_key: &str) -> Result<Self, NarrativeError> {
        let mut providers: Vec<Box<dyn NarrativeProvider>> = Vec::new();
        for model in FALLBACK_MODELS.iter().chain(PREFERRED_MODELS.iter()) {
            providers.push(Box::new(OpenRouterProvider::new(api_key, model)?));
        }
        Ok(Self::new(providers))
    }

    /// Generate a narrative for `profile`, trying providers in order.
    pub fn narrate(&self, profile: &DeviceProfile) -> Result<String, NarrativeError> {
        let user_prompt = build_prompt(profile);
        for provider in &self.providers {
            match provider.invoke(SYSTEM_PROMPT, &user_prompt) {
                Ok(text) if !text.trim().is_empty() => {
                    info!(provider = provider.name(), "narrative generated");
                    return Ok(text);
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "empty narrative, trying next");
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "narrative provider failed");
                }
            }
        }
        Err(NarrativeError::Exhausted {
            attempted: self.providers.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted provider: fails, answers empty, or answers with text.
    struct StubProvider {
        name: &'static str,
        response: Result<&'static str, ()>,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn boxed(
            name: &'static str,
            response: Result<&'static str, ()>,
            calls: &Arc<AtomicUsize>,
        ) -> Box<dyn NarrativeProvider> {
            Box::new(Self {
                name,
                response,
                calls: Arc::clone(calls),
            })
        }
    }

    impl NarrativeProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn invoke(&self, _system: &str, _prompt: &str) -> Result<String, NarrativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.response {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(NarrativeError::Provider {
                    name: self.name.to_string(),
                    message: "down".into(),
                }),
            }
        }
    }

    fn profile() -> DeviceProfile {
        DeviceProfile::empty("insulin pump")
    }

    #[test]
    fn first_success_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = NarrativeChain::new(vec![
            StubProvider::boxed("a", Ok("MAIN OBSERVATION: fine."), &calls),
            StubProvider::boxed("b", Ok("unused"), &calls),
        ]);
        let text = chain.narrate(&profile()).unwrap();
        assert!(text.starts_with("MAIN OBSERVATION"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_fall_through_to_the_next_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = NarrativeChain::new(vec![
            StubProvider::boxed("down", Err(()), &calls),
            StubProvider::boxed("empty", Ok("   "), &calls),
            StubProvider::boxed("ok", Ok("summary text"), &calls),
        ]);
        assert_eq!(chain.narrate(&profile()).unwrap(), "summary text");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausted_chain_reports_the_attempt_count() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = NarrativeChain::new(vec![
            StubProvider::boxed("a", Err(()), &calls),
            StubProvider::boxed("b", Err(()), &calls),
        ]);
        let err = chain.narrate(&profile()).unwrap_err();
        assert!(matches!(err, NarrativeError::Exhausted { attempted: 2 }));
    }

    #[test]
    fn empty_chain_is_exhausted_immediately() {
        let chain = NarrativeChain::new(Vec::new());
        let err = chain.narrate(&profile()).unwrap_err();
        assert!(matches!(err, NarrativeError::Exhausted { attempted: 0 }));
    }

    #[test]
    fn default_chain_orders_free_models_first() {
        let chain = NarrativeChain::openrouter("test-key").unwrap();
        assert_eq!(chain.providers.len(), 6);
        assert_eq!(chain.providers[0].name(), "meta-llama/llama-3.1-8b-instruct:free");
        assert_eq!(chain.providers[3].name(), "openai/gpt-4o-mini");
    }
}
