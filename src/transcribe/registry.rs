use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Transcriber, WhisperTranscriber};
use crate::config::TranscriberConfig;
use crate::error::TranscribeError;

pub type TranscriberFactory =
    Box<dyn Fn(&TranscriberConfig) -> Result<Arc<dyn Transcriber>> + Send + Sync>;

/// Name-keyed transcriber construction, open for extension. Unknown names
/// yield a typed error instead of a panic.
pub struct TranscriberRegistry {
    factories: HashMap<String, TranscriberFactory>,
}

impl TranscriberRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in engines registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("whisper", Box::new(|config| {
            Ok(Arc::new(WhisperTranscriber::load(config)?) as Arc<dyn Transcriber>)
        }));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: TranscriberFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn resolve(
        &self,
        name: &str,
        config: &TranscriberConfig,
    ) -> Result<Arc<dyn Transcriber>> {
        match self.factories.get(name) {
            Some(factory) => factory(config),
            None => Err(TranscribeError::UnknownModel(name.to_string()).into()),
        }
    }
}

impl Default for TranscriberRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
