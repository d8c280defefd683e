use crate::summarization::{LanguageModel, RemoteModelError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str) -> Result<String, RemoteModelError> + Send + Sync;

/// In-memory model whose replies are computed from the prompt; records every prompt it sees.
pub(crate) struct ScriptedModel {
    responder: Box<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&str) -> Result<String, RemoteModelError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn replying(reply: &str) -> Arc<Self> {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock").clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompt lock").len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteModelError> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());
        (self.responder)(prompt)
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}
