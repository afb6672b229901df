//! Verb table and the built-in command handlers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::model::RegistrationForm;
use crate::protocol::{Response, LOAD_COMMAND, REGISTER_COMMAND};
use crate::registration::RegistrationLog;

/// Executes one verb. The returned response is written by the caller.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, argument: &str) -> Result<Response>;
}

/// Maps verbs to their handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher serving the load and register verbs.
    pub fn standard(catalog: Arc<Catalog>, log: Arc<RegistrationLog>) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(LOAD_COMMAND, LoadCourses { catalog });
        dispatcher.register(REGISTER_COMMAND, Register { log });
        dispatcher
    }

    /// Register `handler` for `verb`, replacing any previous handler.
    pub fn register(&mut self, verb: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.handlers.insert(verb.into(), Arc::new(handler));
    }

    /// Run the handler registered for `verb`.
    pub async fn dispatch(&self, verb: &str, argument: &str) -> Result<Response> {
        let handler = self
            .handlers
            .get(verb)
            .ok_or_else(|| Error::UnknownCommand(verb.to_string()))?;

        trace!(verb, "Dispatching command");
        handler.handle(argument).await
    }

    pub fn verbs(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// `CHARGER <session>`
pub struct LoadCourses {
    pub catalog: Arc<Catalog>,
}

#[async_trait]
impl CommandHandler for LoadCourses {
    async fn handle(&self, argument: &str) -> Result<Response> {
        let courses = self.catalog.list_by_session(argument).await?;
        Ok(Response::Courses(courses))
    }
}

/// `INSCRIRE <form-json>`
pub struct Register {
    pub log: Arc<RegistrationLog>,
}

#[async_trait]
impl CommandHandler for Register {
    async fn handle(&self, argument: &str) -> Result<Response> {
        let form: RegistrationForm = serde_json::from_str(argument)
            .map_err(|e| Error::MalformedCommand(format!("bad registration form: {e}")))?;
        let confirmation = self.log.submit(&form).await?;
        Ok(Response::Confirmation(confirmation))
    }
}
