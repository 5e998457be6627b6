use std::collections::HashMap;

use crate::command::errors::{ExecutionError, Rejection};
use crate::command::metadata::CommandSpec;
use crate::resolution::ResolutionContext;

/// Runs before the gate; returning `false` drops the invocation silently.
pub type Interceptor = Box<dyn Fn(&CommandSpec, &dyn ResolutionContext) -> bool + Send + Sync>;
/// Replaces the default reply to a rejection. `None` sends nothing.
pub type RejectionHandler = Box<dyn Fn(&CommandSpec, &Rejection) -> Option<String> + Send + Sync>;
/// Replaces the default reply to a failed handler, given the command path. `None` sends nothing.
pub type ErrorHandler = Box<dyn Fn(&str, &ExecutionError) -> Option<String> + Send + Sync>;

/// Host-supplied customisation of the dispatcher.
#[derive(Default)]
pub struct Hooks {
    interceptors: HashMap<String, Interceptor>,
    pub(crate) rejection_handler: Option<RejectionHandler>,
    pub(crate) error_handler: Option<ErrorHandler>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an interceptor for a command path (`ping`, `tag create`), replacing any previous
    /// one.
    pub fn intercept<F>(mut self, command: &str, interceptor: F) -> Self
    where
        F: Fn(&CommandSpec, &dyn ResolutionContext) -> bool + Send + Sync + 'static,
    {
        self.interceptors.insert(command.to_lowercase(), Box::new(interceptor));
        self
    }

    pub fn on_rejection<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CommandSpec, &Rejection) -> Option<String> + Send + Sync + 'static,
    {
        self.rejection_handler = Some(Box::new(handler));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &ExecutionError) -> Option<String> + Send + Sync + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Whether the invocation may continue to the gate.
    pub fn allows(&self, path: &str, spec: &CommandSpec, ctxt: &dyn ResolutionContext) -> bool {
        self.interceptors.get(path).map_or(true, |interceptor| interceptor(spec, ctxt))
    }
}
