//! Shared state handed to every endpoint handler.

use std::sync::Arc;

use crate::db::ReportStore;
use crate::pipeline::LlmClient;

/// Shared per-request context. Cloned into each handler via `State`.
#[derive(Clone)]
pub struct ApiContext {
    pub store: ReportStore,
    pub llm: Arc<dyn LlmClient>,
}

impl ApiContext {
    pub fn new(store: ReportStore, llm: Arc<dyn LlmClient>) -> Self {
        Self { store, llm }
    }
}
