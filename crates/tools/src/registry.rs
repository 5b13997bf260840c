//! A name → `ToolService` lookup (spec §4.5: dispatch is by tool name).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use agentrt_domain::{Error, Result};

use crate::{ToolCallContext, ToolRawResult, ToolService};

#[derive(Default)]
pub struct ToolRegistry {
    services: HashMap<String, Arc<dyn ToolService>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: Arc<dyn ToolService>) {
        self.services.insert(service.name().to_string(), service);
    }

    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
        ctx: &ToolCallContext,
    ) -> Result<ToolRawResult> {
        let service = self
            .services
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("tool '{name}'")))?;
        service.call(arguments, ctx).await
    }
}
