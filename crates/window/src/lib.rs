//! MemoryWindow (spec §4.4): assembles the model-facing prompt for one
//! conversation from the ResourceIndex + MemoryIndex.

use std::sync::Arc;

use serde_json::Value;

use agentrt_domain::config::BudgetConfig;
use agentrt_domain::resource::{AnyResource, Message as ResourceMessage, Resource, ToolCallMessage};
use agentrt_domain::{Error, Identifier, Result};
use agentrt_index::{MemoryIndex, ResourceIndex};

const TOOL_CALL_MESSAGE_KIND: &str = "tool_call_message";

/// A tool declaration normalized for the LLM-facing window (spec §4.4 step
/// 6: `parameters` always carries `type`/`properties`/`required`).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One entry of the assembled window, in send order.
#[derive(Debug, Clone)]
pub enum WindowMessage {
    System(String),
    Message(ResourceMessage),
    ToolResult(ToolCallMessage),
}

#[derive(Debug, Clone)]
pub struct WindowResult {
    pub messages: Vec<WindowMessage>,
    pub tools: Vec<NormalizedTool>,
}

pub struct MemoryWindow {
    resources: Arc<ResourceIndex>,
    memory: Arc<MemoryIndex>,
    budget: BudgetConfig,
}

impl MemoryWindow {
    pub fn new(resources: Arc<ResourceIndex>, memory: Arc<MemoryIndex>, budget: BudgetConfig) -> Self {
        Self {
            resources,
            memory,
            budget,
        }
    }

    /// Build `{messages, tools}` for `resource_id` under `model`'s context
    /// budget, reserving `max_tokens` for the model's output.
    pub async fn build(
        &self,
        resource_id: &str,
        model: &str,
        max_tokens: u32,
    ) -> Result<WindowResult> {
        let conversation = self.load_conversation(resource_id).await?;
        let agent = self.load_agent(&conversation_agent_key(&conversation)).await?;
        let tools = self.load_tools(&agent).await?;

        let agent_tokens = required_tokens(agent.identifier())?;
        let tool_tokens: u32 = tools
            .iter()
            .map(|t| required_tokens(t.identifier()))
            .sum::<Result<u32>>()?;

        let total = self.budget.total_for(model) as i64;
        let overhead = agent_tokens as i64 + tool_tokens as i64;
        let history_budget = (total - overhead - max_tokens as i64).max(0) as u32;

        let accepted_ids = self.walk_history(resource_id, history_budget).await?;
        let hydrated = self.resources.get(&accepted_ids).await?;

        let mut messages = Vec::with_capacity(hydrated.len() + 1);
        let AnyResource::Agent(ref agent_inner) = agent else {
            unreachable!("load_agent only returns AnyResource::Agent");
        };
        messages.push(WindowMessage::System(agent_inner.system_prompt.clone()));
        for resource in hydrated {
            match resource {
                AnyResource::Message(m) => messages.push(WindowMessage::Message(m)),
                AnyResource::ToolCallMessage(t) => messages.push(WindowMessage::ToolResult(t)),
                _ => {}
            }
        }

        let normalized_tools = tools.iter().map(normalize_tool).collect();

        Ok(WindowResult {
            messages,
            tools: normalized_tools,
        })
    }

    async fn load_conversation(&self, resource_id: &str) -> Result<agentrt_domain::resource::Conversation> {
        let got = self.resources.get(&[resource_id.to_string()]).await?;
        match got.into_iter().next() {
            Some(AnyResource::Conversation(c)) => Ok(c),
            _ => Err(Error::NotFound(resource_id.to_string())),
        }
    }

    async fn load_agent(&self, agent_key: &str) -> Result<AnyResource> {
        let got = self.resources.get(&[agent_key.to_string()]).await?;
        match got.into_iter().next() {
            Some(r @ AnyResource::Agent(_)) => Ok(r),
            _ => Err(Error::NotFound(agent_key.to_string())),
        }
    }

    async fn load_tools(
        &self,
        agent: &AnyResource,
    ) -> Result<Vec<agentrt_domain::resource::ToolFunction>> {
        let AnyResource::Agent(a) = agent else {
            unreachable!("load_agent only returns AnyResource::Agent");
        };
        let keys: Vec<String> = a
            .tools
            .iter()
            .map(|name| Identifier::new("tool_function", name.clone()).to_key())
            .collect();
        let got = self.resources.get(&keys).await?;
        Ok(got
            .into_iter()
            .filter_map(|r| match r {
                AnyResource::ToolFunction(tf) => Some(tf),
                _ => None,
            })
            .collect())
    }

    /// Newest-to-oldest budget walk (step 3) followed by the tool-call
    /// integrity sweep (step 4), returning ids in oldest-first send order.
    async fn walk_history(&self, _resource_id: &str, history_budget: u32) -> Result<Vec<String>> {
        let newest_first = self.memory.newest_first().await?;

        let mut accepted_newest_first = Vec::new();
        let mut sum: u64 = 0;
        for record in &newest_first {
            let tokens = required_tokens(&record.identifier)?;
            if sum + tokens as u64 > history_budget as u64 {
                break;
            }
            sum += tokens as u64;
            accepted_newest_first.push(record);
        }

        let mut accepted: Vec<_> = accepted_newest_first.into_iter().rev().collect::<Vec<_>>();
        while accepted
            .first()
            .is_some_and(|r: &&agentrt_index::MemoryRecord| r.identifier.kind == TOOL_CALL_MESSAGE_KIND)
        {
            accepted.remove(0);
        }

        Ok(accepted.into_iter().map(|r| r.id.clone()).collect())
    }
}

fn conversation_agent_key(conversation: &agentrt_domain::resource::Conversation) -> String {
    conversation.agent_id.clone()
}

fn required_tokens(identifier: &Identifier) -> Result<u32> {
    identifier
        .tokens
        .ok_or_else(|| Error::BudgetMissingTokens(identifier.to_key()))
}

fn normalize_tool(tf: &agentrt_domain::resource::ToolFunction) -> NormalizedTool {
    let mut obj = tf.parameters.as_object().cloned().unwrap_or_default();
    obj.insert("type".to_string(), Value::String("object".to_string()));
    obj.entry("properties".to_string())
        .or_insert_with(|| Value::Object(Default::default()));
    obj.entry("required".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    NormalizedTool {
        name: tf.name.clone(),
        description: tf.description.clone(),
        parameters: Value::Object(obj),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrt_domain::resource::{Agent, Conversation, ToolFunction};
    use agentrt_domain::tool::{MessageContent, Role};
    use agentrt_store::{LocalObjectStore, ObjectStore};
    use serde_json::json;

    struct Harness {
        resources: Arc<ResourceIndex>,
        memory: Arc<MemoryIndex>,
        budget: BudgetConfig,
    }

    impl Harness {
        fn new() -> (tempfile::TempDir, Self) {
            let dir = tempfile::tempdir().unwrap();
            let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
            let resources = Arc::new(ResourceIndex::new(store.clone(), "resources.jsonl"));
            let memory = Arc::new(MemoryIndex::new(store, "memory.jsonl"));
            (
                dir,
                Self {
                    resources,
                    memory,
                    budget: BudgetConfig::default(),
                },
            )
        }

        fn window(&self) -> MemoryWindow {
            MemoryWindow::new(self.resources.clone(), self.memory.clone(), self.budget.clone())
        }
    }

    async fn seed_agent_and_conversation(h: &Harness, agent_tokens: u32, tool_tokens: &[u32]) {
        let tool_names: Vec<String> = (0..tool_tokens.len()).map(|i| format!("tool{i}")).collect();
        for (i, &tok) in tool_tokens.iter().enumerate() {
            let tf = ToolFunction {
                identifier: Identifier::new("tool_function", tool_names[i].clone()).with_tokens(tok),
                name: tool_names[i].clone(),
                description: "d".into(),
                parameters: json!({}),
            };
            h.resources.add(AnyResource::ToolFunction(tf)).await.unwrap();
        }

        let agent = Agent {
            identifier: Identifier::new("agent", "root").with_tokens(agent_tokens),
            system_prompt: "sys".into(),
            tools: tool_names,
            infer: false,
            handoffs: vec![],
        };
        h.resources.add(AnyResource::Agent(agent)).await.unwrap();

        let conv = Conversation {
            identifier: Identifier::new("conversation", "c1").with_tokens(0),
            agent_id: "agent.root".into(),
            actor: "user:1".into(),
        };
        h.resources.add(AnyResource::Conversation(conv)).await.unwrap();
    }

    fn user_message(name: &str, tokens: u32) -> AnyResource {
        AnyResource::Message(ResourceMessage {
            identifier: Identifier::new("message", name)
                .with_parent("conversation.c1")
                .with_tokens(tokens),
            role: Role::User,
            content: MessageContent::Text(name.into()),
            tool_calls: vec![],
        })
    }

    #[tokio::test]
    async fn scenario_a_memory_budget_keeps_longest_affordable_suffix() {
        let (_dir, mut h) = Harness::new();
        h.budget.models.insert("test-model-125".into(), 125);
        seed_agent_and_conversation(&h, 50, &[20, 20]).await;

        for (name, tokens) in [("m1", 15), ("m2", 25), ("m3", 10)] {
            let msg = user_message(name, tokens);
            h.resources.add(msg.clone()).await.unwrap();
            h.memory.append(msg.identifier().clone()).await.unwrap();
        }

        let result = h.window().build("conversation.c1", "test-model-125", 15).await.unwrap();
        assert_eq!(result.messages.len(), 2);
        assert!(matches!(result.messages[0], WindowMessage::System(_)));
        match &result.messages[1] {
            WindowMessage::Message(m) => assert_eq!(m.content.text(), Some("m3")),
            _ => panic!("expected hydrated message"),
        }
    }

    #[tokio::test]
    async fn scenario_b_tool_integrity_sweep_drops_orphaned_tool_results() {
        let (_dir, mut h) = Harness::new();
        h.budget.models.insert("test-model-230".into(), 230);
        seed_agent_and_conversation(&h, 50, &[20, 20]).await;

        let assistant1 = AnyResource::Message(ResourceMessage {
            identifier: Identifier::new("message", "a1")
                .with_parent("conversation.c1")
                .with_tokens(100),
            role: Role::Assistant,
            content: MessageContent::Text("a1".into()),
            tool_calls: vec![],
        });
        let tool1 = AnyResource::ToolCallMessage(ToolCallMessage {
            identifier: Identifier::new("tool_call_message", "t1")
                .with_parent("conversation.c1")
                .with_tokens(50),
            tool_call_id: "call1".into(),
            content: "r1".into(),
            is_error: false,
        });
        let tool2 = AnyResource::ToolCallMessage(ToolCallMessage {
            identifier: Identifier::new("tool_call_message", "t2")
                .with_parent("conversation.c1")
                .with_tokens(50),
            tool_call_id: "call2".into(),
            content: "r2".into(),
            is_error: false,
        });
        let assistant2 = AnyResource::Message(ResourceMessage {
            identifier: Identifier::new("message", "a2")
                .with_parent("conversation.c1")
                .with_tokens(30),
            role: Role::Assistant,
            content: MessageContent::Text("a2".into()),
            tool_calls: vec![],
        });

        for item in [assistant1, tool1, tool2, assistant2] {
            h.resources.add(item.clone()).await.unwrap();
            h.memory.append(item.identifier().clone()).await.unwrap();
        }

        let result = h.window().build("conversation.c1", "test-model-230", 50).await.unwrap();
        assert_eq!(result.messages.len(), 2);
        match &result.messages[1] {
            WindowMessage::Message(m) => assert_eq!(m.content.text(), Some("a2")),
            _ => panic!("expected the final assistant message"),
        }
    }

    #[tokio::test]
    async fn missing_conversation_is_fatal() {
        let (_dir, h) = Harness::new();
        let err = h.window().build("conversation.missing", "test-model-125", 15).await;
        assert!(matches!(err, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_tokens_on_a_memory_entry_is_fatal() {
        let (_dir, mut h) = Harness::new();
        h.budget.models.insert("test-model-125".into(), 125);
        seed_agent_and_conversation(&h, 50, &[]).await;

        let msg = AnyResource::Message(ResourceMessage {
            identifier: Identifier::new("message", "m1").with_parent("conversation.c1"),
            role: Role::User,
            content: MessageContent::Text("hi".into()),
            tool_calls: vec![],
        });
        h.resources.add(msg.clone()).await.unwrap();
        h.memory.append(msg.identifier().clone()).await.unwrap();

        let err = h.window().build("conversation.c1", "test-model-125", 15).await;
        assert!(matches!(err, Err(Error::BudgetMissingTokens(_))));
    }

    #[test]
    fn normalize_tool_fills_in_missing_parameter_shape() {
        let tf = ToolFunction {
            identifier: Identifier::new("tool_function", "x").with_tokens(1),
            name: "x".into(),
            description: "d".into(),
            parameters: json!({}),
        };
        let normalized = normalize_tool(&tf);
        assert_eq!(normalized.parameters["type"], "object");
        assert_eq!(normalized.parameters["properties"], json!({}));
        assert_eq!(normalized.parameters["required"], json!([]));
    }

    #[test]
    fn normalize_tool_preserves_existing_properties() {
        let tf = ToolFunction {
            identifier: Identifier::new("tool_function", "x").with_tokens(1),
            name: "x".into(),
            description: "d".into(),
            parameters: json!({"properties": {"path": {"type": "string"}}, "required": ["path"]}),
        };
        let normalized = normalize_tool(&tf);
        assert_eq!(normalized.parameters["properties"]["path"]["type"], "string");
        assert_eq!(normalized.parameters["required"], json!(["path"]));
    }
}
