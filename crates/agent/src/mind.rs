//! AgentMind — conversation setup and the Mind/Hands glue (spec §4.6).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use agentrt_domain::resource::{AnyResource, Conversation, Message as ResourceMessage, Resource};
use agentrt_domain::tool::{Message as InboundMessage, Role};
use agentrt_domain::{Error, Identifier, Result};
use agentrt_index::{MemoryIndex, ResourceIndex};
use agentrt_store::ObjectStore;

use crate::hands::AgentHands;
use crate::persistence::{ServerPersistence, StreamToClient, SuppressToolChatter};

/// Input to one turn: either a fresh conversation (`resource_id: None`,
/// using `agent_id`/`actor` for the new conversation) or a continuation.
pub struct ProcessRequest {
    pub resource_id: Option<String>,
    pub agent_id: String,
    pub actor: String,
    pub messages: Vec<InboundMessage>,
    pub llm_token: String,
    pub model: String,
}

pub struct SetupResult {
    pub conversation: Conversation,
    pub message: ResourceMessage,
}

pub struct AgentMind {
    resources: Arc<ResourceIndex>,
    store: Arc<dyn ObjectStore>,
    hands: Arc<AgentHands>,
    memory_cache: Mutex<HashMap<String, Arc<MemoryIndex>>>,
}

impl AgentMind {
    pub fn new(resources: Arc<ResourceIndex>, store: Arc<dyn ObjectStore>, hands: Arc<AgentHands>) -> Self {
        Self {
            resources,
            store,
            hands,
            memory_cache: Mutex::new(HashMap::new()),
        }
    }

    /// `setupConversation` (spec §4.6): fetch or create the conversation,
    /// then attach+persist the most recent user message from the request.
    pub async fn setup_conversation(&self, req: &ProcessRequest) -> Result<SetupResult> {
        let conversation = match &req.resource_id {
            Some(resource_id) => self.load_conversation(resource_id).await?,
            None => {
                let conversation = Conversation {
                    identifier: Identifier::new("conversation", uuid::Uuid::new_v4().to_string())
                        .with_tokens(0),
                    agent_id: req.agent_id.clone(),
                    actor: req.actor.clone(),
                };
                self.resources
                    .add(AnyResource::Conversation(conversation.clone()))
                    .await?;
                conversation
            }
        };

        let user_input = req
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| Error::Other("request has no user message".into()))?;

        let conversation_key = conversation.identifier.to_key();
        let message = ResourceMessage {
            identifier: Identifier::new("message", uuid::Uuid::new_v4().to_string()),
            role: Role::User,
            content: user_input.content.clone(),
            tool_calls: vec![],
        }
        .with_identifier(Some(&conversation_key), Vec::new());
        self.resources.add(AnyResource::Message(message.clone())).await?;

        Ok(SetupResult { conversation, message })
    }

    /// `process` (spec §4.6): set up the conversation, record the user
    /// message's first memory write, then drive `AgentHands` to
    /// completion. `stream` receives progress for non-tool messages.
    pub async fn process(&self, req: ProcessRequest, stream: &dyn StreamToClient) -> Result<()> {
        let setup = self.setup_conversation(&req).await?;
        let resource_id = setup.conversation.identifier.to_key();
        let memory = self.memory_index(&resource_id);

        memory.append(setup.message.identifier().clone()).await?;

        let persistence = ServerPersistence::new(self.resources.clone(), memory);
        let filtered_stream = SuppressToolChatter::new(stream);

        self.hands
            .execute_tool_loop(&resource_id, &persistence, &filtered_stream, &req.llm_token, &req.model)
            .await
    }

    async fn load_conversation(&self, resource_id: &str) -> Result<Conversation> {
        let got = self.resources.get(&[resource_id.to_string()]).await?;
        match got.into_iter().next() {
            Some(AnyResource::Conversation(c)) => Ok(c),
            _ => Err(Error::NotFound(resource_id.to_string())),
        }
    }

    fn memory_index(&self, resource_id: &str) -> Arc<MemoryIndex> {
        let mut cache = self.memory_cache.lock();
        cache
            .entry(resource_id.to_string())
            .or_insert_with(|| {
                Arc::new(MemoryIndex::new(
                    self.store.clone(),
                    format!("{resource_id}/memory.jsonl"),
                ))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionChoice, CompletionResponse, FinishReason};
    use agentrt_domain::resource::Agent;
    use agentrt_domain::tool::MessageContent;
    use agentrt_store::LocalObjectStore;
    use agentrt_tools::ToolRegistry;
    use async_trait::async_trait;

    struct ImmediateStop;
    #[async_trait]
    impl crate::llm::LlmService for ImmediateStop {
        async fn create_completions(
            &self,
            _req: crate::llm::CompletionRequest,
        ) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                choices: vec![CompletionChoice {
                    finish_reason: FinishReason::Stop,
                    message: crate::llm::AssistantTurn {
                        content: "ack".into(),
                        tool_calls: vec![],
                    },
                }],
            })
        }
    }

    struct NoopStream;
    impl StreamToClient for NoopStream {
        fn stream(&self, _message: &AnyResource) {}
    }

    fn mind() -> (tempfile::TempDir, AgentMind) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
        let resources = Arc::new(ResourceIndex::new(store.clone(), "resources.jsonl"));
        let hands = Arc::new(AgentHands::new(
            Arc::new(ImmediateStop),
            Arc::new(ToolRegistry::new()),
            resources.clone(),
        ));
        (dir, AgentMind::new(resources, store, hands))
    }

    fn req(resource_id: Option<String>) -> ProcessRequest {
        ProcessRequest {
            resource_id,
            agent_id: "agent.root".into(),
            actor: "user:1".into(),
            messages: vec![InboundMessage {
                role: Role::User,
                content: MessageContent::Text("hello".into()),
            }],
            llm_token: "token".into(),
            model: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn setup_conversation_creates_a_new_conversation_when_absent() {
        let (_dir, mind) = mind();
        let setup = mind.setup_conversation(&req(None)).await.unwrap();
        assert_eq!(setup.conversation.agent_id, "agent.root");
        assert_eq!(setup.message.content.text(), Some("hello"));
        assert_eq!(setup.message.identifier.parent, setup.conversation.identifier.to_key());
    }

    #[tokio::test]
    async fn setup_conversation_fetches_an_existing_conversation() {
        let (_dir, mind) = mind();
        let first = mind.setup_conversation(&req(None)).await.unwrap();
        let resource_id = first.conversation.identifier.to_key();

        let second = mind
            .setup_conversation(&req(Some(resource_id.clone())))
            .await
            .unwrap();
        assert_eq!(second.conversation.identifier.to_key(), resource_id);
    }

    #[tokio::test]
    async fn setup_conversation_without_a_user_message_is_fatal() {
        let (_dir, mind) = mind();
        let mut request = req(None);
        request.messages.clear();
        let err = mind.setup_conversation(&request).await;
        assert!(matches!(err, Err(Error::Other(_))));
    }

    #[tokio::test]
    async fn process_appends_the_first_memory_write_and_runs_hands() {
        let (_dir, mind) = mind();

        // AgentHands needs the agent/tools already resolvable through the
        // window in a full wiring, but `process` itself only needs the
        // conversation + memory write to succeed before delegating.
        let agent = Agent {
            identifier: Identifier::new("agent", "root").with_tokens(1),
            system_prompt: "sys".into(),
            tools: vec![],
            infer: false,
            handoffs: vec![],
        };
        mind.resources.add(AnyResource::Agent(agent)).await.unwrap();

        mind.process(req(None), &NoopStream).await.unwrap();
    }
}
