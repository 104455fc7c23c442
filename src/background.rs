//! Background processing chains
//!
//! Receipt-style post-processing (detect → classify → persist) runs
//! detached from the request that triggered it. Each chain owns its error
//! boundary and always writes a terminal status for the record it
//! references, so a failure can never propagate into an unrelated caller.

use crate::models::Processor;
use crate::Result;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

/// Boundary to the downstream processors: the router names one, the host
/// application dispatches to it (HTTP call, direct invocation, queue
/// publish). Chains use the same boundary for their intermediate stages.
#[async_trait::async_trait]
pub trait ProcessorDispatch: Send + Sync {
    async fn dispatch(&self, processor: Processor, params: Value) -> Result<Value>;
}

/// Terminal status written for a chained record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    Completed,
    Failed,
}

/// Collaborator owning the referenced record's status field.
#[async_trait::async_trait]
pub trait RecordStatusSink: Send + Sync {
    async fn set_status(&self, record_id: Uuid, status: ChainStatus, detail: Option<String>);
}

/// Spawn a fire-and-forget processing chain with its own error boundary.
///
/// The triggering request does not await the chain. The returned handle is
/// for tests; production callers drop it.
pub fn spawn_processing_chain<F>(
    record_id: Uuid,
    status: Arc<dyn RecordStatusSink>,
    chain: F,
) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match chain.await {
            Ok(()) => {
                info!(?record_id, "Background chain completed");
                status.set_status(record_id, ChainStatus::Completed, None).await;
            }
            Err(e) => {
                error!(?record_id, error = %e, "Background chain failed");
                status
                    .set_status(record_id, ChainStatus::Failed, Some(e.to_string()))
                    .await;
            }
        }
    })
}

/// In-memory status sink for development & testing.
#[derive(Default)]
pub struct InMemoryStatusSink {
    statuses: tokio::sync::RwLock<std::collections::HashMap<Uuid, (ChainStatus, Option<String>)>>,
}

impl InMemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn status_of(&self, record_id: Uuid) -> Option<ChainStatus> {
        self.statuses
            .read()
            .await
            .get(&record_id)
            .map(|(status, _)| *status)
    }

    pub async fn detail_of(&self, record_id: Uuid) -> Option<String> {
        self.statuses
            .read()
            .await
            .get(&record_id)
            .and_then(|(_, detail)| detail.clone())
    }
}

#[async_trait::async_trait]
impl RecordStatusSink for InMemoryStatusSink {
    async fn set_status(&self, record_id: Uuid, status: ChainStatus, detail: Option<String>) {
        let mut statuses = self.statuses.write().await;
        statuses.insert(record_id, (status, detail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;

    #[tokio::test]
    async fn test_successful_chain_marks_completed() {
        let sink = Arc::new(InMemoryStatusSink::new());
        let record_id = Uuid::new_v4();

        let handle = spawn_processing_chain(record_id, sink.clone(), async { Ok(()) });
        handle.await.unwrap();

        assert_eq!(sink.status_of(record_id).await, Some(ChainStatus::Completed));
        assert_eq!(sink.detail_of(record_id).await, None);
    }

    #[tokio::test]
    async fn test_failed_chain_marks_failed_with_detail() {
        let sink = Arc::new(InMemoryStatusSink::new());
        let record_id = Uuid::new_v4();

        let handle = spawn_processing_chain(record_id, sink.clone(), async {
            Err(AgentError::Upstream("ocr stage rejected image".to_string()))
        });
        // The boundary swallows the error; the task itself never panics.
        handle.await.unwrap();

        assert_eq!(sink.status_of(record_id).await, Some(ChainStatus::Failed));
        assert!(sink
            .detail_of(record_id)
            .await
            .unwrap()
            .contains("ocr stage rejected image"));
    }

    #[tokio::test]
    async fn test_chain_can_dispatch_through_processors() {
        struct EchoDispatch;

        #[async_trait::async_trait]
        impl ProcessorDispatch for EchoDispatch {
            async fn dispatch(&self, processor: Processor, params: Value) -> crate::Result<Value> {
                Ok(serde_json::json!({ "processor": processor.name(), "params": params }))
            }
        }

        let sink = Arc::new(InMemoryStatusSink::new());
        let dispatch = Arc::new(EchoDispatch);
        let record_id = Uuid::new_v4();

        let handle = spawn_processing_chain(record_id, sink.clone(), async move {
            let ocr = dispatch
                .dispatch(
                    Processor::ReceiptOcr,
                    serde_json::json!({ "image_url": "https://cdn.example/r.jpg" }),
                )
                .await?;
            dispatch
                .dispatch(Processor::TextClassifier, ocr)
                .await?;
            Ok(())
        });
        handle.await.unwrap();

        assert_eq!(sink.status_of(record_id).await, Some(ChainStatus::Completed));
    }
}
