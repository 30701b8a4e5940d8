//! Scripted operator for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::{Operator, PauseRequest, PauseResolution};

/// Operator that answers pauses from a script.
///
/// Resolutions are handed out in order; once the script runs out every
/// pause is discarded.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    script: Arc<RwLock<VecDeque<PauseResolution>>>,
    requests: Arc<RwLock<Vec<PauseRequest>>>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolutions(resolutions: Vec<PauseResolution>) -> Self {
        Self {
            script: Arc::new(RwLock::new(resolutions.into())),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn push(&self, resolution: PauseResolution) {
        self.script.write().await.push_back(resolution);
    }

    /// Get every pause the operator was asked to resolve.
    pub async fn recorded_requests(&self) -> Vec<PauseRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn resolve(&self, request: &PauseRequest) -> PauseResolution {
        self.requests.write().await.push(request.clone());
        self.script
            .write()
            .await
            .pop_front()
            .unwrap_or(PauseResolution::Discard)
    }
}
