use super::{ComponentState, PlaceSnapApp};
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, error};

impl PlaceSnapApp {
    pub(super) async fn set_component_state(&self, component: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        debug!("Component '{}' -> {:?}", component, state);
        states.insert(component.to_string(), state);
    }

    pub async fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().await.get(component).cloned()
    }

    pub async fn component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().await.clone()
    }

    /// Names of components whose last step failed
    pub async fn failed_components(&self) -> Vec<String> {
        let states = self.component_states.lock().await;
        let mut failed: Vec<String> = states
            .iter()
            .filter(|(_, state)| **state == ComponentState::Failed)
            .map(|(name, _)| name.clone())
            .collect();
        failed.sort();
        failed
    }

    /// Run one startup step, recording Starting then Running or Failed
    pub(super) async fn track<T, F>(&self, component: &str, step: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.set_component_state(component, ComponentState::Starting)
            .await;
        match step.await {
            Ok(value) => {
                self.set_component_state(component, ComponentState::Running)
                    .await;
                Ok(value)
            }
            Err(e) => {
                error!("Failed to start {}: {}", component, e);
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(e)
            }
        }
    }
}
