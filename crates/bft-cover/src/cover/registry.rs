//! Registry of configured covers.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use super::controller::{CoverAttributes, CoverController};
use crate::config::Config;
use crate::gate::{GateApi, TokenProvider};

/// All covers known to the host, keyed by slug.
#[derive(Clone, Default)]
pub struct CoverRegistry {
    covers: BTreeMap<String, CoverController>,
}

impl CoverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every configured cover concurrently.
    ///
    /// Covers that fail to connect are logged and left out.
    pub async fn connect_all(
        config: &Config,
        api: Arc<dyn GateApi>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let poll_interval = config.api.poll_interval();

        let results = join_all(config.covers.iter().map(|(slug, cover)| {
            let api = api.clone();
            let tokens = tokens.clone();
            async move {
                let result =
                    CoverController::connect(slug.clone(), cover, api, tokens, poll_interval).await;
                (slug, result)
            }
        }))
        .await;

        let mut registry = Self::new();
        for (slug, result) in results {
            match result {
                Ok(controller) => {
                    info!(cover = %slug, "Registered cover");
                    registry.register(controller);
                }
                Err(e) => error!(cover = %slug, error = %e, "Failed to set up cover"),
            }
        }
        registry
    }

    pub fn register(&mut self, controller: CoverController) {
        self.covers.insert(controller.slug().to_string(), controller);
    }

    pub fn get(&self, slug: &str) -> Option<&CoverController> {
        self.covers.get(slug)
    }

    pub fn len(&self) -> usize {
        self.covers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.covers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoverController> {
        self.covers.values()
    }

    /// Attribute snapshots in slug order.
    pub async fn attributes(&self) -> Vec<CoverAttributes> {
        join_all(self.covers.values().map(|c| c.attributes())).await
    }

    /// Dispose every cover, releasing self-acquired tokens.
    pub async fn dispose_all(&self) {
        join_all(self.covers.values().map(|c| c.dispose())).await;
    }
}
