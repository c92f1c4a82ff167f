//! Component contract.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// A unit of the runtime driven by the engine.
///
/// `init` runs once, before any component's `run`, in registration order;
/// it is where callbacks are registered and resources allocated. `run` is
/// the component's main driver and is spawned as an independent task.
///
/// Components interact only through the engine's publish/subscribe
/// interface; direct calls between components are forbidden.
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    async fn init(self: Arc<Self>) -> Result<()>;

    async fn run(self: Arc<Self>) -> Result<()>;
}
