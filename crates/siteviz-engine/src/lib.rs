use serde_json::{Map, Value};

pub mod config;
pub mod imaging;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod session;

pub use config::EngineConfig;
pub use pipeline::{run_plan, run_stages, AgentBackend};
pub use providers::{
    default_provider_registry, DryrunInpaintProvider, InpaintProvider, InpaintProviderRegistry,
    InpaintRequest, InpaintResponse,
};
pub use render::render_concepts;
pub use session::{CanvasRequest, SessionEvent, SessionOutcome, SiteSession};

pub(crate) fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
