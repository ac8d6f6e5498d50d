pub mod classifier;
pub mod config;
pub mod detect;
pub mod display;
pub mod error;
pub mod intent;
pub mod lane;
pub mod orchestrator;
pub mod snapshot;
pub mod store;
pub mod subject;
pub mod utils;

pub use classifier::{Classification, PageArchetype, classify, classify_detailed};
pub use config::GateConfig;
pub use display::{DisplayState, HiddenReason};
pub use error::{ChipGateError, Result};
pub use intent::{IntentResult, Signal, SignalSet};
pub use lane::Lane;
pub use orchestrator::{GateOrchestrator, GateStates, LaneEvaluation, UserAction};
pub use snapshot::{ContentSnapshot, PageView, SnapshotProvider, StaticSnapshot};
pub use store::{
    CacheKey, Clock, CooldownCheck, CooldownScope, CooldownStore, KvStore, ManualClock,
    MemoryStore, ResultCache, SystemClock,
};
pub use subject::{ConfidenceTier, ExtractionResult, SpecificityFailure};
