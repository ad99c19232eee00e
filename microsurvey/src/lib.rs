//! Microsurvey orchestrator (C8): a fixed, finite per-user survey state
//! machine with AI-scheduled push nudges and a one-time completion reward.

pub mod actor;
pub mod error;
pub mod ingest;
pub mod orchestrator;
pub mod push_time;
pub mod registry;
pub mod repo;
pub mod trigger;
pub mod types;

pub use actor::SurveyActor;
pub use error::SurveyError;
pub use ingest::{AesGcmDecryptor, FormResponsePayload, PayloadDecryptor, RoutedAnswer, decrypt_and_route};
pub use orchestrator::{COMPLETION_REWARD_POINTS, ResolvedEffect, SurveyOrchestrator};
pub use push_time::{FallbackPushTimeScheduler, LlmPushTimeScheduler, PushTimeScheduler};
pub use registry::{ActorRegistry, RegistryMetrics};
pub use repo::SurveyRepo;
pub use trigger::{TriggerRequest, TriggerSelector, TriggerSummary, trigger_microsurvey};
pub use types::{PushContent, SideEffect, SurveyActorState, SurveyEvent, SurveyState, Transition};
