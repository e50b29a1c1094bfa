//! synth-agent: customer and cashier agents for synthetic ordering dialogs
//!
//! This crate provides the two LLM-backed agents, the menu knowledge base the
//! cashier retrieves from, the turn-taking loop that drives them and the
//! batch runner that writes transcripts and statistics to disk.

pub mod analysis;
pub mod batch;
pub mod cashier;
pub mod client;
pub mod conversation;
pub mod dialog;
pub mod error;
pub mod events;
pub mod knowledge;
pub mod menu;
pub mod order;
pub mod profile;
pub mod transport;

pub use analysis::AnalysisLog;
pub use batch::{BatchPaths, BatchPlan, BatchRunner, BatchSummary, DialogFactory, DialogSettings};
pub use cashier::{CashierAgent, CashierConfig, CashierPhase, ClosingDetector, KeywordClosingDetector};
pub use client::{ClientAgent, ClientMove, ClientPhase};
pub use conversation::Conversation;
pub use dialog::{
    DialogAgent, DialogOptions, DialogOutcome, DialogStats, EndReason, FarewellDetector,
    KeywordFarewellDetector, Speaker, Transcript,
};
pub use error::{Error, Result};
pub use events::BatchEvent;
pub use knowledge::{KnowledgeConfig, MenuKnowledgeBase, Retriever};
pub use menu::{Menu, MenuItem};
pub use order::{OrderLine, OrderSource, load_order};
pub use profile::Profile;
pub use transport::{ProviderTransport, RetryConfig, RunConfig, Transport};
