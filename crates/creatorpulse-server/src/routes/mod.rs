//! Route modules for the CreatorPulse API server (§6).

pub mod crawl;
pub mod drafts;
pub mod email;
pub mod feedback;
pub mod health;
pub mod llm_usage;
pub mod preferences;
pub mod sources;
pub mod voice;
