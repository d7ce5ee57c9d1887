//! Consorcio E2E Scenario Suite
//!
//! This crate drives the Consorcio admin-operacional workflow end to end:
//! it logs into the web UI, registers a participant, creates a consortium
//! group and a quota, pays the first installment, waits for the quota to
//! activate, and schedules the group's opening assembly.
//!
//! UI interaction goes through a long-lived Playwright page driver (a Node
//! subprocess speaking a line-delimited JSON command protocol), while
//! backend verification goes through direct REST calls. Identifiers the UI
//! never exposes (group id, quota id) are recovered by querying list
//! endpoints and matching on names generated uniquely per run.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  Scenario Orchestrator (Rust)                │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Scenario                                                    │
//! │    ├── run() -> ScenarioReport            (fail-fast pipeline)│
//! │    ├── PageDriver      — UI actions over JSON line protocol  │
//! │    ├── ApiClient       — REST setup/verification (reqwest)   │
//! │    ├── RunIdentity     — unique names/emails/documents       │
//! │    └── poll_until      — bounded wait for quota activation   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  node driver.js ── playwright ── Consorcio admin UI          │
//! │  reqwest ───────────────────────  Consorcio REST API         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod model;
pub mod poll;
pub mod scenario;
pub mod testdata;

pub use config::{ConfigOutcome, ScenarioConfig};
pub use error::{E2eError, E2eResult};
pub use scenario::{Outcome, Scenario, ScenarioReport};
