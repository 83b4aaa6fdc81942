//! Tokobot Core - Headless Play-Session Orchestration
//!
//! This crate holds all the business logic of the bot, independent of any
//! binary or display surface: it can drive the CLI, run headless under
//! tests, or be embedded elsewhere.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Orchestrator                        │
//! │   CheckingEnergy → Playing → Cooldown → CheckingEnergy    │
//! │        │                │                                  │
//! │        ▼                ▼                                  │
//! │  WaitingForEnergy    Backoff                               │
//! └───────┬───────────────────────────────┬───────────────────┘
//!         │ GameApi                       │ StatusSink
//!         ▼                               ▼
//! ┌───────────────────┐          ┌─────────────────────┐
//! │    ApiGateway     │          │  LogSink / Channel  │
//! │  token lifecycle  │          └─────────────────────┘
//! │  bounded 401 loop │
//! └───────┬───────────┘
//!         │ HttpTransport
//!         ▼
//! ┌───────────────────┐
//! │ ReqwestTransport  │
//! └───────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Orchestrator`]: the phase state machine driving a session
//! - [`ApiGateway`]: authenticated gateway with lazy token exchange and a
//!   bounded re-authentication loop on HTTP 401
//! - [`CredentialStore`]: atomic file persistence of the bearer token
//! - [`IdentityResolver`]: user id extraction from the init-data payload
//! - [`BotConfig`]: TOML + environment configuration
//!
//! # Module Overview
//!
//! - [`config`]: configuration loading (file, environment, defaults)
//! - [`credentials`]: bearer-token persistence
//! - [`identity`]: user identity resolution
//! - [`gateway`]: remote API access and the credential lifecycle
//! - [`orchestrator`]: the session state machine
//! - [`scoring`]: score/multiplier selection policy
//! - [`session`]: session counters
//! - [`sink`]: status snapshot consumers
//! - [`timing`]: shutdown signalling and interruptible timers

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod orchestrator;
pub mod scoring;
pub mod session;
pub mod sink;
pub mod timing;

pub use config::{BotConfig, ConfigError, ConfigSource, GameConfig};
pub use credentials::{CredentialStore, CredentialStoreError};
pub use error::GatewayError;
pub use gateway::{ApiGateway, GameApi, GameSnapshot, HttpTransport, PlayReward};
pub use identity::IdentityResolver;
pub use orchestrator::{Orchestrator, Phase, TimerSettings};
pub use scoring::{Play, ScorePolicy, UniformScorePolicy};
pub use session::SessionStats;
pub use sink::{ChannelSink, LogSink, StatusSink};
pub use timing::{shutdown_pair, ShutdownHandle, ShutdownSignal};
