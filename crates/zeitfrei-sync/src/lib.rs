//! Guild role synchronization for authorized Discord users.
//!
//! # Components
//!
//! - [`guild_api`]: the guild management boundary
//! - [`discord`]: bot-token client for Discord's guild member endpoints
//! - [`reconciler`]: grants the authorized role across every registered guild
//! - [`deauth`]: reverses a reconciliation and purges the credential
//! - [`notify`]: revocation notices (webhook or log)
//! - [`gatekeeper`]: per-user locked entry points composing the above
//! - [`mock`]: scripted guild API for tests

pub mod deauth;
pub mod discord;
pub mod error;
pub mod gatekeeper;
pub mod guild_api;
pub mod mock;
pub mod notify;
pub mod reconciler;
pub mod report;

pub use deauth::Deauthorizer;
pub use discord::DiscordGuildClient;
pub use error::{GuildApiError, Result, SyncError};
pub use gatekeeper::{CheckOutcome, EnsureOutcome, Gatekeeper, SyncOptions};
pub use guild_api::{GuildApi, JoinStatus, SharedGuildApi};
pub use mock::{GuildCall, MockGuildApi};
pub use notify::{LogNotifier, Notifier, RevocationNotice, SharedNotifier, WebhookNotifier};
pub use reconciler::RoleReconciler;
pub use report::{DeauthReport, GuildGrant, GuildReversal, JoinOutcome, OpStatus, ReconcileReport};
