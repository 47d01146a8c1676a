//! Nuvola crate - client for the Nuvola school records service
//!
//! This crate provides:
//! - Domain records (assignments, events, topics, grades, irregularities)
//! - Two-tier credential management with transparent renewal
//! - An authenticated client for the student API
//! - Cached collections with staleness-driven, date-windowed sync
//! - Versioned snapshots of the whole cache
//! - Query helpers over cached records
//!
//! Everything is synchronous and single-threaded; refreshes happen inline
//! on the first read that finds data stale.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod remote;
pub mod sync;

pub use auth::{
    CredentialExchange, CredentialPrompt, CredentialStore, CredentialTier, Exchange,
    FileCredentialStore, FormLogin, HttpCredentialExchange, Login, LoginOptions,
    MemoryCredentialStore, SessionManager, SessionState, TerminalPrompt,
};
pub use crate::config::{LoginCredentials, RefreshIntervals, Settings};
pub use error::{Error, Result};
pub use models::{
    Assignment, Attachment, AttachmentOwner, Event, Irregularity, IrregularityKind, Mark, Record,
    Subject, TimeWindow, Topic,
};
pub use remote::{
    Credential, RemoteClient, Reply, StudentScope, Transport, UreqTransport, attachment_path,
};
pub use sync::{
    Clock, CollectionSnapshot, FORMAT_VERSION, RecordSource, ResyncAnchor, SimpleCollection,
    Snapshot, Staleness, SubjectNode, SyncRoot, SyncStats, SystemClock, TimeWindowNode,
    WindowPolicy, WindowedCollection, select_active,
};
