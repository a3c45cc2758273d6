//! # calscope-sync
//!
//! URL Query Synchronizer.
//!
//! Mirrors the four scope facets (`start`, `mode`, `focus`, `expanded`) into
//! URL query parameters and turns compatible URL changes back into
//! [`ScopeIntent`](calscope_resolver::ScopeIntent)s.
//!
//! - [`query`]: facet ⇄ query string serialization
//! - [`router`]: the navigation seam and an in-process router
//! - [`outbound`]: debounced, serialized state → URL writes
//! - [`inbound`]: URL → intent rules with feedback suppression
//! - [`synchronizer`]: spawns both directions and shuts them down

#![deny(unsafe_code)]

pub mod inbound;
pub mod outbound;
pub mod query;
pub mod router;
pub mod synchronizer;

pub use inbound::inbound_intents;
pub use outbound::{PendingBatch, WrittenParams};
pub use query::{QueryCodec, QueryParams, QueryPatch};
pub use router::{MemoryRouter, NavigationError, NavigationRequest, RouteEvent, Router};
pub use synchronizer::{SyncConfig, SyncHandle, UrlSynchronizer};
