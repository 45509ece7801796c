//! Wire types for the WAMP session layer.
//!
//! This crate contains the serde-serializable types exchanged between a WAMP
//! peer and its router: one struct per message kind, the closed [`Message`]
//! sum type over them, the positional/keyword [`Payload`], and the option and
//! detail dictionaries carried by requests and routed replies.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization and URI validation
//! - **1:1 with protocol**: Field names follow the WAMP v2 basic profile
//! - **Framing-agnostic**: Encoding messages to bytes belongs to the transport
//!
//! Request correlation and session state are built on top of these types in
//! the `wamp` crate.

pub mod messages;
pub mod options;
pub mod payload;
pub mod uri;

pub use messages::*;
pub use options::*;
pub use payload::Payload;
pub use uri::{MatchPolicy, UriPattern, is_valid_uri};

/// Identifier for requests, sessions, publications, subscriptions and registrations.
pub type Id = u64;

/// Largest identifier WAMP allows (2^53), so ids survive a round-trip through
/// IEEE-754 doubles in JSON serializers.
pub const MAX_ID: Id = 1 << 53;
