//! # Aula (learning platform session API)
//!
//! `aula` exposes the session resource of a learning-platform server:
//! creating or upgrading an authenticated session, fetching session details,
//! and deleting a session.
//!
//! ## Session model
//!
//! A session is an opaque server-side record binding a token to either no
//! identity (anonymous) or exactly one authenticated account. Sessions move
//! one way: **Anonymous → Authenticated → Deleted**. An authenticated session
//! is never downgraded or re-assigned through this API, and a deleted session
//! is never resurrected.
//!
//! ## Collaborators
//!
//! The controller itself is thin. Credential checks, lockout counters,
//! password-expiry policy, bad-request rate limiting, and session storage are
//! all behind interfaces selected at construction time; the server wires in
//! either the in-memory implementations or the Postgres-backed ones.
//!
//! ## Enumeration resistance
//!
//! An unknown username answers `404` while a wrong password on an existing
//! account answers `401`. The asymmetry is deliberate and load-bearing for
//! API clients; do not collapse the two.

pub mod aula;
pub mod cli;
