//! # zkid-state — Proving and Channel State Machines
//!
//! Pure, synchronous state machines. Nothing in this crate performs I/O or
//! spawns tasks: the async orchestrator in `zkid-prover` owns a machine,
//! feeds it events, and runs the entry action of whatever state it lands in.
//!
//! ## State Machines
//!
//! - **Proving** (`proving.rs`): the session lifecycle from `idle` through
//!   data fetching, validation, TEE connection and proving, to one of six
//!   terminal outcomes. Unhandled events are reported as
//!   [`Transition::Ignored`], never as panics or errors.
//!
//! - **Channel** (`channel.rs`): the TEE handshake
//!   `Idle → KeyExchangeSent → Verified → Ready`, with `Closed` reachable from
//!   every state. Invalid steps are rejected with `StateError`.
//!
//! ## Design
//!
//! States and events are closed enums. Every accepted transition is appended
//! to a timestamped log so a finished session can be inspected after the
//! fact.

pub mod channel;
pub mod proving;

pub use channel::{ChannelLifecycle, ChannelState};
pub use proving::{
    ErrorInfo, ProvingEvent, ProvingMachine, ProvingState, Transition, TransitionRecord,
};
