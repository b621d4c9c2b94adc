//! Ledger engine for shared badminton session costs.
//!
//! The engine keeps two kinds of facts per organizer: what each player owes
//! for the sessions they played ([`SessionParticipant`]) and what each player
//! paid ([`Payment`]). A per-player [`PlayerBalance`] projection is recomputed
//! from those facts inside the same transaction as every change to them.
//!
//! The [`backup`] module exports an organizer's records to a JSON
//! [`Archive`](backup::Archive) and imports archives back under fresh ids.

pub use allocation::{Allocation, CostInputs, allocate};
pub use commands::{
    CreditTransferCmd, CreditTransferUpdate, PaymentCmd, PaymentUpdate, PlanSessionCmd,
    RecordSessionCmd, SessionMeta, UpdateSessionCmd,
};
pub use error::EngineError;
pub use locations::Location;
pub use money::{Money, Quantity};
pub use ops::{
    BalanceFilter, DateRange, Engine, EngineBuilder, PlayerUpdate, SessionDetail, SessionRecorded,
};
pub use organizers::Organizer;
pub use payments::{CreditTransfer, Payment, PaymentMethod};
pub use player_balances::{BalanceStatus, FinancialSummary, PlayerBalance};
pub use players::Player;
pub use session_participants::SessionParticipant;
pub use sessions::{Session, SessionStatus};

pub mod backup;

mod allocation;
mod commands;
mod error;
mod locations;
mod money;
mod ops;
mod organizers;
mod payments;
mod player_balances;
mod players;
mod session_participants;
mod sessions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
