#![deny(warnings)]

//! Turn runtime for Sectors: the phase sequencer and the game engine that
//! drives the economic resolvers phase by phase.

pub mod actions;
pub mod engine;
pub mod sequencer;

pub use actions::{tally_votes, PlayerAction};
pub use engine::{EngineError, GameEngine, RejectedAction, Transition, TurnReports};
pub use sequencer::{
    needs_to_be_played, next_phase, turn_order, NextPhase, OrderFlags, RoundActivity,
    SequencerContext, SequencerError,
};
