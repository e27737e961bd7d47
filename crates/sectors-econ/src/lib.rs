#![deny(warnings)]

//! Economic resolution for Sectors.
//!
//! Each module resolves one kind of phase against a [`GameEconomyState`]:
//! - consumer distribution across sectors and factories
//! - factory earnings and production records
//! - marketing campaigns and research
//! - factory construction and company operating actions
//! - stock price steps and insolvency
//!
//! Resolvers never call each other; the runtime sequences them.
//!
//! [`GameEconomyState`]: sectors_core::GameEconomyState

pub mod construction;
pub mod distribution;
pub mod earnings;
pub mod marketing;
pub mod operations;
pub mod research;
pub mod stock;

use rust_decimal::Decimal;
use sectors_core::{
    Company, CompanyId, FactoryId, FactorySize, GameEconomyState, ResourceType, SectorKind,
    WorkforceError,
};
use std::collections::BTreeSet;
use thiserror::Error;

/// Business-rule rejection of a player action. Nothing is mutated when one is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("insufficient cash for {what}: need ${need}, have ${have}")]
    InsufficientFunds { what: String, need: Decimal, have: Decimal },
    #[error("insufficient workers for {what}: need {need}, have {have}")]
    InsufficientWorkers { what: String, need: u32, have: u32 },
    #[error("invalid resource selection: {0}")]
    InvalidResources(String),
    #[error("{0} is not active")]
    CompanyNotActive(CompanyId),
    #[error("unknown company {0}")]
    UnknownCompany(CompanyId),
    #[error("unknown factory {0}")]
    UnknownFactory(FactoryId),
    #[error("{size} is outside the sector's permitted sizes at technology level {level}")]
    SizeNotPermitted { size: FactorySize, level: u8 },
    #[error("factory slot {0} does not exist")]
    InvalidSlot(u8),
    #[error("factory slot {0} is occupied by a working factory")]
    SlotOccupied(u8),
    #[error("{0} already carries a loan")]
    LoanAlreadyTaken(CompanyId),
    #[error("{0} already submitted research this turn")]
    ResearchAlreadySubmitted(CompanyId),
}

/// Errors produced by economic resolvers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EconError {
    /// Expected, recoverable rejection of one action.
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// Upstream state is inconsistent; a bug, never a player mistake.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EconError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        EconError::Invariant(msg.into())
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, EconError::Rejected(_))
    }
}

/// Map a pool error for an action named `what`.
pub(crate) fn workforce_error(what: &str, err: WorkforceError) -> EconError {
    match err {
        WorkforceError::Insufficient { need, have } => EconError::Rejected(
            Rejection::InsufficientWorkers { what: what.to_string(), need, have },
        ),
        WorkforceError::OverRelease { .. } => EconError::Invariant(err.to_string()),
    }
}

/// Reject unless `have >= need`.
pub(crate) fn ensure_funds(what: &str, need: Decimal, have: Decimal) -> Result<(), EconError> {
    if have < need {
        return Err(Rejection::InsufficientFunds { what: what.to_string(), need, have }.into());
    }
    Ok(())
}

/// The company with `id`, provided it is active.
pub(crate) fn active_company(state: &GameEconomyState, id: CompanyId) -> Result<&Company, EconError> {
    let company = state.company(id).ok_or(Rejection::UnknownCompany(id))?;
    if !company.is_active() {
        return Err(Rejection::CompanyNotActive(id).into());
    }
    Ok(company)
}

/// Check a resource pick: exactly `count` distinct resources usable in `kind`.
pub(crate) fn validate_resources(
    resources: &[ResourceType],
    count: usize,
    kind: SectorKind,
) -> Result<(), EconError> {
    if resources.len() != count {
        return Err(Rejection::InvalidResources(format!(
            "expected {count} resources, got {}",
            resources.len()
        ))
        .into());
    }
    let distinct: BTreeSet<_> = resources.iter().collect();
    if distinct.len() != resources.len() {
        return Err(Rejection::InvalidResources("resources must be distinct".into()).into());
    }
    if let Some(r) = resources.iter().find(|r| !r.allowed_in(kind)) {
        return Err(Rejection::InvalidResources(format!("{r} is not available in {kind:?}")).into());
    }
    Ok(())
}
