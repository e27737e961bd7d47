//! Operating actions chosen by company votes.

use crate::{active_company, workforce_error, EconError, Rejection};
use rust_decimal::Decimal;
use sectors_core::{CompanyId, FactoryId, GameEconomyState};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Cash granted by a loan.
pub const LOAN_AMOUNT: i64 = 250;

/// Interest charged at every earnings call while a loan is outstanding.
pub const LOAN_INTEREST: i64 = 25;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OperatingAction {
    /// The vote was vetoed; nothing happens.
    Veto,
    TakeLoan,
    CloseFactory { factory_id: FactoryId },
}

/// Apply the winning operating action of `company_id`.
pub fn apply_operating_action(
    state: &mut GameEconomyState,
    company_id: CompanyId,
    action: &OperatingAction,
) -> Result<(), EconError> {
    let company = active_company(state, company_id)?;
    match action {
        OperatingAction::Veto => {}
        OperatingAction::TakeLoan => {
            if company.has_loan {
                return Err(Rejection::LoanAlreadyTaken(company_id).into());
            }
            if let Some(company) = state.company_mut(company_id) {
                company.has_loan = true;
                company.cash_on_hand += Decimal::from(LOAN_AMOUNT);
            }
        }
        OperatingAction::CloseFactory { factory_id } => {
            let factory = state
                .factory(*factory_id)
                .filter(|f| f.company_id == company_id)
                .ok_or(Rejection::UnknownFactory(*factory_id))?;
            let workers = factory.workers;
            state
                .workforce
                .release(workers)
                .map_err(|e| workforce_error("factory closure", e))?;
            state.factories.retain(|f| f.id != *factory_id);
        }
    }
    info!(company = %company_id, ?action, "operating action applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use sectors_core::validate_state;

    #[test]
    fn loan_is_granted_once() {
        let (mut state, _, c) = fixtures::single_company();
        apply_operating_action(&mut state, c, &OperatingAction::TakeLoan).unwrap();
        assert_eq!(state.company(c).unwrap().cash_on_hand, Decimal::from(750));
        let err = apply_operating_action(&mut state, c, &OperatingAction::TakeLoan).unwrap_err();
        assert_eq!(err, EconError::Rejected(Rejection::LoanAlreadyTaken(c)));
    }

    #[test]
    fn closing_a_factory_frees_its_workers() {
        let (mut state, _, c) = fixtures::with_factory();
        let f = state.factories[0].id;
        apply_operating_action(&mut state, c, &OperatingAction::CloseFactory { factory_id: f }).unwrap();
        assert!(state.factories.is_empty());
        assert_eq!(state.workforce.allocated(), 0);
        validate_state(&state).unwrap();
    }

    #[test]
    fn cannot_close_a_rivals_factory() {
        let (mut state, s, c) = fixtures::with_factory();
        let rival = state.add_company(s, "Flux");
        let f = state.factories[0].id;
        let err = apply_operating_action(&mut state, rival, &OperatingAction::CloseFactory { factory_id: f })
            .unwrap_err();
        assert_eq!(err, EconError::Rejected(Rejection::UnknownFactory(f)));
        assert_eq!(state.factories_of(c).count(), 1);
    }

    #[test]
    fn veto_changes_nothing() {
        let (mut state, _, c) = fixtures::with_factory();
        let before = state.clone();
        apply_operating_action(&mut state, c, &OperatingAction::Veto).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn action_payload_is_tagged_json() {
        let json = serde_json::to_string(&OperatingAction::CloseFactory { factory_id: FactoryId(3) }).unwrap();
        assert_eq!(json, r#"{"action":"close_factory","factory_id":3}"#);
    }
}
