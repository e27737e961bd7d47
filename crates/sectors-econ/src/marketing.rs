//! Marketing campaigns: creation and per-turn lifecycle.

use crate::{active_company, ensure_funds, validate_resources, workforce_error, EconError};
use sectors_core::{
    CampaignId, CampaignLifecycle, CompanyId, GameEconomyState, MarketingCampaign, MarketingTier,
    ResourceType,
};
use tracing::{debug, info};

/// Start a campaign for `company_id`.
///
/// Either every effect is applied (cash, workers, brand, bag markers, demand
/// bonus) or the state is left untouched and a rejection is returned.
pub fn create_campaign(
    state: &mut GameEconomyState,
    company_id: CompanyId,
    tier: MarketingTier,
    resources: &[ResourceType],
) -> Result<MarketingCampaign, EconError> {
    let spec = tier.spec();
    let company = active_company(state, company_id)?;
    let sector_id = company.sector_id;
    let kind = state
        .sector(sector_id)
        .map(|s| s.kind)
        .ok_or_else(|| EconError::invariant(format!("{company_id} points at missing {sector_id}")))?;
    validate_resources(resources, spec.markers, kind)?;

    let what = format!("tier {} campaign", tier.level());
    let cost = tier.cash_cost(state.running_campaigns(company_id));
    ensure_funds(&what, cost, company.cash_on_hand)?;
    state
        .workforce
        .ensure_available(spec.workers)
        .map_err(|e| workforce_error(&what, e))?;
    if state.bag(sector_id).is_none() {
        return Err(EconError::invariant(format!("no consumption bag for {sector_id}")));
    }

    // Checks passed; apply.
    state.workforce.allocate(spec.workers).map_err(|e| workforce_error(&what, e))?;
    let id = state.next_campaign_id();
    if let Some(company) = state.company_mut(company_id) {
        company.cash_on_hand -= cost;
        company.brand_score += spec.brand_bonus;
    }
    if let Some(bag) = state.bag_mut(sector_id) {
        for r in resources {
            bag.add_temporary(*r, id);
        }
    }
    let campaign = MarketingCampaign {
        id,
        company_id,
        tier,
        workers: spec.workers,
        brand_bonus: spec.brand_bonus,
        resource_types: resources.to_vec(),
        created_turn: state.turn,
        lifecycle: CampaignLifecycle::Active,
    };
    state.campaigns.push(campaign.clone());
    state.refresh_demand_bonus();

    info!(campaign = %id, company = %company_id, tier = tier.level(), %cost, "campaign started");
    Ok(campaign)
}

/// Advance one campaign a lifecycle step. Returns the new lifecycle.
///
/// On expiry the campaign's workers go back to the pool, the brand bonus is
/// removed and its temporary markers leave the bag.
pub fn resolve_campaign_turn(
    state: &mut GameEconomyState,
    campaign_id: CampaignId,
) -> Result<CampaignLifecycle, EconError> {
    let campaign = state
        .campaigns
        .iter()
        .find(|c| c.id == campaign_id)
        .cloned()
        .ok_or_else(|| EconError::invariant(format!("unknown {campaign_id}")))?;
    let next = campaign.lifecycle.advance();
    if next == campaign.lifecycle {
        return Ok(next);
    }

    if next == CampaignLifecycle::Expired {
        state
            .workforce
            .release(campaign.workers)
            .map_err(|e| workforce_error("campaign expiry", e))?;
        let mut sector_id = None;
        if let Some(company) = state.company_mut(campaign.company_id) {
            company.brand_score = company.brand_score.saturating_sub(campaign.brand_bonus);
            sector_id = Some(company.sector_id);
        }
        let purged = sector_id
            .and_then(|s| state.bag_mut(s))
            .map(|bag| bag.purge_campaign(campaign_id))
            .unwrap_or(0);
        debug!(campaign = %campaign_id, purged, "campaign expired");
    }
    if let Some(c) = state.campaigns.iter_mut().find(|c| c.id == campaign_id) {
        c.lifecycle = next;
    }
    state.refresh_demand_bonus();
    Ok(next)
}

/// Step every running campaign once. Returns the ids that expired.
pub fn advance_campaigns(state: &mut GameEconomyState) -> Result<Vec<CampaignId>, EconError> {
    let running: Vec<CampaignId> =
        state.campaigns.iter().filter(|c| c.is_running()).map(|c| c.id).collect();
    let mut expired = Vec::new();
    for id in running {
        if resolve_campaign_turn(state, id)? == CampaignLifecycle::Expired {
            expired.push(id);
        }
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, Rejection};
    use rust_decimal::Decimal;
    use sectors_core::validate_state;
    use ResourceType::{Circle, Energy, Square, Triangle};

    #[test]
    fn second_tier_two_campaign_scenario() {
        let (mut state, s, c) = fixtures::single_company();
        create_campaign(&mut state, c, MarketingTier::Tier1, &[Circle]).unwrap();
        let cash = state.company(c).unwrap().cash_on_hand;
        let brand = state.company(c).unwrap().brand_score;
        let allocated = state.workforce.allocated();
        let temporary = state.bag(s).unwrap().temporary_count();

        let campaign = create_campaign(&mut state, c, MarketingTier::Tier2, &[Triangle, Energy]).unwrap();
        let company = state.company(c).unwrap();
        assert_eq!(cash - company.cash_on_hand, Decimal::from(300));
        assert_eq!(company.brand_score, brand + 2);
        assert_eq!(state.bag(s).unwrap().temporary_count(), temporary + 2);
        assert_eq!(state.workforce.allocated(), allocated + 2);
        assert_eq!(campaign.workers, 2);
        assert_eq!(state.sectors[0].demand_bonus, 3);
        validate_state(&state).unwrap();
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let (mut state, _, c) = fixtures::single_company();
        state.company_mut(c).unwrap().cash_on_hand = Decimal::from(150);
        let before = state.clone();
        let err = create_campaign(&mut state, c, MarketingTier::Tier2, &[Triangle, Square]).unwrap_err();
        assert!(matches!(err, EconError::Rejected(Rejection::InsufficientFunds { .. })));
        assert_eq!(state, before);
    }

    #[test]
    fn worker_shortage_is_a_rejection() {
        let (mut state, _, c) = fixtures::single_company();
        let free = state.workforce.available();
        state.workforce.allocate(free).unwrap();
        let err = create_campaign(&mut state, c, MarketingTier::Tier1, &[Circle]).unwrap_err();
        assert!(matches!(err, EconError::Rejected(Rejection::InsufficientWorkers { .. })));
    }

    #[test]
    fn inactive_company_cannot_market() {
        let (mut state, _, c) = fixtures::single_company();
        state.company_mut(c).unwrap().status = sectors_core::CompanyStatus::Insolvent;
        let err = create_campaign(&mut state, c, MarketingTier::Tier1, &[Circle]).unwrap_err();
        assert_eq!(err, EconError::Rejected(Rejection::CompanyNotActive(c)));
    }

    #[test]
    fn campaign_decays_then_expires_and_cleans_up() {
        let (mut state, s, c) = fixtures::single_company();
        let bag_len = state.bag(s).unwrap().len();
        let id = create_campaign(&mut state, c, MarketingTier::Tier3, &[Triangle, Square, Circle])
            .unwrap()
            .id;

        assert_eq!(resolve_campaign_turn(&mut state, id).unwrap(), CampaignLifecycle::Decaying);
        assert_eq!(state.company(c).unwrap().brand_score, 3);
        assert_eq!(state.workforce.allocated(), 3);

        assert_eq!(advance_campaigns(&mut state).unwrap(), vec![id]);
        assert_eq!(state.company(c).unwrap().brand_score, 0);
        assert_eq!(state.workforce.allocated(), 0);
        assert_eq!(state.bag(s).unwrap().len(), bag_len);
        assert_eq!(state.sectors[0].demand_bonus, 0);
        validate_state(&state).unwrap();

        assert_eq!(resolve_campaign_turn(&mut state, id).unwrap(), CampaignLifecycle::Expired);
        assert_eq!(state.workforce.allocated(), 0);
    }
}
