#![deny(warnings)]

//! Headless CLI: plays a scripted Sectors game for a number of turns and
//! prints a summary per turn.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use persistence::{GameStore, JsonFileStore};
use rust_decimal::Decimal;
use sectors_core::{
    FactorySize, GameConfig, GameEconomyState, GameId, PhaseName, ResourceType, SectorKind,
};
use sectors_runtime::{GameEngine, PlayerAction, RoundActivity};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_SCENARIO: &str = include_str!("../scenarios/two_sectors.yaml");
/// Upper bound on phase transitions within a single turn.
const MAX_STEPS_PER_TURN: usize = 500;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<PathBuf>,
    turns: Option<u32>,
    save_dir: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next().map(PathBuf::from),
            "--turns" => args.turns = it.next().and_then(|s| s.parse().ok()),
            "--save-dir" => args.save_dir = it.next().map(PathBuf::from),
            _ => {}
        }
    }
    args
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: GameConfig,
    sectors: Vec<SectorSetup>,
    #[serde(default)]
    actions: Vec<ScriptedAction>,
    #[serde(default)]
    activity: Vec<TurnActivity>,
}

#[derive(Debug, Deserialize)]
struct SectorSetup {
    name: String,
    kind: SectorKind,
    base_demand: i32,
    #[serde(default)]
    companies: Vec<CompanySetup>,
}

#[derive(Debug, Deserialize)]
struct CompanySetup {
    name: String,
    #[serde(default)]
    factories: Vec<FactorySetup>,
}

#[derive(Debug, Deserialize)]
struct FactorySetup {
    size: FactorySize,
    resources: Vec<ResourceType>,
}

#[derive(Debug, Deserialize)]
struct ScriptedAction {
    turn: u32,
    action: PlayerAction,
}

/// Stock/operating round counts the driver reports for a turn.
#[derive(Debug, Deserialize)]
struct TurnActivity {
    turn: u32,
    counts: RoundActivity,
}

fn load_scenario(path: Option<&PathBuf>) -> Result<Scenario> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?,
        None => DEFAULT_SCENARIO.to_string(),
    };
    serde_yaml::from_str(&text).context("parsing scenario")
}

fn build_state(scenario: &Scenario) -> Result<GameEconomyState> {
    let mut state = GameEconomyState::new(&scenario.config);
    for setup in &scenario.sectors {
        let sector = state.add_sector(&setup.name, setup.kind, setup.base_demand);
        for company in &setup.companies {
            let id = state.add_company(sector, &company.name);
            for (slot, f) in company.factories.iter().enumerate() {
                let slot = u8::try_from(slot).context("too many factories")?;
                state
                    .place_factory(id, f.size, slot, f.resources.clone())
                    .with_context(|| format!("placing factory for {}", company.name))?;
            }
        }
    }
    Ok(state)
}

/// Queue the scripted actions that belong to the phase the engine is in.
fn submit_scripted(engine: &mut GameEngine, actions: &[ScriptedAction]) {
    let phase = engine.current_phase().clone();
    let due = actions.iter().filter(|a| {
        a.turn == phase.turn
            && a.action.phase() == phase.name
            && (phase.name != PhaseName::OperatingActionCompanyVote
                || phase.company_id == Some(a.action.company_id()))
    });
    for scripted in due {
        if let Err(e) = engine.submit(scripted.action.clone()) {
            warn!(turn = phase.turn, error = %e, "scripted action refused");
        }
    }
}

/// Play until the next turn starts. Returns rejections recorded during the turn.
fn play_turn(engine: &mut GameEngine, scenario: &Scenario) -> Result<usize> {
    let turn = engine.state().turn;
    if let Some(a) = scenario.activity.iter().find(|a| a.turn == turn) {
        engine.set_activity(a.counts);
    }
    let mut rejections = 0;
    for _ in 0..MAX_STEPS_PER_TURN {
        if engine.current_phase().name == PhaseName::EndTurn {
            rejections = engine.reports().rejections.len();
        }
        submit_scripted(engine, &scenario.actions);
        let t = engine.advance(Utc::now())?;
        if t.to == PhaseName::StartTurn {
            return Ok(rejections);
        }
    }
    bail!("turn {turn} did not finish within {MAX_STEPS_PER_TURN} phases")
}

fn print_summary(engine: &GameEngine, turn: u32, rejections: usize) {
    let state = engine.state();
    println!("Turn {turn} | consumers in pool: {} | rejections: {rejections}", state.consumer_pool);
    for c in &state.companies {
        let profit: Decimal = state.production.company_profit(c.id, turn);
        println!(
            "  {:<12} {:?} | cash: ${} | price: ${} | brand: {} | profit: ${} | loan: {}",
            c.name, c.status, c.cash_on_hand, c.current_stock_price, c.brand_score, profit, c.has_loan
        );
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let args = parse_args();
    info!(?args, "starting CLI");

    let scenario = load_scenario(args.scenario.as_ref())?;
    let state = build_state(&scenario)?;
    let mut engine = GameEngine::new(scenario.config.clone(), state, Utc::now())?;

    let game = GameId(1);
    let store = args.save_dir.as_ref().map(JsonFileStore::open).transpose()?;
    let mut version = match &store {
        Some(s) => Some(
            s.create(game, &engine)
                .with_context(|| format!("saving to {}", s.path_for(game).display()))?,
        ),
        None => None,
    };

    for _ in 0..args.turns.unwrap_or(3) {
        let turn = engine.state().turn;
        let rejections = play_turn(&mut engine, &scenario)?;
        print_summary(&engine, turn, rejections);
        if let (Some(s), Some(v)) = (&store, version) {
            version = Some(s.commit(game, v, &engine)?);
        }
    }

    if let Some(s) = &store {
        println!("Saved {game} to {}", s.path_for(game).display());
    }
    Ok(())
}
