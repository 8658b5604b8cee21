use std::time::Duration;

use arcade_core::scoring::{Ranking, SuddenDeathPolicy, SuddenDeathTimeout, WinRules};
use serde_json::json;

use crate::RunnerState;
use crate::config::RunnerConfig;

/// Last runner standing wins; a tie at the time limit goes to sudden death
/// where the first coin decides.
pub fn win_rules(config: &RunnerConfig) -> WinRules {
    let sudden_death = if config.sudden_death_secs > 0.0 {
        SuddenDeathPolicy::FirstDecisiveEvent {
            duration: Duration::from_secs_f32(config.sudden_death_secs),
            on_timeout: match config.sudden_death_replays {
                0 => SuddenDeathTimeout::Draw,
                max_replays => SuddenDeathTimeout::Replay { max_replays },
            },
        }
    } else {
        SuddenDeathPolicy::None
    };
    WinRules {
        ranking: Ranking::Elimination,
        sudden_death,
    }
}

pub fn result_details(state: &RunnerState) -> serde_json::Value {
    let distance: Vec<f32> = state.runners.iter().map(|r| r.x).collect();
    json!({
        "distance": distance,
        "coins": state.coins,
        "obstaclesSpawned": state.spawner.spawned,
        "finalSpeed": state.speed,
    })
}
