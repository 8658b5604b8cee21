use std::time::Duration;

use arcade_core::scoring::{Ranking, SuddenDeathPolicy, SuddenDeathTimeout, WinRules};
use serde_json::json;

use crate::PongState;
use crate::config::PongConfig;

/// Fewest goals against wins. Sudden death is opt-in through config.
pub fn win_rules(config: &PongConfig) -> WinRules {
    let sudden_death = if config.sudden_death_secs > 0.0 {
        SuddenDeathPolicy::FirstDecisiveEvent {
            duration: Duration::from_secs_f32(config.sudden_death_secs),
            on_timeout: if config.sudden_death_replays > 0 {
                SuddenDeathTimeout::Replay {
                    max_replays: config.sudden_death_replays,
                }
            } else {
                SuddenDeathTimeout::Draw
            },
        }
    } else {
        SuddenDeathPolicy::None
    };
    WinRules {
        ranking: Ranking::LowestScore,
        sudden_death,
    }
}

/// Game-specific extras attached to the session result.
pub fn result_details(state: &PongState) -> serde_json::Value {
    json!({
        "bounces": state.bounces,
        "goals": state.goals,
        "peakSpeed": state.peak_speed,
        "balls": state.world.movables.len(),
    })
}
