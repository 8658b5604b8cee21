use serde::de::Error as _;
use serde::{Deserialize, Serialize};

/// Runner body and jump physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerPhysicsConfig {
    /// Gravity acceleration (units/s², negative is down).
    pub gravity: f32,
    /// Initial upward velocity of a jump.
    pub jump_velocity: f32,
    pub runner_width: f32,
    pub runner_height: f32,
    /// Collision height while crouched.
    pub crouch_height: f32,
    /// Forward speed at release (units/s).
    pub run_speed: f32,
    /// Simulated seconds between speed-schedule steps; 0 disables it.
    pub speedup_interval_secs: f32,
    /// Fraction of base speed added per step.
    pub speedup_step: f32,
    pub max_speed_multiplier: f32,
}

impl Default for RunnerPhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -30.0,
            jump_velocity: 12.0,
            runner_width: 0.8,
            runner_height: 1.6,
            crouch_height: 0.8,
            run_speed: 8.0,
            speedup_interval_secs: 10.0,
            speedup_step: 0.10,
            max_speed_multiplier: 2.0,
        }
    }
}

/// Obstacle and coin generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Turn the random spawner off (scenarios inject obstacles by hand).
    pub enabled: bool,
    /// Distance of the first spawn from the start line.
    pub start_clearance: f32,
    pub min_gap: f32,
    pub max_gap: f32,
    /// How far ahead of the leading runner the course is generated.
    pub lookahead: f32,
    /// Obstacles and coins this far behind the trailing runner are dropped.
    pub despawn_behind: f32,
    pub obstacle_width: f32,
    /// Top of a low obstacle (jump over it).
    pub low_obstacle_height: f32,
    /// Underside of an overhead obstacle (crouch under it).
    pub high_obstacle_bottom: f32,
    pub high_obstacle_top: f32,
    /// Chance a spawned obstacle is overhead rather than low.
    pub high_obstacle_chance: f32,
    /// Chance a coin is placed between two obstacles.
    pub coin_chance: f32,
    /// Chance a placed coin floats at jump height.
    pub airborne_coin_chance: f32,
    pub coin_radius: f32,
    pub coin_ground_height: f32,
    pub coin_air_height: f32,
    pub coin_points: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_clearance: 24.0,
            min_gap: 9.0,
            max_gap: 18.0,
            lookahead: 48.0,
            despawn_behind: 12.0,
            obstacle_width: 1.0,
            low_obstacle_height: 1.0,
            high_obstacle_bottom: 1.1,
            high_obstacle_top: 3.0,
            high_obstacle_chance: 0.35,
            coin_chance: 0.5,
            airborne_coin_chance: 0.4,
            coin_radius: 0.3,
            coin_ground_height: 0.6,
            coin_air_height: 2.2,
            coin_points: 1,
        }
    }
}

/// Opponent behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerAiConfig {
    /// Chance per tick that the AI reacts to the obstacle ahead.
    pub reaction_chance: f32,
    /// Jump when a low obstacle is this many seconds away.
    pub jump_lead_secs: f32,
    /// Crouch when an overhead obstacle is this many seconds away.
    pub crouch_lead_secs: f32,
    /// Jump for airborne coins when no obstacle is near.
    pub chase_coins: bool,
}

impl Default for RunnerAiConfig {
    fn default() -> Self {
        Self {
            reaction_chance: 0.9,
            jump_lead_secs: 0.35,
            crouch_lead_secs: 0.4,
            chase_coins: true,
        }
    }
}

/// Top-level runner configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub physics: RunnerPhysicsConfig,
    pub spawn: SpawnConfig,
    pub ai: RunnerAiConfig,
    /// Vertical spacing between lanes.
    pub lane_height: f32,
    /// Sudden-death window (seconds); 0 disables sudden death.
    pub sudden_death_secs: f32,
    pub sudden_death_replays: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            physics: RunnerPhysicsConfig::default(),
            spawn: SpawnConfig::default(),
            ai: RunnerAiConfig::default(),
            lane_height: 10.0,
            sudden_death_secs: 15.0,
            sudden_death_replays: 0,
        }
    }
}

impl RunnerConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        let path = std::env::var("ARCADE_RUNNER_CONFIG")
            .unwrap_or_else(|_| "config/runner.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match RunnerConfig::from_toml(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(
                        path = %path,
                        error = %e,
                        "Invalid runner config; using defaults"
                    );
                    RunnerConfig::default()
                },
            },
            Err(_) => RunnerConfig::default(),
        }
    }

    /// Parse a TOML document. Missing keys take their defaults; NaN or
    /// infinite floats are an error.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = contents.parse()?;
        if let Some(key) = non_finite_key(&table) {
            return Err(toml::de::Error::custom(format!("`{key}` must be finite")));
        }
        toml::Value::Table(table).try_into()
    }

    /// Ground level of `lane`.
    pub fn lane_base(&self, lane: usize) -> f32 {
        lane as f32 * self.lane_height
    }
}

/// Dotted path of the first NaN or infinite float in `table`.
fn non_finite_key(table: &toml::Table) -> Option<String> {
    table.iter().find_map(|(key, value)| match value {
        toml::Value::Float(f) if !f.is_finite() => Some(key.clone()),
        toml::Value::Table(inner) => non_finite_key(inner).map(|k| format!("{key}.{k}")),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_sections_default_independently() {
        let cfg: RunnerConfig = toml::from_str(
            "lane_height = 5.0\n[spawn]\nenabled = false\n[physics]\nspeedup_interval_secs = 0.0\n",
        )
        .unwrap();
        assert_eq!(cfg.lane_height, 5.0);
        assert!(!cfg.spawn.enabled);
        assert_eq!(cfg.spawn.min_gap, SpawnConfig::default().min_gap);
        assert_eq!(cfg.physics.speedup_interval_secs, 0.0);
        assert_eq!(cfg.physics.run_speed, 8.0);
        assert_eq!(cfg.ai, RunnerAiConfig::default());
    }

    #[test]
    fn non_finite_nested_value_is_rejected() {
        let err = RunnerConfig::from_toml("[ai]\nreaction_chance = nan\n").unwrap_err();
        assert!(err.to_string().contains("ai.reaction_chance"));
        assert!(RunnerConfig::from_toml("[physics]\ngravity = -inf\n").is_err());
        let cfg = RunnerConfig::from_toml("[spawn]\nenabled = false\n").unwrap();
        assert!(!cfg.spawn.enabled);
    }

    #[test]
    fn crouch_clears_overhead_but_standing_does_not() {
        let cfg = RunnerConfig::default();
        assert!(cfg.physics.crouch_height < cfg.spawn.high_obstacle_bottom);
        assert!(cfg.physics.runner_height > cfg.spawn.high_obstacle_bottom);
    }

    #[test]
    fn jump_apex_clears_low_obstacle() {
        let p = RunnerPhysicsConfig::default();
        let apex = p.jump_velocity * p.jump_velocity / (2.0 * -p.gravity);
        assert!(apex > RunnerConfig::default().spawn.low_obstacle_height);
    }
}
