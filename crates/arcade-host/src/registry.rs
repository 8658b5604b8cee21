use std::collections::HashMap;

use arcade_core::error::ConfigurationError;
use arcade_core::game_registry::{GameEntry, GameKind};
use arcade_core::game_trait::ArcadeGame;

/// Factory function type for creating game instances.
type GameFactory = fn() -> Box<dyn ArcadeGame>;

/// Registry mapping game kinds to factory functions.
pub struct GameRegistry {
    factories: HashMap<GameKind, GameFactory>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_defaults();
        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "pong")]
        self.register(GameKind::CircularPong, || {
            Box::new(arcade_pong::CircularPong::new())
        });
        #[cfg(feature = "runner")]
        self.register(GameKind::Runner, || Box::new(arcade_runner::RunnerGame::new()));
    }

    pub fn register(&mut self, kind: GameKind, factory: GameFactory) {
        self.factories.insert(kind, factory);
    }

    pub fn create(&self, kind: GameKind) -> Result<Box<dyn ArcadeGame>, ConfigurationError> {
        self.factories
            .get(&kind)
            .map(|f| f())
            .ok_or_else(|| ConfigurationError::UnknownGameKind(kind.to_string()))
    }

    /// Resolve a game kind by name and create it.
    pub fn create_by_name(&self, name: &str) -> Result<Box<dyn ArcadeGame>, ConfigurationError> {
        self.create(name.parse()?)
    }

    /// Lobby listing, in stable order.
    pub fn entries(&self) -> Vec<GameEntry> {
        GameKind::ALL
            .iter()
            .filter_map(|kind| {
                let game = self.factories.get(kind)?();
                Some(GameEntry {
                    kind: *kind,
                    metadata: game.metadata(),
                })
            })
            .collect()
    }

    /// Return the number of registered game types.
    pub fn available_games(&self) -> usize {
        self.factories.len()
    }
}
