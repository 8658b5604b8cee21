pub mod bridge;
pub mod channel;
pub mod entity;
pub mod error;
pub mod game_registry;
pub mod game_trait;
pub mod geometry;
pub mod input;
pub mod lifecycle;
pub mod net;
pub mod result;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod timer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
