pub mod channel;
pub mod config;
pub mod game_loop;
pub mod registry;
