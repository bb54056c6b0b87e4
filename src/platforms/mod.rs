//! Chat platform implementations

pub mod discord;

pub use discord::DiscordClient;
