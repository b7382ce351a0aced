//! External catalog and inference providers.

pub mod ai;
pub mod tmdb;

pub use ai::{AiClient, AiGuess};
pub use tmdb::{Candidate, ProviderError, TmdbClient};
