//! External collaborators: host probe, page summaries and the scores store.

pub mod pinger;
pub mod scores;
pub mod summarizer;

pub use pinger::{PingOutcome, Pinger, SystemPinger};
pub use scores::{Highscore, ScoresStore, SqlScoresStore};
pub use summarizer::{HttpSummarizer, PageSummarizer};
