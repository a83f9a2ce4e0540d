pub mod calibration;
pub mod engine;
pub mod kelly;
pub mod odds;
pub mod params;
pub mod rating;
pub mod recommendation;
pub mod settlement;
pub mod win_probability;

pub use engine::{BettingEngine, MatchAnalysis, MatchRequest, NewBet};
pub use odds::{OddsTriple, Outcome};
pub use win_probability::MatchAdjustments;
