use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Final result of a recorded bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Win,
    Loss,
    /// Stake refunded (void / abandoned match).
    Push,
}

impl BetResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetResult::Win => "win",
            BetResult::Loss => "loss",
            BetResult::Push => "push",
        }
    }
}

/// Money movement when a bet is settled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub result: BetResult,
    /// Net profit or loss on the stake.
    pub profit_loss: f64,
    /// Amount credited back to the bankroll (stake included).
    pub returned: f64,
}

/// Settle a `stake` placed at decimal `odds`.
pub fn settle(stake: f64, odds: f64, result: BetResult) -> Settlement {
    let (profit_loss, returned) = match result {
        BetResult::Win => {
            let profit = stake * (odds - 1.0);
            (profit, stake + profit)
        }
        BetResult::Loss => (-stake, 0.0),
        BetResult::Push => (0.0, stake),
    };
    Settlement {
        result,
        profit_loss,
        returned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_win_pays_net_odds() {
        let s = settle(50.0, 1.8, BetResult::Win);
        assert_relative_eq!(s.profit_loss, 40.0, epsilon = 1e-9);
        assert_relative_eq!(s.returned, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loss_forfeits_stake() {
        let s = settle(25.0, 3.4, BetResult::Loss);
        assert_relative_eq!(s.profit_loss, -25.0);
        assert_relative_eq!(s.returned, 0.0);
    }

    #[test]
    fn test_push_refunds_stake() {
        let s = settle(10.0, 2.2, BetResult::Push);
        assert_relative_eq!(s.profit_loss, 0.0);
        assert_relative_eq!(s.returned, 10.0);
    }

    #[test]
    fn test_result_labels_match_serde() {
        for r in [BetResult::Win, BetResult::Loss, BetResult::Push] {
            let json = serde_json::to_string(&r).unwrap();
            assert_eq!(json, format!("\"{}\"", r.as_str()));
        }
    }
}
