//! Trade lifecycle state machine.
//!
//! Pure, synchronous candle-by-candle evaluation of one trade record. The
//! caller feeds only candles the record has not consumed yet (strictly
//! after its creation time and its last-processed watermark), in ascending
//! timestamp order, and applies the returned changes to storage in
//! emission order. Nothing here suspends, so a single candle can safely
//! drive several transitions (activate, then close or partially close)
//! before any other task observes the record.

use shared::models::{Candle, TradeDirection, TradeEventType, TradeStatus};

/// In-memory view of the fields the state machine reads and mutates.
#[derive(Debug, Clone)]
pub struct TradeView {
    pub direction: TradeDirection,
    pub status: TradeStatus,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit_1: Option<f64>,
    pub take_profit_2: f64,
}

/// One persistable mutation, in the order it must be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeChange {
    Status(TradeStatus),
    StopLoss(f64),
    Event {
        event_type: TradeEventType,
        price: f64,
    },
}

enum PotentialOutcome {
    Cancelled,
    Activated,
    NoChange,
}

enum FinalExit {
    Stop,
    Target,
}

/// Advance a trade through the given candles.
///
/// `candles` must contain only candles the record has not been advanced
/// through before; `candles_since_setup` counts every candle since the
/// record's creation, consumed ones included, so expiration keeps ticking
/// across passes. Returns every status/stop-loss/event change produced; the
/// view is left in the resulting state. A terminal view produces nothing.
pub fn advance(
    view: &mut TradeView,
    candles: &[Candle],
    candles_since_setup: usize,
    expiration_limit: usize,
) -> Vec<TradeChange> {
    let mut changes = Vec::new();

    if view.status == TradeStatus::Potential {
        // Expiration is checked before any price rule each pass.
        if candles_since_setup > expiration_limit {
            set_status(view, TradeStatus::Expired, &mut changes);
            return changes;
        }

        for (i, candle) in candles.iter().enumerate() {
            match potential_step(view, candle) {
                PotentialOutcome::Cancelled => {
                    set_status(view, TradeStatus::Cancelled, &mut changes);
                    return changes;
                }
                PotentialOutcome::Activated => {
                    set_status(view, TradeStatus::Active, &mut changes);
                    changes.push(TradeChange::Event {
                        event_type: TradeEventType::Activated,
                        price: view.entry_price,
                    });
                    // The activating candle is re-evaluated under the
                    // ACTIVE rules before moving to the next candle.
                    run_active(view, &candles[i..], &mut changes);
                    return changes;
                }
                PotentialOutcome::NoChange => {}
            }
        }
        return changes;
    }

    if matches!(view.status, TradeStatus::Active | TradeStatus::PartialProfit) {
        run_active(view, candles, &mut changes);
    }

    changes
}

fn run_active(view: &mut TradeView, candles: &[Candle], changes: &mut Vec<TradeChange>) {
    for candle in candles {
        // Partial profit-taking wins over stopping out on the same candle:
        // TP1 sits closer to the entry than the stop by construction. The
        // moved breakeven stop only applies from the next candle on, but a
        // candle that spans both targets still closes at TP2 right away.
        if view.status == TradeStatus::Active {
            if let Some(tp1) = tp1_trigger(view, candle) {
                set_status(view, TradeStatus::PartialProfit, changes);
                changes.push(TradeChange::Event {
                    event_type: TradeEventType::Tp1Hit,
                    price: tp1,
                });
                view.stop_loss = view.entry_price;
                changes.push(TradeChange::StopLoss(view.entry_price));
                changes.push(TradeChange::Event {
                    event_type: TradeEventType::SlMovedToBe,
                    price: view.entry_price,
                });
                if target_hit(view, candle) {
                    set_status(view, TradeStatus::ClosedTp, changes);
                    changes.push(TradeChange::Event {
                        event_type: TradeEventType::Closed,
                        price: view.take_profit_2,
                    });
                    return;
                }
                continue;
            }
        }

        match final_exit(view, candle) {
            Some(FinalExit::Stop) => {
                let closed_price = view.stop_loss;
                let status = if view.status == TradeStatus::PartialProfit {
                    TradeStatus::ClosedBe
                } else {
                    TradeStatus::ClosedSl
                };
                set_status(view, status, changes);
                changes.push(TradeChange::Event {
                    event_type: TradeEventType::Closed,
                    price: closed_price,
                });
                return;
            }
            Some(FinalExit::Target) => {
                set_status(view, TradeStatus::ClosedTp, changes);
                changes.push(TradeChange::Event {
                    event_type: TradeEventType::Closed,
                    price: view.take_profit_2,
                });
                return;
            }
            None => {}
        }
    }
}

/// POTENTIAL rules for one candle. Invalidation is checked before
/// activation: a candle sweeping the stop without ever reaching the entry
/// cancels the setup rather than opening it.
fn potential_step(view: &TradeView, candle: &Candle) -> PotentialOutcome {
    match view.direction {
        TradeDirection::Long => {
            if candle.low <= view.stop_loss && candle.high < view.entry_price {
                PotentialOutcome::Cancelled
            } else if candle.low <= view.entry_price {
                PotentialOutcome::Activated
            } else {
                PotentialOutcome::NoChange
            }
        }
        TradeDirection::Short => {
            if candle.high >= view.stop_loss && candle.low > view.entry_price {
                PotentialOutcome::Cancelled
            } else if candle.high >= view.entry_price {
                PotentialOutcome::Activated
            } else {
                PotentialOutcome::NoChange
            }
        }
    }
}

/// Returns the TP1 price when the candle's excursion reaches it.
fn tp1_trigger(view: &TradeView, candle: &Candle) -> Option<f64> {
    let tp1 = view.take_profit_1?;
    let hit = match view.direction {
        TradeDirection::Long => candle.high >= tp1,
        TradeDirection::Short => candle.low <= tp1,
    };
    hit.then_some(tp1)
}

/// Final-exit check. The stop is evaluated before the target: when one
/// candle touches both, the adverse move is assumed to have come first.
fn final_exit(view: &TradeView, candle: &Candle) -> Option<FinalExit> {
    let stop_hit = match view.direction {
        TradeDirection::Long => candle.low <= view.stop_loss,
        TradeDirection::Short => candle.high >= view.stop_loss,
    };
    if stop_hit {
        Some(FinalExit::Stop)
    } else if target_hit(view, candle) {
        Some(FinalExit::Target)
    } else {
        None
    }
}

fn target_hit(view: &TradeView, candle: &Candle) -> bool {
    match view.direction {
        TradeDirection::Long => candle.high >= view.take_profit_2,
        TradeDirection::Short => candle.low <= view.take_profit_2,
    }
}

fn set_status(view: &mut TradeView, status: TradeStatus, changes: &mut Vec<TradeChange>) {
    view.status = status;
    changes.push(TradeChange::Status(status));
}
