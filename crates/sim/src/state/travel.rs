use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::world::Coordinate;

use super::EpochMs;

pub const TRAVEL_MS_PER_BLOCK: u64 = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelLeg {
    pub from: Coordinate,
    pub to: Coordinate,
    pub departs_at: EpochMs,
    pub arrives_at: EpochMs,
}

/// Player movement between blocks. Unlike economic operations this queue may
/// be cancelled at any time; nothing is granted until a leg arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelState {
    pub position: Coordinate,
    pub legs: VecDeque<TravelLeg>,
}

impl TravelState {
    pub fn at(position: Coordinate) -> Self {
        Self {
            position,
            legs: VecDeque::new(),
        }
    }

    pub fn is_moving(&self) -> bool {
        !self.legs.is_empty()
    }

    pub fn destination(&self) -> Coordinate {
        self.legs.back().map(|leg| leg.to).unwrap_or(self.position)
    }

    /// Appends legs after the current queue. Returns the final arrival time.
    pub fn queue(&mut self, path: &[Coordinate], now: EpochMs) -> EpochMs {
        let mut from = self.destination();
        let mut departs_at = self.legs.back().map(|leg| leg.arrives_at).unwrap_or(now);
        for to in path {
            if *to == from {
                continue;
            }
            let arrives_at = departs_at + u64::from(from.manhattan_distance(*to)) * TRAVEL_MS_PER_BLOCK;
            self.legs.push_back(TravelLeg {
                from,
                to: *to,
                departs_at,
                arrives_at,
            });
            from = *to;
            departs_at = arrives_at;
        }
        departs_at
    }

    /// Consumes every leg that has arrived by `now`, returning arrivals in
    /// order.
    pub fn settle(&mut self, now: EpochMs) -> Vec<Coordinate> {
        let mut arrivals = Vec::new();
        while let Some(leg) = self.legs.front() {
            if leg.arrives_at > now {
                break;
            }
            self.position = leg.to;
            arrivals.push(leg.to);
            self.legs.pop_front();
        }
        arrivals
    }

    /// Drops every leg that has not arrived yet. An in-flight leg is abandoned
    /// and the traveller stays at its origin.
    pub fn cancel(&mut self) -> usize {
        let dropped = self.legs.len();
        self.legs.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_legs_chain_arrival_times() {
        let mut travel = TravelState::at(Coordinate::new(0, 0));
        let arrives = travel.queue(&[Coordinate::new(2, 0), Coordinate::new(2, 1)], 1_000);
        assert_eq!(arrives, 1_000 + 3 * TRAVEL_MS_PER_BLOCK);
        assert_eq!(travel.legs.len(), 2);
        assert_eq!(travel.destination(), Coordinate::new(2, 1));
    }

    #[test]
    fn settle_consumes_only_arrived_legs() {
        let mut travel = TravelState::at(Coordinate::new(0, 0));
        travel.queue(&[Coordinate::new(1, 0), Coordinate::new(5, 0)], 0);
        assert!(travel.settle(TRAVEL_MS_PER_BLOCK - 1).is_empty());
        assert_eq!(travel.settle(TRAVEL_MS_PER_BLOCK), vec![Coordinate::new(1, 0)]);
        assert_eq!(travel.position, Coordinate::new(1, 0));
        assert!(travel.is_moving());
    }

    #[test]
    fn cancel_truncates_without_moving() {
        let mut travel = TravelState::at(Coordinate::new(0, 0));
        travel.queue(&[Coordinate::new(3, 3)], 0);
        assert_eq!(travel.cancel(), 1);
        assert_eq!(travel.position, Coordinate::new(0, 0));
        assert!(!travel.is_moving());
    }

    #[test]
    fn queue_after_existing_legs_departs_on_last_arrival() {
        let mut travel = TravelState::at(Coordinate::new(0, 0));
        let first = travel.queue(&[Coordinate::new(1, 0)], 0);
        let second = travel.queue(&[Coordinate::new(1, 1)], 500);
        assert_eq!(second, first + TRAVEL_MS_PER_BLOCK);
    }
}
