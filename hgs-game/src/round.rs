//! Round generation.
//!
//! A round binds every alive tribute to at most one event drawn from the
//! stage's pool. Picks are uniform; a pick that does not fit (too many
//! players, fatality quota, reroll, tag requirements) is retried up to a
//! bounded number of times before the round is cut short.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FATALITY_REROLL_RATE, LOG_TARGET_ROUND, RETRY_FLOOR, RETRY_PER_EVENT};
use crate::event::Event;
use crate::stage::Stage;
use crate::template::{RenderedMessage, TemplateError, render};
use crate::tribute::{Tribute, TributeId};

/// Target number of deaths per round.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FatalityPolicy {
    /// No quota; fatal events are thinned out by the reroll rate instead.
    #[default]
    Disabled,
    /// Percentage of the full roster, rounded up.
    Percent(f64),
    /// Fixed number of deaths.
    Absolute(f64),
}

impl FatalityPolicy {
    /// Resolve the policy against the roster size. `None` means no quota;
    /// non-finite inputs disable the quota.
    #[must_use]
    pub fn required(self, roster_size: usize) -> Option<u32> {
        let value = match self {
            Self::Disabled => return None,
            Self::Percent(pct) => (pct.clamp(0.0, 100.0) / 100.0 * roster_size as f64).ceil(),
            Self::Absolute(count) => count.max(0.0).floor(),
        };
        if !value.is_finite() {
            return None;
        }
        Some(value.min(f64::from(u32::MAX)) as u32)
    }
}

/// Bound on consecutive rejected picks: `max(floor, pool_size * per_event)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub floor: usize,
    pub per_event: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            floor: RETRY_FLOOR,
            per_event: RETRY_PER_EVENT,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn attempts(self, pool_size: usize) -> usize {
        self.floor.max(pool_size.saturating_mul(self.per_event))
    }
}

/// Inputs for one round.
#[derive(Debug, Clone, Copy)]
pub struct RoundRequest<'a> {
    pub number: u32,
    pub stage: Stage,
    pub events: &'a [Event],
    pub required_fatalities: Option<u32>,
    pub reroll_rate: f64,
    pub retry: RetryPolicy,
}

impl<'a> RoundRequest<'a> {
    /// Request with default reroll rate, no quota and the default retry bound.
    #[must_use]
    pub fn new(number: u32, stage: Stage, events: &'a [Event]) -> Self {
        Self {
            number,
            stage,
            events,
            required_fatalities: None,
            reroll_rate: DEFAULT_FATALITY_REROLL_RATE,
            retry: RetryPolicy::default(),
        }
    }
}

/// An event bound to concrete tributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InGameEvent {
    pub event: Event,
    /// Tributes in slot order; slot `n` is `%n` in the template.
    pub participants: Vec<TributeId>,
    pub message: RenderedMessage,
}

impl InGameEvent {
    /// Tributes this event killed.
    pub fn victims(&self) -> impl Iterator<Item = TributeId> + '_ {
        self.event
            .fatalities
            .iter()
            .filter_map(|&slot| self.participants.get(slot).copied())
    }
}

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRound {
    pub number: u32,
    pub stage: Stage,
    pub events: Vec<InGameEvent>,
    pub deaths: Vec<TributeId>,
    /// Alive tributes that were not bound to any event.
    pub unassigned: Vec<TributeId>,
    /// Set when the retry bound cut the round short.
    pub exhausted: bool,
}

impl GameRound {
    fn empty(number: u32, stage: Stage) -> Self {
        Self {
            number,
            stage,
            events: Vec::new(),
            deaths: Vec::new(),
            unassigned: Vec::new(),
            exhausted: false,
        }
    }

    #[must_use]
    pub fn has_deaths(&self) -> bool {
        !self.deaths.is_empty()
    }
}

struct Progress<'a> {
    order: &'a [TributeId],
    current: usize,
    left: usize,
    died: u32,
}

fn is_eligible<R>(
    event: &Event,
    progress: &Progress<'_>,
    roster: &[Tribute],
    request: &RoundRequest<'_>,
    rng: &mut R,
) -> bool
where
    R: Rng + ?Sized,
{
    if event.players_involved() > progress.left {
        return false;
    }
    match request.required_fatalities {
        Some(required) => {
            if event.is_fatal() == (progress.died >= required) {
                return false;
            }
        }
        None => {
            if event.is_fatal() && rng.r#gen::<f64>() < request.reroll_rate {
                return false;
            }
        }
    }
    event.requirements().iter().all(|req| {
        progress
            .order
            .get(progress.current + req.player_index)
            .and_then(|id| roster.get(id.0))
            .is_some_and(|tribute| tribute.has_tag(req.tag))
    })
}

/// Generate one round for the tributes in `alive`.
///
/// Deaths and kill credits are written straight into `roster`; the caller
/// recomputes its alive/dead partitions from `died_in_round` afterwards.
///
/// # Errors
///
/// Returns a [`TemplateError`] if a picked event references a slot beyond
/// its own player count. The roster may already hold this round's earlier
/// deaths at that point.
pub fn generate_round<R>(
    roster: &mut [Tribute],
    alive: &[TributeId],
    request: &RoundRequest<'_>,
    rng: &mut R,
) -> Result<GameRound, TemplateError>
where
    R: Rng + ?Sized,
{
    let mut order = alive.to_vec();
    order.shuffle(rng);

    let mut round = GameRound::empty(request.number, request.stage);
    let events = request.events;
    if events.is_empty() {
        log::debug!(
            target: LOG_TARGET_ROUND,
            "no {} events enabled; round {} is empty",
            request.stage.key(),
            request.number
        );
        round.unassigned = order;
        return Ok(round);
    }

    let budget = request.retry.attempts(events.len());
    let mut progress = Progress {
        order: &order,
        current: 0,
        left: order.len(),
        died: 0,
    };
    let mut alive_running = order.len();

    'rounds: while progress.left > 0 {
        let mut attempts = 0;
        let event = loop {
            if attempts >= budget {
                log::debug!(
                    target: LOG_TARGET_ROUND,
                    "round {} gave up after {budget} picks with {} tributes left",
                    request.number,
                    progress.left
                );
                round.exhausted = true;
                break 'rounds;
            }
            attempts += 1;
            let candidate = &events[rng.gen_range(0..events.len())];
            if is_eligible(candidate, &progress, roster, request, rng) {
                break candidate;
            }
        };

        let end = progress.current + event.players_involved();
        let participants = order[progress.current..end].to_vec();
        if let Some(&slot) = event
            .fatalities
            .iter()
            .chain(&event.killers)
            .find(|&&slot| slot >= participants.len())
        {
            return Err(TemplateError {
                index: slot,
                involved: participants.len(),
                template: event.message.clone(),
            });
        }
        for &slot in &event.fatalities {
            let id = participants[slot];
            roster[id.0].died_in_round = Some(request.number);
            round.deaths.push(id);
            alive_running = alive_running.saturating_sub(1);
            progress.died += 1;
        }
        let credit = u32::try_from(event.fatalities.len()).unwrap_or(u32::MAX);
        for &slot in &event.killers {
            let killer = &mut roster[participants[slot].0];
            killer.kills = killer.kills.saturating_add(credit);
        }

        let bound: Vec<&Tribute> = participants.iter().map(|id| &roster[id.0]).collect();
        let message = render(&event.message, &bound)?;
        log::debug!(target: LOG_TARGET_ROUND, "round {}: {}", request.number, message.text);
        round.events.push(InGameEvent {
            event: event.clone(),
            participants,
            message,
        });

        progress.current = end;
        progress.left -= event.players_involved();
        if alive_running < 2 {
            break;
        }
    }

    round.unassigned = order[progress.current..].to_vec();
    round.events.shuffle(rng);
    Ok(round)
}
