//! Per-entity scoreboard and the win-condition evaluator.
//!
//! The evaluator is a pure function of the rules, the scoreboard, the alive
//! and progress standings, and this tick's events. It never mutates the
//! scoreboard; the session applies its verdict.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::game_trait::GameEvent;
use crate::result::EndReason;

/// Progress values closer than this are a tie.
const PROGRESS_EPSILON: f32 = 1e-3;

/// How the final standings are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ranking {
    /// Sole survivor wins; otherwise points, then progress.
    Elimination,
    HighestScore,
    /// Fewest goals against wins.
    LowestScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuddenDeathTimeout {
    Draw,
    Replay { max_replays: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuddenDeathPolicy {
    None,
    /// First decisive event among the tied contenders wins.
    FirstDecisiveEvent {
        duration: Duration,
        on_timeout: SuddenDeathTimeout,
    },
}

/// A game's win-condition policy, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRules {
    pub ranking: Ranking,
    pub sudden_death: SuddenDeathPolicy,
}

/// Score record of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityScore {
    pub points: u32,
    pub goals_against: u32,
    pub survival: Duration,
    pub eliminated_at: Option<Duration>,
    pub withdrawn: bool,
}

/// Scores keyed by entity id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    entries: Vec<EntityScore>,
}

impl Scoreboard {
    pub fn new(entity_count: usize) -> Self {
        Self {
            entries: vec![EntityScore::default(); entity_count],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, entity: EntityId) -> Option<&EntityScore> {
        self.entries.get(entity)
    }

    pub fn points(&self, entity: EntityId) -> u32 {
        self.entry(entity).map_or(0, |e| e.points)
    }

    pub fn goals_against(&self, entity: EntityId) -> u32 {
        self.entry(entity).map_or(0, |e| e.goals_against)
    }

    pub fn is_withdrawn(&self, entity: EntityId) -> bool {
        self.entry(entity).is_some_and(|e| e.withdrawn)
    }

    /// Apply one tick's events. Points only ever increase.
    pub fn apply(&mut self, events: &[GameEvent], now: Duration) {
        for event in events {
            match *event {
                GameEvent::Scored { entity, points } => {
                    if let Some(e) = self.entries.get_mut(entity) {
                        e.points = e.points.saturating_add(points);
                    }
                },
                GameEvent::GoalConceded { entity } => {
                    if let Some(e) = self.entries.get_mut(entity) {
                        e.goals_against = e.goals_against.saturating_add(1);
                    }
                },
                GameEvent::Eliminated { entity } => {
                    if let Some(e) = self.entries.get_mut(entity)
                        && e.eliminated_at.is_none()
                    {
                        e.eliminated_at = Some(now);
                    }
                },
                GameEvent::Bounced { .. } | GameEvent::Terminal { .. } => {},
            }
        }
    }

    /// Credit `dt` of survival to every listed entity.
    pub fn accrue_survival(&mut self, alive: impl IntoIterator<Item = EntityId>, dt: Duration) {
        for id in alive {
            if let Some(e) = self.entries.get_mut(id) {
                e.survival += dt;
            }
        }
    }

    pub fn record_withdrawal(&mut self, entity: EntityId) -> bool {
        match self.entries.get_mut(entity) {
            Some(e) if !e.withdrawn => {
                e.withdrawn = true;
                true
            },
            _ => false,
        }
    }

    /// The ranking metric reported in results: goals against for
    /// lower-is-better games, points otherwise.
    pub fn metric(&self, ranking: Ranking, entity: EntityId) -> i64 {
        match ranking {
            Ranking::LowestScore => i64::from(self.goals_against(entity)),
            Ranking::Elimination | Ranking::HighestScore => i64::from(self.points(entity)),
        }
    }
}

/// Alive flags and progress values, indexed by entity id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Standings {
    pub alive: Vec<bool>,
    pub progress: Vec<f32>,
}

/// Final placement decided by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Option<EntityId>,
    pub joint_winners: Vec<EntityId>,
    pub reason: EndReason,
}

impl Outcome {
    fn from_leaders(leaders: Vec<EntityId>, reason: EndReason) -> Self {
        if leaders.len() == 1 {
            Self {
                winner: leaders.first().copied(),
                joint_winners: Vec::new(),
                reason,
            }
        } else {
            Self {
                winner: None,
                joint_winners: leaders,
                reason,
            }
        }
    }

    fn sole(winner: EntityId, reason: EndReason) -> Self {
        Self {
            winner: Some(winner),
            joint_winners: Vec::new(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    SuddenDeath(Vec<EntityId>),
    Ended(Outcome),
}

/// An active tie-break round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuddenDeathRound {
    pub contenders: Vec<EntityId>,
    pub remaining: Duration,
    pub replays: u32,
}

impl SuddenDeathRound {
    pub fn new(contenders: Vec<EntityId>, duration: Duration) -> Self {
        Self {
            contenders,
            remaining: duration,
            replays: 0,
        }
    }
}

/// Win check for the `Running` state.
pub fn evaluate_running(
    rules: &WinRules,
    board: &Scoreboard,
    standings: &Standings,
    events: &[GameEvent],
    elapsed: Duration,
    max_duration: Duration,
) -> Verdict {
    if let Some(winner) = terminal_winner(events) {
        return Verdict::Ended(match winner {
            Some(w) => Outcome::sole(w, EndReason::Elimination),
            None => Outcome::from_leaders(Vec::new(), EndReason::Elimination),
        });
    }

    let count = standings.alive.len();
    let participants: Vec<EntityId> = (0..count).filter(|&e| !board.is_withdrawn(e)).collect();
    if count >= 2 && participants.len() <= 1 {
        return Verdict::Ended(Outcome::from_leaders(participants, EndReason::Withdrawal));
    }

    let survivors: Vec<EntityId> = participants
        .iter()
        .copied()
        .filter(|&e| standings.alive.get(e).copied().unwrap_or(false))
        .collect();

    if rules.ranking == Ranking::Elimination && count >= 2 && survivors.len() <= 1 {
        if let [sole] = survivors[..] {
            return Verdict::Ended(Outcome::sole(sole, EndReason::Elimination));
        }
        // Everyone went down; the last to fall are the candidates.
        let last_fall = participants
            .iter()
            .filter_map(|&e| board.entry(e).and_then(|s| s.eliminated_at))
            .max();
        let fallen_last: Vec<EntityId> = participants
            .iter()
            .copied()
            .filter(|&e| board.entry(e).and_then(|s| s.eliminated_at) == last_fall)
            .collect();
        let leaders = elimination_fallback(board, standings, fallen_last);
        return Verdict::Ended(Outcome::from_leaders(leaders, EndReason::Elimination));
    }

    if elapsed < max_duration {
        return Verdict::Continue;
    }

    let leaders = match rules.ranking {
        Ranking::Elimination => elimination_fallback(board, standings, survivors),
        Ranking::HighestScore => max_by_key(participants, |e| i64::from(board.points(e))),
        Ranking::LowestScore => max_by_key(participants, |e| -i64::from(board.goals_against(e))),
    };
    if leaders.len() > 1
        && let SuddenDeathPolicy::FirstDecisiveEvent { .. } = rules.sudden_death
    {
        return Verdict::SuddenDeath(leaders);
    }
    Verdict::Ended(Outcome::from_leaders(leaders, EndReason::TimeExpired))
}

/// Win check for the `SuddenDeath` state. Updates the round in place
/// (contender drop-outs, remaining time, replays).
///
/// A tick's events are judged together: several contenders scoring in the
/// same tick, or every remaining contender falling in the same tick, is a
/// tie and goes to the timeout policy.
pub fn evaluate_sudden_death(
    rules: &WinRules,
    round: &mut SuddenDeathRound,
    board: &Scoreboard,
    standings: &Standings,
    events: &[GameEvent],
    dt: Duration,
) -> Verdict {
    let resolved = EndReason::SuddenDeathResolved;

    if let Some(winner) = terminal_winner(events) {
        return Verdict::Ended(match winner {
            Some(w) => Outcome::sole(w, resolved),
            None => Outcome::from_leaders(round.contenders.clone(), resolved),
        });
    }

    let mut scorers = Vec::new();
    let mut fallen = Vec::new();
    for event in events {
        match *event {
            GameEvent::Scored { entity, .. } => scorers.push(entity),
            GameEvent::GoalConceded { entity } | GameEvent::Eliminated { entity } => {
                fallen.push(entity);
            },
            _ => {},
        }
    }
    let scorers: Vec<EntityId> = round
        .contenders
        .iter()
        .copied()
        .filter(|c| scorers.contains(c))
        .collect();
    match scorers[..] {
        [] => {},
        [sole] => return Verdict::Ended(Outcome::sole(sole, resolved)),
        _ => return tied_round(rules, round, scorers, standings),
    }

    let standing: Vec<EntityId> = round
        .contenders
        .iter()
        .copied()
        .filter(|c| !fallen.contains(c))
        .collect();
    if standing.is_empty() {
        let tied = round.contenders.clone();
        return tied_round(rules, round, tied, standings);
    }
    round.contenders = standing;
    if let [last] = round.contenders[..] {
        return Verdict::Ended(Outcome::sole(last, resolved));
    }

    round.contenders.retain(|&c| !board.is_withdrawn(c));
    round
        .contenders
        .retain(|&c| standings.alive.get(c).copied().unwrap_or(false));
    match round.contenders[..] {
        [] => return Verdict::Ended(Outcome::from_leaders(Vec::new(), EndReason::Withdrawal)),
        [last] => return Verdict::Ended(Outcome::sole(last, resolved)),
        _ => {},
    }

    round.remaining = round.remaining.saturating_sub(dt);
    if !round.remaining.is_zero() {
        return Verdict::Continue;
    }
    let tied = round.contenders.clone();
    tied_round(rules, round, tied, standings)
}

/// Apply the timeout policy to a round that ended level between `tied`.
/// A replay needs every tied contender still alive; otherwise it is a draw.
fn tied_round(
    rules: &WinRules,
    round: &mut SuddenDeathRound,
    tied: Vec<EntityId>,
    standings: &Standings,
) -> Verdict {
    let all_alive = tied
        .iter()
        .all(|&c| standings.alive.get(c).copied().unwrap_or(false));
    round.contenders = tied;
    match rules.sudden_death {
        SuddenDeathPolicy::FirstDecisiveEvent {
            duration,
            on_timeout: SuddenDeathTimeout::Replay { max_replays },
        } if all_alive && round.replays < max_replays => {
            round.replays += 1;
            round.remaining = duration;
            tracing::debug!(
                replay = round.replays,
                contenders = ?round.contenders,
                "Sudden death replay"
            );
            Verdict::Continue
        },
        _ => Verdict::Ended(Outcome::from_leaders(
            round.contenders.clone(),
            EndReason::SuddenDeathResolved,
        )),
    }
}

fn terminal_winner(events: &[GameEvent]) -> Option<Option<EntityId>> {
    events.iter().find_map(|e| match *e {
        GameEvent::Terminal { winner } => Some(winner),
        _ => None,
    })
}

/// Points, then progress, then tie.
fn elimination_fallback(
    board: &Scoreboard,
    standings: &Standings,
    candidates: Vec<EntityId>,
) -> Vec<EntityId> {
    let by_points = max_by_key(candidates, |e| i64::from(board.points(e)));
    if by_points.len() <= 1 {
        return by_points;
    }
    let progress = |e: EntityId| standings.progress.get(e).copied().unwrap_or(0.0);
    let best = by_points.iter().map(|&e| progress(e)).fold(f32::NEG_INFINITY, f32::max);
    by_points
        .into_iter()
        .filter(|&e| best - progress(e) < PROGRESS_EPSILON)
        .collect()
}

/// All candidates sharing the maximum key, in id order.
fn max_by_key(candidates: Vec<EntityId>, key: impl Fn(EntityId) -> i64) -> Vec<EntityId> {
    let Some(best) = candidates.iter().map(|&e| key(e)).max() else {
        return candidates;
    };
    candidates.into_iter().filter(|&e| key(e) == best).collect()
}
