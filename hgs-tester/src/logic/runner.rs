use colored::Colorize;
use hgs_game::{
    ConfigStore, GameError, GameOptions, GamePhase, PhaseView, RenderState, Simulator, Stage,
    TributeSetup, TributeStatus,
};
use serde::Serialize;
use std::hash::Hasher;
use std::time::{Duration, Instant};
use twox_hash::XxHash64;

/// What to play for every seed.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub roster: Vec<TributeSetup>,
    pub options: GameOptions,
    /// Declare every survivor a winner once this many rounds have been played.
    pub max_rounds: Option<u32>,
    pub transcript: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KillLeader {
    pub name: String,
    pub kills: u32,
}

/// Outcome of one played game.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub seed: u64,
    pub iteration: usize,
    pub game_seed: u64,
    pub rounds: usize,
    pub feasts: usize,
    pub exhausted_rounds: usize,
    pub winners: Vec<String>,
    pub capped: bool,
    pub top_killer: Option<KillLeader>,
    pub failure: Option<String>,
    /// XxHash64 of the transcript, hex encoded.
    pub digest: String,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transcript: Vec<String>,
}

impl GameRecord {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.failure.is_none()
    }

    fn failed(seed: u64, iteration: usize, game_seed: u64, failure: String) -> Self {
        Self {
            seed,
            iteration,
            game_seed,
            rounds: 0,
            feasts: 0,
            exhausted_rounds: 0,
            winners: Vec::new(),
            capped: false,
            top_killer: None,
            failure: Some(failure),
            digest: String::new(),
            duration_ms: 0.0,
            transcript: Vec::new(),
        }
    }
}

/// Aggregate statistics over a batch of games.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub games: usize,
    pub failures: usize,
    pub mean_rounds: f64,
    pub std_rounds: f64,
    pub mean_feasts: f64,
    pub no_winner_pct: f64,
    pub capped_pct: f64,
    pub exhausted_rounds: usize,
    pub total_duration_ms: f64,
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn summarize(records: &[GameRecord]) -> RunSummary {
    let played: Vec<&GameRecord> = records.iter().filter(|r| r.passed()).collect();
    let count = played.len().max(1) as f64;
    let mean_rounds = played.iter().map(|r| r.rounds as f64).sum::<f64>() / count;
    let variance = played
        .iter()
        .map(|r| (r.rounds as f64 - mean_rounds).powi(2))
        .sum::<f64>()
        / count;
    let pct = |hits: usize| hits as f64 / count * 100.0;
    RunSummary {
        games: records.len(),
        failures: records.len() - played.len(),
        mean_rounds,
        std_rounds: variance.sqrt(),
        mean_feasts: played.iter().map(|r| r.feasts as f64).sum::<f64>() / count,
        no_winner_pct: pct(played.iter().filter(|r| r.winners.is_empty()).count()),
        capped_pct: pct(played.iter().filter(|r| r.capped).count()),
        exhausted_rounds: played.iter().map(|r| r.exhausted_rounds).sum(),
        total_duration_ms: records.iter().map(|r| r.duration_ms).sum(),
    }
}

/// Plays batches of games against one simulator.
pub struct GameRunner<S>
where
    S: ConfigStore,
{
    simulator: Simulator<S>,
    verbose: bool,
}

impl<S> GameRunner<S>
where
    S: ConfigStore,
{
    pub const fn new(simulator: Simulator<S>, verbose: bool) -> Self {
        Self { simulator, verbose }
    }

    pub fn run(&mut self, plan: &RunPlan, seeds: &[u64], iterations: usize) -> Vec<GameRecord> {
        let mut records = Vec::with_capacity(seeds.len() * iterations);
        for &seed in seeds {
            for iteration in 0..iterations {
                let record = self.play_one(plan, seed, iteration);
                if self.verbose {
                    print_record(&record);
                }
                records.push(record);
            }
        }
        records
    }

    fn play_one(&mut self, plan: &RunPlan, seed: u64, iteration: usize) -> GameRecord {
        let game_seed = seed.wrapping_add(u64::try_from(iteration).unwrap_or(u64::MAX));
        let start = Instant::now();
        let mut game = match self
            .simulator
            .create_game(&plan.roster, plan.options, game_seed)
        {
            Ok(game) => game,
            Err(err) => return GameRecord::failed(seed, iteration, game_seed, err.to_string()),
        };

        let mut hasher = XxHash64::with_seed(0);
        let mut transcript = Vec::new();
        let mut capped = false;
        let mut failure = None;
        loop {
            if let Some(cap) = plan.max_rounds
                && !capped
                && matches!(game.phase(), GamePhase::NewRound | GamePhase::InRound)
                && game.rounds().len() + 1 >= cap as usize
            {
                log::debug!("round cap {cap} reached for seed {game_seed}");
                game.declare_all_winners();
                capped = true;
            }
            match game.advance() {
                Ok(state) => {
                    for line in describe_state(&state) {
                        hasher.write(line.as_bytes());
                        hasher.write_u8(b'\n');
                        if plan.transcript {
                            transcript.push(line);
                        }
                    }
                }
                Err(GameError::Finished) => break,
                Err(err) => {
                    failure = Some(err.to_string());
                    break;
                }
            }
        }

        let top_killer = game
            .roster()
            .iter()
            .filter(|t| t.kills > 0)
            .max_by_key(|t| t.kills)
            .map(|t| KillLeader {
                name: t.name.clone(),
                kills: t.kills,
            });
        GameRecord {
            seed,
            iteration,
            game_seed,
            rounds: game.rounds().len(),
            feasts: game
                .rounds()
                .iter()
                .filter(|r| r.stage == Stage::Feast)
                .count(),
            exhausted_rounds: game.rounds().iter().filter(|r| r.exhausted).count(),
            winners: game
                .alive()
                .iter()
                .filter_map(|id| game.tribute(*id))
                .map(|t| t.name.clone())
                .collect(),
            capped,
            top_killer,
            failure,
            digest: format!("{:016x}", hasher.finish()),
            duration_ms: duration_ms(start.elapsed()),
            transcript,
        }
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Plain-text lines for one render state.
#[must_use]
pub fn describe_state(state: &RenderState) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", state.title)];
    match &state.view {
        PhaseView::RoundEvents { round } => {
            lines.extend(round.events.iter().map(|e| e.message.text.clone()));
        }
        PhaseView::Fallen { lines: deaths, cannon, .. } => {
            lines.push(cannon.clone());
            lines.extend(deaths.iter().cloned());
        }
        PhaseView::Winners { text, .. } | PhaseView::NoWinner { text } => lines.push(text.clone()),
        PhaseView::DeathSummary { rounds } => {
            for round in rounds {
                lines.push(round.heading.clone());
                lines.extend(round.lines.iter().map(|line| format!("  {line}")));
            }
        }
        PhaseView::StatSummary { winners, fallen } => {
            for stats in winners.iter().chain(fallen) {
                let status = match stats.status {
                    TributeStatus::Winner => "Winner".to_string(),
                    TributeStatus::Died(round) => format!("Died: Round {round}"),
                };
                lines.push(format!("{}: kills {}, {status}", stats.name, stats.kills));
            }
        }
    }
    lines
}

fn print_record(record: &GameRecord) {
    if let Some(failure) = &record.failure {
        println!(
            "  ❌ seed {} #{}: {}",
            record.seed,
            record.iteration + 1,
            failure.red()
        );
        return;
    }
    let outcome = if record.winners.is_empty() {
        "no survivors".yellow()
    } else {
        record.winners.join(", ").green()
    };
    println!(
        "  ✅ seed {} #{}: {} rounds, {} ({:.1} ms)",
        record.seed,
        record.iteration + 1,
        record.rounds,
        outcome,
        record.duration_ms
    );
}
