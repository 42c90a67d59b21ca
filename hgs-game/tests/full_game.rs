use std::collections::HashSet;
use std::hash::Hasher;

use hgs_game::{
    Catalog, FatalityPolicy, Game, GameError, GameOptions, GamePhase, PhaseView, RenderState,
    Stage, TagRegistry, Tribute, TributeId, debug_roster,
};
use twox_hash::XxHash64;

const MAX_STEPS: usize = 5_000;

fn builtin_game(tributes: usize, options: GameOptions, seed: u64) -> Game {
    let catalog = Catalog::with_builtin_events();
    let mut tags = TagRegistry::new();
    let roster: Vec<Tribute> = debug_roster(tributes)
        .iter()
        .map(|setup| Tribute::from_setup(setup, &mut tags).unwrap())
        .collect();
    Game::new(roster, catalog.pool.stage_events(), options, seed).unwrap()
}

fn play(game: &mut Game) -> Vec<RenderState> {
    let mut states = Vec::new();
    for _ in 0..MAX_STEPS {
        match game.advance() {
            Ok(state) => states.push(state),
            Err(GameError::Finished) => return states,
            Err(err) => panic!("game failed: {err}"),
        }
    }
    panic!("game did not finish within {MAX_STEPS} steps");
}

fn transcript_digest(states: &[RenderState]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    for state in states {
        hasher.write(serde_json::to_string(state).unwrap().as_bytes());
    }
    hasher.finish()
}

#[test]
fn builtin_games_run_to_completion() {
    for seed in 0..40 {
        let mut game = builtin_game(24, GameOptions::default(), seed);
        let states = play(&mut game);
        assert_eq!(game.phase(), GamePhase::End, "seed {seed}");
        assert!(game.alive().len() <= 1, "seed {seed}");
        assert_eq!(game.alive().len() + game.dead().len(), 24, "seed {seed}");

        let last = states.last().unwrap();
        assert_eq!(last.phase, GamePhase::EndSummaryStats);
        assert!(matches!(last.view, PhaseView::StatSummary { .. }));
    }
}

#[test]
fn rounds_bind_each_tribute_at_most_once() {
    for seed in 100..120 {
        let mut game = builtin_game(17, GameOptions::default(), seed);
        play(&mut game);
        let mut alive: HashSet<TributeId> = (0..17).map(TributeId).collect();
        for round in game.rounds() {
            let mut seen = HashSet::new();
            for event in &round.events {
                for id in &event.participants {
                    assert!(seen.insert(*id), "seed {seed}: {id:?} bound twice");
                }
            }
            for id in &round.unassigned {
                assert!(seen.insert(*id), "seed {seed}: {id:?} both bound and unassigned");
            }
            assert_eq!(seen, alive, "seed {seed} round {}", round.number);
            for id in &round.deaths {
                alive.remove(id);
            }
        }
    }
}

#[test]
fn stage_rotation_holds_over_whole_games() {
    for seed in 0..25 {
        let mut game = builtin_game(30, GameOptions::default(), seed);
        play(&mut game);
        let stages: Vec<Stage> = game.rounds().iter().map(|r| r.stage).collect();
        assert_eq!(stages[0], Stage::Bloodbath);
        for pair in stages.windows(2) {
            match pair[0] {
                Stage::Bloodbath | Stage::Feast => assert_eq!(pair[1], Stage::Day),
                Stage::Day => assert_eq!(pair[1], Stage::Night),
                Stage::Night => assert!(matches!(pair[1], Stage::Day | Stage::Feast)),
            }
        }
        for (index, round) in game.rounds().iter().enumerate() {
            assert_eq!(round.number as usize, index + 1);
        }
    }
}

#[test]
fn percentage_quota_bounds_deaths_per_round() {
    let options = GameOptions {
        fatality_policy: FatalityPolicy::Percent(10.0),
        ..GameOptions::default()
    };
    for seed in 0..20 {
        let mut game = builtin_game(24, options, seed);
        assert_eq!(game.required_fatalities(), Some(3));
        play(&mut game);
        for round in game.rounds() {
            let worst_single = round
                .events
                .iter()
                .map(|e| e.event.fatalities().len())
                .max()
                .unwrap_or(0);
            assert!(
                round.deaths.len() <= 3 + worst_single,
                "seed {seed} round {} overshot",
                round.number
            );
        }
    }
}

#[test]
fn kills_never_exceed_deaths_times_killers() {
    for seed in 0..20 {
        let mut game = builtin_game(12, GameOptions::default(), seed);
        play(&mut game);
        let credited: u32 = game.roster().iter().map(|t| t.kills).sum();
        let expected: usize = game
            .rounds()
            .iter()
            .flat_map(|r| r.events.iter())
            .map(|e| e.event.fatalities().len() * e.event.killers().len())
            .sum();
        assert_eq!(credited as usize, expected, "seed {seed}");
    }
}

#[test]
fn equal_seeds_replay_identically() {
    let run = |seed| {
        let mut game = builtin_game(20, GameOptions::default(), seed);
        transcript_digest(&play(&mut game))
    };
    assert_eq!(run(0xDEAD_BEEF), run(0xDEAD_BEEF));
    assert_ne!(run(1), run(2));
}
