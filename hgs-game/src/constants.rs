//! Centralized tuning constants for the round engine.
//!
//! These values define the pacing of a game: how often feasts happen, how
//! hard the round generator tries before giving up, and the defaults used
//! when a game is created without explicit options.

// Logging targets ----------------------------------------------------------
pub(crate) const LOG_TARGET_ROUND: &str = "hgs::round";
pub(crate) const LOG_TARGET_GAME: &str = "hgs::game";
pub(crate) const LOG_TARGET_CONFIG: &str = "hgs::config";

// Templates ----------------------------------------------------------------
/// Escape character introducing a substitution code.
pub const TEMPLATE_ESCAPE: char = '%';
/// Grammar letters that may precede a player digit (`%N0`, `%s1`, ...).
pub const GRAMMAR_CODES: [char; 11] = ['N', 'A', 'G', 'R', 'e', 's', 'y', 'i', 'h', '!', 'w'];
/// Appended to a tribute name when a genitive pronoun is unavailable.
pub const POSSESSIVE_MARKER: &str = "\u{2019}s";

// Events -------------------------------------------------------------------
pub const MIN_PLAYERS_PER_EVENT: usize = 1;
pub const MAX_PLAYERS_PER_EVENT: usize = 9;
pub const EVENT_TYPE_BUILTIN: &str = "BUILTIN";
pub const EVENT_TYPE_CUSTOM: &str = "CUSTOM";

// Round generation ---------------------------------------------------------
/// Lower bound on picks attempted before a round is cut short.
pub const RETRY_FLOOR: usize = 100;
/// Per-event multiplier for the pick budget (`pool_size * RETRY_PER_EVENT`).
pub const RETRY_PER_EVENT: usize = 10;
/// Probability of discarding an eligible fatal event when no quota is set.
pub const DEFAULT_FATALITY_REROLL_RATE: f64 = 0.60;

// Stage rotation -----------------------------------------------------------
/// Rounds that must pass after a feast before another may trigger.
pub const FEAST_MIN_ROUNDS: u32 = 5;
/// Offset subtracted from the rounds-since-feast count in the trigger formula.
pub const FEAST_RATE_OFFSET: u32 = 4;
pub const FEAST_RATE_FIRST: f64 = 0.25;
pub const FEAST_RATE_SECOND: f64 = 0.33;
pub const FEAST_RATE_OVERDUE: f64 = 0.50;

// Tributes -----------------------------------------------------------------
/// Replaces an escaped `//` while a custom pronoun string is split.
pub(crate) const PRONOUN_SLASH_SENTINEL: char = '\u{1}';
