use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Seed used when none is given.
const DEFAULT_SEED: u64 = 1337;
/// Guard against accidental huge ranges such as `0..u64::MAX`.
const MAX_RANGE_LEN: u64 = 100_000;

/// Resolve CLI seed tokens into a deduplicated, ordered seed list.
///
/// Supports decimal integers (negative values use their magnitude),
/// `0x`-prefixed hex, and half-open ranges `start..end`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |seed: u64| {
        if seen.insert(seed) {
            seeds.push(seed);
        }
    };

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        if let Some((start, end)) = token.split_once("..") {
            let start = parse_seed(start).with_context(|| format!("bad range start in {token}"))?;
            let end = parse_seed(end).with_context(|| format!("bad range end in {token}"))?;
            if end <= start || end - start > MAX_RANGE_LEN {
                bail!("seed range {token} is empty or longer than {MAX_RANGE_LEN}");
            }
            (start..end).for_each(&mut push);
            continue;
        }
        push(parse_seed(token)?);
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

fn parse_seed(token: &str) -> Result<u64> {
    let token = token.trim();
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(&hex.replace('_', ""), 16)
            .with_context(|| format!("Unrecognized seed token: {token}"));
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    bail!("Unrecognized seed token: {token}");
}
