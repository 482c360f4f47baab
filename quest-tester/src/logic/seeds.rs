use anyhow::{Context, Result, bail, ensure};
use std::collections::HashSet;

/// Most seeds a single range token may expand to.
const MAX_RANGE_LEN: u64 = 10_000;

/// Resolve CLI seed tokens into a deduplicated, ordered seed list.
///
/// Supports decimal integers (negative values use their magnitude),
/// `0x`-prefixed hex, and ranges `a..b` / `a..=b`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        for seed in parse_token(token)? {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }
    ensure!(!seeds.is_empty(), "no seeds given");
    Ok(seeds)
}

fn parse_token(token: &str) -> Result<Vec<u64>> {
    if let Some((start, end)) = token.split_once("..") {
        let (end, inclusive) = end
            .strip_prefix('=')
            .map_or((end, false), |rest| (rest, true));
        let start = parse_seed(start)?;
        let end = parse_seed(end)?;
        let end = if inclusive { end.saturating_add(1) } else { end };
        ensure!(start < end, "empty seed range: {token}");
        ensure!(
            end - start <= MAX_RANGE_LEN,
            "seed range {token} exceeds {MAX_RANGE_LEN} seeds"
        );
        return Ok((start..end).collect());
    }
    Ok(vec![parse_seed(token)?])
}

fn parse_seed(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u64::from_str_radix(&hex.replace('_', ""), 16)
            .with_context(|| format!("invalid hex seed: {raw}"));
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    bail!("Unrecognized seed token: {raw}");
}
