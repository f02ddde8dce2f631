use anyhow::{Context, Result, bail, ensure};

/// Largest number of seeds a single range token may expand to.
const MAX_RANGE_SEEDS: u64 = 10_000;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Resolve CLI seed tokens into concrete seeds.
///
/// Accepts decimal literals, `0x` hex literals and ranges written `a..b`
/// (exclusive) or `a..=b` (inclusive). Duplicates are dropped, first
/// occurrence wins.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in tokens {
        for seed in parse_token(token)? {
            if !seeds.contains(&seed) {
                seeds.push(seed);
            }
        }
    }
    ensure!(!seeds.is_empty(), "no seeds provided");
    Ok(seeds)
}

fn parse_token(token: &str) -> Result<Vec<u64>> {
    if let Some((start, end)) = token.split_once("..=") {
        let (start, end) = (parse_literal(start)?, parse_literal(end)?);
        return expand_range(token, start, end.saturating_add(1));
    }
    if let Some((start, end)) = token.split_once("..") {
        let (start, end) = (parse_literal(start)?, parse_literal(end)?);
        return expand_range(token, start, end);
    }
    Ok(vec![parse_literal(token)?])
}

fn expand_range(token: &str, start: u64, end: u64) -> Result<Vec<u64>> {
    if end <= start {
        bail!("seed range {token} is empty");
    }
    ensure!(
        end - start <= MAX_RANGE_SEEDS,
        "seed range {token} expands to more than {MAX_RANGE_SEEDS} seeds"
    );
    Ok((start..end).collect())
}

fn parse_literal(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if let Some(hex) = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex seed {raw}"));
    }
    raw.parse::<u64>()
        .with_context(|| format!("invalid seed {raw}"))
}
