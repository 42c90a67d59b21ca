use anyhow::{Result, bail};
use chrono::Utc;
use hgs_game::FatalityPolicy;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse `disabled`, a percentage such as `10%`, or an absolute count.
/// Fractions are truncated toward zero, so `12.5%` means 12%.
pub fn parse_fatality_policy(raw: &str) -> Result<FatalityPolicy> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("disabled") {
        return Ok(FatalityPolicy::Disabled);
    }
    if let Some(pct) = trimmed.strip_suffix('%') {
        let Ok(value) = pct.trim().parse::<f64>() else {
            bail!("invalid fatality percentage: {raw}");
        };
        return Ok(FatalityPolicy::Percent(value.trunc()));
    }
    match trimmed.parse::<f64>() {
        Ok(value) => Ok(FatalityPolicy::Absolute(value.trunc())),
        Err(_) => bail!("invalid fatality policy: {raw} (expected disabled, N% or N)"),
    }
}

/// UTC timestamp stamped into report headers.
pub fn report_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn fatality_policies_parse() {
        assert_eq!(parse_fatality_policy("disabled").unwrap(), FatalityPolicy::Disabled);
        assert_eq!(parse_fatality_policy(" ").unwrap(), FatalityPolicy::Disabled);
        assert_eq!(
            parse_fatality_policy("12.5%").unwrap(),
            FatalityPolicy::Percent(12.0)
        );
        assert_eq!(parse_fatality_policy("3.9").unwrap(), FatalityPolicy::Absolute(3.0));
        assert_eq!(parse_fatality_policy("-2.5").unwrap(), FatalityPolicy::Absolute(-2.0));
        assert_eq!(parse_fatality_policy("3").unwrap(), FatalityPolicy::Absolute(3.0));
        assert!(parse_fatality_policy("lots").is_err());
        assert!(parse_fatality_policy("x%").is_err());
    }

    #[test]
    fn timestamp_is_utc_iso() {
        let stamp = report_timestamp();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2024-01-01T00:00:00Z".len());
    }
}
