const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;
const MONTH: f64 = 30.0 * DAY;
const YEAR: f64 = 365.0 * DAY;

/// Parse an ISO-8601 duration (`PnYnMnWnDTnHnMnS`) into seconds.
///
/// Anything that is not a well-formed duration yields `0.0`.
pub fn parse_duration_seconds(input: &str) -> f64 {
    try_parse(input.trim()).unwrap_or(0.0)
}

fn try_parse(input: &str) -> Option<f64> {
    let body = input.strip_prefix('P')?;
    if body.is_empty() {
        return None;
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((_, "")) => return None,
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut total = sum_components(date_part, &[('Y', YEAR), ('M', MONTH), ('W', WEEK), ('D', DAY)])?;
    if let Some(time) = time_part {
        total += sum_components(time, &[('H', HOUR), ('M', MINUTE), ('S', 1.0)])?;
    }

    (total.is_finite() && total >= 0.0).then_some(total)
}

/// Sum `<number><designator>` pairs. Designators must appear in the order of
/// `units`, each at most once; only the last number may carry a fraction.
fn sum_components(part: &str, units: &[(char, f64)]) -> Option<f64> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut next_unit = 0;
    let mut saw_fraction = false;

    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            if saw_fraction {
                return None;
            }
            number.push(if c == ',' { '.' } else { c });
            continue;
        }

        if number.is_empty() {
            return None;
        }
        let offset = units[next_unit..].iter().position(|(unit, _)| *unit == c)?;
        let (_, scale) = units[next_unit + offset];
        next_unit += offset + 1;

        saw_fraction = number.contains('.');
        let value: f64 = number.parse().ok()?;
        total += value * scale;
        number.clear();
    }

    number.is_empty().then_some(total)
}

#[cfg(test)]
mod tests {
    use super::parse_duration_seconds;

    #[test]
    fn parses_common_video_durations() {
        assert_eq!(parse_duration_seconds("PT1H2M10S"), 3730.0);
        assert_eq!(parse_duration_seconds("PT45S"), 45.0);
        assert_eq!(parse_duration_seconds("PT15M"), 900.0);
        assert_eq!(parse_duration_seconds("PT0S"), 0.0);
    }

    #[test]
    fn parses_date_components() {
        assert_eq!(parse_duration_seconds("P1DT1S"), 86_401.0);
        assert_eq!(parse_duration_seconds("P1W"), 604_800.0);
        assert_eq!(parse_duration_seconds("P1Y"), 365.0 * 86_400.0);
        assert_eq!(parse_duration_seconds("P1M"), 30.0 * 86_400.0);
    }

    #[test]
    fn month_and_minute_share_a_letter() {
        assert_eq!(parse_duration_seconds("P1MT1M"), 30.0 * 86_400.0 + 60.0);
    }

    #[test]
    fn accepts_fractional_last_component() {
        assert_eq!(parse_duration_seconds("PT1.5S"), 1.5);
        assert_eq!(parse_duration_seconds("PT2,5M"), 150.0);
    }

    #[test]
    fn malformed_input_is_zero() {
        for input in [
            "", "   ", "P", "PT", "T1M", "1H", "PT1H2", "PTH", "PT1S1M", "PT1.5M2S", "P1H", "PT-5S",
            "PT1M1M", "garbage", "P1DT",
        ] {
            assert_eq!(parse_duration_seconds(input), 0.0, "input {input:?}");
        }
    }
}
