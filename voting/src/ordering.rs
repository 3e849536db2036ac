//! Natural ordering of unit numbers ("A2" before "A10").

use std::cmp::Ordering;

use agora_types::PropertyUnit;

struct UnitKey<'a> {
    prefix: &'a str,
    /// Trailing digits with leading zeros stripped; `None` when there are none.
    suffix: Option<&'a str>,
    full: &'a str,
}

impl<'a> UnitKey<'a> {
    fn parse(number: &'a str) -> Self {
        let number_trimmed = number.trim();
        let split = number_trimmed
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i);
        match split {
            Some(i) => {
                let digits = number_trimmed[i..].trim_start_matches('0');
                Self {
                    prefix: number_trimmed[..i].trim(),
                    suffix: Some(digits),
                    full: number,
                }
            }
            None => Self {
                prefix: number_trimmed,
                suffix: None,
                full: number,
            },
        }
    }
}

fn cmp_prefix(a: &str, b: &str) -> Ordering {
    let lower = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<String>();
    lower(a).cmp(&lower(b))
}

/// Digit strings without leading zeros: longer is larger, then lexicographic.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Compare two unit numbers.
///
/// Numbers ending in digits sort before those that don't; then by the
/// alphabetic prefix (case-insensitive), then by the numeric suffix as a
/// number, then by the raw text.
pub fn compare_unit_numbers(a: &str, b: &str) -> Ordering {
    let (a, b) = (UnitKey::parse(a), UnitKey::parse(b));
    let by_suffix = match (a.suffix, b.suffix) {
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (Some(x), Some(y)) => cmp_digits(x, y),
        (None, None) => Ordering::Equal,
    };
    cmp_prefix(a.prefix, b.prefix)
        .then(by_suffix)
        .then_with(|| a.full.cmp(b.full))
}

/// Sort units by their number in natural order.
pub fn natural_unit_order(units: &mut [PropertyUnit]) {
    units.sort_by(|a, b| compare_unit_numbers(&a.number, &b.number));
}
