use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use unicode_normalization::UnicodeNormalization;

use crate::{
    Config, GeocodeProvider, GeocodeResult,
    fetch::HttpFetcher,
    geocode::{nominatim::NominatimGeocoder, open_meteo::OpenMeteoGeocoder},
};

pub mod nominatim;
pub mod open_meteo;

/// Forward geocoding: place name to a single best-guess coordinate.
#[async_trait]
pub trait ForwardGeocoder: Send + Sync + Debug {
    fn provider(&self) -> GeocodeProvider;

    /// `None` when the upstream call fails or no candidate survives filtering.
    async fn geocode(&self, place_name: &str) -> Option<GeocodeResult>;
}

/// The configured geocoders in the order they should be tried.
pub fn geocoders_from_config(
    fetcher: &HttpFetcher,
    config: &Config,
) -> Vec<Box<dyn ForwardGeocoder>> {
    vec![
        Box::new(OpenMeteoGeocoder::new(fetcher.clone(), config)),
        Box::new(NominatimGeocoder::new(fetcher.clone(), config)),
    ]
}

/// Combining diacritical marks (U+0300..=U+036F). Thai vowel and tone marks
/// live outside this block and are kept.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Case- and accent-folded form used when comparing place names.
pub(crate) fn fold(s: &str) -> String {
    s.trim()
        .nfd()
        .filter(|c| !COMBINING_MARKS.contains(c))
        .collect::<String>()
        .to_lowercase()
}

/// Accepts JSON numbers and numeric strings alike.
pub(crate) fn as_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// First non-blank string among `candidates`.
pub(crate) fn first_label<'a>(
    candidates: impl IntoIterator<Item = Option<&'a str>>,
) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Index of the highest score; ties keep the earliest candidate.
pub(crate) fn best_index(scores: impl IntoIterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, score) in scores.into_iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fold_ignores_case_and_padding() {
        assert_eq!(fold("  Chiang MAI "), "chiang mai");
        assert_eq!(fold("เชียงใหม่"), "เชียงใหม่");
    }

    #[test]
    fn fold_strips_latin_accents_but_keeps_thai_marks() {
        assert_eq!(fold("Phúket"), "phuket");
        assert_eq!(fold("NAKHÒN RÂTCHASĪMA"), "nakhon ratchasima");
        assert_eq!(fold("น่าน"), "น่าน");
    }

    #[test]
    fn as_number_accepts_numeric_strings() {
        assert_eq!(as_number(Some(&json!(18.5))), Some(18.5));
        assert_eq!(as_number(Some(&json!("98.98"))), Some(98.98));
        assert_eq!(as_number(Some(&json!("abc"))), None);
        assert_eq!(as_number(Some(&json!(null))), None);
        assert_eq!(as_number(None), None);
    }

    #[test]
    fn first_label_skips_blank_values() {
        assert_eq!(first_label([None, Some("  "), Some("Lampang")]), Some("Lampang".into()));
        assert_eq!(first_label([None, None]), None);
    }

    #[test]
    fn best_index_prefers_first_on_tie() {
        assert_eq!(best_index([1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(best_index(Vec::<f64>::new()), None);
    }

    #[test]
    fn geocoders_are_tried_open_meteo_first() {
        let cfg = Config::default();
        let fetcher = HttpFetcher::new(&cfg).unwrap();
        let order: Vec<_> =
            geocoders_from_config(&fetcher, &cfg).iter().map(|g| g.provider()).collect();

        assert_eq!(order, vec![GeocodeProvider::OpenMeteo, GeocodeProvider::Nominatim]);
    }
}
