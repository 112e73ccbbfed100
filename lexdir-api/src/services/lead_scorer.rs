//! Lead quality scoring
//!
//! Deterministic heuristic over the intake fields: message substance, contact
//! completeness and whether the practice area is one the directory lists.
//! The score drives the suggested price tier; an admin still approves the
//! final price before a lead is purchasable.

use crate::db::leads::LeadInput;

/// Practice areas the directory recognizes
pub const KNOWN_PRACTICE_AREAS: &[&str] = &[
    "civil",
    "penal",
    "laboral",
    "mercantil",
    "fiscal",
    "familia",
    "extranjeria",
    "administrativo",
    "inmobiliario",
    "herencias",
];

/// Lowest suggested price (EUR); derived prices never fall below it
pub const MINIMUM_PRICE: f64 = 15.0;

/// Score a lead in [0, 1]
///
/// Components: message length up to 0.4 (saturating at 400 chars), phone
/// present 0.3, recognized practice area 0.3.
pub fn score_lead(input: &LeadInput) -> f64 {
    let message_len = input.message.trim().chars().count() as f64;
    let message_component = (message_len / 400.0).min(1.0) * 0.4;

    let phone_component = match &input.phone {
        Some(phone) if !phone.trim().is_empty() => 0.3,
        _ => 0.0,
    };

    let area = input.practice_area.trim().to_lowercase();
    let area_component = if KNOWN_PRACTICE_AREAS.contains(&area.as_str()) {
        0.3
    } else {
        0.0
    };

    message_component + phone_component + area_component
}

/// Suggested price (EUR) for a score, clamped to [`MINIMUM_PRICE`]
pub fn price_for_score(score: f64) -> f64 {
    let price = if score >= 0.8 {
        60.0
    } else if score >= 0.5 {
        40.0
    } else if score >= 0.25 {
        25.0
    } else {
        MINIMUM_PRICE
    };

    price.max(MINIMUM_PRICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(message: &str, phone: Option<&str>, area: &str) -> LeadInput {
        LeadInput {
            name: "Test".to_string(),
            email: "t@example.com".to_string(),
            phone: phone.map(String::from),
            city: None,
            practice_area: area.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_score_is_bounded() {
        let long_message = "x".repeat(2000);
        let best = lead(&long_message, Some("+34600000000"), "laboral");
        let worst = lead("", None, "astrology");

        let high = score_lead(&best);
        let low = score_lead(&worst);

        assert!(high <= 1.0);
        assert!((high - 1.0).abs() < f64::EPSILON);
        assert_eq!(low, 0.0);
    }

    #[test]
    fn test_more_complete_lead_scores_higher() {
        let with_phone = lead("Necesito ayuda con un despido", Some("+34600000000"), "laboral");
        let without_phone = lead("Necesito ayuda con un despido", None, "laboral");

        assert!(score_lead(&with_phone) > score_lead(&without_phone));
    }

    #[test]
    fn test_unknown_practice_area_loses_its_component() {
        let known = lead("Consulta", Some("+34600000000"), "penal");
        let unknown = lead("Consulta", Some("+34600000000"), "otros");

        assert!((score_lead(&known) - score_lead(&unknown) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_practice_area_match_ignores_case() {
        let upper = lead("Consulta", None, "LABORAL");
        assert!(score_lead(&upper) >= 0.3);
    }

    #[test]
    fn test_price_tiers_and_minimum_clamp() {
        assert_eq!(price_for_score(0.95), 60.0);
        assert_eq!(price_for_score(0.6), 40.0);
        assert_eq!(price_for_score(0.3), 25.0);
        assert_eq!(price_for_score(0.0), MINIMUM_PRICE);
        assert!(price_for_score(-1.0) >= MINIMUM_PRICE);
    }
}
