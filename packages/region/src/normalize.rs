//! Planning area name normalization.
//!
//! The same function is applied at both ends of every join: to the name a
//! location was assigned and to the name the income source spells. The
//! places side uses the planning-area API's title case ("Bukit Timah")
//! while the income side is upper case ("BUKIT TIMAH").

/// Builds the join key for a planning area name.
///
/// The pipeline:
/// 1. Collapse runs of whitespace to a single space
/// 2. Trim
/// 3. Uppercase
///
/// Never used for display.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Upper snake-case code for a planning area (e.g. `"BUKIT_TIMAH"`).
#[must_use]
pub fn region_code(name: &str) -> String {
    normalize(name).replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_variants_share_a_key() {
        let pairs = [
            ("BUKIT TIMAH", "Bukit Timah"),
            ("bukit timah", "BUKIT TIMAH"),
            ("Choa Chu Kang", "CHOA CHU KANG"),
            ("Downtown Core", "downtown core"),
            ("tampines", "Tampines"),
        ];
        for (a, b) in pairs {
            assert_eq!(normalize(a), normalize(b), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn different_regions_keep_distinct_keys() {
        assert_ne!(normalize("Jurong East"), normalize("Jurong West"));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  Bukit   Timah "), "BUKIT TIMAH");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("Marine Parade");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn builds_region_code() {
        assert_eq!(region_code("Bukit Timah"), "BUKIT_TIMAH");
        assert_eq!(region_code("Bedok"), "BEDOK");
    }
}
