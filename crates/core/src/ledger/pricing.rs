//! Feature price list.

/// Cost charged for features missing from the price list.
pub const DEFAULT_COST: u64 = 1;

/// Token cost of a paid feature.
pub fn feature_cost(feature: &str) -> u64 {
    match feature {
        "ask" => 3,
        "questions" => 2,
        "summarize" => 5,
        "tts" => 2,
        "podcast" => 5,
        _ => DEFAULT_COST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_costs() {
        assert_eq!(feature_cost("ask"), 3);
        assert_eq!(feature_cost("questions"), 2);
        assert_eq!(feature_cost("summarize"), 5);
        assert_eq!(feature_cost("tts"), 2);
        assert_eq!(feature_cost("podcast"), 5);
    }

    #[test]
    fn test_unknown_feature_defaults() {
        assert_eq!(feature_cost("translate"), DEFAULT_COST);
        assert_eq!(feature_cost(""), DEFAULT_COST);
    }
}
