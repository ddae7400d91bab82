//! Names of the metrics recorded inside this crate.

pub const CANDIDATES_DISCARDED_TOTAL: &str = "reelcut_candidates_discarded_total";
pub const FFMPEG_INVOCATIONS_TOTAL: &str = "reelcut_ffmpeg_invocations_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_prometheus_counters() {
        for name in [CANDIDATES_DISCARDED_TOTAL, FFMPEG_INVOCATIONS_TOTAL] {
            assert!(name.starts_with("reelcut_") && name.ends_with("_total"), "{}", name);
        }
    }
}
