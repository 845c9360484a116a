//! Topic pattern matching.
//!
//! Topics follow the convention `session.<sessionID>.<eventType>`. A pattern of bare `*` matches
//! every topic; otherwise patterns and topics are segmented by `.` and matched segment-for-segment
//! (segment counts must be equal), where a pattern segment of `*` matches any single topic
//! segment. There is no cross-segment wildcard.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    let topic_segments: Vec<&str> = topic.split('.').collect();

    if pattern_segments.len() != topic_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(topic_segments.iter())
        .all(|(p, t)| *p == "*" || p == t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_star_matches_everything() {
        assert!(topic_matches("*", "session.s1.log"));
        assert!(topic_matches("*", "anything"));
    }

    #[test]
    fn segment_wildcard_matches_single_segment() {
        assert!(topic_matches("session.*.log", "session.s1.log"));
        assert!(!topic_matches("session.*.log", "session.s1.audit"));
    }

    #[test]
    fn segment_counts_must_match() {
        assert!(!topic_matches("session.s1.*", "session.s1.log.extra"));
        assert!(!topic_matches("session.s1", "session.s1.log"));
    }

    #[test]
    fn literal_segments_compare_exactly() {
        assert!(topic_matches("session.s1.log", "session.s1.log"));
        assert!(!topic_matches("session.s1.log", "session.s2.log"));
    }

    #[test]
    fn no_cross_segment_wildcard() {
        // a trailing "*" only ever stands for exactly one segment, never "zero or more".
        assert!(!topic_matches("session.*", "session"));
    }
}
