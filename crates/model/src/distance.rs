/// Levenshtein distance over chars, case-insensitive.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Closest candidate within a third of `needle`'s length (at least one edit).
/// A candidate equal to `needle` is never suggested; one differing only in
/// case is. Ties keep the earliest candidate.
pub fn closest<'a, I>(needle: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let budget = (needle.chars().count() / 3).max(1);
    let mut best: Option<(usize, &'a str)> = None;
    for candidate in candidates {
        if candidate == needle {
            continue;
        }
        let distance = edit_distance(needle, candidate);
        if distance > budget {
            continue;
        }
        if best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_counts_edits() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("@foobar", "@foobaz"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("Lib", "lib"), 0);
    }

    #[test]
    fn closest_respects_budget_and_order() {
        let candidates = ["@mpospelov", "@foobaz", "@foobax"];
        assert_eq!(closest("@foobar", candidates), Some("@foobaz"));
        assert_eq!(closest("@someone", candidates), None);
        assert_eq!(closest("@foobaz", ["@foobaz"]), None);
    }

    #[test]
    fn case_only_difference_is_suggested_first() {
        let candidates = ["@mpospelov2", "@mpospelov"];
        assert_eq!(closest("@MPospelov", candidates), Some("@mpospelov"));
    }
}
