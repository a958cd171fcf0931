use std::sync::LazyLock;

use regex::Regex;

static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([0-9]{4})\)$").expect("valid year pattern"));

static TRAILING_YEAR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\([0-9]{4}\)$").expect("valid suffix pattern"));

/// Release year from a trailing `(YYYY)`, if the title ends with one.
pub fn extract_year(title: &str) -> Option<i32> {
    TRAILING_YEAR.captures(title).and_then(|c| c[1].parse().ok())
}

/// Title with its trailing ` (YYYY)` removed. Other parentheticals are kept.
pub fn clean_title(title: &str) -> String {
    TRAILING_YEAR_SUFFIX.replace(title, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_year() {
        assert_eq!(extract_year("Toy Story (1995)"), Some(1995));
        assert_eq!(clean_title("Toy Story (1995)"), "Toy Story");
    }

    #[test]
    fn keeps_inner_parentheticals() {
        let title = "City of Lost Children, The (Cité des enfants perdus, La) (1995)";
        assert_eq!(extract_year(title), Some(1995));
        assert_eq!(clean_title(title), "City of Lost Children, The (Cité des enfants perdus, La)");
    }

    #[test]
    fn leaves_titles_without_year_alone() {
        for title in ["Babylon 5", "Cosmos (TV)", "Hyena Road (2015", "Year (95)", ""] {
            assert_eq!(extract_year(title), None, "{title}");
            assert_eq!(clean_title(title), title);
        }
    }

    #[test]
    fn year_suffix_must_be_last() {
        let title = "1900 (1976) (Novecento)";
        assert_eq!(extract_year(title), None);
        assert_eq!(clean_title(title), title);
    }

    #[test]
    fn year_without_leading_space_is_parsed_but_not_stripped() {
        assert_eq!(extract_year("Weird(2001)"), Some(2001));
        assert_eq!(clean_title("Weird(2001)"), "Weird(2001)");
    }

    #[test]
    fn only_the_last_suffix_is_removed() {
        assert_eq!(clean_title("Remake (1990) (2010)"), "Remake (1990)");
        assert_eq!(extract_year("Remake (1990) (2010)"), Some(2010));
    }
}
