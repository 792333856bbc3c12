//! Locale-aware ordering for family, style, feature and tag names.

use std::cmp::Ordering;

use unicase::UniCase;

/// Compare two display strings the way a user expects a font list to read.
///
/// Case is folded for the primary comparison so `"alegreya"` and `"Arial"`
/// interleave alphabetically instead of splitting on ASCII case. Strings that
/// fold to the same key are ordered lowercase-first, then by raw code points,
/// which keeps the ordering total and therefore deterministic.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    UniCase::new(a)
        .cmp(&UniCase::new(b))
        .then_with(|| case_tiebreak(a, b))
}

fn case_tiebreak(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca == cb {
            continue;
        }
        match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => return ca.cmp(&cb),
        }
    }
    a.len().cmp(&b.len())
}

/// Sort strings in place with [`locale_cmp`].
pub fn sort_locale<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| locale_cmp(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_for_primary_order() {
        let mut names = vec!["Zapfino", "arial", "Baskerville", "Arial Black"];
        sort_locale(&mut names);
        assert_eq!(names, vec!["arial", "Arial Black", "Baskerville", "Zapfino"]);
    }

    #[test]
    fn lowercase_wins_ties() {
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("Bold", "bold"), Ordering::Greater);
        assert_eq!(locale_cmp("Bold", "Bold"), Ordering::Equal);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(locale_cmp("Bold", "Bold Italic"), Ordering::Less);
    }
}
