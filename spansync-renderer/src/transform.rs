//! Field transforms applied to a source value before it is spliced into a
//! template. Each is a single, non-recursive `replace_all` pass keeping the
//! first capture group; nested clozes are not unwrapped.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static CLOZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{c\d+::(.*?)(::.*?)?\}\}").expect("valid cloze regex"));

static CLOZE_OVERLAPPING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[\[oc\d+::(.*?)(::.*?)?\]\]").expect("valid overlapping cloze regex")
});

static ASSUMPTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)(::.+?)?\]\]").expect("valid assumptions regex"));

// Everything before the first `::`.
static IM_EQ_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A(.*?)(?:::.*)?\z").expect("valid hint regex"));

/// How a field value is rewritten before insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    Normal,
    /// `{{cN::text::hint}}` → `text`
    Cloze,
    /// `[[ocN::text::hint]]` → `text`
    ClozeOverlapping,
    /// `[[text::hint]]` → `text`
    Assumptions,
    /// `text::hint` → `text`
    ImEqHint,
}

impl Transform {
    /// Map the `:type` suffix of a field reference (without the colon).
    /// Unrecognised or missing types fall back to [`Transform::Normal`].
    pub fn from_suffix(suffix: Option<&str>) -> Self {
        match suffix {
            Some("cloze") => Transform::Cloze,
            Some("cloze_overlapping") => Transform::ClozeOverlapping,
            Some("assumptions") => Transform::Assumptions,
            Some("with_im_eq_hint") => Transform::ImEqHint,
            _ => Transform::Normal,
        }
    }

    pub fn apply<'a>(self, value: &'a str) -> Cow<'a, str> {
        let re: &Regex = match self {
            Transform::Normal => return Cow::Borrowed(value),
            Transform::Cloze => &*CLOZE,
            Transform::ClozeOverlapping => &*CLOZE_OVERLAPPING,
            Transform::Assumptions => &*ASSUMPTIONS,
            Transform::ImEqHint => &*IM_EQ_HINT,
        };
        re.replace_all(value, "${1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Transform::Cloze, "{{c1::one}} {{c2::two}}", "one two")]
    #[case(Transform::Cloze, "{{c1::one::h1}} {{c12::two::h2}}", "one two")]
    #[case(Transform::Cloze, "{{c1::one&nbsp;two}}", "one&nbsp;two")]
    #[case(Transform::Cloze, "{{c1::multi\nline}}", "multi\nline")]
    #[case(Transform::Cloze, "no clozes [[oc1::x]]", "no clozes [[oc1::x]]")]
    #[case(Transform::ClozeOverlapping, "[[oc1::a]] and [[oc2::b::hint]]", "a and b")]
    #[case(Transform::Assumptions, "Before [[assumption2::Hint Assumptions]]", "Before assumption2")]
    #[case(Transform::Assumptions, "[[plain]]", "plain")]
    #[case(Transform::ImEqHint, "EQ1::Hint EQ1", "EQ1")]
    #[case(Transform::ImEqHint, "a::b::c", "a")]
    #[case(Transform::ImEqHint, "no hint", "no hint")]
    #[case(Transform::ImEqHint, "", "")]
    #[case(Transform::Normal, "{{c1::kept}}", "{{c1::kept}}")]
    fn transform_cases(#[case] t: Transform, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(t.apply(input), expected);
    }

    #[test]
    fn nested_clozes_are_not_unwrapped_recursively() {
        let out = Transform::Cloze.apply("{{c1::outer {{c2::inner}} }}");
        assert_eq!(out, "outer {{c2 }}");
    }

    #[test]
    fn suffix_mapping() {
        assert_eq!(Transform::from_suffix(Some("cloze")), Transform::Cloze);
        assert_eq!(Transform::from_suffix(Some("with_im_eq_hint")), Transform::ImEqHint);
        assert_eq!(Transform::from_suffix(Some("")), Transform::Normal);
        assert_eq!(Transform::from_suffix(Some("bogus")), Transform::Normal);
        assert_eq!(Transform::from_suffix(None), Transform::Normal);
    }
}
