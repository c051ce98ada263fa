//! Text normalization applied to every document before chunking.

use std::sync::LazyLock;

use regex::Regex;

// Stops at the first closing bracket. After one pass no `[...]` pair can
// remain (a leftover `[` has no later `]`), which keeps normalize idempotent
// even for nested or unbalanced brackets.
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("bracket pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strips bracketed citation/editorial markers (`[1]`, `[edit]`, any `[...]`
/// span), collapses whitespace runs to a single space, and trims.
///
/// Pure and total: never fails, always returns a string (possibly empty).
/// Applying it twice yields the same result as applying it once.
pub fn normalize(text: &str) -> String {
    let stripped = BRACKETED.replace_all(text, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_citation_markers() {
        assert_eq!(
            normalize("Fact A [1]. Fact B [edit]. Fact A [1]."),
            "Fact A . Fact B . Fact A ."
        );
    }

    #[test]
    fn strips_arbitrary_bracketed_spans() {
        assert_eq!(
            normalize("before [citation needed] after"),
            "before after"
        );
    }

    #[test]
    fn strips_brackets_spanning_lines() {
        assert_eq!(normalize("keep [a\nb] this"), "keep this");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize("a\n\n  b\t\tc"), "a b c");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(normalize("   padded   "), "padded");
    }

    #[test]
    fn empty_and_marker_only_inputs_yield_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  [1] [edit]  "), "");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "Fact A [1]. Fact B [edit].",
            "  lots \t of \n whitespace  ",
            "plain text",
            "",
            "[nested [not] handled] tail",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }
}
