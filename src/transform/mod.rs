//! Text transformations to run over a selection.
//!
//! [`Filter`] covers the everyday edits; [`ShellFilter`] pipes the selection
//! through an external command the way Acme's `|cmd` does.

mod shell;

pub use shell::{ShellFilter, TransformError};

/// A built-in transformation.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Convert to upper case
    Upper,
    /// Convert to lower case
    Lower,
    /// Capitalize the first letter of each word
    Title,
    /// Strip trailing whitespace from each line
    Trim,
    /// Sort lines
    SortLines,
    /// Reverse the order of lines
    ReverseLines,
    /// Indent each non-empty line by one tab
    Indent,
    /// Remove one level of indentation from each line
    Unindent,
}

impl Filter {
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Title => title_case(text),
            Self::Trim => map_lines(text, |line| line.trim_end().to_string()),
            Self::SortLines => reorder_lines(text, |lines| lines.sort_unstable()),
            Self::ReverseLines => reorder_lines(text, |lines| lines.reverse()),
            Self::Indent => map_lines(text, |line| {
                if line.is_empty() {
                    line.to_string()
                } else {
                    format!("\t{line}")
                }
            }),
            Self::Unindent => map_lines(text, |line| unindent(line).to_string()),
        }
    }

    /// The name used on the command line and in config files.
    pub fn name(self) -> String {
        clap::ValueEnum::to_possible_value(&self)
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        <Self as clap::ValueEnum>::from_str(name, false).ok()
    }
}

/// Split off a single trailing newline so line edits keep it in place.
fn split_final_newline(text: &str) -> (&str, &str) {
    text.strip_suffix('\n')
        .map_or((text, ""), |body| (body, "\n"))
}

fn map_lines(text: &str, f: impl Fn(&str) -> String) -> String {
    let (body, newline) = split_final_newline(text);
    let mut out = body
        .split('\n')
        .map(f)
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(newline);
    out
}

fn reorder_lines(text: &str, f: impl FnOnce(&mut Vec<&str>)) -> String {
    let (body, newline) = split_final_newline(text);
    let mut lines: Vec<&str> = body.split('\n').collect();
    f(&mut lines);
    let mut out = lines.join("\n");
    out.push_str(newline);
    out
}

fn unindent(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix('\t') {
        return rest;
    }
    let spaces = line.len() - line.trim_start_matches(' ').len();
    &line[spaces.min(4)..]
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = ch.is_whitespace();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_and_lower() {
        assert_eq!(Filter::Upper.apply("hello"), "HELLO");
        assert_eq!(Filter::Lower.apply("HeLLo"), "hello");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(
            Filter::Title.apply("the QUICK brown-fox\njumps"),
            "The Quick Brown-fox\nJumps"
        );
    }

    #[test]
    fn test_trim_keeps_line_structure() {
        assert_eq!(Filter::Trim.apply("a  \nb\t\n"), "a\nb\n");
    }

    #[test]
    fn test_sort_lines_keeps_trailing_newline() {
        assert_eq!(Filter::SortLines.apply("pear\napple\nfig\n"), "apple\nfig\npear\n");
        assert_eq!(Filter::SortLines.apply("b\na"), "a\nb");
    }

    #[test]
    fn test_reverse_lines() {
        assert_eq!(Filter::ReverseLines.apply("1\n2\n3\n"), "3\n2\n1\n");
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(Filter::Indent.apply("a\n\nb\n"), "\ta\n\n\tb\n");
    }

    #[test]
    fn test_unindent_removes_one_level() {
        assert_eq!(Filter::Unindent.apply("\t\ta\n      b\nc"), "\ta\n  b\nc");
    }

    #[test]
    fn test_filter_names_roundtrip_through_cli_values() {
        assert_eq!(Filter::SortLines.name(), "sort-lines");
        assert_eq!(Filter::from_name("sort-lines"), Some(Filter::SortLines));
        assert_eq!(Filter::from_name("nope"), None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn idempotent_filters(text in "[a-zA-Z \t\n]{0,60}") {
                for filter in [Filter::Upper, Filter::Lower, Filter::Title, Filter::Trim, Filter::SortLines] {
                    let once = filter.apply(&text);
                    prop_assert_eq!(filter.apply(&once), once.clone(), "{:?}", filter);
                }
            }

            #[test]
            fn reverse_lines_is_an_involution(text in "[a-z\n]{0,60}") {
                let twice = Filter::ReverseLines.apply(&Filter::ReverseLines.apply(&text));
                prop_assert_eq!(twice, text);
            }
        }
    }
}
