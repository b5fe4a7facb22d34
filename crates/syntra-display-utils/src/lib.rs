//! Utility functions for displaying automata, configurations and words in a
//! structured way.
//!
//! All `Display` implementations in the syntra crates funnel their
//! set-and-sequence rendering through these helpers so that configurations,
//! canonical words and search trees print consistently.

use std::fmt::Display;

/// Size of a tab when indenting nested output
pub const TAB_SIZE: usize = 4;

/// Join an iterator over displayable items using the given separator
///
/// The separator is not appended to the end of the result.
///
/// # Example
///
/// ```
/// use syntra_display_utils::join_iterator;
///
/// let list = vec!["a", "b", "c"];
/// assert_eq!(join_iterator(list.iter(), ", "), "a, b, c");
/// ```
pub fn join_iterator<T: ToString + Sized, U: Iterator<Item = T>, S: Into<String>>(
    list: U,
    sep: S,
) -> String {
    list.map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(sep.into().as_str())
}

/// Display an iterator in a stable (sorted) order
///
/// # Example
///
/// ```
/// use syntra_display_utils::display_iterator_stable_order;
///
/// let list = vec!["c", "a", "b"];
/// assert_eq!(display_iterator_stable_order(list.iter()), "a, b, c");
/// ```
pub fn display_iterator_stable_order<T: Display>(set: impl IntoIterator<Item = T>) -> String {
    let mut sorted_set = set.into_iter().collect::<Vec<_>>();
    sorted_set.sort_by_key(|a| a.to_string());
    join_iterator(sorted_set.iter(), ", ")
}

/// Render an iterator as a brace-delimited set
///
/// The empty iterator renders as `{}`, everything else as `{ a, b }`. This is
/// the format used for configurations and canonical-word partitions.
///
/// # Example
///
/// ```
/// use syntra_display_utils::display_set;
///
/// let list = vec!["a", "b"];
/// assert_eq!(display_set(list.iter()), "{ a, b }");
/// assert_eq!(display_set(Vec::<&str>::new().iter()), "{}");
/// ```
pub fn display_set<T: Display>(set: impl IntoIterator<Item = T>) -> String {
    let inner = join_iterator(set.into_iter(), ", ");
    if inner.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {inner} }}")
    }
}

/// Indent all non-empty lines of a string by one tab size
///
/// # Example
///
/// ```
/// use syntra_display_utils::indent_all;
///
/// let input = "a\nb\nc";
/// assert_eq!(indent_all(input), "    a\n    b\n    c");
/// ```
pub fn indent_all<S>(input: S) -> String
where
    S: Into<String>,
{
    let tab = " ".repeat(TAB_SIZE);
    let input: String = input.into();
    let input_n_lines = input.lines().count();

    let mut output = String::with_capacity(input.len() + input_n_lines * TAB_SIZE);

    for (i, line) in input.lines().enumerate() {
        if !line.is_empty() {
            output.push_str(&tab);
        }

        output.push_str(line);

        if i != input_n_lines - 1 {
            output.push('\n');
        }
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    output
}
