use crate::entry::Entry;
use crate::filter::{MatchInfo, MatchedEntry};
use chrono::{DateTime, Local, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H-%M-%S";
const SIZE_SUFFIXES: [&str; 7] = ["", "K", "M", "G", "T", "E", "Y"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Meta(MetaToken),
    Group(usize),
    /// `$letters`; resolves to a named group when the match has one of that
    /// name and is kept as literal text otherwise.
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaToken {
    Created,
    UtcCreated,
    Modified,
    UtcModified,
    Accessed,
    UtcAccessed,
    Size,
    HumanSize,
}

const META_TOKENS: [(&str, MetaToken); 8] = [
    ("created", MetaToken::Created),
    ("ucreated", MetaToken::UtcCreated),
    ("modified", MetaToken::Modified),
    ("umodified", MetaToken::UtcModified),
    ("accessed", MetaToken::Accessed),
    ("uaccessed", MetaToken::UtcAccessed),
    ("size", MetaToken::Size),
    ("hsize", MetaToken::HumanSize),
];

/// Splits a replacement string into literal text and `$` tokens.
///
/// `$$` becomes a literal `$` right away, so nothing after it can be read as
/// a token. Metadata names win over group names: `$size` is always the file
/// size even if the pattern declares a group called `size`.
pub fn parse_template(input: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        literal.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            literal.push('$');
            rest = tail;
            continue;
        }

        let token = if let Some((name, meta)) = META_TOKENS
            .iter()
            .find(|(name, _)| after.starts_with(name))
        {
            Some((TemplatePart::Meta(*meta), name.len()))
        } else {
            let digits = leading_len(after, |ch| ch.is_ascii_digit());
            let letters = leading_len(after, |ch| ch.is_ascii_alphabetic());
            if digits > 0 {
                let index = after[..digits].parse::<usize>().unwrap_or(usize::MAX);
                Some((TemplatePart::Group(index), digits))
            } else if letters > 0 {
                Some((TemplatePart::Named(after[..letters].to_string()), letters))
            } else {
                None
            }
        };

        match token {
            Some((part, consumed)) => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(part);
                rest = &after[consumed..];
            }
            None => {
                literal.push('$');
                rest = after;
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    parts
}

/// Renders parsed parts against one match. Substituted values are copied
/// verbatim and never rescanned for tokens.
pub fn render_template(parts: &[TemplatePart], captures: &MatchInfo, entry: &Entry) -> String {
    let mut output = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(s) => output.push_str(s),
            TemplatePart::Meta(token) => output.push_str(&meta_value(*token, entry)),
            TemplatePart::Group(index) => {
                output.push_str(captures.group(*index).unwrap_or_default())
            }
            TemplatePart::Named(name) => {
                if captures.has_named(name) {
                    output.push_str(captures.named_group(name).unwrap_or_default());
                } else {
                    output.push('$');
                    output.push_str(name);
                }
            }
        }
    }
    output
}

pub fn expand(template: &str, matched: &MatchedEntry) -> String {
    render_template(&parse_template(template), &matched.captures, &matched.entry)
}

pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_timestamp_utc(time: &DateTime<Local>) -> String {
    time.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string()
}

/// Binary-unit size: `0B`, `1023B`, `1.00KB`, `1.50MB`.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut order = 0usize;
    while value >= 1024.0 && order < SIZE_SUFFIXES.len() - 1 {
        value /= 1024.0;
        order += 1;
    }

    if order == 0 {
        format!("{bytes}B")
    } else {
        format!("{:.2}{}B", value, SIZE_SUFFIXES[order])
    }
}

fn meta_value(token: MetaToken, entry: &Entry) -> String {
    let local = |t: &Option<DateTime<Local>>| t.as_ref().map(format_timestamp);
    let utc = |t: &Option<DateTime<Local>>| t.as_ref().map(format_timestamp_utc);

    match token {
        MetaToken::Created => local(&entry.created),
        MetaToken::UtcCreated => utc(&entry.created),
        MetaToken::Modified => local(&entry.modified),
        MetaToken::UtcModified => utc(&entry.modified),
        MetaToken::Accessed => local(&entry.accessed),
        MetaToken::UtcAccessed => utc(&entry.accessed),
        MetaToken::Size => entry.size.map(|s| s.to_string()),
        MetaToken::HumanSize => entry.size.map(human_size),
    }
    .unwrap_or_default()
}

fn leading_len(input: &str, pred: impl Fn(char) -> bool) -> usize {
    input
        .char_indices()
        .find(|(_, ch)| !pred(*ch))
        .map(|(i, _)| i)
        .unwrap_or(input.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use crate::filter::{FilterOptions, Matcher};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn entry(name: &str, size: Option<u64>) -> Entry {
        let stamp = Local
            .with_ymd_and_hms(2024, 5, 17, 8, 30, 5)
            .single()
            .expect("valid local time");
        Entry {
            name: name.to_string(),
            path: PathBuf::from("/data").join(name),
            kind: if size.is_some() {
                EntryKind::File
            } else {
                EntryKind::Directory
            },
            created: Some(stamp),
            modified: Some(stamp),
            accessed: None,
            size,
        }
    }

    fn expand_with(pattern: &str, name: &str, template: &str) -> String {
        let matcher = Matcher::new(pattern, &FilterOptions::default()).expect("pattern compiles");
        let matched = matcher.test(entry(name, Some(2048)));
        expand(template, &matched)
    }

    #[test]
    fn plain_text_expands_to_itself() {
        assert_eq!(expand_with("a", "a", "renamed.txt"), "renamed.txt");
    }

    #[test]
    fn numbered_groups_are_substituted() {
        assert_eq!(
            expand_with(r"(\d{4})-(\d{2})", "2024-05", "$2/$1"),
            "05/2024"
        );
    }

    #[test]
    fn double_dollar_is_a_literal_dollar() {
        assert_eq!(expand_with(r"(\d)", "7", "a$$1b"), "a$1b");
        assert_eq!(expand_with(r"(\d)", "7", "$$$1"), "$7");
        assert_eq!(expand_with(r"(\d)", "7", "$$created"), "$created");
    }

    #[test]
    fn out_of_range_group_is_empty() {
        assert_eq!(expand_with(r"(a)(b)", "ab", "x$9y"), "xy");
        assert_eq!(
            expand_with(r"(a)", "a", "x$99999999999999999999999y"),
            "xy"
        );
    }

    #[test]
    fn non_participating_group_is_empty() {
        assert_eq!(expand_with(r"(a)|(b)", "b", "[$1][$2]"), "[][b]");
    }

    #[test]
    fn group_zero_is_the_whole_match() {
        assert_eq!(expand_with(r"\d+", "img42", "n$0"), "n42");
    }

    #[test]
    fn named_groups_resolve_and_unknown_names_stay_literal() {
        assert_eq!(
            expand_with(r"(?P<year>\d{4})", "2024", "y$year-$month"),
            "y2024-$month"
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        assert_eq!(expand_with(r"(.*)", "$2x", "$1"), "$2x");
        assert_eq!(expand_with(r"(.*)", "$$", "<$1>"), "<$$>");
    }

    #[test]
    fn lone_or_trailing_dollar_is_kept() {
        assert_eq!(expand_with("a", "a", "cost $ 5$"), "cost $ 5$");
        assert_eq!(expand_with("a", "a", "$-"), "$-");
    }

    #[test]
    fn metadata_tokens_use_entry_snapshot() {
        assert_eq!(expand_with("a", "a", "$size"), "2048");
        assert_eq!(expand_with("a", "a", "$hsize"), "2.00KB");
        assert_eq!(
            expand_with("a", "a", "$created_x"),
            "2024-05-17 08-30-05_x"
        );
        assert_eq!(expand_with("a", "a", "[$accessed]"), "[]");
    }

    #[test]
    fn utc_tokens_convert_the_timestamp() {
        let e = entry("a", Some(1));
        let expected = e
            .modified
            .expect("modified set")
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H-%M-%S")
            .to_string();
        let matcher = Matcher::new("a", &FilterOptions::default()).expect("pattern compiles");
        let matched = matcher.test(e);
        assert_eq!(expand("$umodified", &matched), expected);
    }

    #[test]
    fn metadata_wins_over_same_named_group() {
        assert_eq!(expand_with(r"(?P<size>\w+)", "big", "$size"), "2048");
    }

    #[test]
    fn size_tokens_are_empty_for_directories() {
        let matcher = Matcher::new("dir", &FilterOptions::default()).expect("pattern compiles");
        let matched = matcher.test(entry("dir", None));
        assert_eq!(expand("[$size][$hsize]", &matched), "[][]");
    }

    #[test]
    fn human_size_uses_binary_units() {
        assert_eq!(human_size(0), "0B");
        assert_eq!(human_size(1023), "1023B");
        assert_eq!(human_size(1024), "1.00KB");
        assert_eq!(human_size(1536), "1.50KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.00MB");
    }

    #[test]
    fn parse_splits_literals_and_tokens() {
        assert_eq!(
            parse_template("img_$1.$ext$$"),
            vec![
                TemplatePart::Literal("img_".to_string()),
                TemplatePart::Group(1),
                TemplatePart::Literal(".".to_string()),
                TemplatePart::Named("ext".to_string()),
                TemplatePart::Literal("$".to_string()),
            ]
        );
    }
}
