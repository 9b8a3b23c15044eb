//! Classification from a note's first line.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"#\S*").unwrap())
}

/// Tags and flags carried by the first line of a note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagLine {
    /// Flat tag set; `#a/b` contributes `a` and `b`
    pub tags: BTreeSet<String>,
    /// Line carries the share tag
    pub published: bool,
    /// Line carries the pinned tag
    pub pinned: bool,
}

impl TagLine {
    /// Extract tags from `line`.
    ///
    /// The share tag marks publication and is not itself a tag. The pinned
    /// tag sets `pinned` and is kept as an ordinary tag.
    pub fn parse(line: &str, share_tag: &str, pinned_tag: &str) -> Self {
        let share_token = format!("#{share_tag}");
        let pinned_token = format!("#{pinned_tag}");
        let mut parsed = TagLine::default();

        for token in tag_regex().find_iter(line).map(|m| m.as_str()) {
            if token == pinned_token {
                parsed.pinned = true;
            }
            if token == share_token {
                parsed.published = true;
                continue;
            }

            let name = token.replace('#', "");
            parsed.tags.extend(
                name.split('/')
                    .filter(|part| !part.is_empty())
                    .map(str::to_string),
            );
        }

        parsed
    }
}
