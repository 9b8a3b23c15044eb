//! Cross-reference resolution between notes.
//!
//! Links are followed from published notes only, but targets are looked up
//! in the whole corpus so a published note may point at an unpublished one.

use crate::note::Note;
use crate::scan::{Corpus, NOTE_EXTENSION};
use serde::Serialize;
use std::collections::HashSet;

/// A raw wiki-link target split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink<'a> {
    /// Note name or vault-rooted path, without extension
    pub base: &'a str,
    pub heading: Option<&'a str>,
    pub label: Option<&'a str>,
}

/// Split `target`, `target#heading` and `target|label` forms
pub fn parse_link(raw: &str) -> ParsedLink<'_> {
    let (target, label) = match raw.split_once('|') {
        Some((target, label)) => (target, Some(label.trim()).filter(|l| !l.is_empty())),
        None => (raw, None),
    };
    let (base, heading) = match target.split_once('#') {
        Some((base, heading)) => (base, Some(heading.trim()).filter(|h| !h.is_empty())),
        None => (target, None),
    };
    let base = base.trim();
    let base = base.strip_suffix(NOTE_EXTENSION).unwrap_or(base);

    ParsedLink {
        base,
        heading,
        label,
    }
}

/// Index of the note `base` refers to.
///
/// A base containing `/` is a vault-rooted path; anything else matches on the
/// note name. The first note in walk order wins.
pub fn find_target(notes: &[Note], base: &str) -> Option<usize> {
    if base.is_empty() {
        return None;
    }
    if base.contains('/') {
        let rel_path = format!("{}{}", base.trim_start_matches('/'), NOTE_EXTENSION);
        notes.iter().position(|n| n.rel_path == rel_path)
    } else {
        notes.iter().position(|n| n.name == base)
    }
}

/// A link whose target is not in the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingLink {
    /// Vault-relative path of the linking note
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    pub resolved: usize,
    pub dangling: Vec<DanglingLink>,
}

/// Rewrite every wiki-link of every published note into a permalink and
/// record the reverse edges.
///
/// Resolution runs once per corpus; later calls return an empty report.
pub fn resolve_links(corpus: &mut Corpus) -> ResolveReport {
    let mut report = ResolveReport::default();
    if corpus.resolved {
        return report;
    }

    for &src in &corpus.published {
        let mut links = corpus.notes[src].links.clone();
        dedup_in_order(&mut links);

        for raw in links {
            let parsed = parse_link(&raw);
            let Some(dst) = find_target(&corpus.notes, parsed.base) else {
                tracing::warn!(
                    "Dangling link [[{}]] in {}",
                    raw,
                    corpus.notes[src].rel_path
                );
                report.dangling.push(DanglingLink {
                    source: corpus.notes[src].rel_path.clone(),
                    target: raw,
                });
                continue;
            };

            let forward = corpus.notes[dst].permalink(parsed.heading, parsed.label);
            let backward = corpus.notes[src].permalink(None, None);

            let source = &mut corpus.notes[src];
            source.body = replace_link_token(&source.body, &raw, &forward);
            source.outline.insert(forward);

            let target = &mut corpus.notes[dst];
            target.backlinks.insert(backward.clone());
            target.outline.insert(backward);

            report.resolved += 1;
        }
    }

    corpus.resolved = true;
    report
}

/// Replace `[[raw]]` with `replacement`, leaving `![[raw]]` embeds alone
fn replace_link_token(body: &str, raw: &str, replacement: &str) -> String {
    let token = format!("[[{raw}]]");
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(pos) = rest.find(&token) {
        let (before, after) = rest.split_at(pos);
        out.push_str(before);
        if out.ends_with('!') {
            out.push_str(&token);
        } else {
            out.push_str(replacement);
        }
        rest = &after[token.len()..];
    }
    out.push_str(rest);
    out
}

fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
