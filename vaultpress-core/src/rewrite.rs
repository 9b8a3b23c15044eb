//! Ordered text rewrite passes over a note body.
//!
//! Construction rules run once, in [`CONSTRUCTION_RULES`] order, while a note
//! is loaded; each one records the references it rewrote. Finalize passes run
//! on the resolved body when the output document is rendered. Every pass
//! leaves its own output alone when applied a second time.

use crate::config::normalize_separators;
use crate::resources::ResourceStore;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// URL prefix of copied images
pub const IMAGES_PREFIX: &str = "/images/";

/// URL prefix of copied attachments
pub const DOWNLOAD_PREFIX: &str = "/download/";

/// References collected while rewriting a body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    /// Raw wiki-link targets in body order, `/`-separated
    pub links: Vec<String>,
    /// Embedded images found in the resource store
    pub images: Vec<String>,
    /// Linked attachments found in the resource store
    pub files: Vec<String>,
}

pub struct RewriteContext<'a> {
    resources: &'a ResourceStore,
    pub refs: References,
}

impl<'a> RewriteContext<'a> {
    pub fn new(resources: &'a ResourceStore) -> Self {
        Self {
            resources,
            refs: References::default(),
        }
    }
}

/// One pattern-based pass applied during note construction
pub trait RewriteRule: Sync {
    fn name(&self) -> &'static str;

    fn rewrite(&self, body: &str, cx: &mut RewriteContext<'_>) -> String;
}

/// Construction passes in application order
pub static CONSTRUCTION_RULES: &[&dyn RewriteRule] =
    &[&WikiLinks, &ObsidianEmbeds, &MarkdownImages, &FileLinks];

/// Passes applied when the final document is rendered
pub static FINALIZE_PASSES: &[(&str, fn(&str) -> String)] = &[
    ("placeholders", strip_placeholders),
    ("headings", separate_headings),
];

/// Run every construction rule over `body`
pub fn apply_construction_rules(body: String, cx: &mut RewriteContext<'_>) -> String {
    CONSTRUCTION_RULES.iter().fold(body, |body, rule| {
        let rewritten = rule.rewrite(&body, cx);
        if rewritten != body {
            tracing::trace!("Rewrite rule '{}' changed the body", rule.name());
        }
        rewritten
    })
}

/// Run every finalize pass over `body`
pub fn apply_finalize_passes(body: &str) -> String {
    FINALIZE_PASSES
        .iter()
        .fold(body.to_string(), |body, (name, pass)| {
            let finished = pass(&body);
            if finished != body {
                tracing::trace!("Finalize pass '{}' changed the body", name);
            }
            finished
        })
}

static WIKILINK_REGEX: OnceLock<Regex> = OnceLock::new();
static EMBED_REGEX: OnceLock<Regex> = OnceLock::new();
static MD_IMAGE_REGEX: OnceLock<Regex> = OnceLock::new();
static FILE_LINK_REGEX: OnceLock<Regex> = OnceLock::new();
static FENCE_INFO_REGEX: OnceLock<Regex> = OnceLock::new();
static QUERY_REGEX: OnceLock<Regex> = OnceLock::new();

fn wikilink_regex() -> &'static Regex {
    WIKILINK_REGEX.get_or_init(|| Regex::new(r"(!?)\[\[([^\[\]\n]+)\]\]").unwrap())
}

fn embed_regex() -> &'static Regex {
    EMBED_REGEX.get_or_init(|| Regex::new(r"!\[\[([^\[\]\n]+)\]\]").unwrap())
}

fn md_image_regex() -> &'static Regex {
    MD_IMAGE_REGEX.get_or_init(|| Regex::new(r"!\[([^\]\n]*)\]\(([^)\n]*)\)").unwrap())
}

fn file_link_regex() -> &'static Regex {
    FILE_LINK_REGEX
        .get_or_init(|| Regex::new(r"(?m)(^|\s)\[([^\]\n]*)\]\(([^)\n]*)\)").unwrap())
}

fn fence_info_regex() -> &'static Regex {
    FENCE_INFO_REGEX.get_or_init(|| Regex::new(r"(```\w*)[^\S\n].*").unwrap())
}

fn query_regex() -> &'static Regex {
    QUERY_REGEX.get_or_init(|| Regex::new(r"(?m)(^|[^\S\n])\?\?.*").unwrap())
}

fn is_external(target: &str) -> bool {
    target.contains("://") || target.starts_with("mailto:") || target.starts_with("data:")
}

/// `[[target]]` → `[[target]]` with `/` separators; records the target.
/// Embeds (`![[...]]`) are left for [`ObsidianEmbeds`].
pub struct WikiLinks;

impl RewriteRule for WikiLinks {
    fn name(&self) -> &'static str {
        "wikilinks"
    }

    fn rewrite(&self, body: &str, cx: &mut RewriteContext<'_>) -> String {
        wikilink_regex()
            .replace_all(body, |caps: &Captures| {
                if &caps[1] == "!" {
                    return caps[0].to_string();
                }
                let target = normalize_separators(&caps[2]);
                if !target.trim().is_empty() {
                    cx.refs.links.push(target.clone());
                }
                format!("[[{target}]]")
            })
            .into_owned()
    }
}

/// `![[pic.png]]` / `![[pic.png|300]]` → `![](/images/pic.png)` when the image exists
pub struct ObsidianEmbeds;

impl RewriteRule for ObsidianEmbeds {
    fn name(&self) -> &'static str {
        "obsidian-embeds"
    }

    fn rewrite(&self, body: &str, cx: &mut RewriteContext<'_>) -> String {
        embed_regex()
            .replace_all(body, |caps: &Captures| {
                let raw = &caps[1];
                let name = raw.split('|').next().unwrap_or(raw).trim();
                if !cx.resources.contains(name) {
                    tracing::debug!("Embed target not in resource store: {}", name);
                    return caps[0].to_string();
                }
                cx.refs.images.push(name.to_string());
                format!("![]({IMAGES_PREFIX}{name})")
            })
            .into_owned()
    }
}

/// `![alt](dir/pic.png)` → `![](/images/pic.png)` when the image exists; URLs are skipped
pub struct MarkdownImages;

impl RewriteRule for MarkdownImages {
    fn name(&self) -> &'static str {
        "markdown-images"
    }

    fn rewrite(&self, body: &str, cx: &mut RewriteContext<'_>) -> String {
        md_image_regex()
            .replace_all(body, |caps: &Captures| {
                let target = normalize_separators(
                    caps[2].trim().trim_start_matches('<').trim_end_matches('>'),
                );
                if is_external(&target) || target.starts_with(IMAGES_PREFIX) {
                    return caps[0].to_string();
                }
                let name = target.rsplit('/').next().unwrap_or(&target).trim();
                if !cx.resources.contains(name) {
                    tracing::debug!("Image target not in resource store: {}", target);
                    return caps[0].to_string();
                }
                cx.refs.images.push(name.to_string());
                format!("![]({IMAGES_PREFIX}{name})")
            })
            .into_owned()
    }
}

/// `[label](report.pdf)` → `[label](/download/report.pdf)` when the file exists.
///
/// Only links at the start of a line or after whitespace qualify, which keeps
/// image syntax out. An empty label becomes the file name.
pub struct FileLinks;

impl RewriteRule for FileLinks {
    fn name(&self) -> &'static str {
        "file-links"
    }

    fn rewrite(&self, body: &str, cx: &mut RewriteContext<'_>) -> String {
        file_link_regex()
            .replace_all(body, |caps: &Captures| {
                let lead = &caps[1];
                let label = &caps[2];
                let target = caps[3].trim();
                if is_external(target)
                    || target.starts_with(DOWNLOAD_PREFIX)
                    || !cx.resources.contains(target)
                {
                    return caps[0].to_string();
                }
                cx.refs.files.push(target.to_string());
                let label = if label.trim().is_empty() { target } else { label };
                format!("{lead}[{label}]({DOWNLOAD_PREFIX}{target})")
            })
            .into_owned()
    }
}

/// Drop authoring-tool markers the site cannot render: trailing info after a
/// fence language, `run-` fence prefixes and `??` query lines.
pub fn strip_placeholders(body: &str) -> String {
    let body = body.replace("```run-", "```");
    let body = fence_info_regex().replace_all(&body, "$1");
    query_regex().replace_all(&body, "${1}  ").into_owned()
}

/// Surround `##`-and-deeper headings with blank lines (outside code fences)
pub fn separate_headings(body: &str) -> String {
    let lines: Vec<&str> = body.split('\n').collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut in_fence = false;

    for (idx, line) in lines.iter().copied().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let heading = !in_fence && line.starts_with("##");

        if heading && out.last().is_some_and(|prev| !prev.trim().is_empty()) {
            out.push("");
        }
        out.push(line);
        if heading && lines.get(idx + 1).is_some_and(|next| !next.trim().is_empty()) {
            out.push("");
        }
    }

    out.join("\n")
}
