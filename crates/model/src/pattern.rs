use std::fmt;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// A CODEOWNERS path pattern together with its compiled matcher.
///
/// Matching follows the gitignore-style rules GitHub applies to CODEOWNERS:
///
/// - a leading `/`, or a `/` anywhere but at the end, anchors the pattern at
///   the repository root; otherwise the pattern matches at any depth
/// - `*` never crosses a `/`, `**` does
/// - a trailing `/` matches only paths below that directory
/// - a pattern naming a directory also owns everything below it, except when
///   its last segment is a bare `*` (`docs/*` covers direct children only)
/// - a backslash makes the next character literal (`my\ file.md`, `\[id\].rb`)
#[derive(Clone)]
pub struct Pattern {
    text: String,
    matcher: Option<GlobSet>,
}

impl Pattern {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let matcher = compile(&text);
        Self { text, matcher }
    }

    /// Pattern text matching exactly `path`, with whitespace and glob
    /// metacharacters escaped.
    pub fn escape(path: &str) -> String {
        let mut out = String::with_capacity(path.len());
        for (idx, ch) in path.chars().enumerate() {
            let special = matches!(ch, '\\' | '*' | '?' | '[' | ']' | '{' | '}')
                || ch.is_whitespace()
                || (idx == 0 && ch == '#');
            if special {
                out.push('\\');
            }
            out.push(ch);
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Pattern text with the root anchor removed, as git pathspecs expect it.
    pub fn without_root_anchor(&self) -> &str {
        self.text.trim_start_matches('/')
    }

    /// Whether the pattern compiled; invalid globs never match.
    pub fn is_valid(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./").trim_start_matches('/');
        self.matcher.as_ref().is_some_and(|m| m.is_match(path))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.text).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn compile(text: &str) -> Option<GlobSet> {
    let trimmed = text.trim();
    let dir_only = trimmed.ends_with('/');
    let body = trimmed.trim_start_matches('/').trim_end_matches('/');
    if body.is_empty() {
        return None;
    }

    let anchored = trimmed.starts_with('/') || body.contains('/');
    let base = if anchored || body.starts_with("**/") {
        body.to_string()
    } else {
        format!("**/{body}")
    };

    let last_segment = body.rsplit('/').next().unwrap_or(body);
    let mut globs = Vec::with_capacity(2);
    if !dir_only {
        globs.push(base.clone());
    }
    if (dir_only || last_segment != "*") && !body.ends_with("**") {
        globs.push(format!("{base}/**"));
    }
    if globs.is_empty() {
        globs.push(base);
    }

    let mut builder = GlobSetBuilder::new();
    for glob in &globs {
        match GlobBuilder::new(glob)
            .literal_separator(true)
            .backslash_escape(true)
            .build() {
            Ok(compiled) => {
                builder.add(compiled);
            }
            Err(err) => {
                log::warn!("pattern {text:?} does not compile: {err}");
                return None;
            }
        }
    }

    match builder.build() {
        Ok(set) => Some(set),
        Err(err) => {
            log::warn!("pattern {text:?} does not compile: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_every_path() {
        let pattern = Pattern::new("*");
        assert!(pattern.matches("README.md"));
        assert!(pattern.matches("src/x.rb"));
        assert!(pattern.matches("a/b/c/d.txt"));
    }

    #[test]
    fn directory_star_covers_direct_children_only() {
        let pattern = Pattern::new("docs/*");
        assert!(pattern.matches("docs/readme.md"));
        assert!(!pattern.matches("docs/guides/setup.md"));
        assert!(!pattern.matches("other/docs/readme.md"));
    }

    #[test]
    fn leading_slash_anchors_at_root() {
        let anchored = Pattern::new("/README.md");
        assert!(anchored.matches("README.md"));
        assert!(!anchored.matches("docs/README.md"));

        let floating = Pattern::new("README.md");
        assert!(floating.matches("README.md"));
        assert!(floating.matches("docs/README.md"));
    }

    #[test]
    fn directory_patterns_own_their_subtree() {
        let trailing = Pattern::new("lib/");
        assert!(trailing.matches("lib/a.rb"));
        assert!(trailing.matches("lib/deep/b.rb"));
        assert!(!trailing.matches("lib"));

        let bare = Pattern::new("lib");
        assert!(bare.matches("lib/a.rb"));
        assert!(bare.matches("vendor/lib/a.rb"));
        assert!(bare.matches("lib"));
    }

    #[test]
    fn extension_globs_float_and_double_star_crosses_directories() {
        assert!(Pattern::new("*.rb").matches("app/models/user.rb"));
        assert!(!Pattern::new("*.rb").matches("app/models/user.rs"));
        assert!(Pattern::new("**/logs").matches("a/b/logs/today.txt"));
        assert!(Pattern::new("/src/**/*.rs").matches("src/a/b/lib.rs"));
    }

    #[test]
    fn non_matching_sibling_directory() {
        let pattern = Pattern::new("liba/*");
        assert!(!pattern.matches("lib/new_file.rb"));
        assert!(Pattern::new("lib/*").matches("lib/new_file.rb"));
    }

    #[test]
    fn invalid_glob_matches_nothing() {
        let pattern = Pattern::new("src/[");
        assert!(!pattern.is_valid());
        assert!(!pattern.matches("src/["));
        assert!(!Pattern::new("/").is_valid());
    }

    #[test]
    fn escaped_paths_match_only_themselves() {
        assert_eq!(Pattern::escape("docs/my guide.md"), "docs/my\\ guide.md");
        assert_eq!(Pattern::escape("lib/[id].rb"), "lib/\\[id\\].rb");
        assert_eq!(Pattern::escape("#notes.md"), "\\#notes.md");

        let spaced = Pattern::new(Pattern::escape("docs/my guide.md"));
        assert!(spaced.matches("docs/my guide.md"));
        assert!(!spaced.matches("docs/myxguide.md"));

        let bracketed = Pattern::new(Pattern::escape("lib/[id].rb"));
        assert!(bracketed.is_valid());
        assert!(bracketed.matches("lib/[id].rb"));
        assert!(!bracketed.matches("lib/i.rb"));

        let starred = Pattern::new(Pattern::escape("src/a*b?.rs"));
        assert!(starred.matches("src/a*b?.rs"));
        assert!(!starred.matches("src/axxbc.rs"));

        assert!(Pattern::new(Pattern::escape("#notes.md")).matches("#notes.md"));
    }

    #[test]
    fn root_anchor_is_stripped_for_pathspecs() {
        assert_eq!(Pattern::new("/docs/*").without_root_anchor(), "docs/*");
        assert_eq!(Pattern::new("docs/*").without_root_anchor(), "docs/*");
    }
}
