use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::{ModelError, Result};
use crate::line::{LineId, OwnerSet, OwnershipLine, PatternRule, UnrecognizedLine};

/// In-memory image of an ownership file.
///
/// Every mutation marks the group dirty. Line-number addressed operations
/// refuse to run on a dirty group until [`Group::refresh`] has re-parsed the
/// edited lines and renumbered the file, so a caller can never act on a line
/// number computed before an edit. [`LineId`]s survive edits and can be used
/// to find a line's current number.
#[derive(Clone, Debug)]
pub struct Group {
    lines: Vec<OwnershipLine>,
    trailing_newline: bool,
    next_id: u32,
    dirty: bool,
}

impl Group {
    pub fn parse(content: &str) -> Self {
        let mut group = Self {
            lines: Vec::new(),
            trailing_newline: false,
            next_id: 0,
            dirty: false,
        };
        if content.is_empty() {
            return group;
        }

        let body = match content.strip_suffix('\n') {
            Some(body) => {
                group.trailing_newline = true;
                body
            }
            None => content,
        };
        for (idx, raw) in body.split('\n').enumerate() {
            let id = group.allocate_id();
            group.lines.push(OwnershipLine::parse(raw, id, idx + 1));
        }
        group
    }

    pub fn lines(&self) -> &[OwnershipLine] {
        &self.lines
    }

    pub fn rules(&self) -> impl Iterator<Item = &PatternRule> {
        self.lines.iter().filter_map(OwnershipLine::as_rule)
    }

    pub fn unrecognized(&self) -> impl Iterator<Item = &UnrecognizedLine> {
        self.lines.iter().filter_map(|line| match line {
            OwnershipLine::Unrecognized(line) => Some(line),
            _ => None,
        })
    }

    /// The rule that owns `path`: the last matching rule in file order.
    pub fn owner_rule(&self, path: &str) -> Option<&PatternRule> {
        self.rules().filter(|rule| rule.matches(path)).last()
    }

    pub fn owners_for(&self, path: &str) -> Option<&OwnerSet> {
        self.owner_rule(path).map(PatternRule::owners)
    }

    pub fn defined_owner(&self, path: &str) -> bool {
        self.rules().any(|rule| rule.matches(path))
    }

    /// Owner to patterns (root anchor stripped), patterns in file order.
    pub fn patterns_by_owner(&self) -> BTreeMap<String, Vec<String>> {
        let mut by_owner: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for rule in self.rules() {
            for owner in rule.owners().iter() {
                by_owner
                    .entry(owner.to_string())
                    .or_default()
                    .push(rule.pattern().without_root_anchor().to_string());
            }
        }
        by_owner
    }

    pub fn to_content(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|line| line.render())
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Re-parses edited lines and renumbers the whole file.
    pub fn refresh(&mut self) {
        for (idx, line) in self.lines.iter_mut().enumerate() {
            let reparsed = match line {
                OwnershipLine::Rule(rule) if rule.is_modified() => {
                    Some(OwnershipLine::parse(&rule.render(), rule.id(), idx + 1))
                }
                _ => None,
            };
            if let Some(reparsed) = reparsed {
                *line = reparsed;
            }
            line.set_line_number(idx + 1);
        }
        self.dirty = false;
    }

    /// Current line number of the line with `id`, if it still exists.
    pub fn line_number_of(&self, id: LineId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.id() == Some(id))
            .map(|idx| idx + 1)
    }

    pub fn rule(&self, id: LineId) -> Option<&PatternRule> {
        self.rules().find(|rule| rule.id() == id)
    }

    pub fn replace_pattern(&mut self, line_number: usize, pattern: &str) -> Result<()> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ModelError::EmptyPattern);
        }
        let idx = self.index(line_number)?;
        let rule = self.lines[idx]
            .as_rule_mut()
            .ok_or(ModelError::NotARule(line_number))?;
        rule.set_pattern(pattern);
        self.dirty = true;
        Ok(())
    }

    /// Replaces an owner token in the rule at `line_number`. Returns whether
    /// the rule changed.
    pub fn replace_owner(&mut self, line_number: usize, from: &str, to: &str) -> Result<bool> {
        let idx = self.index(line_number)?;
        let rule = self.lines[idx]
            .as_rule_mut()
            .ok_or(ModelError::NotARule(line_number))?;
        let changed = rule.replace_owner(from, to);
        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Replaces the whole line, classifying the new text from scratch.
    pub fn replace_line(&mut self, line_number: usize, raw: &str) -> Result<()> {
        let idx = self.index(line_number)?;
        let id = match self.lines[idx].id() {
            Some(id) => id,
            None => self.allocate_id(),
        };
        let raw = if self.lines[idx].render().ends_with('\r') && !raw.ends_with('\r') {
            Cow::Owned(format!("{raw}\r"))
        } else {
            Cow::Borrowed(raw)
        };
        self.lines[idx] = OwnershipLine::parse(&raw, id, line_number);
        self.dirty = true;
        Ok(())
    }

    pub fn delete_line(&mut self, line_number: usize) -> Result<OwnershipLine> {
        let idx = self.index(line_number)?;
        let removed = self.lines.remove(idx);
        for (offset, line) in self.lines.iter_mut().enumerate().skip(idx) {
            line.set_line_number(offset + 1);
        }
        self.dirty = true;
        Ok(removed)
    }

    /// Appends `pattern owners...` at the end of the file.
    pub fn append_rule(&mut self, pattern: &str, owners: OwnerSet) -> Result<LineId> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ModelError::EmptyPattern);
        }
        if owners.is_empty() {
            return Err(ModelError::NoOwners(pattern.to_string()));
        }
        if self.lines.is_empty() {
            self.trailing_newline = true;
        }
        let crlf = self
            .lines
            .last()
            .is_some_and(|line| line.render().ends_with('\r'));
        let id = self.allocate_id();
        let line_number = self.lines.len() + 1;
        self.lines.push(OwnershipLine::Rule(
            PatternRule::new(id, line_number, pattern, owners).with_crlf(crlf),
        ));
        self.dirty = true;
        Ok(id)
    }

    fn index(&self, line_number: usize) -> Result<usize> {
        if self.dirty {
            return Err(ModelError::StaleLineNumbers);
        }
        if line_number == 0 || line_number > self.lines.len() {
            return Err(ModelError::LineNotFound(line_number));
        }
        Ok(line_number - 1)
    }

    fn allocate_id(&mut self) -> LineId {
        let id = LineId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "# Global owners\n* @a\n\n# Docs\ndocs/*   @b @c\n@stray\n";

    #[test]
    fn parse_then_serialize_is_identity() {
        for content in [
            SAMPLE,
            "",
            "\n",
            "* @a",
            "lib/new_file.rb @mpospelov\n",
            "  \n#x\r\nsrc/ @a\n\n",
        ] {
            assert_eq!(Group::parse(content).to_content(), content);
        }
    }

    #[test]
    fn every_line_is_classified_in_order() {
        let group = Group::parse(SAMPLE);
        let kinds: Vec<&str> = group
            .lines()
            .iter()
            .map(|line| match line {
                OwnershipLine::Blank(_) => "blank",
                OwnershipLine::Comment(_) => "comment",
                OwnershipLine::Rule(_) => "rule",
                OwnershipLine::Unrecognized(_) => "unrecognized",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["comment", "rule", "blank", "comment", "rule", "unrecognized"]
        );
        let stray = group.unrecognized().next().expect("stray line");
        assert_eq!(stray.line_number(), 6);
        assert_eq!(stray.raw(), "@stray");
    }

    #[test]
    fn last_match_wins() {
        let group = Group::parse("* @a\ndocs/* @b\n");
        let docs: Vec<&str> = group
            .owners_for("docs/readme.md")
            .expect("owned")
            .iter()
            .collect();
        assert_eq!(docs, vec!["@b"]);
        let src: Vec<&str> = group.owners_for("src/x.rb").expect("owned").iter().collect();
        assert_eq!(src, vec!["@a"]);
        assert!(group.defined_owner("src/x.rb"));
        assert!(!Group::parse("docs/* @b\n").defined_owner("src/x.rb"));
    }

    #[test]
    fn line_addressed_edits_require_refresh() {
        let mut group = Group::parse("a/ @x\nb/ @y\nc/ @z\n");
        group.delete_line(1).expect("delete");
        assert!(group.is_dirty());
        assert_eq!(
            group.replace_pattern(1, "q/"),
            Err(ModelError::StaleLineNumbers)
        );

        group.refresh();
        group.replace_pattern(2, "cc/").expect("replace");
        group.refresh();
        assert_eq!(group.to_content(), "b/ @y\ncc/ @z\n");
        let numbers: Vec<usize> = group.rules().map(PatternRule::line_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn ids_follow_lines_across_edits() {
        let mut group = Group::parse("a/ @x\nb/ @y\nc/ @z\n");
        let third = group.rules().nth(2).expect("third").id();
        group.delete_line(1).expect("delete");
        group.refresh();
        assert_eq!(group.line_number_of(third), Some(2));
        assert_eq!(group.rule(third).expect("rule").pattern().as_str(), "c/");
    }

    #[test]
    fn replace_owner_deduplicates_and_keeps_other_lines_verbatim() {
        let mut group = Group::parse("# keep   me\nlib/new_file.rb @mpospelov @foobar\n");
        assert!(group.replace_owner(2, "@foobar", "@mpospelov").expect("replace"));
        group.refresh();
        assert_eq!(
            group.to_content(),
            "# keep   me\nlib/new_file.rb @mpospelov\n"
        );
    }

    #[test]
    fn edited_unrecognized_line_reparses_as_rule() {
        let mut group = Group::parse("lib/new_file.rb @mpospelov\n@mpospelov\n");
        group.replace_line(2, "pattern @mpospelov").expect("edit");
        group.refresh();
        assert_eq!(group.unrecognized().count(), 0);
        let rule = group.rules().nth(1).expect("new rule");
        assert_eq!(rule.pattern().as_str(), "pattern");
        assert_eq!(rule.line_number(), 2);
    }

    #[test]
    fn append_rule_to_empty_file_ends_with_newline() {
        let mut group = Group::parse("");
        group
            .append_rule("lib/new_file.rb", OwnerSet::from_tokens("@a"))
            .expect("append");
        group.refresh();
        assert_eq!(group.to_content(), "lib/new_file.rb @a\n");
        assert!(group.defined_owner("lib/new_file.rb"));
    }

    #[test]
    fn crlf_file_keeps_its_line_endings_through_edits() {
        let mut group = Group::parse("# owners\r\nlib/ @a\r\n@stray\r\n");
        group.replace_pattern(2, "src/").expect("replace");
        group.refresh();
        group.replace_line(3, "docs/ @b").expect("edit");
        group
            .append_rule("app/x.rb", OwnerSet::from_tokens("@c"))
            .expect("append");
        group.refresh();
        assert_eq!(
            group.to_content(),
            "# owners\r\nsrc/ @a\r\ndocs/ @b\r\napp/x.rb @c\r\n"
        );
        assert_eq!(group.rules().count(), 3);
        assert_eq!(group.unrecognized().count(), 0);
    }

    #[test]
    fn appended_literal_path_with_space_stays_a_rule() {
        let mut group = Group::parse("lib/ @a\n");
        group
            .append_rule(
                &Pattern::escape("docs/my guide.md"),
                OwnerSet::from_tokens("@a"),
            )
            .expect("append");
        group.refresh();
        assert_eq!(group.to_content(), "lib/ @a\ndocs/my\\ guide.md @a\n");
        assert_eq!(group.unrecognized().count(), 0);
        assert!(group.defined_owner("docs/my guide.md"));
    }

    #[test]
    fn append_rejects_missing_owners() {
        let mut group = Group::parse("");
        assert_eq!(
            group.append_rule("lib/x", OwnerSet::new()),
            Err(ModelError::NoOwners("lib/x".to_string()))
        );
    }

    #[test]
    fn out_of_range_lines_are_reported() {
        let mut group = Group::parse("a/ @x\n");
        assert_eq!(group.delete_line(0), Err(ModelError::LineNotFound(0)));
        assert_eq!(group.delete_line(2), Err(ModelError::LineNotFound(2)));
        assert_eq!(group.replace_owner(1, "@y", "@z"), Ok(false));
    }

    #[test]
    fn patterns_grouped_by_owner() {
        let group = Group::parse("/lib/ @a @b\ndocs/* @b\n");
        let by_owner = group.patterns_by_owner();
        assert_eq!(by_owner["@a"], vec!["lib/".to_string()]);
        assert_eq!(
            by_owner["@b"],
            vec!["lib/".to_string(), "docs/*".to_string()]
        );
    }
}
