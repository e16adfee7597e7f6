use std::collections::HashSet;

use crate::distance;
use crate::group::Group;
use crate::line::PatternRule;

/// The authoritative list of valid owners (one identifier per line).
#[derive(Clone, Debug, Default)]
pub struct OwnersList {
    owners: Vec<String>,
    index: HashSet<String>,
}

impl OwnersList {
    /// Blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Self {
        let mut list = Self::default();
        for line in content.lines() {
            let owner = line.trim();
            if owner.is_empty() || owner.starts_with('#') {
                continue;
            }
            list.insert(owner);
        }
        list
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.index.contains(owner)
    }

    /// Adds `owner`; returns false when it was already listed.
    pub fn insert(&mut self, owner: &str) -> bool {
        let owner = owner.trim();
        if owner.is_empty() || !self.index.insert(owner.to_string()) {
            return false;
        }
        self.owners.push(owner.to_string());
        true
    }

    /// Closest listed owner for an unknown identifier ("did you mean").
    pub fn suggest(&self, unknown: &str) -> Option<&str> {
        distance::closest(unknown, self.owners.iter().map(String::as_str))
    }

    /// One `(owner, rule)` pair per owner reference missing from the list,
    /// in file order.
    pub fn invalid_owners<'g>(&self, group: &'g Group) -> Vec<(String, &'g PatternRule)> {
        group
            .rules()
            .flat_map(|rule| {
                rule.owners()
                    .iter()
                    .filter(move |owner| !self.contains(owner))
                    .map(move |owner| (owner.to_string(), rule))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.owners.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn to_content(&self) -> String {
        let mut out = String::new();
        for owner in &self.owners {
            out.push_str(owner);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blanks_comments_and_duplicates() {
        let list = OwnersList::parse("# team\n@a\n\n  @b  \n@a\n");
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["@a", "@b"]);
        assert_eq!(list.to_content(), "@a\n@b\n");
    }

    #[test]
    fn reports_each_unknown_owner_per_rule() {
        let list = OwnersList::parse("@mpospelov\n");
        let group = Group::parse("lib/new_file.rb @mpospelov @foobar\nspec/ @foobar\n");
        let invalid: Vec<(String, usize)> = list
            .invalid_owners(&group)
            .into_iter()
            .map(|(owner, rule)| (owner, rule.line_number()))
            .collect();
        assert_eq!(
            invalid,
            vec![("@foobar".to_string(), 1), ("@foobar".to_string(), 2)]
        );
    }

    #[test]
    fn suggests_close_owner() {
        let list = OwnersList::parse("@mpospelov\n@foobaz\n");
        assert_eq!(list.suggest("@foobar"), Some("@foobaz"));
        assert_eq!(list.suggest("@completely-else"), None);
    }

    #[test]
    fn suggests_owner_differing_only_in_case() {
        let list = OwnersList::parse("@mpospelov\n");
        assert!(!list.contains("@MPospelov"));
        assert_eq!(list.suggest("@MPospelov"), Some("@mpospelov"));
        assert_eq!(list.suggest("@mpospelov"), None);
    }

    #[test]
    fn insert_appends_once() {
        let mut list = OwnersList::parse("@a\n");
        assert!(list.insert("@b"));
        assert!(!list.insert("@b"));
        assert!(!list.insert("  "));
        assert_eq!(list.len(), 2);
        assert_eq!(list.to_content(), "@a\n@b\n");
    }
}
