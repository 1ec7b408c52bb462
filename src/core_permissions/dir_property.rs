// Directory properties: regex rules anchored at one configured directory

use crate::core_fs::FileAdapter;
use regex::Regex;
use std::collections::HashMap;

/// Operation a rule list governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Access,
    List,
    Create,
    Rename,
    Delete,
    /// Files only
    Append,
    /// Files only
    Overwrite,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Access,
        Action::List,
        Action::Create,
        Action::Rename,
        Action::Delete,
        Action::Append,
        Action::Overwrite,
    ];

    /// Append and overwrite exist for files only.
    pub fn applies_to(self, target: Target) -> bool {
        !(target == Target::Folder && matches!(self, Action::Append | Action::Overwrite))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Access => "access",
            Action::List => "list",
            Action::Create => "create",
            Action::Rename => "rename",
            Action::Delete => "delete",
            Action::Append => "append",
            Action::Overwrite => "overwrite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    File,
    Folder,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::File => "file",
            Target::Folder => "directory",
        }
    }
}

/// Outcome of testing a name against one rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexpActionResult {
    AllowMatch,
    ForbidMatch,
    NoMatch,
}

/// One `(pattern, allow|forbid)` entry. The pattern must match the whole name.
#[derive(Debug, Clone)]
pub struct RegexRule {
    source: String,
    pattern: Regex,
    allow: bool,
}

impl RegexRule {
    pub fn new(source: &str, allow: bool) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            pattern,
            allow,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn allow(&self) -> bool {
        self.allow
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}

/// Rules configured for one directory. Read only once loaded.
#[derive(Debug, Clone)]
pub struct DirProperty {
    directory: String,
    spread: bool,
    file_rules: HashMap<Action, Vec<RegexRule>>,
    folder_rules: HashMap<Action, Vec<RegexRule>>,
}

impl DirProperty {
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            spread: true,
            file_rules: HashMap::new(),
            folder_rules: HashMap::new(),
        }
    }

    pub fn with_spread(mut self, spread: bool) -> Self {
        self.spread = spread;
        self
    }

    /// Appends a rule keeping declaration order. Returns false (and keeps nothing) when the
    /// action does not exist for the target.
    pub fn add_rule(&mut self, action: Action, target: Target, rule: RegexRule) -> bool {
        if !action.applies_to(target) {
            return false;
        }
        let rules = match target {
            Target::File => &mut self.file_rules,
            Target::Folder => &mut self.folder_rules,
        };
        rules.entry(action).or_default().push(rule);
        true
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// When false the rules cover the directory's direct children only.
    pub fn spread(&self) -> bool {
        self.spread
    }

    pub fn rules(&self, action: Action, target: Target) -> &[RegexRule] {
        let rules = match target {
            Target::File => &self.file_rules,
            Target::Folder => &self.folder_rules,
        };
        rules.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tests the last component of `path`, lower-cased, against the rule list.
    /// The first matching rule decides.
    pub fn evaluate(
        &self,
        action: Action,
        target: Target,
        path: &str,
        adapter: &dyn FileAdapter,
    ) -> RegexpActionResult {
        let name = adapter.file_name(path).to_lowercase();
        match self
            .rules(action, target)
            .iter()
            .find(|rule| rule.is_match(&name))
        {
            Some(rule) if rule.allow() => RegexpActionResult::AllowMatch,
            Some(_) => RegexpActionResult::ForbidMatch,
            None => RegexpActionResult::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_fs::NativeFileAdapter;

    #[test]
    fn test_first_match_wins() {
        let mut dp = DirProperty::new("/home/bob");
        dp.add_rule(Action::Access, Target::File, RegexRule::new("plan.*", true).unwrap());
        dp.add_rule(Action::Access, Target::File, RegexRule::new(".*", false).unwrap());

        let fs = NativeFileAdapter;
        assert_eq!(
            dp.evaluate(Action::Access, Target::File, "/home/bob/plan.txt", &fs),
            RegexpActionResult::AllowMatch
        );
        assert_eq!(
            dp.evaluate(Action::Access, Target::File, "/home/bob/other.txt", &fs),
            RegexpActionResult::ForbidMatch
        );
        assert_eq!(
            dp.evaluate(Action::Access, Target::Folder, "/home/bob/other", &fs),
            RegexpActionResult::NoMatch
        );
    }

    #[test]
    fn test_names_are_lower_cased_and_fully_matched() {
        let mut dp = DirProperty::new("/home/bob");
        dp.add_rule(Action::Delete, Target::File, RegexRule::new("secret", false).unwrap());

        let fs = NativeFileAdapter;
        assert_eq!(
            dp.evaluate(Action::Delete, Target::File, "/home/bob/SECRET", &fs),
            RegexpActionResult::ForbidMatch
        );
        assert_eq!(
            dp.evaluate(Action::Delete, Target::File, "/home/bob/secret.txt", &fs),
            RegexpActionResult::NoMatch
        );
    }

    #[test]
    fn test_folder_append_is_rejected() {
        let mut dp = DirProperty::new("/home/bob");
        let rule = RegexRule::new(".*", false).unwrap();
        assert!(!dp.add_rule(Action::Append, Target::Folder, rule.clone()));
        assert!(!dp.add_rule(Action::Overwrite, Target::Folder, rule.clone()));
        assert!(dp.add_rule(Action::Append, Target::File, rule));
        assert!(dp.rules(Action::Append, Target::Folder).is_empty());
    }
}
