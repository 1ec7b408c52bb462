use crate::core_fs::FileAdapter;
use crate::core_permissions::dir_property::{Action, DirProperty, RegexpActionResult, Target};
use crate::core_permissions::user_home::UserHome;
use log::debug;
use std::sync::Arc;

/// Decides which file system operations a user may perform.
///
/// Operations depend on each other, a stronger one requires every weaker one:
///
/// ```text
/// ACCESS
///   CREATE
///     APPEND     (files only)
///       OVERWRITE  (files only)
///         RENAME   (after CREATE for directories, after OVERWRITE for files)
///           DELETE
/// ```
///
/// LIST stands alone. Anything not configured is allowed.
pub struct PermissionsManager {
    file_adapter: Arc<dyn FileAdapter>,
}

impl PermissionsManager {
    pub fn new(file_adapter: Arc<dyn FileAdapter>) -> Self {
        Self { file_adapter }
    }

    fn is_valid_path(&self, path: &str) -> bool {
        !path.is_empty() && !path.ends_with(self.file_adapter.separator())
    }

    /// Finds the properties of the deepest configured directory containing `path`.
    ///
    /// The parent of `path` is matched because the parent's properties carry the rules for
    /// its entries. Properties without `spread` only count for their direct children.
    /// Several properties may share the winning directory, they are all returned in
    /// configuration order.
    pub fn find_closest_properties<'a>(
        &self,
        path: &str,
        home: &'a UserHome,
    ) -> Option<Vec<&'a DirProperty>> {
        if !self.is_valid_path(path) {
            debug!("Cannot find properties for path [{}]", path);
            return None;
        }

        let parent = self.file_adapter.parent_path(path);
        let mut properties: Vec<&DirProperty> = Vec::new();
        let mut length = 0;

        for dp in home.all_properties() {
            let directory = dp.directory();
            if !parent.starts_with(directory) {
                continue;
            }
            if !dp.spread() && parent != directory {
                continue;
            }
            if directory.len() < length {
                continue;
            }
            if directory.len() > length {
                properties.clear();
                length = directory.len();
            }
            properties.push(dp);
        }

        if properties.is_empty() {
            debug!("Path [{}] not configured, no properties", path);
            return None;
        }

        debug!(
            "Path [{}], {} closest configured [{}]",
            path,
            properties.len(),
            properties[0].directory()
        );
        Some(properties)
    }

    /// The operation that must also be allowed before `action` is.
    fn prerequisite(action: Action, target: Target) -> Option<Action> {
        match (action, target) {
            (Action::Access, _) | (Action::List, _) => None,
            (Action::Create, _) => Some(Action::Access),
            (Action::Append, _) => Some(Action::Create),
            (Action::Overwrite, _) => Some(Action::Append),
            (Action::Rename, Target::File) => Some(Action::Overwrite),
            (Action::Rename, Target::Folder) => Some(Action::Create),
            (Action::Delete, _) => Some(Action::Rename),
        }
    }

    /// Runs one check: the path's own rule cascade, then the prerequisite chain.
    pub fn check(&self, action: Action, target: Target, path: &str, home: &UserHome) -> bool {
        if !self.is_valid_path(path) || !action.applies_to(target) {
            debug!("Can {} {} [{}]? cannot", action.as_str(), target.as_str(), path);
            return false;
        }

        if let Some(properties) = self.find_closest_properties(path, home) {
            for dp in properties {
                match dp.evaluate(action, target, path, self.file_adapter.as_ref()) {
                    RegexpActionResult::AllowMatch => break,
                    RegexpActionResult::ForbidMatch => {
                        debug!("Can {} {} [{}]? no", action.as_str(), target.as_str(), path);
                        return false;
                    }
                    RegexpActionResult::NoMatch => {}
                }
            }
        }

        if let Some(required) = Self::prerequisite(action, target) {
            if !self.check(required, target, path, home) {
                return false;
            }
        }

        debug!("Can {} {} [{}]? yes", action.as_str(), target.as_str(), path);
        true
    }

    pub fn can_access_directory(&self, dirname: &str, home: &UserHome) -> bool {
        self.check(Action::Access, Target::Folder, dirname, home)
    }

    pub fn can_access_file(&self, filename: &str, home: &UserHome) -> bool {
        self.check(Action::Access, Target::File, filename, home)
    }

    pub fn can_list_directory(&self, dirname: &str, home: &UserHome) -> bool {
        self.check(Action::List, Target::Folder, dirname, home)
    }

    pub fn can_list_file(&self, filename: &str, home: &UserHome) -> bool {
        self.check(Action::List, Target::File, filename, home)
    }

    pub fn can_create_directory(&self, dirname: &str, home: &UserHome) -> bool {
        self.check(Action::Create, Target::Folder, dirname, home)
    }

    pub fn can_create_file(&self, filename: &str, home: &UserHome) -> bool {
        self.check(Action::Create, Target::File, filename, home)
    }

    pub fn can_append_file(&self, filename: &str, home: &UserHome) -> bool {
        self.check(Action::Append, Target::File, filename, home)
    }

    pub fn can_overwrite_file(&self, filename: &str, home: &UserHome) -> bool {
        self.check(Action::Overwrite, Target::File, filename, home)
    }

    pub fn can_rename_directory(&self, dirname: &str, home: &UserHome) -> bool {
        self.check(Action::Rename, Target::Folder, dirname, home)
    }

    pub fn can_rename_file(&self, filename: &str, home: &UserHome) -> bool {
        self.check(Action::Rename, Target::File, filename, home)
    }

    pub fn can_delete_directory(&self, dirname: &str, home: &UserHome) -> bool {
        self.check(Action::Delete, Target::Folder, dirname, home)
    }

    pub fn can_delete_file(&self, filename: &str, home: &UserHome) -> bool {
        self.check(Action::Delete, Target::File, filename, home)
    }
}
