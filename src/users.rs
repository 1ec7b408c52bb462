use crate::config::{Config, ConfigError};
use crate::core_fs::FileAdapter;
use crate::core_permissions::{Action, DirProperty, RegexRule, Target, UserHome, VirtualFolder};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileSystemConfig {
    pub users_path: String,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    #[serde(default)]
    pub default: bool,
    /// bcrypt hash; without one any password is accepted
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub home: HomeConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HomeConfig {
    #[serde(default)]
    pub properties: Vec<PropertiesConfig>,
    #[serde(default)]
    pub virtual_folders: Vec<FolderConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FolderConfig {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub properties: Vec<PropertiesConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PropertiesConfig {
    /// Relative to the home or folder path, empty for the path itself
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub spread: Option<bool>,
    #[serde(default)]
    pub access: Vec<RuleConfig>,
    #[serde(default)]
    pub list: Vec<RuleConfig>,
    #[serde(default)]
    pub create: Vec<RuleConfig>,
    #[serde(default)]
    pub rename: Vec<RuleConfig>,
    #[serde(default)]
    pub delete: Vec<RuleConfig>,
    #[serde(default)]
    pub append: Vec<RuleConfig>,
    #[serde(default)]
    pub overwrite: Vec<RuleConfig>,
}

impl PropertiesConfig {
    fn rules(&self, action: Action) -> &[RuleConfig] {
        match action {
            Action::Access => &self.access,
            Action::List => &self.list,
            Action::Create => &self.create,
            Action::Rename => &self.rename,
            Action::Delete => &self.delete,
            Action::Append => &self.append,
            Action::Overwrite => &self.overwrite,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub file_regexp: Option<String>,
    #[serde(default)]
    pub folder_regexp: Option<String>,
    pub allow: bool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub is_default: bool,
    pub password_hash: Option<String>,
    pub home: UserHome,
}

/// All configured users, built once at startup and read only afterwards.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: HashMap<String, User>,
    default_user: Option<String>,
}

impl UserRegistry {
    /// Builds every user from the configuration. Nothing is returned unless the whole
    /// configuration is valid.
    pub fn load(config: &Config, adapter: &dyn FileAdapter) -> Result<Self, ConfigError> {
        let users_path = config.substitute(&config.file_system.users_path);
        if users_path.is_empty() || !users_path.starts_with(adapter.separator()) {
            return Err(ConfigError::invalid(
                "file-system/users-path",
                "must be an absolute path",
            ));
        }

        let mut registry = UserRegistry::default();
        for user_config in &config.file_system.users {
            let user = build_user(config, adapter, &users_path, user_config)?;
            let node = format!("users/user[{}]", user.username);

            if user.is_default {
                if let Some(existing) = &registry.default_user {
                    return Err(ConfigError::invalid(
                        node,
                        format!("user {} is already the default user", existing),
                    ));
                }
                registry.default_user = Some(user.username.clone());
            }
            if registry.users.contains_key(&user.username) {
                return Err(ConfigError::invalid(node, "duplicate username"));
            }
            debug!(
                "User {} home {} ({} virtual folders)",
                user.username,
                user.home.path(),
                user.home.virtual_folders().len()
            );
            registry.users.insert(user.username.clone(), user);
        }

        info!("Loaded {} users", registry.users.len());
        Ok(registry)
    }

    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    /// Exact match first, then the default user.
    pub fn find(&self, username: &str) -> Option<&User> {
        self.users.get(username).or_else(|| {
            self.default_user
                .as_ref()
                .and_then(|name| self.users.get(name))
        })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, user: User) {
        if user.is_default {
            self.default_user = Some(user.username.clone());
        }
        self.users.insert(user.username.clone(), user);
    }
}

fn build_user(
    config: &Config,
    adapter: &dyn FileAdapter,
    users_path: &str,
    user_config: &UserConfig,
) -> Result<User, ConfigError> {
    let username = config.substitute(user_config.username.trim());
    if username.is_empty() {
        return Err(ConfigError::invalid("users/user/username", "missing value"));
    }
    let node = format!("users/user[{}]/home", username);

    let home_path = adapter.join(users_path, &username);
    let properties = build_properties(
        adapter,
        &node,
        &home_path,
        &user_config.home.properties,
    )?;

    let mut folders = Vec::new();
    for (index, folder_config) in user_config.home.virtual_folders.iter().enumerate() {
        let folder_node = format!("{}/virtual-folders/folder[{}]", node, index);
        let name = config.substitute(folder_config.name.trim());
        if name.is_empty() {
            return Err(ConfigError::invalid(format!("{}/name", folder_node), "missing value"));
        }
        let path = config.substitute(folder_config.path.trim());
        if path.is_empty() || !path.starts_with(adapter.separator()) {
            return Err(ConfigError::invalid(
                format!("{}/path", folder_node),
                "must be an absolute path",
            ));
        }
        let path = adapter.normalize_path(&path);
        let properties =
            build_properties(adapter, &folder_node, &path, &folder_config.properties)?;
        folders.push(VirtualFolder::new(name, path).with_properties(properties));
    }

    Ok(User {
        username,
        is_default: user_config.default,
        password_hash: user_config.password_hash.clone(),
        home: UserHome::new(home_path)
            .with_properties(properties)
            .with_virtual_folders(folders),
    })
}

fn build_properties(
    adapter: &dyn FileAdapter,
    parent_node: &str,
    base_path: &str,
    configs: &[PropertiesConfig],
) -> Result<Vec<DirProperty>, ConfigError> {
    let mut properties = Vec::with_capacity(configs.len());

    for (index, properties_config) in configs.iter().enumerate() {
        let node = format!("{}/properties[{}]", parent_node, index);
        let directory = if properties_config.dir.trim().is_empty() {
            base_path.to_string()
        } else {
            adapter.join(base_path, properties_config.dir.trim())
        };

        let mut property = DirProperty::new(directory);
        if let Some(spread) = properties_config.spread {
            property = property.with_spread(spread);
        }

        for action in Action::ALL {
            let rule_node = format!("{}/{}", node, action.as_str());
            for rule_config in properties_config.rules(action) {
                if let Some(pattern) = &rule_config.file_regexp {
                    let rule = compile_rule(&rule_node, pattern, rule_config.allow)?;
                    property.add_rule(action, Target::File, rule);
                }
                if let Some(pattern) = &rule_config.folder_regexp {
                    if !action.applies_to(Target::Folder) {
                        return Err(ConfigError::invalid(
                            rule_node,
                            "folder_regexp is not allowed here",
                        ));
                    }
                    let rule = compile_rule(&rule_node, pattern, rule_config.allow)?;
                    property.add_rule(action, Target::Folder, rule);
                }
            }
        }

        properties.push(property);
    }

    Ok(properties)
}

fn compile_rule(node: &str, pattern: &str, allow: bool) -> Result<RegexRule, ConfigError> {
    RegexRule::new(pattern, allow)
        .map_err(|e| ConfigError::invalid(node, format!("invalid regexp {}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_fs::NativeFileAdapter;

    const SAMPLE: &str = r#"
        [properties]
        FERRO_TEST_SHARED = "/srv/shared"

        [file_system]
        users_path = "/home"

        [[file_system.users]]
        username = "bob"

        [[file_system.users.home.properties]]
        access = [
            { file_regexp = "public.*", allow = true },
            { file_regexp = "secret.*", folder_regexp = "private", allow = false },
        ]

        [[file_system.users.home.properties]]
        dir = "uploads"
        spread = false
        overwrite = [{ file_regexp = ".*", allow = false }]

        [[file_system.users.home.virtual_folders]]
        name = "shared"
        path = "${FERRO_TEST_SHARED}"

        [[file_system.users.home.virtual_folders.properties]]
        delete = [{ file_regexp = ".*", allow = false }]

        [[file_system.users]]
        username = "anonymous"
        default = true
    "#;

    fn load(text: &str) -> Result<UserRegistry, ConfigError> {
        let config = Config::from_toml_str(text)?;
        UserRegistry::load(&config, &NativeFileAdapter)
    }

    #[test]
    fn test_load_users() {
        let registry = load(SAMPLE).unwrap();
        assert_eq!(registry.len(), 2);

        let bob = registry.get("bob").unwrap();
        assert_eq!(bob.home.path(), "/home/bob");
        assert_eq!(bob.home.properties().len(), 2);

        let root = &bob.home.properties()[0];
        assert_eq!(root.directory(), "/home/bob");
        let access = root.rules(Action::Access, Target::File);
        assert_eq!(access.len(), 2);
        assert_eq!(access[0].source(), "public.*");
        assert_eq!(access[1].source(), "secret.*");
        assert_eq!(root.rules(Action::Access, Target::Folder).len(), 1);

        let uploads = &bob.home.properties()[1];
        assert_eq!(uploads.directory(), "/home/bob/uploads");
        assert!(!uploads.spread());

        let shared = bob.home.virtual_folder("shared").unwrap();
        assert_eq!(shared.path(), "/srv/shared");
        assert_eq!(shared.properties()[0].directory(), "/srv/shared");
    }

    #[test]
    fn test_unknown_users_fall_back_to_default() {
        let registry = load(SAMPLE).unwrap();
        assert_eq!(registry.find("bob").unwrap().username, "bob");
        assert_eq!(registry.find("guest").unwrap().username, "anonymous");
        assert!(registry.get("guest").is_none());
    }

    #[test]
    fn test_folder_regexp_on_append_fails_the_load() {
        let text = r#"
            [file_system]
            users_path = "/home"
            [[file_system.users]]
            username = "bob"
            [[file_system.users.home.properties]]
            append = [{ folder_regexp = ".*", allow = false }]
        "#;
        match load(text) {
            Err(ConfigError::InvalidNode { node, .. }) => {
                assert_eq!(node, "users/user[bob]/home/properties[0]/append")
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_invalid_regexp_fails_the_load() {
        let text = r#"
            [file_system]
            users_path = "/home"
            [[file_system.users]]
            username = "bob"
            [[file_system.users.home.properties]]
            list = [{ file_regexp = "([unclosed", allow = true }]
        "#;
        assert!(matches!(load(text), Err(ConfigError::InvalidNode { .. })));
    }

    #[test]
    fn test_two_default_users_fail_the_load() {
        let text = r#"
            [file_system]
            users_path = "/home"
            [[file_system.users]]
            username = "a"
            default = true
            [[file_system.users]]
            username = "b"
            default = true
        "#;
        assert!(load(text).is_err());
    }

    #[test]
    fn test_relative_users_path_fails_the_load() {
        let text = r#"
            [file_system]
            users_path = "home"
        "#;
        assert!(load(text).is_err());
    }
}
