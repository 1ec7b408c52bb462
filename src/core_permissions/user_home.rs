use crate::core_permissions::dir_property::DirProperty;

/// A named folder mounted into the user's namespace from anywhere on disk.
#[derive(Debug, Clone)]
pub struct VirtualFolder {
    name: String,
    path: String,
    properties: Vec<DirProperty>,
}

impl VirtualFolder {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<DirProperty>) -> Self {
        self.properties = properties;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn properties(&self) -> &[DirProperty] {
        &self.properties
    }
}

/// Everything one user can reach: the home directory plus the virtual folders.
#[derive(Debug, Clone)]
pub struct UserHome {
    path: String,
    properties: Vec<DirProperty>,
    virtual_folders: Vec<VirtualFolder>,
}

impl UserHome {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: Vec::new(),
            virtual_folders: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<DirProperty>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_virtual_folders(mut self, folders: Vec<VirtualFolder>) -> Self {
        self.virtual_folders = folders;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn properties(&self) -> &[DirProperty] {
        &self.properties
    }

    pub fn virtual_folders(&self) -> &[VirtualFolder] {
        &self.virtual_folders
    }

    pub fn virtual_folder(&self, name: &str) -> Option<&VirtualFolder> {
        self.virtual_folders.iter().find(|f| f.name == name)
    }

    /// Home properties first, then every virtual folder's, in configuration order.
    pub fn all_properties(&self) -> impl Iterator<Item = &DirProperty> {
        self.properties
            .iter()
            .chain(self.virtual_folders.iter().flat_map(|f| f.properties.iter()))
    }
}
