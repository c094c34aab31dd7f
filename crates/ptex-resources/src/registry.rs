use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::{Bundle, ResourceError};

type FileTable = BTreeMap<&'static str, &'static str>;

static REGISTRY: OnceLock<RwLock<HashMap<&'static str, Arc<FileTable>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<&'static str, Arc<FileTable>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns `true` if a group with this name has been registered.
pub fn has_group(group: &str) -> bool {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(group)
}

/// Registers `bundle` unless its group already exists.
///
/// Returns `Ok(true)` when this call performed the registration and
/// `Ok(false)` when the group was already present. The presence check and the
/// insert happen under the same write lock, so concurrent callers register a
/// group at most once.
pub fn ensure_registered(bundle: &'static Bundle) -> Result<bool, ResourceError> {
    if has_group(bundle.group()) {
        return Ok(false);
    }

    let table = bundle.validate()?;

    let mut groups = registry().write().unwrap_or_else(PoisonError::into_inner);
    if groups.contains_key(bundle.group()) {
        return Ok(false);
    }
    groups.insert(bundle.group(), Arc::new(table));
    Ok(true)
}

/// Read-only view of one registered group.
#[derive(Debug, Clone)]
pub struct Resource {
    group: &'static str,
    files: Arc<FileTable>,
}

impl Resource {
    /// Opens a registered group by name.
    pub fn open(group: &str) -> Result<Self, ResourceError> {
        let groups = registry().read().unwrap_or_else(PoisonError::into_inner);
        groups
            .get_key_value(group)
            .map(|(name, files)| Self { group: *name, files: Arc::clone(files) })
            .ok_or_else(|| ResourceError::MissingGroup { group: group.to_owned() })
    }

    #[inline]
    pub fn group(&self) -> &'static str {
        self.group
    }

    /// Returns the text of `name`.
    pub fn get(&self, name: &str) -> Result<&'static str, ResourceError> {
        self.files.get(name).copied().ok_or_else(|| ResourceError::MissingFile {
            group: self.group.to_owned(),
            name: name.to_owned(),
        })
    }

    /// File names in the group, sorted.
    pub fn list(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.files.keys().copied()
    }
}
