use std::collections::BTreeMap;

use crate::ResourceError;

/// A single named blob inside a [`Bundle`].
#[derive(Debug, Copy, Clone)]
pub struct BundleFile {
    pub name: &'static str,
    pub data: &'static [u8],
}

impl BundleFile {
    #[inline]
    pub const fn new(name: &'static str, data: &'static [u8]) -> Self {
        Self { name, data }
    }
}

/// A packaged set of text files registered under one logical group name.
///
/// Bundles are usually `static` items built from `include_bytes!`, so the
/// registry can hand out `&'static str` views without copying.
#[derive(Debug, Copy, Clone)]
pub struct Bundle {
    group: &'static str,
    files: &'static [BundleFile],
}

impl Bundle {
    #[inline]
    pub const fn new(group: &'static str, files: &'static [BundleFile]) -> Self {
        Self { group, files }
    }

    #[inline]
    pub fn group(&self) -> &'static str {
        self.group
    }

    #[inline]
    pub fn files(&self) -> &'static [BundleFile] {
        self.files
    }

    /// Checks the whole bundle and returns its decoded file table.
    ///
    /// Nothing is registered unless every file passes, so a corrupt bundle
    /// never leaves a half-populated group behind.
    pub(crate) fn validate(&self) -> Result<BTreeMap<&'static str, &'static str>, ResourceError> {
        if self.group.trim().is_empty() {
            return Err(ResourceError::corrupt(self.group, "empty group name"));
        }
        if self.files.is_empty() {
            return Err(ResourceError::corrupt(self.group, "bundle contains no files"));
        }

        let mut table = BTreeMap::new();
        for file in self.files {
            if file.name.is_empty() {
                return Err(ResourceError::corrupt(self.group, "file with empty name"));
            }
            let text = std::str::from_utf8(file.data).map_err(|e| {
                ResourceError::corrupt(self.group, format!("`{}` is not valid UTF-8: {e}", file.name))
            })?;
            if table.insert(file.name, text).is_some() {
                return Err(ResourceError::corrupt(
                    self.group,
                    format!("duplicate file `{}`", file.name),
                ));
            }
        }
        Ok(table)
    }
}
