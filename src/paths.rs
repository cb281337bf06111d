//! Where each item's file lives.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::field::Value;
use crate::item::Item;

/// How item file names are prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Prefix {
    /// The file name of the boot image, eg. `boot.img-kernel`.
    #[default]
    ImageName,
    /// A caller chosen prefix, eg. `custom-kernel`.
    Custom(String),
    /// No prefix at all, eg. `kernel`.
    Bare,
}

impl Prefix {
    /// `no_prefix` wins over an explicit prefix.
    pub fn from_options(prefix: Option<String>, no_prefix: bool) -> Prefix {
        match (prefix, no_prefix) {
            (_, true) => Prefix::Bare,
            (Some(prefix), false) => Prefix::Custom(prefix),
            (None, false) => Prefix::ImageName,
        }
    }

    /// The string put in front of item names, separator included.
    pub fn resolve(&self, image_path: &Path) -> String {
        match self {
            Prefix::ImageName => {
                let name = image_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}-", name)
            }
            Prefix::Custom(prefix) => format!("{}-", prefix),
            Prefix::Bare => String::new(),
        }
    }
}

/// Per-item choices that take precedence over the computed file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub paths: BTreeMap<Item, PathBuf>,
    /// Only scalar items can be given by value.
    pub values: BTreeMap<Item, Value>,
}

impl Overrides {
    pub fn with_path(mut self, item: Item, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(item, path.into());
        self
    }

    pub fn with_value(mut self, item: Item, value: Value) -> Self {
        self.values.insert(item, value);
        self
    }
}

/// Where an item comes from or goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Value(Value),
}

/// The source of every item taking part in one unpack or pack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPaths {
    sources: BTreeMap<Item, Source>,
}

impl ResolvedPaths {
    pub fn get(&self, item: Item) -> Option<&Source> {
        self.sources.get(&item)
    }

    pub fn path(&self, item: Item) -> Option<&Path> {
        match self.sources.get(&item) {
            Some(Source::Path(path)) => Some(path.as_path()),
            _ => None,
        }
    }

    /// Iterates in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Item, &Source)> {
        self.sources.iter().map(|(item, source)| (*item, source))
    }
}

/// `directory/prefix + name`.
pub fn default_path(directory: &Path, prefix: &str, item: Item) -> PathBuf {
    directory.join(format!("{}{}", prefix, item.name()))
}

/// Decides the source of each of `items`: an inline value, else a path
/// override, else the default path in `directory`.
pub fn resolve(
    directory: &Path,
    prefix: &str,
    items: impl IntoIterator<Item = Item>,
    overrides: &Overrides,
) -> ResolvedPaths {
    let sources = items
        .into_iter()
        .map(|item| {
            let source = if let Some(value) = overrides.values.get(&item) {
                Source::Value(value.clone())
            } else if let Some(path) = overrides.paths.get(&item) {
                Source::Path(path.clone())
            } else {
                Source::Path(default_path(directory, prefix, item))
            };
            (item, source)
        })
        .collect();
    ResolvedPaths { sources }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_defaults_to_image_name() {
        let prefix = Prefix::from_options(None, false);
        assert_eq!(prefix.resolve(Path::new("/tmp/images/boot.img")), "boot.img-");
    }

    #[test]
    fn no_prefix_wins() {
        let prefix = Prefix::from_options(Some("custom".into()), true);
        assert_eq!(prefix, Prefix::Bare);
        assert_eq!(prefix.resolve(Path::new("boot.img")), "");
        assert_eq!(
            Prefix::from_options(Some("custom".into()), false).resolve(Path::new("boot.img")),
            "custom-"
        );
    }

    #[test]
    fn default_paths() {
        let resolved = resolve(
            Path::new("out"),
            "boot.img-",
            [Item::Kernel, Item::Base],
            &Overrides::default(),
        );
        assert_eq!(resolved.path(Item::Kernel), Some(Path::new("out/boot.img-kernel")));
        assert_eq!(resolved.path(Item::Base), Some(Path::new("out/boot.img-base")));
        assert_eq!(resolved.get(Item::Ramdisk), None);

        let bare = resolve(Path::new("out"), "", [Item::Dt], &Overrides::default());
        assert_eq!(bare.path(Item::Dt), Some(Path::new("out/dt")));
    }

    #[test]
    fn values_beat_paths_beat_defaults() {
        let overrides = Overrides::default()
            .with_path(Item::Kernel, "/tmp/zImage")
            .with_path(Item::PageSize, "/tmp/page_size")
            .with_value(Item::PageSize, Value::Integer(4096));
        let resolved = resolve(
            Path::new("."),
            "",
            [Item::Kernel, Item::PageSize, Item::Ramdisk],
            &overrides,
        );

        assert_eq!(resolved.path(Item::Kernel), Some(Path::new("/tmp/zImage")));
        assert_eq!(resolved.get(Item::PageSize), Some(&Source::Value(Value::Integer(4096))));
        assert_eq!(resolved.path(Item::PageSize), None);
        assert_eq!(resolved.path(Item::Ramdisk), Some(Path::new("./ramdisk")));

        let order: Vec<_> = resolved.iter().map(|(item, _)| item).collect();
        assert_eq!(order, [Item::PageSize, Item::Kernel, Item::Ramdisk]);
    }
}
