//! Component archive reading and layout classification.
//!
//! An archive is read once into an ordered in-memory tree. Entries keep the
//! order in which they first appear in the zip central directory, and parent
//! directories that the zip only implies through file paths are created on
//! the fly.
//!
//! # Classification
//!
//! | Priority | Format | Rule |
//! |----------|--------|------|
//! | 1 | Octopart | `eec.dcm`, `eec.lib`, `eec.pretty/` at the root |
//! | 2 | SamacSys | first directory whose name contains `KiCad` |
//! | 3 | Ultra Librarian | `KiCAD/` directory at the root |
//! | 4 | SnapEDA | any `.lib` file |

use std::io::{Read, Seek};
use std::path::Path;

use super::{ImpartError, ImpartResult, VendorFormat};

/// A file or directory inside a component archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A file and its contents.
    File {
        /// Final path component.
        name: String,
        /// Uncompressed contents.
        data: Vec<u8>,
    },
    /// A directory and its children, in archive order.
    Dir {
        /// Final path component (empty for the archive root).
        name: String,
        /// Child entries.
        entries: Vec<Entry>,
    },
}

impl Entry {
    /// Returns the final path component of this entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Dir { name, .. } => name,
        }
    }

    /// Returns true if this entry is a directory.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self, Self::Dir { .. })
    }

    /// Returns true if this entry is a file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Returns the children of a directory (empty for files).
    #[must_use]
    pub fn entries(&self) -> &[Self] {
        match self {
            Self::Dir { entries, .. } => entries,
            Self::File { .. } => &[],
        }
    }

    /// Returns the contents of a file (`None` for directories).
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::File { data, .. } => Some(data),
            Self::Dir { .. } => None,
        }
    }

    /// Returns the direct child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.entries().iter().find(|e| e.name() == name)
    }

    /// Depth-first, pre-order search starting at (and including) this entry.
    ///
    /// Stops at the first match; siblings of a matching entry are never
    /// visited.
    pub fn find_first<P>(&self, predicate: P) -> Option<&Self>
    where
        P: Fn(&Self) -> bool,
    {
        find_first_in(self, &predicate)
    }
}

fn find_first_in<'a, P>(entry: &'a Entry, predicate: &P) -> Option<&'a Entry>
where
    P: Fn(&Entry) -> bool,
{
    if predicate(entry) {
        return Some(entry);
    }
    entry
        .entries()
        .iter()
        .find_map(|child| find_first_in(child, predicate))
}

fn is_file_with_suffix(suffix: &'static str) -> impl Fn(&Entry) -> bool {
    move |e| e.is_file() && e.name().ends_with(suffix)
}

fn is_dir_with_suffix(suffix: &'static str) -> impl Fn(&Entry) -> bool {
    move |e| e.is_dir() && e.name().ends_with(suffix)
}

/// A component archive read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    root: Entry,
}

impl Default for Archive {
    fn default() -> Self {
        Self {
            root: Entry::Dir {
                name: String::new(),
                entries: Vec::new(),
            },
        }
    }
}

impl Archive {
    /// Opens a zip archive from the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a zip archive.
    pub fn open(path: impl AsRef<Path>) -> ImpartResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ImpartError::file_read(path, e))?;
        Self::read(file).map_err(|e| match e {
            ImpartError::Archive { message, .. } => ImpartError::archive(path, message),
            other => other,
        })
    }

    /// Reads a zip archive from any reader implementing `Read + Seek`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a readable zip archive.
    pub fn read<R: Read + Seek>(reader: R) -> ImpartResult<Self> {
        let mut zip = zip::ZipArchive::new(reader)
            .map_err(|e| ImpartError::archive(UNNAMED, e.to_string()))?;

        let mut items = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let mut file = zip
                .by_index(index)
                .map_err(|e| ImpartError::archive(UNNAMED, e.to_string()))?;
            let name = file.name().to_string();

            if file.is_dir() {
                items.push(split_path(&name, None));
                continue;
            }

            let mut data = Vec::new();
            file.read_to_end(&mut data).map_err(|e| {
                ImpartError::archive(UNNAMED, format!("failed to read {name}: {e}"))
            })?;
            items.push(split_path(&name, Some(data)));
        }

        tracing::debug!(entries = items.len(), "Read component archive");
        Ok(Self {
            root: build_dir(String::new(), items),
        })
    }

    /// Builds an archive from `(path, contents)` pairs. A `None` content, or
    /// a path ending in `/`, denotes a directory.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<Vec<u8>>)>,
    {
        let items = entries
            .into_iter()
            .map(|(path, data)| split_path(path, data))
            .collect();

        Self {
            root: build_dir(String::new(), items),
        }
    }

    /// Returns the archive root directory.
    #[must_use]
    pub const fn root(&self) -> &Entry {
        &self.root
    }
}

/// Placeholder path for archives read from a stream.
const UNNAMED: &str = "<archive>";

type Item = (Vec<String>, Option<Vec<u8>>);

fn split_path(path: &str, data: Option<Vec<u8>>) -> Item {
    let parts = path
        .split('/')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    let data = if path.ends_with('/') { None } else { data };
    (parts, data)
}

/// Builds a directory from path-split items, grouping children by their first
/// path component in order of first appearance.
///
/// A name that has descendants, or is listed as a directory, becomes a
/// directory even if the archive also lists it as a file.
fn build_dir(name: String, items: Vec<Item>) -> Entry {
    let mut groups: Vec<(String, Vec<Item>)> = Vec::new();
    for (mut parts, data) in items {
        if parts.is_empty() {
            continue;
        }
        let head = parts.remove(0);
        match groups.iter_mut().find(|(n, _)| *n == head) {
            Some((_, members)) => members.push((parts, data)),
            None => groups.push((head, vec![(parts, data)])),
        }
    }

    let entries = groups
        .into_iter()
        .map(|(name, members)| {
            let is_dir = members
                .iter()
                .any(|(rest, data)| !rest.is_empty() || data.is_none());
            if is_dir {
                build_dir(name, members)
            } else {
                // Last write wins for duplicated paths
                let data = members
                    .into_iter()
                    .filter_map(|(_, data)| data)
                    .last()
                    .unwrap_or_default();
                Entry::File { name, data }
            }
        })
        .collect();

    Entry::Dir { name, entries }
}

/// The entries of an archive relevant to an import.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    /// Detected vendor convention.
    pub format: VendorFormat,
    /// Description database fragment, if the vendor ships one.
    pub description: Option<&'a Entry>,
    /// Symbol database fragment.
    pub symbol: &'a Entry,
    /// Directory whose direct children include the footprint files.
    pub footprints: &'a Entry,
}

/// Determines which vendor convention an archive follows.
///
/// # Errors
///
/// Returns [`ImpartError::Format`] if the layout is unknown or a
/// vendor-specific file is missing.
pub fn classify(archive: &Archive) -> ImpartResult<Layout<'_>> {
    let root = archive.root();

    if let (Some(description), Some(symbol), Some(footprints)) = (
        root.child("eec.dcm").filter(|e| e.is_file()),
        root.child("eec.lib").filter(|e| e.is_file()),
        root.child("eec.pretty").filter(|e| e.is_dir()),
    ) {
        return Ok(Layout {
            format: VendorFormat::Octopart,
            description: Some(description),
            symbol,
            footprints,
        });
    }

    if let Some(dir) = root.find_first(|e| e.is_dir() && e.name().contains("KiCad")) {
        let description = dir.find_first(is_file_with_suffix(".dcm"));
        let symbol = dir.find_first(is_file_with_suffix(".lib"));
        return match (description, symbol) {
            (Some(description), Some(symbol)) => Ok(Layout {
                format: VendorFormat::SamacSys,
                description: Some(description),
                symbol,
                footprints: dir,
            }),
            _ => Err(not_in_layout(VendorFormat::SamacSys)),
        };
    }

    if let Some(dir) = root.child("KiCAD").filter(|e| e.is_dir()) {
        let description = dir.find_first(is_file_with_suffix(".dcm"));
        let symbol = dir.find_first(is_file_with_suffix(".lib"));
        let footprints = dir.find_first(is_dir_with_suffix(".pretty"));
        return match (symbol, footprints) {
            (Some(symbol), Some(footprints)) => Ok(Layout {
                format: VendorFormat::UltraLibrarian,
                description,
                symbol,
                footprints,
            }),
            _ => Err(not_in_layout(VendorFormat::UltraLibrarian)),
        };
    }

    if let Some(symbol) = root.find_first(is_file_with_suffix(".lib")) {
        return Ok(Layout {
            format: VendorFormat::SnapEda,
            description: root.find_first(is_file_with_suffix(".dcm")),
            symbol,
            footprints: root,
        });
    }

    Err(ImpartError::format("unknown archive layout"))
}

fn not_in_layout(format: VendorFormat) -> ImpartError {
    ImpartError::format(format!("not in {format} layout"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> (&str, Option<Vec<u8>>) {
        (path, Some(Vec::new()))
    }

    fn dir(path: &str) -> (&str, Option<Vec<u8>>) {
        (path, None)
    }

    #[test]
    fn implied_directories_are_created() {
        let archive = Archive::from_entries([file("a/b/c.lib")]);
        let a = archive.root().child("a").unwrap();
        assert!(a.is_dir());
        let b = a.child("b").unwrap();
        assert!(b.is_dir());
        assert!(b.child("c.lib").unwrap().is_file());
    }

    #[test]
    fn entry_order_is_preserved() {
        let archive = Archive::from_entries([file("z.lib"), file("a.lib"), file("m.lib")]);
        let names: Vec<&str> = archive.root().entries().iter().map(Entry::name).collect();
        assert_eq!(names, ["z.lib", "a.lib", "m.lib"]);
    }

    #[test]
    fn find_first_is_pre_order() {
        let archive = Archive::from_entries([
            file("outer/inner/deep.lib"),
            file("outer/shallow.lib"),
            file("top.lib"),
        ]);
        let found = archive
            .root()
            .find_first(is_file_with_suffix(".lib"))
            .unwrap();
        assert_eq!(found.name(), "deep.lib");
    }

    #[test]
    fn octopart_wins_over_other_content() {
        let archive = Archive::from_entries([
            file("KiCAD/other.lib"),
            dir("Foo_KiCad/"),
            file("eec.dcm"),
            file("eec.lib"),
            file("eec.pretty/SOIC8.kicad_mod"),
        ]);
        let layout = classify(&archive).unwrap();
        assert_eq!(layout.format, VendorFormat::Octopart);
        assert_eq!(layout.symbol.name(), "eec.lib");
        assert_eq!(layout.description.unwrap().name(), "eec.dcm");
        assert_eq!(layout.footprints.name(), "eec.pretty");
    }

    #[test]
    fn samacsys_layout() {
        let archive = Archive::from_entries([
            file("LM358/3D/LM358.stp"),
            file("LM358/KiCad/LM358.dcm"),
            file("LM358/KiCad/LM358.lib"),
            file("LM358/KiCad/SOIC127P600X175-8N.kicad_mod"),
        ]);
        let layout = classify(&archive).unwrap();
        assert_eq!(layout.format, VendorFormat::SamacSys);
        assert_eq!(layout.footprints.name(), "KiCad");
        assert_eq!(layout.symbol.name(), "LM358.lib");
    }

    #[test]
    fn samacsys_without_description_fails() {
        let archive = Archive::from_entries([file("LM358/KiCad/LM358.lib")]);
        let err = classify(&archive).unwrap_err();
        assert!(matches!(err, ImpartError::Format { .. }));
        assert!(err.to_string().contains("samacsys"));
    }

    #[test]
    fn ultralibrarian_without_description() {
        let archive = Archive::from_entries([
            file("KiCAD/part.lib"),
            file("KiCAD/part.pretty/SOT23.kicad_mod"),
        ]);
        let layout = classify(&archive).unwrap();
        assert_eq!(layout.format, VendorFormat::UltraLibrarian);
        assert!(layout.description.is_none());
        assert_eq!(layout.footprints.name(), "part.pretty");
    }

    #[test]
    fn ultralibrarian_without_footprints_fails() {
        let archive = Archive::from_entries([file("KiCAD/part.lib")]);
        assert!(matches!(
            classify(&archive),
            Err(ImpartError::Format { .. })
        ));
    }

    #[test]
    fn snapeda_layout() {
        let archive = Archive::from_entries([
            file("NE555.lib"),
            file("NE555.dcm"),
            file("DIP8.kicad_mod"),
        ]);
        let layout = classify(&archive).unwrap();
        assert_eq!(layout.format, VendorFormat::SnapEda);
        assert_eq!(layout.description.unwrap().name(), "NE555.dcm");
        assert_eq!(layout.footprints.name(), "");
    }

    #[test]
    fn unknown_layout() {
        let archive = Archive::from_entries([file("readme.txt")]);
        let err = classify(&archive).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported archive: unknown archive layout");
    }
}
