//! Vendor archive conventions.

use std::fmt;

/// The packaging convention of a component archive.
///
/// Each distributor ships its KiCad exports in a different layout, and each
/// convention is imported into a library of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorFormat {
    /// Octopart / EE Concierge: `eec.dcm`, `eec.lib` and `eec.pretty/` at the root.
    Octopart,
    /// SamacSys (Component Search Engine): everything inside a `*KiCad*` directory.
    SamacSys,
    /// Ultra Librarian: a `KiCAD/` directory with a `.pretty/` subdirectory.
    UltraLibrarian,
    /// SnapEDA: loose `.lib`/`.dcm` files, footprints at the root.
    SnapEda,
}

impl VendorFormat {
    /// All formats, in classification priority order.
    pub const ALL: [Self; 4] = [
        Self::Octopart,
        Self::SamacSys,
        Self::UltraLibrarian,
        Self::SnapEda,
    ];

    /// Name of the library this vendor's parts are merged into.
    #[must_use]
    pub const fn library_name(self) -> &'static str {
        match self {
            Self::Octopart => "octopart",
            Self::SamacSys => "samacsys",
            Self::UltraLibrarian => "ultralibrarian",
            Self::SnapEda => "snapeda",
        }
    }

    /// Looks up a format by its library name.
    #[must_use]
    pub fn from_library_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.library_name() == name)
    }
}

impl fmt::Display for VendorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.library_name())
    }
}
