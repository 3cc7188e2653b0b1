//! End-to-end import tests.
//!
//! Each test writes a vendor archive into a download directory, initialises
//! the vendor library, and runs [`Importer::import`] with scripted replies.

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use kicad_impart::cancel::CancelToken;
use kicad_impart::console::{Console, LinePrompter, Prompter};
use kicad_impart::impart::{list_archives, ImportOutcome, Importer};
use kicad_impart::kicad::{ImpartError, Library, MergeStatus, RecordKind, VendorFormat};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Creates a temporary directory inside `.tmp/` for test isolation.
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
///
/// Converts to an absolute path to avoid issues with parallel test execution.
fn test_temp_dir() -> TempDir {
    let tmp_root = Path::new(".tmp");
    fs::create_dir_all(tmp_root).expect("Failed to create .tmp directory");
    let tmp_root = tmp_root
        .canonicalize()
        .expect("Failed to canonicalize .tmp path");
    tempfile::tempdir_in(&tmp_root).expect("Failed to create temp dir")
}

const SAMACSYS_DCM: &str = "EESchema-DOCLIB  Version 2.0\n\
#\n\
$CMP LM358DR\n\
D Dual Operational Amplifier\n\
K opamp\n\
F https://www.ti.com/lit/ds/symlink/lm358.pdf\n\
$ENDCMP\n\
#\n\
#End Doc Library\n";

const SAMACSYS_LIB: &str = "EESchema-LIBRARY Version 2.3\n\
#encoding utf-8\n\
#SamacSys ECAD Model LM358DR\n\
DEF LM358DR IC 0 30 Y Y 1 F N\n\
F0 \"IC\" 950 300 50 H V L CNN\n\
F1 \"LM358DR\" 950 200 50 H V L CNN\n\
F2 \"SOIC127P600X175-8N\" 950 100 50 H I L CNN\n\
DRAW\n\
S 200 100 900 -500 0 1 6 f\n\
ENDDRAW\n\
ENDDEF\n\
#\n\
#End Library\n";

const ULTRALIBRARIAN_LIB: &str = "EESchema-LIBRARY Version 2.3\n\
#encoding utf-8\n\
#\n\
# LMV321IDBVR\n\
#\n\
DEF LMV321IDBVR U 0 40 Y Y 1 L N\n\
F0 \"U\" 0 0 0 H V C CNN\n\
F1 \"LMV321IDBVR\" 0 0 0 H V C CNN\n\
ENDDEF\n\
#\n\
#End Library\n";

/// A download directory and an initialised library side by side.
struct Workspace {
    _temp_dir: TempDir,
    downloads: PathBuf,
    library: Library,
}

impl Workspace {
    fn new(vendor: VendorFormat) -> Self {
        let temp_dir = test_temp_dir();
        let downloads = temp_dir.path().join("downloads");
        fs::create_dir(&downloads).unwrap();
        let library = Library::new(temp_dir.path().join("libs"));
        library.initialize(vendor).unwrap();
        Self {
            _temp_dir: temp_dir,
            downloads,
            library,
        }
    }

    fn write_archive(&self, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (path, contents) in entries {
            writer
                .start_file(*path, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        let path = self.downloads.join(name);
        fs::write(&path, writer.finish().unwrap().into_inner()).unwrap();
        path
    }

    fn samacsys_archive(&self) -> PathBuf {
        self.write_archive(
            "LM358DR.zip",
            &[
                ("LM358DR/KiCad/LM358DR.dcm", SAMACSYS_DCM),
                ("LM358DR/KiCad/LM358DR.lib", SAMACSYS_LIB),
                ("LM358DR/KiCad/SOIC127P600X175-8N.kicad_mod", "(module SOIC8)\n"),
                ("LM358DR/KiCad/LM358DR.mod", "PCBNEW-LibModule-V1\n"),
                ("LM358DR/3D/LM358DR.stp", "ISO-10303-21;\n"),
            ],
        )
    }

    fn read(&self, vendor: VendorFormat, kind: RecordKind) -> String {
        fs::read_to_string(self.library.database_path(vendor, kind)).unwrap()
    }

    fn import(&self, archive: &Path, replies: &str) -> Result<ImportOutcome, ImpartError> {
        let mut prompter = LinePrompter::new(Cursor::new(replies.as_bytes().to_vec()), Vec::new());
        let mut console = Console::new(&mut prompter, CancelToken::new());
        Importer::new(self.library.clone()).import(archive, &mut console)
    }
}

/// Replies from a fixed script, cancelling the token when asked `cancel_on`.
struct CancellingPrompter {
    replies: Vec<String>,
    cancel_on: &'static str,
    token: CancelToken,
}

impl Prompter for CancellingPrompter {
    fn prompt_with_default(&mut self, label: &str, default: &str) -> io::Result<String> {
        if label.contains(self.cancel_on) {
            self.token.cancel();
        }
        if self.replies.is_empty() {
            return Ok(default.to_string());
        }
        Ok(self.replies.remove(0))
    }

    fn prompt_from_candidates(&mut self, label: &str, _: &[String]) -> io::Result<String> {
        self.prompt_with_default(label, "")
    }
}

// =============================================================================
// Fresh imports
// =============================================================================

#[test]
fn samacsys_archive_is_imported() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    let archive = ws.samacsys_archive();

    // Device name, then keep the description and datasheet as shipped.
    let outcome = ws.import(&archive, "LM358\n\n\n").unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::Imported {
            device: "LM358".to_string(),
            vendor: VendorFormat::SamacSys,
            description: MergeStatus::Written,
            symbol: MergeStatus::Written,
            footprints: 2,
        }
    );

    let dcm = ws.read(VendorFormat::SamacSys, RecordKind::Description);
    assert_eq!(
        dcm,
        "EESchema-DOCLIB  Version 2.0\n\
         #\n\
         $CMP LM358\n\
         D Dual Operational Amplifier\n\
         K opamp\n\
         F https://www.ti.com/lit/ds/symlink/lm358.pdf\n\
         $ENDCMP\n\
         #End Doc Library\n"
    );

    let lib = ws.read(VendorFormat::SamacSys, RecordKind::Symbol);
    assert!(lib.contains("DEF LM358 IC 0 30 Y Y 1 F N\n"));
    assert!(lib.contains("F1 \"LM358\" 950 200 50 H V L CNN\n"));
    assert!(lib.ends_with("ENDDEF\n#End Library\n"));

    let pretty = ws.library.footprint_dir(VendorFormat::SamacSys);
    assert!(pretty.join("SOIC127P600X175-8N.kicad_mod").is_file());
    assert!(pretty.join("LM358DR.mod").is_file());
    assert!(!pretty.join("LM358DR.stp").exists());
}

#[test]
fn description_is_synthesised_when_missing() {
    let ws = Workspace::new(VendorFormat::UltraLibrarian);
    let archive = ws.write_archive(
        "LMV321IDBVR.zip",
        &[
            ("KiCAD/LMV321IDBVR.lib", ULTRALIBRARIAN_LIB),
            ("KiCAD/footprints.pretty/DBV5.kicad_mod", "(module DBV5)\n"),
        ],
    );

    let outcome = ws
        .import(&archive, "LMV321\nSingle op-amp\n\n")
        .unwrap();
    assert!(outcome.is_imported());

    let dcm = ws.read(VendorFormat::UltraLibrarian, RecordKind::Description);
    assert_eq!(
        dcm,
        "EESchema-DOCLIB  Version 2.0\n\
         #\n\
         # LMV321IDBVR\n\
         #\n\
         $CMP LMV321\n\
         D Single op-amp\n\
         F\n\
         $ENDCMP\n\
         #End Doc Library\n"
    );

    let lib = ws.read(VendorFormat::UltraLibrarian, RecordKind::Symbol);
    assert!(lib.contains("#\n# LMV321IDBVR\n#\nDEF LMV321 U"));
    assert!(lib.contains("F1 \"LMV321\""));
    assert!(ws
        .library
        .footprint_dir(VendorFormat::UltraLibrarian)
        .join("DBV5.kicad_mod")
        .is_file());
}

// =============================================================================
// Re-imports
// =============================================================================

#[test]
fn declined_reimport_changes_nothing() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    let archive = ws.samacsys_archive();
    ws.import(&archive, "LM358\n\n\n").unwrap();

    let dcm_before = ws.read(VendorFormat::SamacSys, RecordKind::Description);
    let lib_before = ws.read(VendorFormat::SamacSys, RecordKind::Symbol);
    let pretty = ws.library.footprint_dir(VendorFormat::SamacSys);
    fs::remove_file(pretty.join("LM358DR.mod")).unwrap();

    let outcome = ws.import(&archive, "LM358\n\n\nno\n").unwrap();

    assert!(matches!(outcome, ImportOutcome::AlreadyPresent { .. }));
    assert_eq!(outcome.to_string(), "OK: LM358 already in samacsys.dcm");
    assert_eq!(
        ws.read(VendorFormat::SamacSys, RecordKind::Description),
        dcm_before
    );
    assert_eq!(ws.read(VendorFormat::SamacSys, RecordKind::Symbol), lib_before);
    // Footprints are only copied once both merges are settled.
    assert!(!pretty.join("LM358DR.mod").exists());
}

#[test]
fn confirmed_reimport_replaces_both_records() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    let archive = ws.samacsys_archive();
    ws.import(&archive, "LM358\n\n\n").unwrap();

    let outcome = ws
        .import(&archive, "LM358\nLow-power dual op-amp\n\ny\ny\n")
        .unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::Imported {
            device: "LM358".to_string(),
            vendor: VendorFormat::SamacSys,
            description: MergeStatus::Replaced,
            symbol: MergeStatus::Replaced,
            footprints: 2,
        }
    );

    let dcm = ws.read(VendorFormat::SamacSys, RecordKind::Description);
    assert_eq!(dcm.matches("$CMP LM358").count(), 1);
    assert!(dcm.contains("D Low-power dual op-amp\n"));
    assert!(!dcm.contains("D Dual Operational Amplifier"));

    let lib = ws.read(VendorFormat::SamacSys, RecordKind::Symbol);
    assert_eq!(lib.matches("DEF LM358 ").count(), 1);
}

// =============================================================================
// Failures and cancellation
// =============================================================================

#[test]
fn mismatched_device_name_is_rejected() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    let archive = ws.samacsys_archive();
    let dcm_before = ws.read(VendorFormat::SamacSys, RecordKind::Description);

    let err = ws.import(&archive, "NE555\n").unwrap_err();

    assert!(matches!(err, ImpartError::DeviceMismatch { .. }));
    assert_eq!(err.to_string(), "Unexpected device in LM358DR.dcm");
    assert_eq!(
        ws.read(VendorFormat::SamacSys, RecordKind::Description),
        dcm_before
    );
}

#[test]
fn empty_device_name_skips_archive() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    let archive = ws.samacsys_archive();
    let token = CancelToken::new();
    let mut prompter = CancellingPrompter {
        replies: vec![String::new()],
        cancel_on: "never asked",
        token: token.clone(),
    };
    let mut console = Console::new(&mut prompter, token);

    let outcome = Importer::new(ws.library.clone())
        .import(&archive, &mut console)
        .unwrap();

    assert_eq!(outcome, ImportOutcome::Skipped);
}

#[test]
fn cancellation_at_prompt_leaves_library_untouched() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    let archive = ws.samacsys_archive();
    let dcm_before = ws.read(VendorFormat::SamacSys, RecordKind::Description);
    let lib_before = ws.read(VendorFormat::SamacSys, RecordKind::Symbol);

    let token = CancelToken::new();
    let mut prompter = CancellingPrompter {
        replies: vec!["LM358".to_string()],
        cancel_on: "Datasheet URL",
        token: token.clone(),
    };
    let mut console = Console::new(&mut prompter, token);

    let result = Importer::new(ws.library.clone()).import(&archive, &mut console);

    assert!(matches!(result, Err(ImpartError::Cancelled)));
    assert_eq!(
        ws.read(VendorFormat::SamacSys, RecordKind::Description),
        dcm_before
    );
    assert_eq!(ws.read(VendorFormat::SamacSys, RecordKind::Symbol), lib_before);
    let pretty = ws.library.footprint_dir(VendorFormat::SamacSys);
    assert_eq!(fs::read_dir(pretty).unwrap().count(), 0);
}

#[test]
fn closed_input_is_fatal() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    let archive = ws.samacsys_archive();

    let err = ws.import(&archive, "").unwrap_err();

    assert!(matches!(err, ImpartError::EndOfInput));
    assert!(err.is_fatal());
}

#[test]
fn download_directory_listing() {
    let ws = Workspace::new(VendorFormat::SamacSys);
    ws.samacsys_archive();
    ws.write_archive("NE555P.zip", &[("NE555P.lib", "")]);
    fs::write(ws.downloads.join("readme.txt"), "").unwrap();

    assert_eq!(
        list_archives(&ws.downloads).unwrap(),
        ["LM358DR.zip", "NE555P.zip"]
    );
}
