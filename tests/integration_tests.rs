use clap::Parser;
use orderly::cli::{AppError, Args, run_cli_in};
use orderly::config::{ConfigStore, Configuration, Courses, PRIMARY_FILE_NAME};
use orderly::organizer::OrganizeError;
use orderly::platform::{Platform, PlatformError, PlatformResult};
use orderly::prompt::ScriptedPrompter;
/// Integration tests for orderly
///
/// These tests drive complete runs through `run_cli_in` with a fake platform,
/// scripted answers and throwaway directories.
///
/// Test categories:
/// 1. Organizing with an existing configuration
/// 2. First-run setup
/// 3. Backup fallback
/// 4. Edit and reset modes
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Platform double: no real editor, no sudo.
#[derive(Default)]
struct FakePlatform {
    elevated: bool,
    elevation_fails: bool,
    edited: RefCell<Vec<PathBuf>>,
    elevations: RefCell<Vec<PathBuf>>,
}

impl Platform for FakePlatform {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn config_dir(&self) -> PathBuf {
        PathBuf::from("/nonexistent/orderly-config")
    }

    fn backup_file_name(&self) -> Option<&'static str> {
        Some(".conf.bckup.toml")
    }

    fn hide_file(&self, _path: &Path) -> PlatformResult<()> {
        Ok(())
    }

    fn open_in_editor(&self, path: &Path, _editor: &str) -> PlatformResult<()> {
        self.edited.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn is_elevated(&self) -> bool {
        self.elevated
    }

    fn elevate(&self, config_dir: &Path) -> PlatformResult<()> {
        self.elevations.borrow_mut().push(config_dir.to_path_buf());
        if self.elevation_fails {
            Err(PlatformError::ElevationFailed("denied".to_string()))
        } else {
            Ok(())
        }
    }
}

/// A scan root, a destination tree and a configuration directory.
struct TestFixture {
    scan: TempDir,
    dest: TempDir,
    config: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        TestFixture {
            scan: TempDir::new().expect("Failed to create temp directory"),
            dest: TempDir::new().expect("Failed to create temp directory"),
            config: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    fn scan_path(&self) -> &Path {
        self.scan.path()
    }

    fn dest_path(&self) -> &Path {
        self.dest.path()
    }

    fn config_path(&self) -> &Path {
        self.config.path()
    }

    /// Create a folder (with one file inside) at the scan root.
    fn create_folder(&self, name: &str) {
        let dir = self.scan_path().join(name);
        fs::create_dir(&dir).expect("Failed to create folder");
        fs::write(dir.join("notes.txt"), name).expect("Failed to write file");
    }

    /// Create a destination folder under the destination tree.
    fn create_destination(&self, name: &str) -> PathBuf {
        let dir = self.dest_path().join(name);
        fs::create_dir_all(&dir).expect("Failed to create destination");
        dir
    }

    /// Save a configuration mapping prefixes to destination folder names.
    fn save_config(&self, platform: &dyn Platform, courses: &[(&str, &str)]) {
        let courses: Courses = courses
            .iter()
            .map(|(prefix, folder)| (prefix.to_string(), self.create_destination(folder)))
            .collect();
        let config = Configuration::new(self.dest_path().to_path_buf(), courses);
        ConfigStore::new(self.config_path(), platform)
            .save(&config)
            .expect("Failed to save configuration");
    }

    fn args(&self, extra: &[&str]) -> Args {
        let mut argv = vec![
            "orderly".to_string(),
            "--config-dir".to_string(),
            self.config_path().to_string_lossy().to_string(),
            "--src".to_string(),
            self.scan_path().to_string_lossy().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).expect("arguments should parse")
    }

    fn run(
        &self,
        platform: &FakePlatform,
        prompter: &mut ScriptedPrompter,
        extra: &[&str],
    ) -> Result<(), AppError> {
        run_cli_in(&self.args(extra), platform, prompter, self.scan_path())
    }

    fn assert_in_scan(&self, name: &str) {
        let path = self.scan_path().join(name);
        assert!(path.exists(), "Should still be in scan root: {}", path.display());
    }

    fn assert_in_dest(&self, rel_path: &str) {
        let path = self.dest_path().join(rel_path);
        assert!(path.is_dir(), "Should have been moved: {}", path.display());
    }
}

// ============================================================================
// Test Suite 1: Organizing with an existing configuration
// ============================================================================

#[test]
fn test_organize_moves_matching_folders() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs"), ("ma", "math")]);
    fixture.create_folder("CS101");
    fixture.create_folder("MATH200");
    fixture.create_folder("other");
    fs::write(fixture.scan_path().join("readme.txt"), "hello").unwrap();

    let mut prompter = ScriptedPrompter::default();
    fixture
        .run(&platform, &mut prompter, &[])
        .expect("Organize should succeed");

    fixture.assert_in_dest("cs/CS101");
    fixture.assert_in_dest("math/MATH200");
    fixture.assert_in_scan("other");
    fixture.assert_in_scan("readme.txt");
    assert!(prompter.questions().is_empty());
}

#[test]
fn test_organize_twice_is_quiet() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);
    fixture.create_folder("cs101");

    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &[])
        .expect("First run should succeed");
    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &[])
        .expect("Second run should succeed");

    fixture.assert_in_dest("cs/cs101");
}

#[test]
fn test_first_declared_prefix_wins() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "general"), ("cs1", "intro")]);
    fixture.create_folder("cs101");

    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &[])
        .unwrap();

    fixture.assert_in_dest("general/cs101");
    assert!(!fixture.dest_path().join("intro").join("cs101").exists());
}

#[test]
fn test_conflict_declined_keeps_both() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);
    fixture.create_folder("cs101");
    let existing = fixture.dest_path().join("cs").join("cs101");
    fs::create_dir(&existing).unwrap();
    fs::write(existing.join("old.txt"), "old").unwrap();

    let mut prompter = ScriptedPrompter::new(["n"]);
    fixture.run(&platform, &mut prompter, &[]).unwrap();

    assert_eq!(prompter.questions().len(), 1);
    fixture.assert_in_scan("cs101/notes.txt");
    assert_eq!(fs::read_to_string(existing.join("old.txt")).unwrap(), "old");
    assert!(!existing.join("notes.txt").exists());
}

#[test]
fn test_conflict_overwrite_policy() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);
    fixture.create_folder("cs101");
    let existing = fixture.dest_path().join("cs").join("cs101");
    fs::create_dir(&existing).unwrap();
    fs::write(existing.join("old.txt"), "old").unwrap();

    let mut prompter = ScriptedPrompter::default();
    fixture
        .run(&platform, &mut prompter, &["--on-conflict", "overwrite"])
        .unwrap();

    assert!(prompter.questions().is_empty());
    assert!(!fixture.scan_path().join("cs101").exists());
    assert_eq!(
        fs::read_to_string(existing.join("notes.txt")).unwrap(),
        "cs101"
    );
    assert!(!existing.join("old.txt").exists());
}

#[test]
fn test_missing_source_fails() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);

    let config_dir = fixture.config_path().to_string_lossy().to_string();
    let args = Args::try_parse_from([
        "orderly",
        "--config-dir",
        config_dir.as_str(),
        "--src",
        "does-not-exist",
    ])
    .unwrap();
    let mut prompter = ScriptedPrompter::default();
    let result = run_cli_in(&args, &platform, &mut prompter, fixture.scan_path());

    assert!(matches!(
        result,
        Err(AppError::Organize(OrganizeError::SourceMissing { .. }))
    ));
    assert!(prompter.questions().is_empty());
}

#[test]
fn test_missing_destination_leaves_folder() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);
    fs::remove_dir(fixture.dest_path().join("cs")).unwrap();
    fixture.create_folder("cs101");

    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &[])
        .expect("Move failures are reported, not fatal");
    fixture.assert_in_scan("cs101");

    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &["--create-dirs"])
        .unwrap();
    fixture.assert_in_dest("cs/cs101");
}

#[test]
fn test_scan_root_as_destination_keeps_folders() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    let courses: Courses = [("cs".to_string(), fixture.scan_path().to_path_buf())]
        .into_iter()
        .collect();
    ConfigStore::new(fixture.config_path(), &platform)
        .save(&Configuration::new(fixture.scan_path().to_path_buf(), courses))
        .expect("Failed to save configuration");
    fixture.create_folder("cs101");

    let mut prompter = ScriptedPrompter::default();
    fixture
        .run(&platform, &mut prompter, &["--on-conflict", "overwrite"])
        .unwrap();

    assert!(prompter.questions().is_empty());
    assert_eq!(
        fs::read_to_string(fixture.scan_path().join("cs101").join("notes.txt")).unwrap(),
        "cs101"
    );
}

// ============================================================================
// Test Suite 2: First-run setup
// ============================================================================

#[test]
fn test_first_run_setup_saves_and_organizes() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.create_destination("Computer Science");
    fixture.create_folder("CS101");
    fixture.create_folder("history");

    let mut prompter = ScriptedPrompter::new([
        fixture.dest_path().to_string_lossy().to_string(),
        "1".to_string(),
        "CS".to_string(),
        "Computer Science".to_string(),
    ]);
    fixture
        .run(&platform, &mut prompter, &[])
        .expect("Setup should succeed");

    assert_eq!(prompter.remaining(), 0);
    fixture.assert_in_dest("Computer Science/CS101");
    fixture.assert_in_scan("history");

    let primary = fixture.config_path().join(PRIMARY_FILE_NAME);
    assert!(primary.exists());
    assert!(fs::metadata(&primary).unwrap().permissions().readonly());
    assert!(fixture.config_path().join(".conf.bckup.toml").exists());

    let saved = ConfigStore::new(fixture.config_path(), &platform)
        .load(&mut ScriptedPrompter::default())
        .unwrap();
    assert_eq!(
        saved.courses.get("cs"),
        Some(&fixture.dest_path().join("Computer Science"))
    );
}

#[test]
fn test_first_run_destination_inside_scan_root() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.create_folder("CS");
    fixture.create_folder("cs101");

    // A blank base directory means the scan root itself.
    let mut prompter = ScriptedPrompter::new(["", "1", "cs", "CS"]);
    fixture
        .run(&platform, &mut prompter, &["--on-conflict", "overwrite"])
        .expect("Setup should succeed");

    assert_eq!(prompter.remaining(), 0);
    let destination = fixture.scan_path().join("CS");
    assert!(destination.join("notes.txt").exists());
    assert!(destination.join("cs101").join("notes.txt").exists());
    assert!(!destination.join("CS").exists());
    assert!(!fixture.scan_path().join("cs101").exists());
}

#[test]
fn test_first_run_invalid_count_fails() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();

    let mut prompter = ScriptedPrompter::new(["", "lots"]);
    let result = fixture.run(&platform, &mut prompter, &[]);

    assert!(matches!(result, Err(AppError::Setup(_))));
    assert!(!fixture.config_path().join(PRIMARY_FILE_NAME).exists());
}

// ============================================================================
// Test Suite 3: Backup fallback
// ============================================================================

#[test]
fn test_backup_used_when_primary_missing() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);
    let primary = fixture.config_path().join(PRIMARY_FILE_NAME);
    platform.set_writable(&primary).unwrap();
    fs::remove_file(&primary).unwrap();
    fixture.create_folder("cs101");

    let mut prompter = ScriptedPrompter::new(["yes"]);
    fixture.run(&platform, &mut prompter, &[]).unwrap();

    assert_eq!(prompter.questions().len(), 1);
    fixture.assert_in_dest("cs/cs101");
}

#[test]
fn test_backup_declined_starts_setup() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);
    let primary = fixture.config_path().join(PRIMARY_FILE_NAME);
    platform.set_writable(&primary).unwrap();
    fs::remove_file(&primary).unwrap();

    let mut prompter = ScriptedPrompter::new(["no", "", "0"]);
    fixture.run(&platform, &mut prompter, &[]).unwrap();

    assert_eq!(prompter.questions().len(), 3);
    assert!(primary.exists());
}

// ============================================================================
// Test Suite 4: Edit and reset modes
// ============================================================================

#[test]
fn test_edit_opens_primary_document() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);

    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &["--edit", "--reset"])
        .unwrap();

    let primary = fixture.config_path().join(PRIMARY_FILE_NAME);
    assert_eq!(*platform.edited.borrow(), vec![primary.clone()]);
    assert!(primary.exists(), "--edit wins over --reset");
    assert!(fs::metadata(&primary).unwrap().permissions().readonly());
}

#[test]
fn test_edit_without_configuration() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();

    let result = fixture.run(&platform, &mut ScriptedPrompter::default(), &["--edit"]);

    assert!(matches!(result, Err(AppError::EditTargetMissing(_))));
    assert!(platform.edited.borrow().is_empty());
}

#[test]
fn test_reset_deletes_both_documents() {
    let fixture = TestFixture::new();
    let platform = FakePlatform {
        elevated: true,
        ..Default::default()
    };
    fixture.save_config(&platform, &[("cs", "cs")]);

    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &["--reset"])
        .unwrap();

    assert!(!fixture.config_path().join(PRIMARY_FILE_NAME).exists());
    assert!(!fixture.config_path().join(".conf.bckup.toml").exists());
    assert!(platform.elevations.borrow().is_empty());
}

#[test]
fn test_reset_relaunches_when_not_elevated() {
    let fixture = TestFixture::new();
    let platform = FakePlatform::default();
    fixture.save_config(&platform, &[("cs", "cs")]);

    fixture
        .run(&platform, &mut ScriptedPrompter::default(), &["--reset"])
        .unwrap();

    assert_eq!(
        *platform.elevations.borrow(),
        vec![fixture.config_path().to_path_buf()]
    );
    assert!(fixture.config_path().join(PRIMARY_FILE_NAME).exists());
}

#[test]
fn test_reset_elevation_failure() {
    let fixture = TestFixture::new();
    let platform = FakePlatform {
        elevation_fails: true,
        ..Default::default()
    };
    fixture.save_config(&platform, &[("cs", "cs")]);

    let result = fixture.run(&platform, &mut ScriptedPrompter::default(), &["--reset"]);

    assert!(matches!(
        result,
        Err(AppError::Platform(PlatformError::ElevationFailed(_)))
    ));
    assert_eq!(platform.elevations.borrow().len(), 1);
    assert!(fixture.config_path().join(PRIMARY_FILE_NAME).exists());
}

#[test]
fn test_cli_parses_from_argv() {
    let args = Args::parse_from(["orderly", "--src", "/tmp", "--create-dirs"]);
    assert_eq!(args.src, Some(PathBuf::from("/tmp")));
    assert!(args.create_dirs);
    assert!(!args.edit && !args.reset);
}
