use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MANIFEST: &str = r#"
[project]
name = "terra"
version = "6.0.0"

[repositories]
local = "repo"

[platform.fabric]

[[platform.fabric.dependencies]]
coordinate = "cloud.commandframework:cloud-fabric:${Libraries.cloud}"
mode = "shaded"

[platform.fabric.run]
addon-dir = "run/config/Terra/addons"

[platform.forge]

[[platform.forge.dependencies]]
coordinate = "net.minecraftforge:forge:$minecraft-$forge"
mode = "compile-only"
"#;

const CATALOG: &str = r#"
[Libraries]
cloud = "1.6.2"

[Fabric]
minecraft = "1.18.2"
yarn = "$minecraft+build.3"

[Forge]
minecraft = "${Fabric.minecraft}"
"#;

/// A project with a local directory repository; `home` isolates the
/// global configuration.
struct Fixture {
    project: TempDir,
    home: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let project = TempDir::new().unwrap();
        let root = project.path();
        std::fs::write(root.join("Terrabuild.toml"), MANIFEST).unwrap();
        std::fs::write(root.join("versions.toml"), CATALOG).unwrap();

        let dir = root.join("repo/cloud/commandframework/cloud-fabric/1.6.2");
        std::fs::create_dir_all(&dir).unwrap();
        write_jar(&dir.join("cloud-fabric-1.6.2.jar"), "cloud/fabric.txt");
        std::fs::write(
            dir.join("cloud-fabric-1.6.2.pom"),
            "<project><groupId>cloud.commandframework</groupId><artifactId>cloud-fabric</artifactId><version>1.6.2</version></project>",
        )
        .unwrap();

        Self {
            project,
            home: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.project.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("terrabuild").unwrap();
        cmd.current_dir(self.root())
            .env("TERRABUILD_HOME", self.home.path())
            .env_remove("RUST_LOG");
        cmd
    }
}

fn write_jar(path: &Path, entry: &str) {
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    zip.start_file(entry, zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"data").unwrap();
    zip.finish().unwrap();
}

#[test]
fn test_catalog_get() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["catalog", "get", "Fabric.yarn"])
        .assert()
        .success()
        .stdout("1.18.2+build.3\n");
}

#[test]
fn test_catalog_get_missing_key_fails() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["catalog", "get", "Forge.forge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Forge.forge"));
}

#[test]
fn test_catalog_list_namespace() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["catalog", "list", "Forge"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Forge.minecraft = 1.18.2"))
        .stdout(predicate::str::contains("Fabric").not());
}

#[test]
fn test_catalog_override_outside_project() {
    let fixture = Fixture::new();
    let elsewhere = TempDir::new().unwrap();
    Command::cargo_bin("terrabuild")
        .unwrap()
        .current_dir(elsewhere.path())
        .env("TERRABUILD_HOME", fixture.home.path())
        .arg("catalog")
        .arg("--catalog")
        .arg(fixture.root().join("versions.toml"))
        .args(["get", "Libraries.cloud"])
        .assert()
        .success()
        .stdout("1.6.2\n");
}

#[test]
fn test_build_fabric() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["build", "fabric"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Packaged"));

    let libs = fixture.root().join("build/fabric/libs");
    assert!(libs.join("Terra-6.0.0.jar").is_file());
    assert_eq!(std::fs::read_dir(&libs).unwrap().count(), 1);
}

#[test]
fn test_build_forge_with_missing_key_fails() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["build", "forge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Forge.forge"));
    assert!(!fixture.root().join("build/forge/libs").exists());
}

#[test]
fn test_build_unknown_platform_fails() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["build", "quilt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quilt"));
}

#[test]
fn test_plan_json() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["plan", "fabric", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"archive_name\": \"Terra-6.0.0.jar\""));
}

#[test]
fn test_run_creates_addon_directory() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["run", "fabric", "client"])
        .assert()
        .success();
    assert!(fixture.root().join("run/config/Terra/addons").is_dir());
}

#[test]
fn test_clean() {
    let fixture = Fixture::new();
    let libs = fixture.root().join("build/fabric/libs");
    std::fs::create_dir_all(&libs).unwrap();

    fixture
        .cmd()
        .args(["clean", "fabric"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned platform 'fabric'"));
    assert!(!libs.exists());

    fixture
        .cmd()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned build directory"));
    fixture
        .cmd()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to clean"));
}

#[test]
fn test_outside_project_fails() {
    let home = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    Command::cargo_bin("terrabuild")
        .unwrap()
        .current_dir(elsewhere.path())
        .env("TERRABUILD_HOME", home.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Terrabuild.toml"));
}
