use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use terrabuild_core::key_path::KeyPath;
use terrabuild_core::platform::{MappingsPlan, PackagingPlan, PlatformPlan, RunPlan};
use terrabuild_core::dependency::MavenCoordinate;
use terrabuild_package::archive::{self, ResourceManifest, RESOURCE_MANIFEST_ENTRY};
use terrabuild_package::mappings::{ClassMappings, TINY_ENTRY};
use terrabuild_package::remap::{self, IdentityRemapper};
use terrabuild_package::shade::{self, Entry};

const TINY: &str = "tiny\t2\t0\tofficial\tintermediary\tnamed
c\tbzx\tnet/minecraft/class_1937\tnet/minecraft/world/World
";

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(name.trim_end_matches('/'), options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

fn read_jar(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        out.insert(file.name().to_string(), data);
    }
    out
}

fn utf8(pool: &mut Vec<u8>, text: &str) {
    pool.push(1);
    pool.extend_from_slice(&(text.len() as u16).to_be_bytes());
    pool.extend_from_slice(text.as_bytes());
}

fn u2(pool: &mut Vec<u8>, tag: u8, index: u16) {
    pool.push(tag);
    pool.extend_from_slice(&index.to_be_bytes());
}

/// `class com.example.Hooks { private List<World> worlds; }` with a
/// `String` constant that must survive untouched.
fn sample_class() -> Vec<u8> {
    let mut pool = Vec::new();
    utf8(&mut pool, "com/example/Hooks"); // 1
    u2(&mut pool, 7, 1); // 2
    utf8(&mut pool, "java/lang/Object"); // 3
    u2(&mut pool, 7, 3); // 4
    utf8(&mut pool, "worlds"); // 5
    utf8(&mut pool, "Ljava/util/List;"); // 6
    utf8(&mut pool, "Signature"); // 7
    utf8(&mut pool, "Ljava/util/List<Lnet/minecraft/world/World;>;"); // 8
    pool.push(5); // 9 (long, two slots)
    pool.extend_from_slice(&42u64.to_be_bytes());
    utf8(&mut pool, "net/minecraft/world/World"); // 11
    u2(&mut pool, 7, 11); // 12
    utf8(&mut pool, "hello"); // 13
    u2(&mut pool, 8, 13); // 14

    let mut class = Vec::new();
    class.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    class.extend_from_slice(&[0, 0, 0, 61]);
    class.extend_from_slice(&15u16.to_be_bytes());
    class.extend_from_slice(&pool);
    class.extend_from_slice(&[0x00, 0x21, 0, 2, 0, 4, 0, 0]);
    // one field with a Signature attribute
    class.extend_from_slice(&[0, 1, 0, 2, 0, 5, 0, 6, 0, 1, 0, 7, 0, 0, 0, 2, 0, 8]);
    // no methods, no class attributes
    class.extend_from_slice(&[0, 0, 0, 0]);
    class
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

fn plan(root: &Path) -> PlatformPlan {
    PlatformPlan {
        platform: "fabric".to_string(),
        namespace: KeyPath::parse("Fabric").unwrap(),
        project_name: "terra".to_string(),
        version: "6.0.0".to_string(),
        group: Some("com.dfsek".to_string()),
        description: Some("Data-driven world generator".to_string()),
        declarations: Vec::new(),
        packaging: PackagingPlan {
            archive_name: "Terra-6.0.0.jar".to_string(),
            access_widener: Some(root.join("terra.accesswidener")),
            refmap: Some("terra-fabric-refmap.json".to_string()),
            mappings: Some(MappingsPlan {
                coordinate: MavenCoordinate::parse("net.fabricmc:yarn:1.18.2+build.3:v2").unwrap(),
                from: "named".to_string(),
                to: "intermediary".to_string(),
            }),
            java_release: Some(17),
            resources: vec![root.join("resources")],
            exclude: vec!["META-INF/maven/**".to_string()],
        },
        run: RunPlan {
            addon_dir: root.join("run/config/Terra/addons"),
            working_dir: root.join("run"),
            client: Vec::new(),
            server: Vec::new(),
            env: BTreeMap::new(),
        },
        output_dir: root.join("build/fabric/libs"),
    }
}

#[test]
fn test_shade_merges_jars_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.jar");
    let second = dir.path().join("second.jar");
    write_jar(
        &first,
        &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n"),
            ("META-INF/CERT.SF", b"sig"),
            ("META-INF/services/com.example.Api", b"com.first.Impl\n"),
            ("com/", b""),
            ("com/shared.txt", b"first"),
        ],
    );
    write_jar(
        &second,
        &[
            ("META-INF/services/com.example.Api", b"com.second.Impl\n"),
            ("META-INF/maven/g/a/pom.xml", b"<project/>"),
            ("com/shared.txt", b"second"),
        ],
    );

    let entries = shade::shade(&[&first, &second], &["META-INF/maven/**".to_string()]).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["META-INF/services/com.example.Api", "com/shared.txt"]);
    assert_eq!(entries[0].data, b"com.first.Impl\ncom.second.Impl\n");
    assert_eq!(entries[1].data, b"first");
}

#[test]
fn test_unreadable_jar_names_the_jar() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.jar");
    std::fs::write(&bogus, b"not a zip").unwrap();
    let err = shade::shade(&[&bogus], &[]).unwrap_err();
    assert!(err.to_string().contains("bogus.jar"));
}

#[test]
fn test_mappings_from_jar() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("yarn-v2.jar");
    write_jar(&jar, &[(TINY_ENTRY, TINY.as_bytes())]);
    let mappings = ClassMappings::from_file(&jar, "named", "intermediary").unwrap();
    assert_eq!(
        mappings.get("net/minecraft/world/World"),
        Some("net/minecraft/class_1937")
    );
}

#[test]
fn test_remap_rewrites_constant_pool_and_renames_entries() {
    let mappings = ClassMappings::parse_tiny(TINY, "named", "intermediary").unwrap();
    let entries = vec![
        Entry::new("com/example/Hooks.class", sample_class()),
        Entry::new("net/minecraft/world/World.class", sample_class()),
        Entry::new("fabric.mod.json", "{}"),
    ];
    let out = remap::remap_entries(entries, &mappings).unwrap();

    let names: Vec<&str> = out.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "com/example/Hooks.class",
            "net/minecraft/class_1937.class",
            "fabric.mod.json"
        ]
    );
    let class = &out[0].data;
    assert!(contains(class, "Ljava/util/List<Lnet/minecraft/class_1937;>;"));
    assert!(contains(class, "net/minecraft/class_1937"));
    assert!(!contains(class, "net/minecraft/world/World"));
    assert!(contains(class, "hello"));
    assert_eq!(out[2].data, b"{}");

    // The rewritten class is still well formed.
    let again = remap::remap_class(class, &IdentityRemapper).unwrap();
    assert_eq!(&again, class);
}

fn class_file(count: u16, pool: &[u8], rest: &[u8]) -> Vec<u8> {
    let mut class = Vec::new();
    class.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    class.extend_from_slice(&[0, 0, 0, 61]);
    class.extend_from_slice(&count.to_be_bytes());
    class.extend_from_slice(pool);
    class.extend_from_slice(rest);
    class
}

#[test]
fn test_string_literal_sharing_a_class_name_keeps_its_text() {
    let mut pool = Vec::new();
    utf8(&mut pool, "com/example/Lookup"); // 1
    u2(&mut pool, 7, 1); // 2
    utf8(&mut pool, "java/lang/Object"); // 3
    u2(&mut pool, 7, 3); // 4
    utf8(&mut pool, "net/minecraft/world/World"); // 5
    u2(&mut pool, 7, 5); // 6
    u2(&mut pool, 8, 5); // 7, Class.forName("net/minecraft/world/World")
    let class = class_file(8, &pool, &[0x00, 0x21, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);

    let mappings = ClassMappings::parse_tiny(TINY, "named", "intermediary").unwrap();
    let out = remap::remap_class(&class, &mappings).unwrap();

    assert_eq!(&out[8..10], &9u16.to_be_bytes());
    assert!(contains(&out, "net/minecraft/world/World"));
    assert!(contains(&out, "net/minecraft/class_1937"));
    // the class constant points at the appended copy, the string does not
    assert!(out.windows(3).any(|w| w == [7, 0, 8]));
    assert!(out.windows(3).any(|w| w == [8, 0, 5]));
    assert!(!out.windows(3).any(|w| w == [7, 0, 5]));

    let again = remap::remap_class(&out, &mappings).unwrap();
    assert_eq!(again, out);
}

#[test]
fn test_record_components_and_type_annotations_are_remapped() {
    let mut pool = Vec::new();
    utf8(&mut pool, "com/example/Pos"); // 1
    u2(&mut pool, 7, 1); // 2
    utf8(&mut pool, "java/lang/Record"); // 3
    u2(&mut pool, 7, 3); // 4
    utf8(&mut pool, "Record"); // 5
    utf8(&mut pool, "world"); // 6
    utf8(&mut pool, "Lnet/minecraft/world/World;"); // 7
    utf8(&mut pool, "Signature"); // 8
    utf8(&mut pool, "Ljava/util/Optional<Lnet/minecraft/world/World;>;"); // 9
    utf8(&mut pool, "RuntimeVisibleTypeAnnotations"); // 10
    utf8(&mut pool, "Lnet/minecraft/world/World$Marker;"); // 11

    let mut rest = vec![0x00, 0x31, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 2];
    // Record: one component `world` with a Signature attribute
    rest.extend_from_slice(&[0, 5, 0, 0, 0, 16, 0, 1, 0, 6, 0, 7, 0, 1, 0, 8, 0, 0, 0, 2, 0, 9]);
    // one supertype annotation with a one-step type path
    rest.extend_from_slice(&[0, 10, 0, 0, 0, 12, 0, 1, 0x10, 0xFF, 0xFF, 1, 3, 0, 0, 11, 0, 0]);
    let class = class_file(12, &pool, &rest);

    let mappings = ClassMappings::parse_tiny(TINY, "named", "intermediary").unwrap();
    let out = remap::remap_class(&class, &mappings).unwrap();
    assert!(contains(&out, "Lnet/minecraft/class_1937;"));
    assert!(contains(&out, "Ljava/util/Optional<Lnet/minecraft/class_1937;>;"));
    assert!(contains(&out, "Lnet/minecraft/class_1937$Marker;"));
    assert!(!contains(&out, "net/minecraft/world/World"));
    // nothing needed a copy
    assert_eq!(&out[8..10], &12u16.to_be_bytes());
}

#[test]
fn test_truncated_class_is_packaging_error() {
    let mut class = sample_class();
    class.truncate(20);
    let err = remap::remap_entries(vec![Entry::new("a/B.class", class)], &IdentityRemapper)
        .unwrap_err();
    assert!(err.to_string().contains("a/B.class"));
}

#[test]
fn test_write_archive() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("resources/assets/terra")).unwrap();
    std::fs::write(root.join("resources/fabric.mod.json"), "{\"id\":\"terra\"}").unwrap();
    std::fs::write(root.join("resources/assets/terra/icon.png"), b"png").unwrap();
    std::fs::write(root.join("terra.accesswidener"), "accessWidener v1 named\n").unwrap();

    let plan = plan(root);
    let manifest = ResourceManifest::new(
        &plan,
        vec!["net.fabricmc:fabric-loader:0.14.2".to_string()],
        vec!["cloud.commandframework:cloud-fabric:1.6.2".to_string()],
    );
    let entries = vec![
        Entry::new("fabric.mod.json", "{\"id\":\"shaded\"}"),
        Entry::new("cloud/Command.class", "x"),
    ];
    let report = archive::write_archive(&plan, entries, &manifest).unwrap();
    assert_eq!(report.path, root.join("build/fabric/libs/Terra-6.0.0.jar"));

    let files = read_jar(&report.path);
    assert_eq!(report.entries, files.len());
    let manifest_mf = String::from_utf8(files["META-INF/MANIFEST.MF"].clone()).unwrap();
    assert!(manifest_mf.contains("Implementation-Version: 6.0.0\r\n"));
    assert!(manifest_mf.contains("Implementation-Vendor-Id: com.dfsek\r\n"));
    // project resources win over shaded files
    assert_eq!(files["fabric.mod.json"], b"{\"id\":\"terra\"}");
    assert!(files.contains_key("assets/terra/icon.png"));
    assert!(files.contains_key("terra.accesswidener"));
    assert!(files.contains_key("cloud/Command.class"));

    let json: serde_json::Value = serde_json::from_slice(&files[RESOURCE_MANIFEST_ENTRY]).unwrap();
    assert_eq!(json["platform"], "fabric");
    assert_eq!(json["group"], "com.dfsek");
    assert_eq!(json["description"], "Data-driven world generator");
    assert_eq!(json["access_widener"], "terra.accesswidener");
    assert_eq!(json["mappings"]["to"], "intermediary");
    assert_eq!(json["shaded"][0], "cloud.commandframework:cloud-fabric:1.6.2");

    // Only the archive remains in the output directory.
    let outputs: Vec<_> = std::fs::read_dir(&plan.output_dir).unwrap().collect();
    assert_eq!(outputs.len(), 1);
}

#[test]
fn test_archives_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("terra.accesswidener"), "accessWidener v1 named\n").unwrap();
    let plan = plan(root);
    let manifest = ResourceManifest::new(&plan, Vec::new(), Vec::new());

    let first = archive::write_archive(&plan, vec![Entry::new("a.txt", "a")], &manifest).unwrap();
    let first = std::fs::read(first.path).unwrap();
    let second = archive::write_archive(&plan, vec![Entry::new("a.txt", "a")], &manifest).unwrap();
    assert_eq!(first, std::fs::read(second.path).unwrap());
}
