use terrabuild_core::dependency::{Exclusion, InclusionMode, MavenCoordinate};

#[test]
fn test_parse_coordinate() {
    let c = MavenCoordinate::parse("net.fabricmc:yarn:1.18.2+build.3").unwrap();
    assert_eq!(c.group_id, "net.fabricmc");
    assert_eq!(c.artifact_id, "yarn");
    assert_eq!(c.version, "1.18.2+build.3");
    assert!(c.classifier.is_none());
    assert_eq!(c.key(), "net.fabricmc:yarn");
    assert_eq!(c.jar_filename(), "yarn-1.18.2+build.3.jar");
}

#[test]
fn test_parse_coordinate_with_classifier() {
    let c = MavenCoordinate::parse("net.fabricmc:yarn:1.18.2+build.3:v2").unwrap();
    assert_eq!(c.classifier.as_deref(), Some("v2"));
    assert_eq!(c.key(), "net.fabricmc:yarn:v2");
    assert_eq!(c.jar_filename(), "yarn-1.18.2+build.3-v2.jar");
    assert_eq!(c.pom_filename(), "yarn-1.18.2+build.3.pom");
    assert_eq!(c.to_string(), "net.fabricmc:yarn:1.18.2+build.3:v2");
}

#[test]
fn test_parse_coordinate_rejects_bad_shapes() {
    assert!(MavenCoordinate::parse("net.fabricmc:yarn").is_none());
    assert!(MavenCoordinate::parse("a:b::c").is_none());
    assert!(MavenCoordinate::parse("a:b:c:d:e").is_none());
}

#[test]
fn test_inclusion_modes() {
    assert!(!InclusionMode::CompileOnly.is_bundled());
    assert!(!InclusionMode::CompileOnly.follows_transitives());
    assert!(!InclusionMode::Runtime.is_bundled());
    assert!(InclusionMode::Runtime.follows_transitives());
    assert!(InclusionMode::Shaded.is_bundled());
    assert!(InclusionMode::Shaded.follows_transitives());
    assert!(InclusionMode::TransitiveExcluded.is_bundled());
    assert!(!InclusionMode::TransitiveExcluded.follows_transitives());
    assert_eq!(InclusionMode::default(), InclusionMode::Runtime);
}

#[test]
fn test_inclusion_mode_kebab_case() {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        mode: InclusionMode,
    }
    let w: Wrapper = toml::from_str("mode = \"transitive-excluded\"").unwrap();
    assert_eq!(w.mode, InclusionMode::TransitiveExcluded);
    assert_eq!(w.mode.to_string(), "transitive-excluded");
}

#[test]
fn test_exclusion_matching() {
    let group = Exclusion::parse("net.fabricmc").unwrap();
    assert!(group.matches("net.fabricmc", "fabric-loader"));
    assert!(!group.matches("org.ow2.asm", "asm"));

    let exact = Exclusion::parse("org.ow2.asm:asm").unwrap();
    assert!(exact.matches("org.ow2.asm", "asm"));
    assert!(!exact.matches("org.ow2.asm", "asm-tree"));

    let wildcard = Exclusion::parse("org.ow2.asm:*").unwrap();
    assert!(wildcard.matches("org.ow2.asm", "asm-tree"));

    assert!(Exclusion::parse("").is_none());
}
