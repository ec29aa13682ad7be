use terrabuild_util::errors::TerraError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = TerraError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_manifest_error_display() {
    let err = TerraError::Manifest {
        message: "bad syntax".to_string(),
    };
    assert_eq!(err.to_string(), "Manifest error: bad syntax");
}

#[test]
fn test_unresolved_key_names_path() {
    let err = TerraError::UnresolvedKey {
        path: "Forge.forge".to_string(),
        referenced_by: "platform `forge`".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Unresolved catalog key `Forge.forge` (referenced by platform `forge`)"
    );
}

#[test]
fn test_cyclic_reference_display() {
    let err = TerraError::CyclicReference {
        chain: "Fabric.a -> Fabric.b -> Fabric.a".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Cyclic reference in version catalog: Fabric.a -> Fabric.b -> Fabric.a"
    );
}

#[test]
fn test_dependency_fetch_display() {
    let err = TerraError::DependencyFetch {
        coordinate: "net.fabricmc:yarn:1.18.2+build.3".to_string(),
        message: "not found".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Failed to fetch net.fabricmc:yarn:1.18.2+build.3: not found"
    );
}

#[test]
fn test_packaging_error_display() {
    let err = TerraError::Packaging {
        message: "bad jar".to_string(),
    };
    assert_eq!(err.to_string(), "Packaging failed: bad jar");
}

#[test]
fn test_network_error_display() {
    let err = TerraError::Network {
        message: "timeout".to_string(),
    };
    assert_eq!(err.to_string(), "Network error: timeout");
}

#[test]
fn test_generic_error_display() {
    let err = TerraError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: TerraError = io_err.into();
    assert!(matches!(err, TerraError::Io(_)));
}
