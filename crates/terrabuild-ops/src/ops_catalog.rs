//! Operation: query the version catalog.

use std::path::Path;

use terrabuild_core::catalog::Catalog;
use terrabuild_core::key_path::KeyPath;
use terrabuild_util::errors::TerraError;

use crate::context::ProjectContext;

/// Load the catalog: the `explicit` file on its own, or the project's.
///
/// An explicit catalog needs no project, so `catalog get` also works
/// outside a terrabuild checkout.
pub fn load(start_dir: &Path, explicit: Option<&Path>) -> miette::Result<Catalog> {
    match explicit {
        Some(path) => Catalog::from_path(path),
        None => {
            let ctx = ProjectContext::load(start_dir, None)?;
            Ok((*ctx.catalog).clone())
        }
    }
}

/// The resolved value at a dotted `path`.
pub fn get<'a>(catalog: &'a Catalog, path: &str) -> miette::Result<&'a str> {
    catalog.get_str(path)
}

/// Every resolved entry, or those inside `namespace`, sorted by path.
pub fn list<'a>(
    catalog: &'a Catalog,
    namespace: Option<&str>,
) -> miette::Result<Vec<(String, &'a str)>> {
    let entries: Vec<(String, &str)> = match namespace {
        None => catalog.entries().map(|(k, v)| (k.to_string(), v)).collect(),
        Some(ns) => {
            let ns = KeyPath::parse(ns)?;
            if !catalog.has_namespace(&ns) {
                return Err(TerraError::UnresolvedKey {
                    path: ns.to_string(),
                    referenced_by: "catalog list".to_string(),
                }
                .into());
            }
            catalog
                .entries_in(&ns)
                .map(|(k, v)| (k.to_string(), v))
                .collect()
        }
    };
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[Fabric]
minecraft = "1.18.2"
yarn = "$minecraft+build.3"

[Forge]
minecraft = "${Fabric.minecraft}"
"#;

    #[test]
    fn get_resolves_references() {
        let catalog = Catalog::parse(CATALOG).unwrap();
        assert_eq!(get(&catalog, "Fabric.yarn").unwrap(), "1.18.2+build.3");
        assert_eq!(get(&catalog, "Forge.minecraft").unwrap(), "1.18.2");
        let err = get(&catalog, "Forge.forge").unwrap_err();
        assert!(err.to_string().contains("Forge.forge"));
    }

    #[test]
    fn list_by_namespace() {
        let catalog = Catalog::parse(CATALOG).unwrap();
        assert_eq!(list(&catalog, None).unwrap().len(), 3);
        let fabric = list(&catalog, Some("Fabric")).unwrap();
        assert_eq!(
            fabric,
            vec![
                ("Fabric.minecraft".to_string(), "1.18.2"),
                ("Fabric.yarn".to_string(), "1.18.2+build.3"),
            ]
        );
        assert!(list(&catalog, Some("Quilt")).is_err());
    }

    #[test]
    fn explicit_catalog_needs_no_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.toml");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = load(dir.path(), Some(&path)).unwrap();
        assert_eq!(catalog.len(), 3);
    }
}
