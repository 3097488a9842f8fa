//! Registry tests against local git origins

#![allow(clippy::unwrap_used, clippy::expect_used)]

use tokio_util::sync::CancellationToken;

use super::*;
use crate::error::RocketError;
use crate::package::{Dependency, PackageType, Source};
use crate::platform::Platform;
use crate::task::ExecutionMode;
use crate::test_fixtures::{TestRegistry, addon_yaml, build_yaml};

const BUILD: &str = "registry.test/org/repo/builds/stable/1.0";
const ADDON_A: &str = "registry.test/org/repo/addons/a";
const ADDON_B: &str = "registry.test/org/repo/addons/b";
const OTHER: &str = "other.test/team/library/addons/c";

fn r(s: &str) -> Reference {
    Reference::parse(s).unwrap()
}

fn options() -> RunOptions {
    RunOptions::new(ExecutionMode::Bounded, 4)
}

#[test]
fn test_clone_on_first_use() {
    let fixture = TestRegistry::new();
    fixture.publish(BUILD, &build_yaml("https://example.test/b.tar.gz", "blender", &[]));
    let registry = fixture.registry(options());

    let token = CancellationToken::new();
    let packages = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(BUILD)], false))
        .unwrap();

    assert_eq!(packages.len(), 1);
    assert_eq!(packages[&r(BUILD)].package_type, PackageType::Build);
    assert!(fixture.packages.join("registry.test/org/repo/.git").exists());
}

#[test]
fn test_nested_dependencies_across_registries() {
    let fixture = TestRegistry::new();
    fixture.publish(
        BUILD,
        &build_yaml("https://example.test/b.tar.gz", "blender", &[ADDON_A]),
    );
    fixture.publish(ADDON_A, &addon_yaml(None, &[ADDON_B, OTHER]));
    fixture.publish(ADDON_B, &addon_yaml(None, &[]));
    fixture.publish(OTHER, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());

    let token = CancellationToken::new();
    let packages = registry
        .get_packages(&token, &GetPackagesOptions::closure(vec![r(BUILD)], false))
        .unwrap();

    let refs: Vec<&str> = packages.keys().map(Reference::as_str).collect();
    assert_eq!(refs, vec![OTHER, ADDON_A, ADDON_B, BUILD]);
}

#[test]
fn test_shallow_skips_dependencies() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[ADDON_B]));
    fixture.publish(ADDON_B, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());

    let token = CancellationToken::new();
    let packages = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_A)], false))
        .unwrap();
    assert_eq!(packages.len(), 1);
}

#[test]
fn test_missing_descriptor_is_not_found() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());

    let token = CancellationToken::new();
    let err = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_B)], false))
        .unwrap_err();
    assert!(matches!(err, RocketError::PackageNotFound { .. }));
}

#[test]
fn test_update_pulls_new_descriptors() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    let first = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_A)], false))
        .unwrap();
    assert!(first[&r(ADDON_A)].name.is_none());

    fixture.publish(ADDON_A, "type: addon\nname: Renamed\nsources:\n  - resource: addon.py\n");

    let cached = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_A)], false))
        .unwrap();
    assert!(cached[&r(ADDON_A)].name.is_none());

    let updated = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_A)], true))
        .unwrap();
    assert_eq!(updated[&r(ADDON_A)].name.as_deref(), Some("Renamed"));
}

#[test]
fn test_missing_descriptor_triggers_pull() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_A)], false))
        .unwrap();

    fixture.publish(ADDON_B, &addon_yaml(None, &[]));
    let packages = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_B)], false))
        .unwrap();
    assert!(packages.contains_key(&r(ADDON_B)));
}

#[test]
fn test_cycle_is_detected() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[ADDON_B]));
    fixture.publish(ADDON_B, &addon_yaml(None, &[ADDON_A]));
    let registry = fixture.registry(options());

    let token = CancellationToken::new();
    let err = registry
        .get_packages(&token, &GetPackagesOptions::closure(vec![r(ADDON_A)], false))
        .unwrap_err();
    assert!(matches!(err, RocketError::CircularDependency { .. }));
    assert!(err.to_string().contains(&format!("{ADDON_A} -> {ADDON_B} -> {ADDON_A}")));
}

#[test]
fn test_depth_limit() {
    let fixture = TestRegistry::new();
    let chain: Vec<String> = (0..=MAX_DEPENDENCY_DEPTH + 1)
        .map(|i| format!("registry.test/org/repo/addons/chain{i}"))
        .collect();
    for (i, reference) in chain.iter().enumerate() {
        let deps: Vec<&str> = chain.get(i + 1).map(String::as_str).into_iter().collect();
        fixture.publish(reference, &addon_yaml(None, &deps));
    }
    let registry = fixture.registry(RunOptions::sequential());

    let token = CancellationToken::new();
    let err = registry
        .get_packages(
            &token,
            &GetPackagesOptions::closure(vec![r(&chain[0])], false),
        )
        .unwrap_err();
    assert!(matches!(err, RocketError::DependencyDepthExceeded { .. }));
}

#[test]
fn test_nested_type_mismatch() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[ADDON_B]));
    fixture.publish(
        ADDON_B,
        &build_yaml("https://example.test/b.tar.gz", "blender", &[]),
    );
    let registry = fixture.registry(options());

    let token = CancellationToken::new();
    let err = registry
        .get_packages(&token, &GetPackagesOptions::closure(vec![r(ADDON_A)], false))
        .unwrap_err();
    assert!(matches!(err, RocketError::TypeMismatch { .. }));
}

#[test]
fn test_resolve_dependencies_is_idempotent() {
    let fixture = TestRegistry::new();
    fixture.publish(
        BUILD,
        &build_yaml("https://example.test/b.tar.gz", "blender", &[ADDON_A]),
    );
    fixture.publish(ADDON_A, &addon_yaml(None, &[ADDON_B]));
    fixture.publish(ADDON_B, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    let deps = vec![Dependency::build(r(BUILD))];
    let first = registry.resolve_dependencies(&token, &deps, false).unwrap();
    let second = registry.resolve_dependencies(&token, &deps, false).unwrap();
    assert_eq!(first, second);

    assert_eq!(first.direct, vec![Dependency::build(r(BUILD))]);
    assert_eq!(
        first.indirect,
        vec![
            Dependency::addon(r(ADDON_A)).into_indirect(),
            Dependency::addon(r(ADDON_B)).into_indirect(),
        ]
    );
}

#[test]
fn test_resolve_types_direct_entries_by_package() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    let resolved = registry
        .resolve_dependencies(&token, &[Dependency::build(r(ADDON_A))], false)
        .unwrap();
    assert_eq!(resolved.direct[0].package_type, PackageType::Addon);
}

#[test]
fn test_insert_local_package() {
    let fixture = TestRegistry::new();
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    let reference = r("local/addons/mine");
    let package = Package::new(
        PackageType::Addon,
        vec![Source::new("mine.py", None, Platform::Any)],
    );
    let mut packages = Packages::new();
    packages.insert(reference.clone(), package.clone());
    registry.insert_packages(&token, &packages).unwrap();

    let loaded = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![reference.clone()], true))
        .unwrap();
    assert_eq!(loaded[&reference], package);

    registry.remove_packages(&token, &[reference.clone()]).unwrap();
    assert!(!fixture.packages.join("local/addons/mine").exists());
}

#[test]
fn test_insert_rejects_invalid_package() {
    let fixture = TestRegistry::new();
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    let mut packages = Packages::new();
    packages.insert(r("local/builds/empty"), Package::new(PackageType::Build, Vec::new()));
    let err = registry.insert_packages(&token, &packages).unwrap_err();
    assert!(matches!(err, RocketError::PackageValidationFailed { .. }));
}

#[test]
fn test_remove_registry_clone() {
    let fixture = TestRegistry::new();
    fixture.publish(ADDON_A, &addon_yaml(None, &[]));
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_A)], false))
        .unwrap();
    let clone = fixture.packages.join("registry.test/org/repo");
    assert!(clone.exists());

    registry.remove_packages(&token, &[r(ADDON_A)]).unwrap();
    assert!(!clone.exists());
    registry.remove_packages(&token, &[r(ADDON_A)]).unwrap();
}

#[test]
fn test_local_package_missing() {
    let fixture = TestRegistry::new();
    let registry = fixture.registry(options());
    let token = CancellationToken::new();

    let err = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r("local/x/y")], false))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_cancelled_token() {
    let fixture = TestRegistry::new();
    let registry = fixture.registry(options());
    let token = CancellationToken::new();
    token.cancel();

    let err = registry
        .get_packages(&token, &GetPackagesOptions::shallow(vec![r(ADDON_A)], false))
        .unwrap_err();
    assert!(matches!(err, RocketError::Cancelled));
}
