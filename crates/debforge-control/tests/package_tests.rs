//! Source packages loaded from disk, registered and ordered

use debforge_control::{
    full_license_text, ControlError, CopyrightLicense, Environment, Registry, SourcePackage,
};
use std::path::Path;
use tempfile::TempDir;

// Test helper: write a complete package directory
fn write_package(root: &Path, name: &str, version: &str, build_depends: &str, binaries: &[&str]) {
    let debian = root.join(name).join("debian");
    std::fs::create_dir_all(&debian).unwrap();

    let mut control = format!(
        "Source: {}\nMaintainer: Jane Doe <jane@example.com>\nBuild-Depends: {}\nStandards-Version: 4.5.0\n",
        name, build_depends
    );
    for binary in binaries {
        control.push_str(&format!(
            "\nPackage: {}\nArchitecture: any\nDescription: {} package\n",
            binary, binary
        ));
    }
    std::fs::write(debian.join("control"), control).unwrap();

    let changelog = format!(
        "{} ({}) focal; urgency=medium\n\n  * Initial release.\n\n -- Jane Doe <jane@example.com>  Mon, 05 Apr 2021 11:13:34 +0300\n\n",
        name, version
    );
    std::fs::write(debian.join("changelog"), changelog).unwrap();

    std::fs::write(
        debian.join("copyright"),
        "Format: https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/\nUpstream-Name: test\n",
    )
    .unwrap();
}

fn environment(root: &Path) -> Environment {
    Environment::new(
        "focal",
        "amd64",
        root,
        root.join("build"),
        root.join("artifacts"),
    )
}

fn register(root: &Path, names: &[&str]) -> Registry {
    let env = environment(root);
    let mut registry = Registry::new(&env);
    for name in names {
        let mut package = SourcePackage::new(root.join(name), &env).unwrap();
        package.complete().unwrap();
        registry.add(package).unwrap();
    }
    registry
}

fn order(registry: &Registry) -> Vec<String> {
    registry
        .build_order()
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect()
}

#[test]
fn test_library_is_built_before_its_users() {
    let root = TempDir::new().unwrap();
    write_package(root.path(), "myapp", "0.1-1", "debhelper-compat (= 12), libfoo1", &["myapp"]);
    write_package(root.path(), "libfoo", "1.0-1", "debhelper-compat (= 12)", &["libfoo1"]);

    let registry = register(root.path(), &["myapp", "libfoo"]);
    assert_eq!(order(&registry), vec!["libfoo", "myapp"]);
}

#[test]
fn test_circular_build_dependencies() {
    let root = TempDir::new().unwrap();
    write_package(root.path(), "a", "1.0-1", "b-bin", &["a-bin"]);
    write_package(root.path(), "b", "1.0-1", "a-bin", &["b-bin"]);

    let registry = register(root.path(), &["a", "b"]);
    let err = registry.build_order().unwrap_err();
    assert!(matches!(err, ControlError::CircularDependency(ref names) if names == &["a", "b"]));
    assert!(err.to_string().contains("a, b"));
    assert!(!err.is_unexpected());
}

#[test]
fn test_distribution_packages_impose_no_order() {
    let root = TempDir::new().unwrap();
    write_package(root.path(), "zlib-tools", "1.0-1", "zlib1g-dev, libc6-dev", &["zlib-tools"]);
    write_package(root.path(), "hello", "2.10-2", "debhelper-compat (= 12)", &["hello"]);

    let registry = register(root.path(), &["zlib-tools", "hello"]);
    assert_eq!(order(&registry), vec!["zlib-tools", "hello"]);
}

#[test]
fn test_pin_build_dependency_to_registered_version() {
    let root = TempDir::new().unwrap();
    write_package(root.path(), "libfoo", "1.0-1", "debhelper-compat (= 12)", &["libfoo1", "libfoo-dev"]);
    write_package(root.path(), "myapp", "0.1-1", "libfoo-dev (>= 0.9)", &["myapp"]);

    let mut registry = register(root.path(), &["libfoo", "myapp"]);
    let pinned = registry.make_relation("libfoo-dev").unwrap();

    let myapp = registry.get_mut("myapp").unwrap();
    let source = myapp.control.source.as_mut().unwrap();
    source
        .build_depends
        .as_mut()
        .unwrap()
        .add_relation(pinned, true)
        .unwrap();
    myapp.save().unwrap();

    let written = std::fs::read_to_string(root.path().join("myapp/debian/control")).unwrap();
    assert!(written.contains("libfoo-dev (= 1.0-1)"));
    assert!(!written.contains(">= 0.9"));
}

#[test]
fn test_name_must_match_directory() {
    let root = TempDir::new().unwrap();
    write_package(root.path(), "hello", "1.0-1", "debhelper-compat (= 12)", &["hello"]);
    std::fs::rename(root.path().join("hello"), root.path().join("goodbye")).unwrap();

    let err = SourcePackage::new(root.path().join("goodbye"), &environment(root.path())).unwrap_err();
    assert!(matches!(err, ControlError::NameMismatch { .. }));
}

#[test]
fn test_mit_license_text_in_copyright_file() {
    let text = full_license_text("MIT").unwrap();
    let body: Vec<&str> = text.lines().skip(1).collect();
    assert!(body
        .iter()
        .all(|line| line.starts_with(' ') && !line.starts_with("  ")));
    assert!(body.contains(&" ."));

    let root = TempDir::new().unwrap();
    write_package(root.path(), "hello", "1.0-1", "debhelper-compat (= 12)", &["hello"]);
    let mut package = SourcePackage::new(root.path().join("hello"), &environment(root.path())).unwrap();
    package
        .copyright
        .add_license(CopyrightLicense::spdx("MIT").unwrap())
        .unwrap();

    let written = std::fs::read_to_string(root.path().join("hello/debian/copyright")).unwrap();
    assert!(written.contains("\nLicense: MIT\n Permission is hereby granted"));
    assert!(written.contains("\n .\n"));
}
