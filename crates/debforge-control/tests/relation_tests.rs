//! Relation field parsing and rendering tests

use debforge_control::{
    ArchRestriction, BuildRestriction, Comparator, ControlError, Dependency, PackageRelations,
    Relation, RelationItem, VersionConstraint,
};
use proptest::prelude::*;

fn comparator() -> impl Strategy<Value = Comparator> {
    prop_oneof![
        Just(Comparator::Equal),
        Just(Comparator::LessOrEqual),
        Just(Comparator::GreaterOrEqual),
        Just(Comparator::StrictlyLess),
        Just(Comparator::StrictlyGreater),
    ]
}

fn dependency() -> impl Strategy<Value = Dependency> {
    (
        "[a-z0-9][a-z0-9+.-]{0,12}",
        proptest::option::of("any|native|[a-z]{3,6}"),
        proptest::option::of((comparator(), "([0-9]:)?[0-9]{1,3}(\\.[0-9]{1,3}){0,2}(-[0-9]{1,2})?")),
        proptest::option::of(proptest::collection::vec(
            (any::<bool>(), "amd64|arm64|armel|i386|linux-any"),
            1..3,
        )),
        proptest::option::of(proptest::collection::vec(
            proptest::collection::vec((any::<bool>(), "nocheck|nodoc|cross|stage1"), 1..3),
            1..3,
        )),
    )
        .prop_map(|(name, archqual, version, arch, restrictions)| Dependency {
            name,
            archqual,
            version: version.map(|(op, v)| VersionConstraint::new(op, v)),
            arch: arch.map(|terms| {
                terms
                    .into_iter()
                    .map(|(enabled, arch)| ArchRestriction { enabled, arch })
                    .collect()
            }),
            restrictions: restrictions.map(|groups| {
                groups
                    .into_iter()
                    .map(|group| {
                        group
                            .into_iter()
                            .map(|(enabled, profile)| BuildRestriction { enabled, profile })
                            .collect()
                    })
                    .collect()
            }),
        })
}

proptest! {
    #[test]
    fn rendered_dependencies_parse_back(dep in dependency()) {
        let rendered = dep.to_string();
        prop_assert_eq!(Dependency::parse(&rendered).unwrap(), dep);
    }

    #[test]
    fn rendered_relation_lists_parse_back(
        alternatives in proptest::collection::vec(proptest::collection::vec(dependency(), 1..3), 0..5)
    ) {
        let relations: PackageRelations = alternatives
            .into_iter()
            .map(|deps| RelationItem::Relation(Relation::new(deps)))
            .collect();
        let rendered = relations.to_string();
        prop_assert_eq!(PackageRelations::parse(&rendered).unwrap(), relations.clone());
        prop_assert_eq!(PackageRelations::parse(&relations.to_multiline()).unwrap(), relations);
    }
}

#[test]
fn test_three_item_field() {
    let relations =
        PackageRelations::parse("${shlibs:Depends}, libfoo (>= 1.2), libbar | libbaz [amd64]").unwrap();
    assert_eq!(relations.len(), 3);

    match relations.get(0) {
        Some(RelationItem::Substitution(s)) => assert_eq!(s.as_str(), "${shlibs:Depends}"),
        other => panic!("expected a substitution, got {:?}", other),
    }

    let single = relations.get(1).and_then(RelationItem::as_relation).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].name, "libfoo");
    let constraint = single[0].version.as_ref().unwrap();
    assert_eq!(constraint.relationship, Comparator::GreaterOrEqual);
    assert_eq!(constraint.version, "1.2");

    let alternatives = relations.get(2).and_then(RelationItem::as_relation).unwrap();
    assert_eq!(alternatives.names().collect::<Vec<_>>(), vec!["libbar", "libbaz"]);
    assert_eq!(
        alternatives[1].arch,
        Some(vec![ArchRestriction {
            enabled: true,
            arch: "amd64".to_string()
        }])
    );

    assert_eq!(
        relations.names().collect::<Vec<_>>(),
        vec!["libfoo", "libbar", "libbaz"]
    );
    assert_eq!(
        relations.to_string(),
        "${shlibs:Depends}, libfoo (>= 1.2), libbar | libbaz [amd64]"
    );
}

#[test]
fn test_conflicting_relation_left_untouched() {
    let mut relations = PackageRelations::parse("libfoo (>= 1.0), libbar").unwrap();
    let err = relations
        .add_relation(Relation::parse("libfoo (>= 2.0)").unwrap(), false)
        .unwrap_err();
    assert!(matches!(err, ControlError::ConflictingRelation { .. }));
    assert_eq!(relations.to_string(), "libfoo (>= 1.0), libbar");

    relations
        .add_relation(Relation::parse("libfoo (>= 2.0)").unwrap(), true)
        .unwrap();
    assert_eq!(relations.to_string(), "libbar, libfoo (>= 2.0)");
}

#[test]
fn test_invalid_relations() {
    for value in ["(>= 1.0)", "libfoo (~= 1.0)", "libfoo (>= 1.0", "libfoo [amd64"] {
        let err = PackageRelations::parse(value).unwrap_err();
        assert!(
            matches!(err, ControlError::InvalidRelation { .. }),
            "{} gave {}",
            value,
            err
        );
    }
}
