//! End-to-end scenarios for the structural rewrite passes: vendor-branch
//! import normalization, dead-on-add removal, trunk-only exclusion with
//! grafting, tag/branch mutation, and preferred-parent reparenting.

use chrono::{TimeZone, Utc};
use cvs_internal::internal::db::{
    CvsFileRecord, InMemoryCvsFileDb, InMemoryMetadataDb,
};
use cvs_internal::internal::file_items::CvsFileItems;
use cvs_internal::internal::item::{
    CvsBranch, CvsItem, CvsRevision, CvsTag, FileId, ItemId, MetadataId, RevisionKind, SymbolId,
};
use cvs_internal::internal::symbol::{InMemorySymbolDb, Symbol};
use std::path::PathBuf;

const TRUNK: SymbolId = SymbolId(0);
const VENDOR: SymbolId = SymbolId(1);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn revision(id: u32, rev: &str, lod: SymbolId, kind: RevisionKind) -> CvsRevision {
    CvsRevision {
        id: ItemId(id),
        rev: rev.to_string(),
        lod,
        timestamp: Utc.timestamp_opt(1_000_000_000 + id as i64, 0).unwrap(),
        metadata_id: MetadataId(id),
        kind,
        deltatext_exists: true,
        prev_id: None,
        next_id: None,
        first_on_branch_id: None,
        default_branch_revision: false,
        default_branch_prev_id: None,
        default_branch_next_id: None,
        tag_ids: vec![],
        branch_ids: vec![],
        branch_commit_ids: vec![],
        closed_symbol_ids: vec![],
    }
}

fn branch(id: u32, symbol: SymbolId, source_lod: SymbolId, source: u32) -> CvsBranch {
    CvsBranch {
        id: ItemId(id),
        symbol_id: symbol,
        branch_number: None,
        source_lod,
        source_id: ItemId(source),
        next_id: None,
        tag_ids: vec![],
        branch_ids: vec![],
        noop: false,
    }
}

fn tag(id: u32, symbol: SymbolId, source_lod: SymbolId, source: u32) -> CvsTag {
    CvsTag {
        id: ItemId(id),
        symbol_id: symbol,
        source_lod,
        source_id: ItemId(source),
        noop: false,
    }
}

fn file_db(file_id: FileId) -> InMemoryCvsFileDb {
    let mut db = InMemoryCvsFileDb::new();
    db.insert(CvsFileRecord {
        id: file_id,
        filename: PathBuf::from("proj/foo.c,v"),
        basename: "foo.c".to_string(),
        project: "proj".to_string(),
    });
    db
}

/// The pure-import shape of scenario S1:
/// `1.1 (noop, "Initial revision\n") -> 1.2 (modification)`, vendor branch
/// `1.1.1` sprouting at `1.1`, first vendor revision `1.1.1.1`
/// (modification, no deltatext).
fn pure_import() -> CvsFileItems {
    let mut r11 = revision(1, "1.1", TRUNK, RevisionKind::Noop);
    let mut r12 = revision(2, "1.2", TRUNK, RevisionKind::Change);
    let mut vendor = branch(3, VENDOR, TRUNK, 1);
    vendor.branch_number = Some("1.1.1".to_string());
    let mut v1 = revision(4, "1.1.1.1", VENDOR, RevisionKind::Change);

    r11.next_id = Some(ItemId(2));
    r12.prev_id = Some(ItemId(1));
    r11.branch_ids = vec![ItemId(3)];
    r11.branch_commit_ids = vec![ItemId(4)];
    vendor.next_id = Some(ItemId(4));
    v1.first_on_branch_id = Some(ItemId(3));
    v1.deltatext_exists = false;

    CvsFileItems::new(
        FileId(0xf0),
        TRUNK,
        vec![r11.into(), r12.into(), CvsItem::Branch(vendor), v1.into()],
    )
}

#[test]
fn s1_pure_import_normalization() {
    init_tracing();
    let mut fi = pure_import();
    fi.adjust_ntdbrs(true, &[ItemId(4)], Some(ItemId(2))).unwrap();

    // 1.1 is gone, and so is the vendor branch node.
    assert!(!fi.contains(ItemId(1)));
    assert!(!fi.contains(ItemId(3)));

    // 1.1.1.1 is a root with position-type Add and the cross edge to 1.2.
    let v1 = fi.revision(ItemId(4)).unwrap();
    assert!(fi.root_ids().contains(&ItemId(4)));
    assert_eq!(v1.kind, RevisionKind::Add);
    assert_eq!(v1.default_branch_next_id, Some(ItemId(2)));

    let r12 = fi.revision(ItemId(2)).unwrap();
    assert_eq!(r12.default_branch_prev_id, Some(ItemId(4)));
    assert_eq!(r12.kind, RevisionKind::Change);

    fi.check_link_consistency().unwrap();
}

#[test]
fn s2_dead_on_branch_add() {
    init_tracing();
    let branch_sym = SymbolId(2);
    let mut r11 = revision(1, "1.1", TRUNK, RevisionKind::Noop);
    let mut b = branch(2, branch_sym, TRUNK, 1);
    let mut b1 = revision(3, "1.1.2.1", branch_sym, RevisionKind::Add);
    r11.branch_ids = vec![ItemId(2)];
    r11.branch_commit_ids = vec![ItemId(3)];
    b.next_id = Some(ItemId(3));
    b1.first_on_branch_id = Some(ItemId(2));

    let mut fi = CvsFileItems::new(
        FileId(0xf1),
        TRUNK,
        vec![r11.into(), CvsItem::Branch(b), b1.into()],
    );
    let files = file_db(fi.file_id());
    let mut metadata = InMemoryMetadataDb::new();
    metadata.insert(
        MetadataId(1),
        "",
        "file foo.c was initially added on branch B.\n",
    );

    fi.remove_unneeded_deletes(&files, &metadata).unwrap();

    assert!(!fi.contains(ItemId(1)));
    let b1 = fi.revision(ItemId(3)).unwrap();
    assert!(fi.root_ids().contains(&ItemId(3)));
    assert!(!b1.default_branch_revision);
    assert!(b1.closed_symbol_ids.is_empty());
    fi.check_link_consistency().unwrap();
}

#[test]
fn s3_graft_after_import() {
    init_tracing();
    let mut fi = pure_import();
    fi.adjust_ntdbrs(true, &[ItemId(4)], Some(ItemId(2))).unwrap();
    fi.exclude_non_trunk().unwrap();

    let v1 = fi.revision(ItemId(4)).unwrap();
    assert_eq!(v1.lod, TRUNK);
    assert!(!v1.default_branch_revision);
    assert_eq!(v1.default_branch_next_id, None);
    assert_eq!(v1.next_id, Some(ItemId(2)));
    let r12 = fi.revision(ItemId(2)).unwrap();
    assert_eq!(r12.prev_id, Some(ItemId(4)));
    assert_eq!(r12.default_branch_prev_id, None);

    // Only trunk LODs and no symbol nodes remain.
    for lod_items in fi.iter_lods() {
        assert_eq!(lod_items.lod, TRUNK);
        assert!(lod_items.child_branches.is_empty());
        assert!(lod_items.child_tags.is_empty());
    }
    assert!(fi.iter_values().all(|item| item.as_revision().is_some()));
    fi.check_link_consistency().unwrap();
}

#[test]
fn s4_tag_branch_mutation() {
    init_tracing();
    let tagged_branch = SymbolId(3);
    let mut r11 = revision(1, "1.1", TRUNK, RevisionKind::Add);
    let b = branch(2, tagged_branch, TRUNK, 1);
    r11.branch_ids = vec![ItemId(2)];
    let mut fi = CvsFileItems::new(FileId(0xf2), TRUNK, vec![r11.into(), CvsItem::Branch(b)]);

    let mut symbols = InMemorySymbolDb::new();
    symbols.insert(Symbol::Trunk { id: TRUNK });
    symbols.insert(Symbol::Tag {
        id: tagged_branch,
        name: "ACTUALLY_A_TAG".to_string(),
        preferred_parent_id: None,
    });

    fi.mutate_symbols(&symbols).unwrap();

    assert!(fi.tag(ItemId(2)).is_ok());
    let r11 = fi.revision(ItemId(1)).unwrap();
    assert!(!r11.branch_ids.contains(&ItemId(2)));
    assert!(r11.tag_ids.contains(&ItemId(2)));
    fi.check_link_consistency().unwrap();

    // Running the pass again changes nothing.
    let snapshot = serde_json::to_string(&fi).unwrap();
    fi.mutate_symbols(&symbols).unwrap();
    assert_eq!(serde_json::to_string(&fi).unwrap(), snapshot);

    // With a commit on the branch the mutation is fatal.
    let mut fi = {
        let mut r11 = revision(1, "1.1", TRUNK, RevisionKind::Add);
        let mut b = branch(2, tagged_branch, TRUNK, 1);
        let mut c = revision(3, "1.1.2.1", tagged_branch, RevisionKind::Change);
        r11.branch_ids = vec![ItemId(2)];
        r11.branch_commit_ids = vec![ItemId(3)];
        b.next_id = Some(ItemId(3));
        c.first_on_branch_id = Some(ItemId(2));
        CvsFileItems::new(
            FileId(0xf3),
            TRUNK,
            vec![r11.into(), CvsItem::Branch(b), c.into()],
        )
    };
    assert!(fi.mutate_symbols(&symbols).is_err());
}

#[test]
fn s6_preferred_parent_reparenting() {
    init_tracing();
    let b1_sym = SymbolId(1);
    let b2_sym = SymbolId(2);
    let tag_sym = SymbolId(3);

    let build = |preferred: SymbolId| {
        let mut r = revision(1, "1.1", TRUNK, RevisionKind::Add);
        let b1 = branch(2, b1_sym, TRUNK, 1);
        let b2 = branch(3, b2_sym, TRUNK, 1);
        let t = tag(4, tag_sym, TRUNK, 1);
        r.branch_ids = vec![ItemId(2), ItemId(3)];
        r.tag_ids = vec![ItemId(4)];
        let fi = CvsFileItems::new(
            FileId(0xf4),
            TRUNK,
            vec![
                r.into(),
                CvsItem::Branch(b1),
                CvsItem::Branch(b2),
                CvsItem::Tag(t),
            ],
        );
        let mut symbols = InMemorySymbolDb::new();
        symbols.insert(Symbol::Trunk { id: TRUNK });
        symbols.insert(Symbol::Branch {
            id: b1_sym,
            name: "B1".to_string(),
            preferred_parent_id: None,
        });
        symbols.insert(Symbol::Branch {
            id: b2_sym,
            name: "B2".to_string(),
            preferred_parent_id: None,
        });
        symbols.insert(Symbol::Tag {
            id: tag_sym,
            name: "Tg".to_string(),
            preferred_parent_id: Some(preferred),
        });
        (fi, symbols)
    };

    // Preferred parent B2: the tag moves onto B2's branch node.
    let (mut fi, symbols) = build(b2_sym);
    fi.adjust_parents(&symbols).unwrap();
    let t = fi.tag(ItemId(4)).unwrap();
    assert_eq!(t.source_id, ItemId(3));
    assert_eq!(t.source_lod, b2_sym);
    assert!(fi.branch(ItemId(3)).unwrap().tag_ids.contains(&ItemId(4)));
    fi.check_link_consistency().unwrap();

    // Stability: a second run converges.
    let snapshot = serde_json::to_string(&fi).unwrap();
    fi.adjust_parents(&symbols).unwrap();
    assert_eq!(serde_json::to_string(&fi).unwrap(), snapshot);

    // Preferred parent absent from this revision: nothing changes.
    let (mut fi, mut symbols) = build(SymbolId(9));
    symbols.insert(Symbol::Branch {
        id: SymbolId(9),
        name: "ELSEWHERE".to_string(),
        preferred_parent_id: None,
    });
    fi.adjust_parents(&symbols).unwrap();
    assert_eq!(fi.tag(ItemId(4)).unwrap().source_id, ItemId(1));
    fi.check_link_consistency().unwrap();
}

#[test]
fn full_pass_sequence_on_imported_file() {
    init_tracing();
    // The passes in driver order over the import shape, finishing with a
    // trunk-only graph whose invariants hold at every boundary.
    let mut fi = pure_import();
    let files = file_db(fi.file_id());
    let mut metadata = InMemoryMetadataDb::new();
    metadata.insert(MetadataId(1), "", "Initial revision\n");

    fi.adjust_ntdbrs(true, &[ItemId(4)], Some(ItemId(2))).unwrap();
    fi.check_link_consistency().unwrap();

    fi.remove_unneeded_deletes(&files, &metadata).unwrap();
    fi.check_link_consistency().unwrap();

    fi.remove_initial_branch_deletes(&files, &metadata).unwrap();
    fi.check_link_consistency().unwrap();

    fi.exclude_non_trunk().unwrap();
    fi.check_link_consistency().unwrap();

    fi.refine_symbols().unwrap();
    fi.check_link_consistency().unwrap();

    let trunk_revs: Vec<String> = fi
        .iter_lods()
        .flat_map(|lod| lod.revisions)
        .map(|id| fi.revision(id).unwrap().rev.clone())
        .collect();
    assert_eq!(trunk_revs, vec!["1.1.1.1".to_string(), "1.2".to_string()]);
}

#[test]
fn container_serde_round_trip() {
    init_tracing();
    let fi = pure_import();
    let json = serde_json::to_string(&fi).unwrap();
    let back: CvsFileItems = serde_json::from_str(&json).unwrap();
    assert_eq!(back.root_ids(), fi.root_ids());
    assert_eq!(back.len(), fi.len());
    back.check_link_consistency().unwrap();
}

mod properties {
    use cvs_internal::internal::item::RevisionKind;
    use quickcheck::quickcheck;

    quickcheck! {
        /// The transition table preserves the modification bit it was
        /// keyed on.
        fn derive_preserves_modification_bit(this_mod: bool, prev_mod: bool) -> bool {
            RevisionKind::derive(this_mod, prev_mod).is_modification() == this_mod
        }

        /// Exactly the (false, true) input produces a delete.
        fn derive_delete_only_after_modification(this_mod: bool, prev_mod: bool) -> bool {
            RevisionKind::derive(this_mod, prev_mod).is_delete() == (!this_mod && prev_mod)
        }
    }
}
