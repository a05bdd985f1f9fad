use corvid::search::tt::{Bound, TranspositionTable, MATE_THRESHOLD};

#[test]
fn mate_score_normalizes_to_the_probing_ply() {
    let mut tt = TranspositionTable::new(1);
    let key = 123456789;

    // Mate found 5 plies below the node where it's stored, at ply 10.
    let search_score = MATE_THRESHOLD + 5;
    let search_ply = 10;
    tt.save(key, None, search_score, 5, Bound::Exact, search_ply);

    let hit = tt.probe(key, 0, search_ply).unwrap();
    assert_eq!(hit.score, search_score, "probing at the storing ply returns the original score");

    // A transposition reaching the same position later in the tree, 10 plies
    // deeper: the distance to mate grows by the same amount.
    let probe_ply = 20;
    let hit = tt.probe(key, 0, probe_ply).unwrap();
    assert_eq!(hit.score, search_score + (probe_ply - search_ply));
}

#[test]
fn depth_gate_rejects_shallow_entries() {
    let mut tt = TranspositionTable::new(1);
    tt.save(1, None, 10, 3, Bound::Exact, 0);
    assert!(tt.probe(1, 4, 0).is_none());
    assert!(tt.probe(1, 3, 0).is_some());
}
