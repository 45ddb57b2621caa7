//! Properties of the DOT statement sets: dedup, order independence, and
//! column alignment, over generated inputs.

#[macro_use]
extern crate proptest;

use proptest::prelude::{Strategy, prop};

use fluxdot::dot::{AttrList, EdgeSet, NodeSet};

fn id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,14}").unwrap()
}

proptest! {
    #[test]
    fn node_text_is_insertion_order_independent(
        ids in prop::collection::vec(id_strategy(), 1..24),
    ) {
        let mut forward = NodeSet::new();
        let mut backward = NodeSet::new();
        for (i, id) in ids.iter().enumerate() {
            let attrs = (i % 2 == 0).then(|| AttrList::new().with("color", "red"));
            forward.insert(id, attrs);
        }
        for (i, id) in ids.iter().enumerate().rev() {
            let attrs = (i % 2 == 0).then(|| AttrList::new().with("color", "red"));
            backward.insert(id, attrs);
        }
        prop_assert_eq!(forward.render(1), backward.render(1));
    }

    #[test]
    fn edge_text_is_insertion_order_independent(
        pairs in prop::collection::vec((id_strategy(), id_strategy()), 1..24),
    ) {
        let mut forward = EdgeSet::new();
        let mut backward = EdgeSet::new();
        for (i, (src, dst)) in pairs.iter().enumerate() {
            let attrs = (i % 2 == 0).then(|| AttrList::new().with("label", "1.00"));
            forward.insert(src, dst, attrs);
        }
        for (i, (src, dst)) in pairs.iter().enumerate().rev() {
            let attrs = (i % 2 == 0).then(|| AttrList::new().with("label", "1.00"));
            backward.insert(src, dst, attrs);
        }
        prop_assert_eq!(forward.render(2), backward.render(2));
    }

    #[test]
    fn duplicate_insertions_never_change_the_text(
        ids in prop::collection::vec(id_strategy(), 1..12),
    ) {
        let mut once = NodeSet::new();
        let mut thrice = NodeSet::new();
        for id in &ids {
            once.insert_plain(id);
            thrice.insert_plain(id);
            thrice.insert_plain(id);
            thrice.insert_plain(id);
        }
        prop_assert_eq!(once.len(), thrice.len());
        prop_assert_eq!(once.render(0), thrice.render(0));
    }

    #[test]
    fn attributed_node_brackets_share_a_column(
        ids in prop::collection::vec(id_strategy(), 2..16),
    ) {
        let mut nodes = NodeSet::new();
        for id in &ids {
            nodes.insert(id, Some(AttrList::new().with("shape", "box")));
        }
        let text = nodes.render(1);
        let columns: Vec<usize> = text
            .lines()
            .map(|line| line.trim_start_matches('\t').find('[').unwrap())
            .collect();
        prop_assert!(columns.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn edge_arrows_and_brackets_share_columns(
        pairs in prop::collection::vec((id_strategy(), id_strategy()), 2..16),
    ) {
        let mut edges = EdgeSet::new();
        for (src, dst) in &pairs {
            edges.insert(src, dst, Some(AttrList::new().with("label", "2.00")));
        }
        let text = edges.render(1);
        let arrow_cols: Vec<usize> = text
            .lines()
            .map(|line| line.trim_start_matches('\t').find(" -> ").unwrap())
            .collect();
        let bracket_cols: Vec<usize> = text
            .lines()
            .map(|line| line.trim_start_matches('\t').find('[').unwrap())
            .collect();
        prop_assert!(arrow_cols.windows(2).all(|w| w[0] == w[1]));
        prop_assert!(bracket_cols.windows(2).all(|w| w[0] == w[1]));
    }
}

#[test]
fn empty_sets_render_placeholder_comments() {
    assert_eq!(NodeSet::new().render(3), "// no nodes in this section");
    assert_eq!(EdgeSet::new().render(3), "// no edges in this section");
}

#[test]
fn a_long_bare_id_does_not_widen_the_bracket_column() {
    let mut nodes = NodeSet::new();
    nodes.insert("coal", Some(AttrList::new().with("shape", "box")));
    nodes.insert_plain("a_very_long_unattributed_node_id");
    let text = nodes.render(1);
    let attributed = text
        .lines()
        .find(|line| line.contains('['))
        .expect("one attributed line")
        .trim_start_matches('\t');
    assert!(attributed.starts_with("\"coal\" ["), "got: {attributed}");
}

#[test]
fn continuation_lines_carry_the_requested_indent() {
    let mut nodes = NodeSet::new();
    nodes.insert_plain("alpha");
    nodes.insert_plain("beta");
    let text = nodes.render(2);
    assert_eq!(text, "\"alpha\" ;\n\t\t\"beta\" ;");
}
