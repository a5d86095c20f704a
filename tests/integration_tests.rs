use quadpack::{BoundingBox, IndexedPoint, QuadTree, QuadTreeBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;

fn payloads(points: &[IndexedPoint]) -> Vec<u64> {
    points.iter().map(|p| p.payload).collect()
}

fn sorted_payloads(points: &[IndexedPoint]) -> Vec<u64> {
    let mut out = payloads(points);
    out.sort_unstable();
    out
}

fn random_tree(count: u64, maxfill: u32, seed: u64) -> (QuadTree, Vec<IndexedPoint>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let region = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let mut builder = QuadTreeBuilder::new(region, maxfill).unwrap();

    let mut inserted = Vec::with_capacity(count as usize);
    for payload in 0..count {
        let point = IndexedPoint::new(payload, rng.random_range(0.0..1.0), rng.random_range(0.0..1.0));
        builder.insert(point).unwrap();
        inserted.push(point);
    }

    (builder.finalise(), inserted)
}

#[test]
fn test_query_outside_region_is_empty() {
    let mut builder = QuadTreeBuilder::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 2).unwrap();
    builder.insert(IndexedPoint::new(0xA, 1.0, 1.0)).unwrap();
    builder.insert(IndexedPoint::new(0xB, 9.0, 9.0)).unwrap();
    builder.insert(IndexedPoint::new(0xC, 5.0, 5.0)).unwrap();
    let tree = builder.finalise();

    let miss = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
    assert!(tree.query_array(&miss, 0).is_empty());
    assert!(tree.query_array_fast(&miss, 0).is_empty());
    assert_eq!(tree.query(&miss).count(), 0);
}

#[test]
fn test_boundary_points_are_reachable() {
    let mut builder = QuadTreeBuilder::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 2).unwrap();
    builder.insert(IndexedPoint::new(0xA, 1.0, 1.0)).unwrap();
    builder.insert(IndexedPoint::new(0xB, 9.0, 9.0)).unwrap();
    builder.insert(IndexedPoint::new(0xC, 5.0, 5.0)).unwrap();
    builder.insert(IndexedPoint::new(0xD, 5.0, 5.0)).unwrap();
    let tree = builder.finalise();

    // A degenerate query rectangle picks up exactly the midpoint pair.
    let center = BoundingBox::new(5.0, 5.0, 5.0, 5.0);
    assert_eq!(sorted_payloads(&tree.query_array(&center, 0)), vec![0xC, 0xD]);

    // The closed south-west window includes the boundary points, whichever
    // internal child they were placed in.
    let south_west = BoundingBox::new(0.0, 0.0, 5.0, 5.0);
    assert_eq!(
        sorted_payloads(&tree.query_array(&south_west, 0)),
        vec![0xA, 0xC, 0xD]
    );
}

#[test]
fn test_coincident_overflow_single_leaf() {
    let mut builder = QuadTreeBuilder::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 2).unwrap();
    for payload in 1..=5 {
        builder.insert(IndexedPoint::new(payload, 0.3, 0.3)).unwrap();
    }

    let stats = builder.stats();
    assert_eq!(stats.inner_count, 1);
    assert_eq!(stats.leaf_count, 1);

    let tree = builder.finalise();
    let all = tree.query_array(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0);
    assert_eq!(payloads(&all), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_full_region_returns_all_random_points() {
    let (tree, inserted) = random_tree(1000, 8, 42);
    let all = BoundingBox::new(0.0, 0.0, 1.0, 1.0);

    let slow = tree.query_array(&all, 0);
    let fast = tree.query_array_fast(&all, 0);
    assert_eq!(slow.len(), 1000);
    assert_eq!(sorted_payloads(&slow), (0..1000).collect::<Vec<_>>());
    assert_eq!(sorted_payloads(&fast), sorted_payloads(&slow));
    assert_eq!(inserted.len(), 1000);
}

#[test]
fn test_completeness_against_naive_filter() {
    let (tree, inserted) = random_tree(500, 4, 7);

    let windows = [
        BoundingBox::new(0.1, 0.1, 0.4, 0.9),
        BoundingBox::new(0.25, 0.25, 0.75, 0.75),
        BoundingBox::new(0.0, 0.0, 0.5, 0.5),
        BoundingBox::new(0.9, 0.9, 1.0, 1.0),
        BoundingBox::new(0.5, 0.0, 0.5, 1.0),
    ];

    for window in windows {
        let mut expected: Vec<u64> = inserted
            .iter()
            .filter(|p| window.contains_xy(p.x, p.y))
            .map(|p| p.payload)
            .collect();
        expected.sort_unstable();

        assert_eq!(sorted_payloads(&tree.query_array(&window, 0)), expected);
        assert_eq!(sorted_payloads(&tree.query_array_fast(&window, 0)), expected);
    }
}

#[test]
fn test_persistence_round_trip() {
    let (tree, _) = random_tree(1000, 8, 42);
    let all = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let before = sorted_payloads(&tree.query_array(&all, 0));

    let file = NamedTempFile::new().unwrap();
    tree.save(file.path()).unwrap();
    drop(tree);

    let loaded = QuadTree::load(file.path()).unwrap();
    assert_eq!(loaded.len(), 1000);
    assert_eq!(sorted_payloads(&loaded.query_array(&all, 0)), before);
    assert_eq!(
        sorted_payloads(&loaded.query_array_fast(&all, 0)),
        before
    );
}

#[test]
fn test_finalise_to_writes_equivalent_file() {
    let mut builder = QuadTreeBuilder::new(BoundingBox::new(0.0, 0.0, 4.0, 4.0), 2).unwrap();
    for (payload, x, y) in [(1u64, 0.5, 0.5), (2, 3.5, 0.5), (3, 2.0, 2.0), (4, 1.0, 3.0)] {
        builder.insert(IndexedPoint::new(payload, x, y)).unwrap();
    }

    let file = NamedTempFile::new().unwrap();
    let tree = builder.finalise_to(file.path()).unwrap();
    let loaded = QuadTree::load(file.path()).unwrap();

    assert_eq!(loaded.as_bytes(), tree.as_bytes());
}

#[test]
fn test_enclosed_subtree_skips_filtering() {
    let (tree, _) = random_tree(300, 4, 99);

    let mut iter = tree.query(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));
    let yielded = iter.by_ref().count();
    let stats = iter.stats();

    assert_eq!(yielded, 300);
    assert_eq!(stats.filtered_leaves, 0);
    assert_eq!(stats.points_tested, 0);
}

#[test]
fn test_fast_path_equivalence_random_windows() {
    let (tree, _) = random_tree(400, 4, 3);
    let mut rng = StdRng::seed_from_u64(17);

    for _ in 0..50 {
        let x1: f64 = rng.random_range(0.0..1.0);
        let y1: f64 = rng.random_range(0.0..1.0);
        let x2: f64 = rng.random_range(0.0..1.0);
        let y2: f64 = rng.random_range(0.0..1.0);
        let window = BoundingBox::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2));

        assert_eq!(
            sorted_payloads(&tree.query_array(&window, 0)),
            sorted_payloads(&tree.query_array_fast(&window, 0))
        );
    }
}

#[test]
fn test_maxn_limits_both_collectors() {
    let (tree, _) = random_tree(200, 8, 11);
    let all = BoundingBox::new(0.0, 0.0, 1.0, 1.0);

    for maxn in [1, 7, 50, 199, 200, 500] {
        let capped = tree.query_array(&all, maxn);
        let capped_fast = tree.query_array_fast(&all, maxn);
        assert_eq!(capped.len() as u64, maxn.min(200));
        assert_eq!(capped_fast.len() as u64, maxn.min(200));
    }
}

#[test]
fn test_empty_tree_round_trip() {
    let builder = QuadTreeBuilder::new(BoundingBox::new(-5.0, -5.0, 5.0, 5.0), 4).unwrap();
    let tree = builder.finalise();
    assert!(tree.is_empty());

    let file = NamedTempFile::new().unwrap();
    tree.save(file.path()).unwrap();
    let loaded = QuadTree::load(file.path()).unwrap();

    assert!(loaded.is_empty());
    assert_eq!(loaded.region(), BoundingBox::new(-5.0, -5.0, 5.0, 5.0));
    assert_eq!(
        loaded.query(&BoundingBox::new(-5.0, -5.0, 5.0, 5.0)).count(),
        0
    );
}

#[test]
fn test_negative_coordinates() {
    let mut builder =
        QuadTreeBuilder::new(BoundingBox::new(-180.0, -90.0, 180.0, 90.0), 4).unwrap();
    let cities = [
        (1u64, -74.0060, 40.7128),
        (2, -0.1278, 51.5074),
        (3, 2.3522, 48.8566),
        (4, 151.2093, -33.8688),
    ];
    for (payload, x, y) in cities {
        builder.insert(IndexedPoint::new(payload, x, y)).unwrap();
    }
    let tree = builder.finalise();

    // Western hemisphere only
    let west = BoundingBox::new(-180.0, -90.0, 0.0, 90.0);
    assert_eq!(sorted_payloads(&tree.query_array(&west, 0)), vec![1, 2]);

    // Southern hemisphere only
    let south = BoundingBox::new(-180.0, -90.0, 180.0, 0.0);
    assert_eq!(sorted_payloads(&tree.query_array(&south, 0)), vec![4]);
}

#[test]
fn test_deep_tree_stack_capacity() {
    // A tight cluster forces many levels of subdivision; the query stack
    // is sized from the recorded depth and must cope. Three points are
    // needed: the first pair merely doubles a one-item bucket, and only
    // the third overflows it into the split cascade.
    let mut builder = QuadTreeBuilder::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1).unwrap();
    builder.insert(IndexedPoint::new(1, 0.2000001, 0.2000001)).unwrap();
    builder.insert(IndexedPoint::new(2, 0.2000002, 0.2000002)).unwrap();
    builder.insert(IndexedPoint::new(3, 0.2000003, 0.2000003)).unwrap();
    let tree = builder.finalise();

    assert!(tree.max_depth() > 10);
    let all = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    assert_eq!(sorted_payloads(&tree.query_array(&all, 0)), vec![1, 2, 3]);

    let narrow = BoundingBox::new(0.2, 0.2, 0.2000001, 0.2000001);
    assert_eq!(sorted_payloads(&tree.query_array(&narrow, 0)), vec![1]);
}
