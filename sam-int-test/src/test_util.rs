use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sam_rtree::{BoundingBox, RTree, RTreeConfig, SpatialResult, SyncRTree};
use std::backtrace::Backtrace;
use std::time::Instant;

/// Seed used by every randomized test unless the test picks its own.
pub const DEFAULT_SEED: u64 = 0x5A4D_2024;

/// Runs a test between a setup and a teardown step.
/// The teardown step runs even if the test body returns an error.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> SpatialResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx)
                    .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let elapsed = start_time.elapsed();

    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", panic_err.type_id())
            };
            (format!("Panic: {}", err_msg), String::new())
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", elapsed);
    eprintln!("Error: {}", error);
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");

    panic!("Test failed. Last error: {}", error);
}

#[derive(Clone)]
pub struct TestContext {
    seed: u64,
    index: SyncRTree<u64>,
}

impl TestContext {
    pub fn new(seed: u64, index: SyncRTree<u64>) -> Self {
        Self { seed, index }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn index(&self) -> SyncRTree<u64> {
        self.index.clone()
    }

    /// Fresh generator, identical for every call on the same context.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }
}

/// Small nodes (4 / 2) so that a handful of inserts already splits.
pub fn small_config() -> RTreeConfig {
    RTreeConfig::new(4).with_min_nodes(2)
}

pub fn create_test_context() -> SpatialResult<TestContext> {
    Ok(TestContext::new(
        DEFAULT_SEED,
        SyncRTree::with_config(small_config())?,
    ))
}

pub fn create_default_test_context() -> SpatialResult<TestContext> {
    Ok(TestContext::new(DEFAULT_SEED, SyncRTree::new()))
}

/// Verifies the index is structurally sound, then empties it.
pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    use sam_rtree::SpatialIndex;

    let report = ctx.index().read(|tree| tree.check_integrity());
    assert!(report.is_valid, "integrity errors: {:?}", report.errors);
    ctx.index().clear()
}

pub fn small_tree<V: Clone + PartialEq>() -> RTree<V> {
    match RTree::with_config(small_config()) {
        Ok(tree) => tree,
        Err(e) => panic!("small config rejected: {}", e),
    }
}

/// Random rectangle with its lower corner inside `extent` and sides up to `max_side`.
pub fn random_box(rng: &mut impl Rng, extent: f64, max_side: f64) -> BoundingBox {
    let x = rng.random_range(0.0..extent);
    let y = rng.random_range(0.0..extent);
    let w = rng.random_range(0.0..=max_side);
    let h = rng.random_range(0.0..=max_side);
    BoundingBox::new(x, y, x + w, y + h)
}

pub fn random_boxes(rng: &mut impl Rng, count: usize, extent: f64, max_side: f64) -> Vec<BoundingBox> {
    (0..count).map(|_| random_box(rng, extent, max_side)).collect()
}

/// Unit square whose lower corner sits on cell `(i % columns, i / columns)` of a grid with `spacing`.
pub fn grid_box(i: usize, columns: usize, spacing: f64) -> BoundingBox {
    let x = (i % columns) as f64 * spacing;
    let y = (i / columns) as f64 * spacing;
    BoundingBox::new(x, y, x + 1.0, y + 1.0)
}

/// Brute-force intersection query over a plain list.
pub fn oracle_intersecting(entries: &[(BoundingBox, u64)], query: &BoundingBox) -> Vec<u64> {
    let mut found: Vec<u64> = entries
        .iter()
        .filter(|(mbr, _)| mbr.intersects(query))
        .map(|(_, v)| *v)
        .collect();
    found.sort_unstable();
    found
}

pub fn whole_plane() -> BoundingBox {
    BoundingBox::new(f64::MIN, f64::MIN, f64::MAX, f64::MAX)
}

/// Full-plane search, sorted.
pub fn all_values<V: Clone + PartialEq + Ord>(tree: &RTree<V>) -> Vec<V> {
    let mut values = Vec::new();
    tree.search(&whole_plane(), &mut values);
    values.sort();
    values
}

pub fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values
}
