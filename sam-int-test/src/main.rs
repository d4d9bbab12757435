use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sam_int_test::test_util::{cleanup, create_default_test_context, random_box, DEFAULT_SEED};
use sam_rtree::{BoundingBox, SpatialError, SpatialIndex, SpatialResult};

fn main() -> SpatialResult<()> {
    colog::init();
    info!("Starting stress test...");
    let ctx = create_default_test_context()?;
    let index = ctx.index();
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);

    let count = 1_000_000u64;
    let mut boxes = Vec::with_capacity(count as usize);

    let start = std::time::Instant::now();
    for id in 0..count {
        let mbr = random_box(&mut rng, 10_000.0, 5.0);
        index.add(&mbr, id)?;
        boxes.push(mbr);
    }
    let elapsed = start.elapsed();
    info!(
        "Inserted {} entries in {:?} ({} nodes, height {})",
        count,
        elapsed,
        index.size(),
        index.height()
    );

    let start = std::time::Instant::now();
    let mut hits = 0;
    for i in 0..1000 {
        let x = (i % 100) as f64 * 100.0;
        let y = (i / 100) as f64 * 1000.0;
        hits += index
            .find_intersecting_keys(&BoundingBox::new(x, y, x + 50.0, y + 50.0))?
            .len();
    }
    info!("Ran 1000 window queries ({} hits) in {:?}", hits, start.elapsed());

    let start = std::time::Instant::now();
    let mut removed = 0u64;
    for (id, mbr) in boxes.iter().enumerate().step_by(2) {
        if index.remove(mbr, &(id as u64))? {
            removed += 1;
        }
    }
    let expected = count.div_ceil(2);
    if removed != expected || index.entry_count() as u64 != count - removed {
        return Err(SpatialError::InvalidOperation(format!(
            "removed {} of {} entries, {} left",
            removed,
            expected,
            index.entry_count()
        )));
    }
    info!(
        "Removed {} entries in {:?} ({} nodes, height {})",
        removed,
        start.elapsed(),
        index.size(),
        index.height()
    );

    let start = std::time::Instant::now();
    let stats = index.rebuild();
    info!("Rebuilt in {:?}: {:?}", start.elapsed(), stats);

    cleanup(ctx)
}
