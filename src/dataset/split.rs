use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices assigned to each side of a train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and carve off `ceil(n * test_fraction)`
/// rows for testing.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, String> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(format!("Invalid test fraction {test_fraction} (expected 0 < f < 1)"));
    }
    let test_n = ((n as f64) * test_fraction).ceil() as usize;
    if test_n == 0 || test_n >= n {
        return Err(format!(
            "Cannot split {n} rows with test fraction {test_fraction}"
        ));
    }
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(test_n);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}
