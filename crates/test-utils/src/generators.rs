//! Synthetic gridded data for tests.
//!
//! Values follow simple formulas so that tests can check placement after
//! merging without storing expected arrays.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use grid_dataset::{
    ArrayData, ArraySource, Dataset, DatasetError, LazyArray, Variable,
};

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Creates a sea-surface-temperature-like grid in Kelvin (271K to 301K).
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f64 / width.max(1) as f64;
            let y_factor = row as f64 / height.max(1) as f64;
            data.push(271.0 + x_factor * 15.0 + y_factor * 15.0);
        }
    }
    data
}

/// Evenly spaced coordinate labels.
pub fn linspace(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// A single-time-step dataset with canonical names.
///
/// `var(time, lat, lon)` holds `time * 1_000_000 + create_test_grid(lon, lat)`,
/// so every cell identifies where it came from.
pub fn daily_dataset(time: f64, lats: &[f64], lons: &[f64], var: &str) -> Dataset {
    named_dataset(("time", "lat", "lon"), time, lats, lons, var)
}

/// Same layout as [`daily_dataset`] but with provider-style axis names
/// (`Time`, `Latitude`, `Longitude`).
pub fn provider_style_dataset(time: f64, lats: &[f64], lons: &[f64], var: &str) -> Dataset {
    named_dataset(("Time", "Latitude", "Longitude"), time, lats, lons, var)
}

fn named_dataset(
    (t, y, x): (&str, &str, &str),
    time: f64,
    lats: &[f64],
    lons: &[f64],
    var: &str,
) -> Dataset {
    let mut ds = Dataset::new();
    ds.add_index_coordinate(t, vec![time]).expect("time coordinate");
    ds.add_index_coordinate(y, lats.to_vec()).expect("lat coordinate");
    ds.add_index_coordinate(x, lons.to_vec()).expect("lon coordinate");

    let values = create_test_grid(lons.len(), lats.len())
        .into_iter()
        .map(|v| time * 1_000_000.0 + v)
        .collect();
    let data = ArrayData::new(vec![1, lats.len(), lons.len()], values).expect("grid shape");
    ds.add_variable(
        Variable::data(var, &[t, y, x], LazyArray::from_data(data))
            .with_attribute("units", "K"),
    )
    .expect("data variable");
    ds
}

/// Array source that counts how often it is read.
#[derive(Debug)]
pub struct CountingArray {
    data: ArrayData,
    loads: Arc<AtomicUsize>,
}

impl CountingArray {
    pub fn new(data: ArrayData) -> (Self, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        (
            Self {
                data,
                loads: loads.clone(),
            },
            loads,
        )
    }
}

impl ArraySource for CountingArray {
    fn shape(&self) -> &[usize] {
        &self.data.shape
    }

    fn load(&self) -> grid_dataset::Result<ArrayData> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// Array source whose reads always fail.
#[derive(Debug)]
pub struct FailingArray {
    shape: Vec<usize>,
}

impl FailingArray {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }
}

impl ArraySource for FailingArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn load(&self) -> grid_dataset::Result<ArrayData> {
        Err(DatasetError::read_failed("failing", "synthetic read failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_temperature_range() {
        let grid = create_temperature_grid(10, 10);
        assert!(grid.iter().all(|&t| (271.0..=301.0).contains(&t)));
    }

    #[test]
    fn test_daily_dataset_layout() {
        let ds = daily_dataset(2.0, &[0.0, 1.0], &[10.0, 20.0, 30.0], "sst");
        assert_eq!(ds.dim_len("lon"), Some(3));
        let sst = ds.variable("sst").unwrap().load().unwrap();
        assert_eq!(sst.get(&[0, 1, 2]), Some(2_000_000.0 + 2001.0));
    }

    #[test]
    fn test_counting_array() {
        let (source, loads) = CountingArray::new(ArrayData::vector(vec![1.0]));
        let array = LazyArray::new(source);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        array.load().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_array() {
        assert!(LazyArray::new(FailingArray::new(vec![2])).load().is_err());
    }
}
