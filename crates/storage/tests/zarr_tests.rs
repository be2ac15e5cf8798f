//! Reading Zarr stores written to a temp directory.

use std::path::Path;
use std::sync::Arc;

use grid_dataset::cf::EPOCH_UNITS;
use serde_json::json;
use storage::{open_zarr, storage_for, StorageError, ZarrStoreOpener};
use test_utils::assert_approx_eq;
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn attrs(dims: &[&str], extra: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("_ARRAY_DIMENSIONS".to_string(), json!(dims));
    if let serde_json::Value::Object(extra) = extra {
        map.extend(extra);
    }
    map
}

fn write_f64(store: &Arc<FilesystemStore>, path: &str, dims: &[&str], values: &[f64], extra: serde_json::Value) -> TestResult {
    let array = ArrayBuilder::new(
        vec![values.len() as u64],
        DataType::Float64,
        vec![values.len() as u64].try_into()?,
        FillValue::from(f64::NAN),
    )
    .attributes(attrs(dims, extra))
    .build(store.clone(), path)?;
    array.store_metadata()?;
    let subset = ArraySubset::new_with_start_shape(vec![0], vec![values.len() as u64])?;
    array.store_array_subset_elements(&subset, values)?;
    Ok(())
}

/// A one-day store: `time(1)`, `lat(2)`, `lon(3)`, float `sst` and packed
/// int16 `analysed_sst`.
fn write_store(dir: &Path) -> TestResult {
    let store = Arc::new(FilesystemStore::new(dir)?);

    GroupBuilder::new()
        .attributes({
            let mut map = serde_json::Map::new();
            map.insert("title".to_string(), json!("synthetic SST"));
            map
        })
        .build(store.clone(), "/")?
        .store_metadata()?;

    write_f64(&store, "/time", &["time"], &[1.0], json!({"units": "days since 2023-01-01"}))?;
    write_f64(&store, "/lat", &["lat"], &[38.8, 38.9], json!({"units": "degrees_north"}))?;
    write_f64(&store, "/lon", &["lon"], &[-76.6, -76.55, -76.5], json!({}))?;

    let sst = ArrayBuilder::new(
        vec![1, 2, 3],
        DataType::Float32,
        vec![1u64, 2, 3].try_into()?,
        FillValue::from(f32::NAN),
    )
    .attributes(attrs(&["time", "lat", "lon"], json!({"units": "K"})))
    .build(store.clone(), "/sst")?;
    sst.store_metadata()?;
    let subset = ArraySubset::new_with_start_shape(vec![0, 0, 0], vec![1, 2, 3])?;
    sst.store_array_subset_elements::<f32>(&subset, &[280.0, 281.0, 282.0, 283.0, 284.0, 285.0])?;

    let packed = ArrayBuilder::new(
        vec![1, 2, 3],
        DataType::Int16,
        vec![1u64, 2, 3].try_into()?,
        FillValue::from(-32768i16),
    )
    .attributes(attrs(
        &["time", "lat", "lon"],
        json!({"scale_factor": 0.01, "add_offset": 273.15, "_FillValue": -32768}),
    ))
    .build(store.clone(), "/analysed_sst")?;
    packed.store_metadata()?;
    packed.store_array_subset_elements::<i16>(&subset, &[0, 100, -32768, 200, 300, 400])?;

    Ok(())
}

#[test]
fn test_open_store_structure() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_store(dir.path())?;

    let storage = storage_for(&dir.path().display().to_string(), "us-west-2")?;
    let ds = open_zarr(storage, "test store")?;

    assert_eq!(ds.dim_len("time"), Some(1));
    assert_eq!(ds.dim_len("lat"), Some(2));
    assert_eq!(ds.dim_len("lon"), Some(3));
    assert_eq!(ds.data_variable_names(), vec!["analysed_sst", "sst"]);
    assert_eq!(ds.indexed_dims().count(), 3);
    assert_eq!(ds.attributes.get("title"), Some(&json!("synthetic SST")));

    let lat = ds.variable("lat").unwrap();
    assert!(lat.is_coordinate());
    assert!(!lat.attributes.contains_key("_ARRAY_DIMENSIONS"));
    Ok(())
}

#[test]
fn test_time_coordinate_decoded() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_store(dir.path())?;

    let ds = open_zarr(storage_for(&dir.path().display().to_string(), "us-west-2")?, "t")?;

    let time = ds.index("time").unwrap();
    assert_eq!(time.values.as_slice(), &[1_672_617_600.0]);
    assert_eq!(
        ds.variable("time").unwrap().attributes.get("units"),
        Some(&json!(EPOCH_UNITS))
    );
    Ok(())
}

#[test]
fn test_data_read_lazily_and_unpacked() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_store(dir.path())?;

    let ds = open_zarr(storage_for(&dir.path().display().to_string(), "us-west-2")?, "t")?;

    let sst = ds.variable("sst").unwrap().load()?;
    assert_eq!(sst.shape, vec![1, 2, 3]);
    assert_eq!(sst.get(&[0, 1, 2]), Some(285.0));

    let packed = ds.variable("analysed_sst").unwrap().load()?;
    assert_approx_eq!(packed.get(&[0, 0, 0]).unwrap(), 273.15, 1e-6);
    assert_approx_eq!(packed.get(&[0, 0, 1]).unwrap(), 274.15, 1e-6);
    assert!(packed.get(&[0, 0, 2]).unwrap().is_nan());
    Ok(())
}

#[tokio::test]
async fn test_store_opener_local_path() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_store(dir.path())?;

    let opener = ZarrStoreOpener::new("us-west-2");
    let ds = opener
        .open(&format!("file://{}", dir.path().display()))
        .await?;
    assert!(ds.variable("sst").is_some());
    Ok(())
}

#[tokio::test]
async fn test_empty_store_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;

    let err = ZarrStoreOpener::new("us-west-2")
        .open(&dir.path().display().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Zarr { .. }));
    Ok(())
}
