//! Zarr store access.
//!
//! A store is read as one [`Dataset`]: every array in the hierarchy becomes a
//! variable. Dimension coordinates are read at open time and indexed; all
//! other arrays are read on demand through [`ZarrArray`].

use std::collections::BTreeMap;
use std::sync::Arc;

use grid_dataset::cf::{self, Packing};
use grid_dataset::{ArrayData, ArraySource, Dataset, DatasetError, LazyArray, Variable, VariableRole};
use object_store::aws::AmazonS3Builder;
use object_store::prefix::PrefixStore;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs_filesystem::FilesystemStore;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{AsyncToSyncBlockOn, AsyncToSyncStorageAdapter};
use zarrs_storage::{ListableStorageTraits, ReadableListableStorage};

use crate::error::{StorageError, StorageResult};
use crate::opener::parse_s3_path;

/// Attribute xarray uses to record dimension names.
const ARRAY_DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";

/// Blocking executor that works from within a tokio runtime.
///
/// On a runtime worker this needs the multi-threaded runtime; on a
/// `spawn_blocking` thread it works with either flavor.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Opens Zarr stores by path: `s3://bucket/prefix`, `file://dir` or a plain
/// directory.
#[derive(Debug, Clone)]
pub struct ZarrStoreOpener {
    region: String,
}

impl ZarrStoreOpener {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn open(&self, path: &str) -> StorageResult<Dataset> {
        let path = path.to_string();
        let region = self.region.clone();
        tokio::task::spawn_blocking(move || {
            let storage = storage_for(&path, &region)?;
            open_zarr(storage, &path)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

/// Build a listable synchronous storage for a store path.
pub fn storage_for(path: &str, region: &str) -> StorageResult<ReadableListableStorage> {
    if path.starts_with("s3://") {
        let (bucket, prefix) = parse_s3_path(path)?;
        // Ambient AWS credentials (or none) for stores addressed directly.
        let s3 = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(region)
            .build()
            .map_err(|e| StorageError::object_store(path, e))?;
        let store = PrefixStore::new(s3, prefix.trim_end_matches('/'));
        let async_store = Arc::new(AsyncObjectStore::new(store));
        let storage: ReadableListableStorage =
            Arc::new(AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn));
        return Ok(storage);
    }

    let local = path.strip_prefix("file://").unwrap_or(path);
    if local.contains("://") {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    let store = FilesystemStore::new(local).map_err(|e| StorageError::zarr(path, e))?;
    let storage: ReadableListableStorage = Arc::new(store);
    Ok(storage)
}

/// Read the hierarchy in `storage` as a dataset. `label` is used in errors.
pub fn open_zarr(storage: ReadableListableStorage, label: &str) -> StorageResult<Dataset> {
    let keys = storage.list().map_err(|e| StorageError::zarr(label, e))?;

    let mut array_paths: Vec<String> = keys
        .iter()
        .filter_map(|key| array_path(key.as_str()))
        .collect();
    array_paths.sort();
    array_paths.dedup();

    let mut dataset = Dataset::new();
    for path in &array_paths {
        // Group metadata shares the `zarr.json` name; those fail to open as arrays.
        let array = match Array::open(storage.clone(), path) {
            Ok(array) => array,
            Err(e) => {
                debug!(path = %path, error = %e, "Not an array, skipping");
                continue;
            }
        };
        add_array(&mut dataset, &storage, path, &array).map_err(|e| StorageError::zarr(label, e))?;
    }

    if dataset.is_empty() {
        return Err(StorageError::zarr(label, "store contains no arrays"));
    }

    if let Ok(root) = Group::open(storage.clone(), "/") {
        dataset.attributes = root
            .attributes()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
    }

    debug!(
        store = label,
        dims = dataset.dims().len(),
        variables = dataset.variable_names().len(),
        "Opened Zarr store"
    );
    Ok(dataset)
}

/// Node path of the array whose metadata lives at `key`.
fn array_path(key: &str) -> Option<String> {
    let parent = key
        .strip_suffix("zarr.json")
        .or_else(|| key.strip_suffix(".zarray"))?;
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        return None;
    }
    Some(format!("/{}", parent))
}

fn add_array(
    dataset: &mut Dataset,
    storage: &ReadableListableStorage,
    path: &str,
    array: &Array<dyn zarrs_storage::ReadableListableStorageTraits>,
) -> grid_dataset::Result<()> {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    let shape: Vec<usize> = array.shape().iter().map(|&n| n as usize).collect();

    let mut attributes: BTreeMap<String, Value> = array
        .attributes()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let dims = dimension_names(array, attributes.remove(ARRAY_DIMENSIONS_ATTR), &name, shape.len());
    for (dim, &len) in dims.iter().zip(&shape) {
        dataset.add_dimension(dim.clone(), len)?;
    }
    let packing = Packing::from_attributes(&attributes);

    if dims.len() == 1 && dims[0] == name {
        let mut values = read_elements(&name, array, &shape)?;
        packing.apply(&mut values);
        cf::decode_time(&mut values, &mut attributes);

        let mut coord = Variable::coordinate(
            name.clone(),
            &[name.as_str()],
            LazyArray::from_data(ArrayData::vector(values)),
        );
        coord.attributes = attributes;
        dataset.add_variable(coord)?;
        return dataset.set_index(&name);
    }

    let source = ZarrArray {
        storage: storage.clone(),
        path: path.to_string(),
        shape,
        packing,
    };
    let mut variable = Variable::new(name, dims, VariableRole::Data, LazyArray::new(source));
    variable.attributes = attributes;
    dataset.add_variable(variable)
}

fn dimension_names(
    array: &Array<dyn zarrs_storage::ReadableListableStorageTraits>,
    xarray_dims: Option<Value>,
    name: &str,
    rank: usize,
) -> Vec<String> {
    if let Some(names) = array.dimension_names() {
        let named: Vec<String> = names
            .iter()
            .filter_map(|n| n.as_str().map(str::to_string))
            .collect();
        if named.len() == rank {
            return named;
        }
    }

    if let Some(Value::Array(items)) = xarray_dims {
        let named: Vec<String> = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if named.len() == rank {
            return named;
        }
    }

    warn!(array = name, "No dimension names, synthesizing");
    (0..rank).map(|i| format!("{}_dim_{}", name, i)).collect()
}

fn read_elements<S>(name: &str, array: &Array<S>, shape: &[usize]) -> grid_dataset::Result<Vec<f64>>
where
    S: ?Sized + zarrs_storage::ReadableStorageTraits + 'static,
{
    let subset = ArraySubset::new_with_shape(shape.iter().map(|&n| n as u64).collect());
    let failed = |e: zarrs::array::ArrayError| DatasetError::read_failed(name, e.to_string());

    macro_rules! widen {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(&subset)
                .map_err(failed)?
                .into_iter()
                .map(|v| v as f64)
                .collect()
        };
    }

    let values: Vec<f64> = match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_elements::<f64>(&subset)
            .map_err(failed)?,
        DataType::Float32 => widen!(f32),
        DataType::Int8 => widen!(i8),
        DataType::Int16 => widen!(i16),
        DataType::Int32 => widen!(i32),
        DataType::Int64 => widen!(i64),
        DataType::UInt8 => widen!(u8),
        DataType::UInt16 => widen!(u16),
        DataType::UInt32 => widen!(u32),
        DataType::UInt64 => widen!(u64),
        other => {
            return Err(DatasetError::read_failed(
                name,
                format!("unsupported data type {:?}", other),
            ))
        }
    };
    Ok(values)
}

/// An array in a Zarr store, read on demand.
pub struct ZarrArray {
    storage: ReadableListableStorage,
    path: String,
    shape: Vec<usize>,
    packing: Packing,
}

impl std::fmt::Debug for ZarrArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrArray")
            .field("path", &self.path)
            .field("shape", &self.shape)
            .finish()
    }
}

impl ArraySource for ZarrArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn load(&self) -> grid_dataset::Result<ArrayData> {
        let array = Array::open(self.storage.clone(), &self.path)
            .map_err(|e| DatasetError::read_failed(self.path.clone(), e.to_string()))?;
        let mut values = read_elements(&self.path, &array, &self.shape)?;
        self.packing.apply(&mut values);
        ArrayData::new(self.shape.clone(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_path() {
        assert_eq!(array_path("sst/zarr.json"), Some("/sst".to_string()));
        assert_eq!(array_path("group/sst/.zarray"), Some("/group/sst".to_string()));
        assert_eq!(array_path("zarr.json"), None);
        assert_eq!(array_path("sst/c/0/0"), None);
        assert_eq!(array_path(".zattrs"), None);
    }

    #[test]
    fn test_storage_for_rejects_other_schemes() {
        assert!(matches!(
            storage_for("https://host/store.zarr", "us-west-2"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_storage_for_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("file://{}", dir.path().display());
        assert!(storage_for(&path, "us-west-2").is_ok());
    }
}
