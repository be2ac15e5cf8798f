//! Open a NetCDF/HDF5 granule as a lazily loaded [`Dataset`].
//!
//! Dimension coordinates (1-D variables named after their dimension) are
//! read immediately and indexed, since merging needs their labels. Every
//! other variable becomes a [`NetCdfArray`] that reopens the file when
//! its values are requested.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use grid_dataset::cf::{self, Packing};
use grid_dataset::{
    ArrayData, ArraySource, Dataset, DatasetError, LazyArray, Variable, VariableRole,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{global_attributes, variable_attributes, LocalFile};

/// Open a NetCDF file that already exists on disk.
pub fn open_dataset(path: &Path) -> NetCdfResult<Dataset> {
    read_dataset(Arc::new(LocalFile::existing(path)))
}

/// Open a NetCDF file from its bytes.
///
/// The bytes are spilled to a temp file that lives as long as any array
/// of the returned dataset.
pub fn open_dataset_from_bytes(data: &[u8]) -> NetCdfResult<Dataset> {
    read_dataset(Arc::new(LocalFile::from_bytes(data)?))
}

/// Like [`open_dataset_from_bytes`], spilling into `dir`.
pub fn open_dataset_from_bytes_in(dir: &Path, data: &[u8]) -> NetCdfResult<Dataset> {
    read_dataset(Arc::new(LocalFile::from_bytes_in(dir, data)?))
}

fn read_dataset(local: Arc<LocalFile>) -> NetCdfResult<Dataset> {
    let file = local.open()?;
    let mut dataset = Dataset::new();

    for dim in file.dimensions() {
        dataset.add_dimension(dim.name().to_string(), dim.len())?;
    }

    let mut coordinate_refs = BTreeSet::new();
    for var in file.variables() {
        let name = var.name().to_string();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let mut attributes = variable_attributes(&var);
        let packing = Packing::from_attributes(&attributes);

        if let Some(Value::String(refs)) = attributes.get("coordinates") {
            coordinate_refs.extend(refs.split_whitespace().map(str::to_string));
        }

        if dims.len() == 1 && dims[0] == name {
            let mut values: Vec<f64> = match var.get_values::<f64, _>(..) {
                Ok(values) => values,
                Err(e) => {
                    warn!(variable = %name, error = %e, "Skipping unreadable dimension coordinate");
                    continue;
                }
            };
            packing.apply(&mut values);
            cf::decode_time(&mut values, &mut attributes);

            let mut coord = Variable::coordinate(
                name.clone(),
                &[name.as_str()],
                LazyArray::from_data(ArrayData::vector(values)),
            );
            coord.attributes = attributes;
            dataset.add_variable(coord)?;
            dataset.set_index(&name)?;
            continue;
        }

        let array = NetCdfArray {
            file: Arc::clone(&local),
            variable: name.clone(),
            shape,
            packing,
        };
        let mut variable = Variable::new(name, dims, VariableRole::Data, LazyArray::new(array));
        variable.attributes = attributes;
        dataset.add_variable(variable)?;
    }

    let known: Vec<String> = coordinate_refs
        .into_iter()
        .filter(|name| dataset.variable(name).is_some())
        .collect();
    dataset.set_coords(&known)?;
    dataset.attributes = global_attributes(&file);

    debug!(
        path = %local.path().display(),
        dims = dataset.dims().len(),
        variables = dataset.variable_names().len(),
        "Opened NetCDF dataset"
    );
    Ok(dataset)
}

/// A variable in a NetCDF file, read on demand.
#[derive(Debug)]
pub struct NetCdfArray {
    file: Arc<LocalFile>,
    variable: String,
    shape: Vec<usize>,
    packing: Packing,
}

impl NetCdfArray {
    fn read(&self) -> NetCdfResult<Vec<f64>> {
        let file = self.file.open()?;
        let var = file
            .variable(&self.variable)
            .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", self.variable)))?;
        let mut values: Vec<f64> = var.get_values::<f64, _>(..).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to read {}: {}", self.variable, e))
        })?;
        self.packing.apply(&mut values);
        Ok(values)
    }
}

impl ArraySource for NetCdfArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn load(&self) -> grid_dataset::Result<ArrayData> {
        let values = self
            .read()
            .map_err(|e| DatasetError::read_failed(self.variable.clone(), e.to_string()))?;
        ArrayData::new(self.shape.clone(), values)
    }
}
