//! Native NetCDF access using the netcdf library.
//!
//! libnetcdf needs a file path, so granules fetched as bytes are spilled to
//! a temp file on disk. The file stays as long as a lazy array of the
//! dataset still refers to it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;

use serde_json::Value;
use tempfile::TempPath;

use crate::error::{NetCdfError, NetCdfResult};

/// Turn off HDF5's automatic error printing to stderr.
///
/// Probing optional attributes otherwise produces `HDF5-DIAG` noise for
/// errors that are handled. Safe to call repeatedly; only the first call acts.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: null handler and client data disable automatic printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

#[derive(Debug)]
enum Backing {
    Existing(PathBuf),
    Spilled(TempPath),
}

/// A NetCDF file on local disk that array handles can reopen.
///
/// Files spilled from bytes are removed when the last handle drops.
#[derive(Debug)]
pub struct LocalFile {
    backing: Backing,
}

impl LocalFile {
    /// Refer to an existing file without taking ownership of it.
    pub fn existing(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::Existing(path.into()),
        }
    }

    /// Spill `data` to a fresh file in the system temp directory.
    pub fn from_bytes(data: &[u8]) -> NetCdfResult<Self> {
        Self::from_bytes_in(&std::env::temp_dir(), data)
    }

    /// Spill `data` to a fresh file in `dir`.
    pub fn from_bytes_in(dir: &Path, data: &[u8]) -> NetCdfResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("granule_")
            .suffix(".nc")
            .tempfile_in(dir)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(Self {
            backing: Backing::Spilled(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> &Path {
        match &self.backing {
            Backing::Existing(path) => path.as_path(),
            Backing::Spilled(path) => &**path,
        }
    }

    /// Open the file with the netcdf library.
    pub fn open(&self) -> NetCdfResult<netcdf::File> {
        silence_hdf5_errors();
        netcdf::open(self.path()).map_err(|e| {
            NetCdfError::InvalidFormat(format!(
                "Failed to open NetCDF {}: {}",
                self.path().display(),
                e
            ))
        })
    }
}

/// Convert a NetCDF attribute value to JSON. Unrepresentable values are dropped.
pub(crate) fn attribute_json(value: netcdf::AttributeValue) -> Option<Value> {
    use netcdf::AttributeValue;

    match value {
        AttributeValue::Str(s) => Some(Value::String(s)),
        AttributeValue::Strs(items) => Some(Value::from(items)),
        AttributeValue::Doubles(items) => Some(Value::from(items)),
        AttributeValue::Floats(items) => Some(Value::from(
            items.into_iter().map(f64::from).collect::<Vec<_>>(),
        )),
        other => f64::try_from(other).ok().map(Value::from),
    }
}

/// All attributes of a variable as JSON.
pub(crate) fn variable_attributes(var: &netcdf::Variable) -> std::collections::BTreeMap<String, Value> {
    var.attributes()
        .filter_map(|attr| {
            let name = attr.name().to_string();
            let value = attr.value().ok().and_then(attribute_json)?;
            Some((name, value))
        })
        .collect()
}

/// All global attributes of a file as JSON.
pub(crate) fn global_attributes(file: &netcdf::File) -> std::collections::BTreeMap<String, Value> {
    file.attributes()
        .filter_map(|attr| {
            let name = attr.name().to_string();
            let value = attr.value().ok().and_then(attribute_json)?;
            Some((name, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = LocalFile::from_bytes_in(dir.path(), b"not really netcdf").unwrap();
        let path = file.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_spills_to_system_temp_dir() {
        let file = LocalFile::from_bytes(b"x").unwrap();
        assert!(file.path().starts_with(std::env::temp_dir()));
    }

    #[test]
    fn test_existing_file_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.nc");
        std::fs::write(&path, b"x").unwrap();
        drop(LocalFile::existing(&path));
        assert!(path.exists());
    }

    #[test]
    fn test_open_garbage_fails() {
        let file = LocalFile::from_bytes(b"definitely not netcdf").unwrap();
        assert!(matches!(file.open(), Err(NetCdfError::InvalidFormat(_))));
    }

    #[test]
    fn test_spill_files_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = LocalFile::from_bytes_in(dir.path(), b"a").unwrap();
        let b = LocalFile::from_bytes_in(dir.path(), b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
