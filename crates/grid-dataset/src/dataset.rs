//! The dataset model: named dimensions, variables over them, and index
//! coordinates that label positions along a dimension.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::array::{ArrayData, LazyArray};
use crate::error::{DatasetError, Result};

/// A named axis with a fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

/// Whether a variable labels the grid or carries data on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRole {
    Coordinate,
    Data,
}

/// A named n-dimensional array over an ordered list of dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub role: VariableRole,
    pub attributes: BTreeMap<String, Value>,
    data: LazyArray,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        dims: Vec<String>,
        role: VariableRole,
        data: LazyArray,
    ) -> Self {
        Self {
            name: name.into(),
            dims,
            role,
            attributes: BTreeMap::new(),
            data,
        }
    }

    /// A data variable over `dims`.
    pub fn data(name: impl Into<String>, dims: &[&str], data: LazyArray) -> Self {
        Self::new(
            name,
            dims.iter().map(|d| d.to_string()).collect(),
            VariableRole::Data,
            data,
        )
    }

    /// A coordinate variable over `dims`.
    pub fn coordinate(name: impl Into<String>, dims: &[&str], data: LazyArray) -> Self {
        Self::new(
            name,
            dims.iter().map(|d| d.to_string()).collect(),
            VariableRole::Coordinate,
            data,
        )
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn array(&self) -> &LazyArray {
        &self.data
    }

    pub fn is_coordinate(&self) -> bool {
        self.role == VariableRole::Coordinate
    }

    /// Read the variable's values.
    pub fn load(&self) -> Result<ArrayData> {
        self.data.load().map_err(|e| match e {
            DatasetError::ReadFailed { message, .. } => {
                DatasetError::read_failed(self.name.clone(), message)
            }
            other => other,
        })
    }
}

/// Sorted coordinate labels for a dimension, held in memory for alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub coord: String,
    pub values: Arc<Vec<f64>>,
}

/// A collection of variables sharing named dimensions.
///
/// An index on dimension `d` always refers to the 1-D coordinate named `d`.
/// Renaming either one drops the index; [`Dataset::set_index`] restores it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    dims: Vec<Dimension>,
    variables: BTreeMap<String, Variable>,
    indexes: BTreeMap<String, Index>,
    pub attributes: BTreeMap<String, Value>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension. Redeclaring with the same length is a no-op.
    pub fn add_dimension(&mut self, name: impl Into<String>, len: usize) -> Result<()> {
        let name = name.into();
        match self.dims.iter().find(|d| d.name == name) {
            Some(existing) if existing.len == len => Ok(()),
            Some(existing) => Err(DatasetError::DimensionConflict {
                name,
                existing: existing.len,
                requested: len,
            }),
            None => {
                self.dims.push(Dimension { name, len });
                Ok(())
            }
        }
    }

    /// Add a variable, checking its shape against the declared dimensions.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        let expected = self.shape_of(&variable.dims)?;
        if expected != variable.shape() {
            return Err(DatasetError::ShapeMismatch {
                name: variable.name.clone(),
                expected,
                actual: variable.shape().to_vec(),
            });
        }
        if self.variables.contains_key(&variable.name) {
            return Err(DatasetError::Invalid(format!(
                "variable '{}' already exists",
                variable.name
            )));
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Add a 1-D coordinate named after its own dimension and index it.
    pub fn add_index_coordinate(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        self.add_dimension(name.clone(), values.len())?;
        let values = Arc::new(values);
        let data = LazyArray::from_data(ArrayData::vector(values.as_ref().clone()));
        self.add_variable(Variable::coordinate(name.clone(), &[name.as_str()], data))?;
        self.indexes.insert(
            name.clone(),
            Index {
                coord: name,
                values,
            },
        );
        Ok(())
    }

    /// Index `dim` by the 1-D coordinate of the same name, loading its values.
    pub fn set_index(&mut self, dim: &str) -> Result<()> {
        let variable = self
            .variables
            .get_mut(dim)
            .ok_or_else(|| DatasetError::UnknownVariable(dim.to_string()))?;
        if variable.dims.len() != 1 || variable.dims[0] != dim {
            return Err(DatasetError::Invalid(format!(
                "'{}' is not a 1-D coordinate over dimension '{}'",
                dim, dim
            )));
        }
        variable.role = VariableRole::Coordinate;
        let values = variable.load()?.values;
        self.indexes.insert(
            dim.to_string(),
            Index {
                coord: dim.to_string(),
                values: Arc::new(values),
            },
        );
        Ok(())
    }

    /// Mark existing variables as coordinates.
    pub fn set_coords<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            let variable = self
                .variables
                .get_mut(name.as_ref())
                .ok_or_else(|| DatasetError::UnknownVariable(name.as_ref().to_string()))?;
            variable.role = VariableRole::Coordinate;
        }
        Ok(())
    }

    /// Rename dimensions everywhere they are referenced.
    ///
    /// Entries whose source is absent or whose target already names another
    /// dimension are skipped. Returns the renames actually applied.
    pub fn rename_dims(&mut self, renames: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let existing: BTreeSet<String> = self.dims.iter().map(|d| d.name.clone()).collect();
        let applied = effective_renames(renames, &existing);
        if applied.is_empty() {
            return applied;
        }

        for dim in &mut self.dims {
            if let Some(new) = applied.get(&dim.name) {
                dim.name = new.clone();
            }
        }
        for variable in self.variables.values_mut() {
            for dim in &mut variable.dims {
                if let Some(new) = applied.get(dim) {
                    *dim = new.clone();
                }
            }
        }
        for old in applied.keys() {
            if self.indexes.remove(old).is_some() {
                debug!(dim = %old, "Dropped index on renamed dimension");
            }
        }
        applied
    }

    /// Rename variables. Same skip rules as [`Dataset::rename_dims`].
    pub fn rename_vars(&mut self, renames: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let existing: BTreeSet<String> = self.variables.keys().cloned().collect();
        let applied = effective_renames(renames, &existing);

        let moved: Vec<(String, Variable)> = applied
            .iter()
            .filter_map(|(old, new)| self.variables.remove(old).map(|v| (new.clone(), v)))
            .collect();
        for (new, mut variable) in moved {
            variable.name = new.clone();
            self.variables.insert(new, variable);
        }
        for old in applied.keys() {
            if self.indexes.remove(old).is_some() {
                debug!(coord = %old, "Dropped index on renamed coordinate");
            }
        }
        applied
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims.iter().find(|d| d.name == name).map(|d| d.len)
    }

    pub fn has_dim(&self, name: &str) -> bool {
        self.dim_len(name).is_some()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub(crate) fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// All variable names, sorted.
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    /// Names of non-coordinate variables, sorted.
    pub fn data_variable_names(&self) -> Vec<String> {
        self.variables
            .values()
            .filter(|v| !v.is_coordinate())
            .map(|v| v.name.clone())
            .collect()
    }

    /// Names of coordinate variables, sorted.
    pub fn coordinate_names(&self) -> Vec<String> {
        self.variables
            .values()
            .filter(|v| v.is_coordinate())
            .map(|v| v.name.clone())
            .collect()
    }

    pub fn index(&self, dim: &str) -> Option<&Index> {
        self.indexes.get(dim)
    }

    pub fn indexed_dims(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn shape_of(&self, dims: &[String]) -> Result<Vec<usize>> {
        dims.iter()
            .map(|d| {
                self.dim_len(d)
                    .ok_or_else(|| DatasetError::UnknownDimension(d.clone()))
            })
            .collect()
    }
}

fn effective_renames(
    renames: &BTreeMap<String, String>,
    existing: &BTreeSet<String>,
) -> BTreeMap<String, String> {
    let mut applied = BTreeMap::new();
    let mut targets = BTreeSet::new();
    for (old, new) in renames {
        if old == new || !existing.contains(old) {
            continue;
        }
        let collides = (existing.contains(new) && !renames.contains_key(new))
            || !targets.insert(new.clone());
        if collides {
            debug!(from = %old, to = %new, "Skipping rename onto an existing name");
            continue;
        }
        applied.insert(old.clone(), new.clone());
    }
    applied
}
