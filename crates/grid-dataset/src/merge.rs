//! Combine several datasets into one by aligning on index coordinates.
//!
//! Indexed dimensions are outer-joined: the merged index is the sorted union
//! of every input's labels and each input's values are placed at their
//! labels' positions. Dimensions without an index must agree on length.
//! Positions no input covers read as NaN. Where inputs overlap, the first
//! input with a non-NaN value wins. Values at NaN labels are dropped.
//!
//! Nothing is read while merging except index labels; merged variables load
//! their pieces on demand.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::array::{ArrayData, ArraySource, LazyArray};
use crate::dataset::{Dataset, Variable, VariableRole};
use crate::error::{DatasetError, Result};

/// Merge datasets by their coordinates.
///
/// The inputs are typically the per-file datasets of one acquisition, so
/// they share variable names and differ in where they sit along time or
/// space.
pub fn combine_by_coords(datasets: Vec<Dataset>) -> Result<Dataset> {
    let mut datasets = datasets;
    match datasets.len() {
        0 => return Err(DatasetError::merge_conflict("no datasets to combine")),
        1 => return Ok(datasets.remove(0)),
        _ => {}
    }

    let axes = merged_axes(&datasets)?;

    let mut merged = Dataset::new();
    for (name, axis) in &axes {
        match axis {
            Axis::Indexed(values) => {
                merged.add_index_coordinate(name.clone(), values.as_ref().clone())?;
                if let Some(coord) = merged.variable_mut(name) {
                    for ds in &datasets {
                        if let Some(local) = ds.variable(name) {
                            merge_attributes(&mut coord.attributes, &local.attributes);
                        }
                    }
                }
            }
            Axis::Plain(len) => merged.add_dimension(name.clone(), *len)?,
        }
    }

    // Variable name -> pieces in input order.
    let mut pieces: BTreeMap<&str, Vec<(usize, &Variable)>> = BTreeMap::new();
    for (i, ds) in datasets.iter().enumerate() {
        for variable in ds.variables() {
            pieces.entry(variable.name.as_str()).or_default().push((i, variable));
        }
    }

    for (name, parts) in pieces {
        if merged.index(name).is_some() {
            continue;
        }
        let variable = merge_variable(name, &parts, &datasets, &axes)?;
        merged.add_variable(variable)?;
    }

    for ds in &datasets {
        merge_attributes(&mut merged.attributes, &ds.attributes);
    }

    debug!(
        inputs = datasets.len(),
        dims = merged.dims().len(),
        variables = merged.variable_names().len(),
        "Combined datasets by coordinates"
    );
    Ok(merged)
}

/// Add entries of `from` that `into` does not have yet.
fn merge_attributes(into: &mut BTreeMap<String, Value>, from: &BTreeMap<String, Value>) {
    for (key, value) in from {
        into.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

#[derive(Debug)]
enum Axis {
    Indexed(Arc<Vec<f64>>),
    Plain(usize),
}

impl Axis {
    fn len(&self) -> usize {
        match self {
            Axis::Indexed(values) => values.len(),
            Axis::Plain(len) => *len,
        }
    }
}

/// Resolve every dimension across inputs, in first-seen order.
fn merged_axes(datasets: &[Dataset]) -> Result<Vec<(String, Axis)>> {
    let mut order: Vec<String> = Vec::new();
    for ds in datasets {
        for dim in ds.dims() {
            if !order.contains(&dim.name) {
                order.push(dim.name.clone());
            }
        }
    }

    let mut axes = Vec::with_capacity(order.len());
    for name in order {
        let holders: Vec<&Dataset> = datasets.iter().filter(|ds| ds.has_dim(&name)).collect();
        let indexed = holders.iter().filter(|ds| ds.index(&name).is_some()).count();

        let axis = if indexed == 0 {
            let mut lens = holders.iter().filter_map(|ds| ds.dim_len(&name));
            let first = lens.next().unwrap_or(0);
            if let Some(other) = lens.find(|&len| len != first) {
                return Err(DatasetError::merge_conflict(format!(
                    "dimension '{}' has no coordinate and differing lengths {} and {}",
                    name, first, other
                )));
            }
            Axis::Plain(first)
        } else if indexed == holders.len() {
            let mut values: Vec<f64> = holders
                .iter()
                .filter_map(|ds| ds.index(&name))
                .flat_map(|idx| idx.values.iter().copied())
                .filter(|v| !v.is_nan())
                .collect();
            values.sort_by(f64::total_cmp);
            values.dedup_by(|a, b| a.total_cmp(b).is_eq());
            Axis::Indexed(Arc::new(values))
        } else {
            return Err(DatasetError::merge_conflict(format!(
                "dimension '{}' is indexed in some inputs but not others",
                name
            )));
        };
        axes.push((name, axis));
    }
    Ok(axes)
}

fn merge_variable(
    name: &str,
    parts: &[(usize, &Variable)],
    datasets: &[Dataset],
    axes: &[(String, Axis)],
) -> Result<Variable> {
    let (_, first) = parts[0];
    if let Some((_, other)) = parts.iter().find(|(_, v)| v.dims != first.dims) {
        return Err(DatasetError::merge_conflict(format!(
            "variable '{}' has dimensions {:?} in one input and {:?} in another",
            name, first.dims, other.dims
        )));
    }

    let shape: Vec<usize> = first
        .dims
        .iter()
        .map(|d| axis_of(axes, d).map(Axis::len).unwrap_or(0))
        .collect();

    let mut sources = Vec::with_capacity(parts.len());
    for &(input, variable) in parts {
        let ds = &datasets[input];
        let mut positions = Vec::with_capacity(variable.dims.len());
        for dim in &variable.dims {
            positions.push(match (axis_of(axes, dim), ds.index(dim)) {
                (Some(Axis::Indexed(merged)), Some(local)) => {
                    locate_labels(&local.values, merged, dim)?
                }
                _ => (0..ds.dim_len(dim).unwrap_or(0)).map(Some).collect(),
            });
        }
        sources.push(Piece {
            array: variable.array().clone(),
            positions,
        });
    }

    let role = if parts.iter().any(|(_, v)| v.role == VariableRole::Coordinate) {
        VariableRole::Coordinate
    } else {
        VariableRole::Data
    };

    let data = if sources.len() == 1 && sources[0].is_identity(&shape) {
        sources.remove(0).array
    } else {
        LazyArray::new(MergedArray {
            name: name.to_string(),
            shape,
            pieces: sources,
        })
    };

    let mut variable = Variable::new(name, first.dims.clone(), role, data);
    for (_, part) in parts {
        merge_attributes(&mut variable.attributes, &part.attributes);
    }
    Ok(variable)
}

fn axis_of<'a>(axes: &'a [(String, Axis)], dim: &str) -> Option<&'a Axis> {
    axes.iter().find(|(name, _)| name == dim).map(|(_, axis)| axis)
}

/// Map each local label to its position in the merged (sorted) labels.
/// NaN labels have no position.
fn locate_labels(local: &[f64], merged: &[f64], dim: &str) -> Result<Vec<Option<usize>>> {
    local
        .iter()
        .map(|v| {
            if v.is_nan() {
                return Ok(None);
            }
            merged
                .binary_search_by(|label| label.total_cmp(v))
                .map(Some)
                .map_err(|_| {
                    DatasetError::merge_conflict(format!(
                        "label {} on dimension '{}' cannot be aligned",
                        v, dim
                    ))
                })
        })
        .collect()
}

/// One input's contribution to a merged variable.
#[derive(Debug)]
struct Piece {
    array: LazyArray,
    /// Per axis, the merged position of each local position.
    positions: Vec<Vec<Option<usize>>>,
}

impl Piece {
    fn is_identity(&self, shape: &[usize]) -> bool {
        self.positions.len() == shape.len()
            && self
                .positions
                .iter()
                .zip(shape)
                .all(|(pos, &n)| pos.len() == n && pos.iter().enumerate().all(|(i, &p)| p == Some(i)))
    }
}

#[derive(Debug)]
struct MergedArray {
    name: String,
    shape: Vec<usize>,
    pieces: Vec<Piece>,
}

impl ArraySource for MergedArray {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn load(&self) -> Result<ArrayData> {
        let total: usize = self.shape.iter().product();
        let mut out = vec![f64::NAN; total];
        let strides = strides(&self.shape);

        for piece in &self.pieces {
            let data = piece.array.load()?;
            let local_shape: Vec<usize> = piece.positions.iter().map(Vec::len).collect();
            if data.shape != local_shape {
                return Err(DatasetError::ShapeMismatch {
                    name: self.name.clone(),
                    expected: local_shape,
                    actual: data.shape,
                });
            }

            let mut index = vec![0usize; local_shape.len()];
            for &value in &data.values {
                let target: Option<usize> = index
                    .iter()
                    .zip(&piece.positions)
                    .zip(&strides)
                    .map(|((&i, pos), &stride)| pos[i].map(|p| p * stride))
                    .sum();
                if let Some(target) = target {
                    if out[target].is_nan() {
                        out[target] = value;
                    }
                }
                advance(&mut index, &local_shape);
            }
        }

        ArrayData::new(self.shape.clone(), out)
    }
}

fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Step a row-major multi-index forward by one element.
fn advance(index: &mut [usize], shape: &[usize]) {
    for axis in (0..index.len()).rev() {
        index[axis] += 1;
        if index[axis] < shape[axis] {
            return;
        }
        index[axis] = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(times: &[f64], value: f64) -> Dataset {
        let mut ds = Dataset::new();
        ds.add_index_coordinate("time", times.to_vec()).unwrap();
        ds.add_index_coordinate("lat", vec![0.0, 1.0]).unwrap();
        let data = ArrayData::new(vec![times.len(), 2], vec![value; times.len() * 2]).unwrap();
        ds.add_variable(Variable::data("sst", &["time", "lat"], LazyArray::from_data(data)))
            .unwrap();
        ds
    }

    #[test]
    fn test_strides_and_advance() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        let mut idx = vec![0, 2];
        advance(&mut idx, &[2, 3]);
        assert_eq!(idx, vec![1, 0]);
    }

    #[test]
    fn test_combine_along_time() {
        let merged = combine_by_coords(vec![daily(&[2.0], 20.0), daily(&[1.0], 10.0)]).unwrap();

        assert_eq!(merged.dim_len("time"), Some(2));
        assert_eq!(merged.index("time").unwrap().values.as_slice(), &[1.0, 2.0]);

        let sst = merged.variable("sst").unwrap().load().unwrap();
        assert_eq!(sst.shape, vec![2, 2]);
        assert_eq!(sst.values, vec![10.0, 10.0, 20.0, 20.0]);
    }

    #[test]
    fn test_outer_join_fills_nan() {
        let mut a = Dataset::new();
        a.add_index_coordinate("lat", vec![0.0, 1.0]).unwrap();
        a.add_variable(Variable::data(
            "v",
            &["lat"],
            LazyArray::from_data(ArrayData::vector(vec![1.0, 2.0])),
        ))
        .unwrap();

        let mut b = Dataset::new();
        b.add_index_coordinate("lat", vec![1.0, 2.0]).unwrap();
        b.add_variable(Variable::data(
            "v",
            &["lat"],
            LazyArray::from_data(ArrayData::vector(vec![9.0, 3.0])),
        ))
        .unwrap();
        b.add_variable(Variable::data(
            "w",
            &["lat"],
            LazyArray::from_data(ArrayData::vector(vec![5.0, 6.0])),
        ))
        .unwrap();

        let merged = combine_by_coords(vec![a, b]).unwrap();
        let v = merged.variable("v").unwrap().load().unwrap();
        assert_eq!(v.values, vec![1.0, 2.0, 3.0]);

        let w = merged.variable("w").unwrap().load().unwrap();
        assert!(w.values[0].is_nan());
        assert_eq!(&w.values[1..], &[5.0, 6.0]);
    }

    #[test]
    fn test_nan_labels_are_dropped() {
        let merged = combine_by_coords(vec![
            daily(&[1.0, f64::NAN], 10.0),
            daily(&[2.0], 20.0),
        ])
        .unwrap();

        assert_eq!(merged.index("time").unwrap().values.as_slice(), &[1.0, 2.0]);
        let sst = merged.variable("sst").unwrap().load().unwrap();
        assert_eq!(sst.values, vec![10.0, 10.0, 20.0, 20.0]);
    }

    #[test]
    fn test_index_coordinate_keeps_attributes() {
        let mut a = daily(&[1.0], 1.0);
        let time = a.variable_mut("time").unwrap();
        time.attributes.insert("units".to_string(), Value::from("seconds since 1970-01-01"));
        time.attributes.insert("long_name".to_string(), Value::from("time"));
        let b = daily(&[2.0], 2.0);

        let merged = combine_by_coords(vec![a, b]).unwrap();

        let time = merged.variable("time").unwrap();
        assert!(time.is_coordinate());
        assert_eq!(
            time.attributes.get("units"),
            Some(&Value::from("seconds since 1970-01-01"))
        );
        assert_eq!(time.attributes.get("long_name"), Some(&Value::from("time")));
    }

    #[test]
    fn test_single_input_passthrough() {
        let ds = daily(&[1.0], 1.0);
        let merged = combine_by_coords(vec![ds.clone()]).unwrap();
        assert_eq!(merged, ds);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(combine_by_coords(Vec::new()).is_err());
    }

    #[test]
    fn test_unindexed_length_mismatch() {
        let mut a = Dataset::new();
        a.add_dimension("nv", 2).unwrap();
        let mut b = Dataset::new();
        b.add_dimension("nv", 3).unwrap();
        assert!(matches!(
            combine_by_coords(vec![a, b]),
            Err(DatasetError::MergeConflict(_))
        ));
    }

    #[test]
    fn test_dims_mismatch_rejected() {
        let a = daily(&[1.0], 1.0);
        let mut b = Dataset::new();
        b.add_index_coordinate("time", vec![2.0]).unwrap();
        b.add_index_coordinate("lat", vec![0.0, 1.0]).unwrap();
        let data = ArrayData::new(vec![2, 1], vec![0.0; 2]).unwrap();
        b.add_variable(Variable::data("sst", &["lat", "time"], LazyArray::from_data(data)))
            .unwrap();
        assert!(combine_by_coords(vec![a, b]).is_err());
    }
}
