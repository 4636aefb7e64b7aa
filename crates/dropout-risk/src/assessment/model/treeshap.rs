//! Path-dependent TreeSHAP: exact Shapley values for a single decision tree,
//! using node covers as the background distribution.
//!
//! Each recursion step keeps the set of unique features seen on the current
//! root-to-node path together with the fraction of "feature absent"
//! (`zero_fraction`) and "feature present" (`one_fraction`) paths flowing
//! through it. `pweight` carries the permutation weights of every subset size.

use super::forest::{DecisionTree, TreeNode};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Adds the Shapley values of `tree` for `row` onto `phi` (model column order).
pub(crate) fn accumulate(tree: &DecisionTree, row: &[f64], phi: &mut [f64]) {
    recurse(tree, row, phi, 0, &[], 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &DecisionTree,
    row: &[f64],
    phi: &mut [f64],
    node: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend(&mut path, zero_fraction, one_fraction, feature);

    match &tree.nodes[node] {
        TreeNode::Leaf { value, .. } => {
            for index in 1..path.len() {
                let weight = unwound_sum(&path, index);
                let element = path[index];
                if let Some(column) = element.feature {
                    phi[column] +=
                        weight * (element.one_fraction - element.zero_fraction) * value;
                }
            }
        }
        TreeNode::Split {
            feature: split,
            threshold,
            left,
            right,
            ..
        } => {
            let (hot, cold) = if row[*split] <= *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let hot_cover = tree.nodes[hot].cover();
            let cold_cover = tree.nodes[cold].cover();
            let total_cover = hot_cover + cold_cover;

            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;

            // A feature already on the path is folded back out before recursing.
            if let Some(position) = path
                .iter()
                .position(|element| element.feature == Some(*split))
            {
                incoming_zero = path[position].zero_fraction;
                incoming_one = path[position].one_fraction;
                unwind(&mut path, position);
            }

            recurse(
                tree,
                row,
                phi,
                hot,
                &path,
                hot_cover / total_cover * incoming_zero,
                incoming_one,
                Some(*split),
            );
            recurse(
                tree,
                row,
                phi,
                cold,
                &path,
                cold_cover / total_cover * incoming_zero,
                0.0,
                Some(*split),
            );
        }
    }
}

fn extend(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let scale = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / scale;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / scale;
    }
}

/// Inverse of [`extend`] for the element at `position`; the path shrinks by one.
fn unwind(path: &mut Vec<PathElement>, position: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[position].one_fraction;
    let zero_fraction = path[position].zero_fraction;
    let scale = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let current = path[i].pweight;
            path[i].pweight = next_one_portion * scale / ((i + 1) as f64 * one_fraction);
            next_one_portion =
                current - path[i].pweight * zero_fraction * (depth - i) as f64 / scale;
        } else {
            path[i].pweight = path[i].pweight * scale / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in position..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with the element at `position` removed.
fn unwound_sum(path: &[PathElement], position: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[position].one_fraction;
    let zero_fraction = path[position].zero_fraction;
    let scale = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let portion = next_one_portion * scale / ((i + 1) as f64 * one_fraction);
            total += portion;
            next_one_portion =
                path[i].pweight - portion * zero_fraction * (depth - i) as f64 / scale;
        } else {
            total += path[i].pweight / zero_fraction / ((depth - i) as f64 / scale);
        }
    }
    total
}
