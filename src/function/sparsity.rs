use std::collections::BTreeSet;

use crate::base::Base;
use crate::tape::Op;

use super::TapeFunction;

/// Structural sparsity of a Jacobian in COO format.
///
/// Entries are sorted by `(row, col)`; `(i, j)` is present when output `i`
/// may depend on input `j`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JacobianPattern {
    pub num_outputs: usize,
    pub num_inputs: usize,
    /// Output indices (0-based).
    pub rows: Vec<u32>,
    /// Input indices (0-based).
    pub cols: Vec<u32>,
}

impl JacobianPattern {
    fn from_entries(num_outputs: usize, num_inputs: usize, entries: BTreeSet<(u32, u32)>) -> Self {
        let (rows, cols) = entries.into_iter().unzip();
        JacobianPattern {
            num_outputs,
            num_inputs,
            rows,
            cols,
        }
    }

    /// Number of structurally non-zero entries.
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether output `i` may depend on input `j`.
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .any(|(&r, &c)| r as usize == i && c as usize == j)
    }
}

impl<B: Base> TapeFunction<B> {
    /// Jacobian sparsity by propagating input dependency sets forward.
    pub fn forward_sparsity(&self) -> JacobianPattern {
        let ops = &self.tape.ops;
        let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); ops.len()];

        for (i, op) in ops.iter().enumerate() {
            match op {
                Op::Input => {
                    deps[i].insert(i);
                }
                Op::Const | Op::AtomicResult { .. } => {}
                Op::Unary { arg, .. } => deps[i] = deps[*arg as usize].clone(),
                Op::Binary { args: [a, b], .. } => {
                    deps[i] = deps[*a as usize].union(&deps[*b as usize]).copied().collect();
                }
                Op::Atomic {
                    local,
                    args,
                    num_results,
                } => {
                    let arg_deps: Vec<BTreeSet<usize>> =
                        args.iter().map(|&a| deps[a as usize].clone()).collect();
                    let m = *num_results as usize;
                    let results = self.tape.atomics[*local as usize]
                        .op
                        .forward_sparsity(&arg_deps, m);
                    for (r, set) in results.into_iter().take(m).enumerate() {
                        deps[i + r] = set;
                    }
                }
            }
        }

        let mut entries = BTreeSet::new();
        for (row, &y) in self.dependents.iter().enumerate() {
            for &col in &deps[y as usize] {
                entries.insert((row as u32, col as u32));
            }
        }
        JacobianPattern::from_entries(self.num_outputs(), self.num_inputs(), entries)
    }

    /// Jacobian sparsity by propagating dependent output sets backward.
    pub fn reverse_sparsity(&self) -> JacobianPattern {
        let ops = &self.tape.ops;
        let mut feeds: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); ops.len()];
        for (row, &y) in self.dependents.iter().enumerate() {
            feeds[y as usize].insert(row);
        }

        for i in (0..ops.len()).rev() {
            if feeds[i].is_empty() && !matches!(ops[i], Op::Atomic { .. }) {
                continue;
            }
            match &ops[i] {
                Op::Input | Op::Const | Op::AtomicResult { .. } => {}
                Op::Unary { arg, .. } => {
                    let set = feeds[i].clone();
                    feeds[*arg as usize].extend(set);
                }
                Op::Binary { args: [a, b], .. } => {
                    let set = feeds[i].clone();
                    feeds[*a as usize].extend(set.iter().copied());
                    feeds[*b as usize].extend(set);
                }
                Op::Atomic {
                    local,
                    args,
                    num_results,
                } => {
                    let m = *num_results as usize;
                    let results = &feeds[i..i + m];
                    if results.iter().all(BTreeSet::is_empty) {
                        continue;
                    }
                    let arg_sets = self.tape.atomics[*local as usize]
                        .op
                        .reverse_sparsity(results, args.len());
                    for (&a, set) in args.iter().zip(arg_sets) {
                        feeds[a as usize].extend(set);
                    }
                }
            }
        }

        let entries = (0..self.num_inputs())
            .flat_map(|col| feeds[col].iter().map(move |&row| (row as u32, col as u32)))
            .collect();
        JacobianPattern::from_entries(self.num_outputs(), self.num_inputs(), entries)
    }
}
