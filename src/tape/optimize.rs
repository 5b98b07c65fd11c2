use log::debug;

use crate::base::Base;

use super::Op;

impl<B: Base> super::Tape<B> {
    /// Eliminate entries that no output depends on.
    ///
    /// Walks backward from `outputs`, marks reachable entries, then compacts
    /// the tape with an index remap. Inputs are never removed, and an atomic
    /// call keeps all of its result slots when any one of them is reachable.
    /// `outputs` is rewritten in place. Returns the number of removed entries.
    pub(crate) fn prune(&mut self, outputs: &mut [u32]) -> usize {
        let n = self.ops.len();
        let mut reachable = vec![false; n];

        // Mark all inputs as reachable.
        for flag in reachable.iter_mut().take(self.num_inputs as usize) {
            *flag = true;
        }

        let mut stack: Vec<u32> = outputs.to_vec();

        while let Some(idx) = stack.pop() {
            let i = idx as usize;
            if reachable[i] {
                continue;
            }
            reachable[i] = true;
            match &self.ops[i] {
                Op::AtomicResult { call } => stack.push(*call),
                Op::Atomic {
                    args, num_results, ..
                } => {
                    stack.extend((1..*num_results).map(|r| idx + r));
                    stack.extend_from_slice(args);
                }
                op => stack.extend_from_slice(op.args()),
            }
        }

        // Build remap: old index -> new index.
        let mut remap = vec![0u32; n];
        let mut new_idx = 0u32;
        for i in 0..n {
            if reachable[i] {
                remap[i] = new_idx;
                new_idx += 1;
            }
        }
        let new_len = new_idx as usize;
        if new_len == n {
            return 0;
        }

        let old_ops = std::mem::take(&mut self.ops);
        let old_values = std::mem::take(&mut self.values);
        self.ops.reserve(new_len);
        self.values.reserve(new_len);

        for ((op, value), keep) in old_ops.into_iter().zip(old_values).zip(&reachable) {
            if !keep {
                continue;
            }
            let op = match op {
                Op::Unary { op, arg } => Op::Unary {
                    op,
                    arg: remap[arg as usize],
                },
                Op::Binary { op, args: [a, b] } => Op::Binary {
                    op,
                    args: [remap[a as usize], remap[b as usize]],
                },
                Op::Atomic {
                    local,
                    args,
                    num_results,
                } => Op::Atomic {
                    local,
                    args: args.into_iter().map(|a| remap[a as usize]).collect(),
                    num_results,
                },
                Op::AtomicResult { call } => Op::AtomicResult {
                    call: remap[call as usize],
                },
                op @ (Op::Input | Op::Const) => op,
            };
            self.ops.push(op);
            self.values.push(value);
        }

        for out in outputs.iter_mut() {
            *out = remap[*out as usize];
        }

        let removed = n - new_len;
        debug!("pruned {} of {} entries from tape {}", removed, n, self.id);
        removed
    }
}
