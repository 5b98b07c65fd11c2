//! User-extensible vector operations.
//!
//! An [`AtomicOp`] is a named, stateless function of one or more arguments
//! that the tape records as a single entry. During sweeps the engine hands it
//! Taylor coefficients laid out as `tx[j * (q + 1) + k]` (order `k` of
//! argument `j`) and `ty[i * (q + 1) + k]` (order `k` of result `i`).
//!
//! Every base type has its own process-wide [`AtomicRegistry`], created on
//! first use with the built-ins (`sum`, `concat`, `reverse`, `pack`)
//! pre-registered. Size-parameterised built-ins (`make[n]`, `unpack[n]`) are
//! registered on demand.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::ad::{Slot, AD};
use crate::base::Base;
use crate::error::{Error, Result};
use crate::tape::thread_local::{active_tape_id, with_active_tape};

mod concat;
mod flip;
mod make;
mod pack;
mod sum;

pub use self::concat::Concat;
pub use self::flip::Flip;
pub use self::make::Make;
pub use self::pack::{Pack, Unpack};
pub use self::sum::Sum;

/// The contract a vector operation implements to take part in sweeps.
///
/// Implementations must be stateless: a single instance is shared by every
/// tape and thread. `Ok(false)` from `forward` or `reverse` means the order
/// or shape is not supported; the engine reports it as
/// [`Error::UnsupportedOrder`].
pub trait AtomicOp<B: Base>: Send + Sync {
    /// Number of results produced from `num_args` arguments.
    fn num_results(&self, _num_args: usize) -> usize {
        1
    }

    /// Compute orders `p..=q` of every result.
    ///
    /// `ty` already holds orders below `p`. `var_in[j]` tells whether
    /// argument `j` is a variable; at order zero the op may refine
    /// `var_out[i]`, which starts out true for every result when any
    /// argument is a variable.
    #[allow(clippy::too_many_arguments)]
    fn forward(
        &self,
        p: usize,
        q: usize,
        var_in: &[bool],
        var_out: &mut [bool],
        tx: &[B],
        ty: &mut [B],
    ) -> Result<bool>;

    /// Compute argument partials `px` from result partials `py`, for orders
    /// `0..=q`.
    ///
    /// `px` is zero on entry; `py[i * (q + 1) + k]` is the partial of the
    /// weighted objective with respect to order `k` of result `i`.
    fn reverse(&self, q: usize, tx: &[B], ty: &[B], px: &mut [B], py: &[B]) -> Result<bool>;

    /// Input dependencies of every result, given those of every argument.
    fn forward_sparsity(
        &self,
        args: &[BTreeSet<usize>],
        num_results: usize,
    ) -> Vec<BTreeSet<usize>> {
        dense_forward_sparsity(args, num_results)
    }

    /// Dependent outputs of every argument, given those of every result.
    fn reverse_sparsity(
        &self,
        results: &[BTreeSet<usize>],
        num_args: usize,
    ) -> Vec<BTreeSet<usize>> {
        dense_reverse_sparsity(results, num_args)
    }
}

/// Every result depends on every argument.
pub fn dense_forward_sparsity(
    args: &[BTreeSet<usize>],
    num_results: usize,
) -> Vec<BTreeSet<usize>> {
    let all: BTreeSet<usize> = args.iter().flatten().copied().collect();
    vec![all; num_results]
}

/// Every argument feeds every result.
pub fn dense_reverse_sparsity(
    results: &[BTreeSet<usize>],
    num_args: usize,
) -> Vec<BTreeSet<usize>> {
    let all: BTreeSet<usize> = results.iter().flatten().copied().collect();
    vec![all; num_args]
}

/// Handle to a registered atomic, valid for the registry of one base type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtomicId(pub(crate) u32);

impl AtomicId {
    pub(crate) const SUM: AtomicId = AtomicId(0);
    pub(crate) const CONCAT: AtomicId = AtomicId(1);
    pub(crate) const REVERSE: AtomicId = AtomicId(2);
    pub(crate) const PACK: AtomicId = AtomicId(3);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A registered atomic, as referenced from a tape.
pub(crate) struct AtomicEntry<B: Base> {
    pub(crate) id: AtomicId,
    pub(crate) name: Arc<str>,
    pub(crate) op: Arc<dyn AtomicOp<B>>,
}

impl<B: Base> Clone for AtomicEntry<B> {
    fn clone(&self) -> Self {
        AtomicEntry {
            id: self.id,
            name: Arc::clone(&self.name),
            op: Arc::clone(&self.op),
        }
    }
}

struct RegistryInner<B: Base> {
    entries: Vec<AtomicEntry<B>>,
    by_name: HashMap<Arc<str>, AtomicId>,
}

/// Append-only table of atomics for one base type.
///
/// Entries are never removed or replaced, so an [`AtomicId`] stays valid for
/// the life of the process.
pub struct AtomicRegistry<B: Base> {
    inner: RwLock<RegistryInner<B>>,
}

impl<B: Base> AtomicRegistry<B> {
    fn empty() -> Self {
        AtomicRegistry {
            inner: RwLock::new(RegistryInner {
                entries: Vec::new(),
                by_name: HashMap::new(),
            }),
        }
    }

    /// A registry holding the fixed-arity built-ins at their reserved ids.
    pub(crate) fn with_builtins() -> Self {
        let registry = Self::empty();
        let builtins: [(&str, Arc<dyn AtomicOp<B>>); 4] = [
            ("sum", Arc::new(Sum)),
            ("concat", Arc::new(Concat)),
            ("reverse", Arc::new(Flip)),
            ("pack", Arc::new(Pack)),
        ];
        for (name, op) in builtins {
            // The registry is empty, so none of these names can collide.
            let _ = registry.register(name, op);
        }
        registry
    }

    /// Add `op` under `name`. Fails if the name is taken.
    pub fn register(&self, name: &str, op: Arc<dyn AtomicOp<B>>) -> Result<AtomicId> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.by_name.contains_key(name) {
            return Err(Error::state(format!("atomic `{}` is already registered", name)));
        }
        Ok(Self::insert(&mut inner, name, op))
    }

    fn insert(inner: &mut RegistryInner<B>, name: &str, op: Arc<dyn AtomicOp<B>>) -> AtomicId {
        let id = AtomicId(inner.entries.len() as u32);
        let name: Arc<str> = Arc::from(name);
        inner.entries.push(AtomicEntry {
            id,
            name: Arc::clone(&name),
            op,
        });
        inner.by_name.insert(name, id);
        debug!("registered atomic `{}` as {:?}", inner.entries[id.index()].name, id);
        id
    }

    /// Id of the atomic registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<AtomicId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_name.get(name).copied()
    }

    /// Find `name`, registering `make()` under it if absent.
    pub fn get_or_register(
        &self,
        name: &str,
        make: impl FnOnce() -> Arc<dyn AtomicOp<B>>,
    ) -> AtomicId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have registered it between the two locks.
        if let Some(&id) = inner.by_name.get(name) {
            return id;
        }
        Self::insert(&mut inner, name, make())
    }

    /// Name of a registered atomic.
    pub fn name(&self, id: AtomicId) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(id.index()).map(|e| e.name.to_string())
    }

    /// Number of registered atomics.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn entry(&self, id: AtomicId) -> Result<AtomicEntry<B>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .entries
            .get(id.index())
            .cloned()
            .ok_or_else(|| Error::state(format!("unknown atomic id {}", id.0)))
    }
}

/// Register `op` under `name` in the registry of base `B`.
pub fn register_atomic<B: Base>(name: &str, op: impl AtomicOp<B> + 'static) -> Result<AtomicId> {
    B::atomic_registry().register(name, Arc::new(op))
}

/// Id of the atomic registered under `name` for base `B`.
pub fn lookup_atomic<B: Base>(name: &str) -> Option<AtomicId> {
    B::atomic_registry().lookup(name)
}

/// Id of the `make[len]` atomic, registering it on first use.
pub fn make_atomic<B: Base>(len: usize) -> AtomicId {
    B::atomic_registry().get_or_register(&format!("make[{}]", len), || Arc::new(Make::new(len)))
}

/// Id of the `unpack[len]` atomic, registering it on first use.
pub fn unpack_atomic<B: Base>(len: usize) -> AtomicId {
    B::atomic_registry().get_or_register(&format!("unpack[{}]", len), || Arc::new(Unpack::new(len)))
}

/// Apply an atomic to `args`.
///
/// The order-zero results are computed immediately. When recording and at
/// least one argument is a variable of the active tape, the call is recorded
/// and every result the atomic marks in `var_out` becomes a variable;
/// parameter arguments are embedded as constants.
pub fn call_atomic<B: Base>(id: AtomicId, args: &[AD<B>]) -> Result<Vec<AD<B>>> {
    let entry = B::atomic_registry().entry(id)?;
    let m = entry.op.num_results(args.len());
    if m == 0 {
        return Err(Error::state(format!("atomic `{}` produces no results", entry.name)));
    }

    let tape_id = active_tape_id::<B>();
    let var_in: Vec<bool> = args
        .iter()
        .map(|a| tape_id.is_some_and(|t| a.index_on(t).is_some()))
        .collect();
    let any_var = var_in.iter().any(|&v| v);
    let mut var_out = vec![any_var; m];

    let tx: Vec<B> = args.iter().map(|a| a.value.clone()).collect();
    let mut ty = vec![B::zero(); m];
    if !entry.op.forward(0, 0, &var_in, &mut var_out, &tx, &mut ty)? {
        return Err(Error::UnsupportedOrder {
            atomic: entry.name.to_string(),
            order: 0,
        });
    }

    if !any_var || !var_out.iter().any(|&v| v) {
        return Ok(ty.into_iter().map(AD::parameter).collect());
    }

    let recorded = with_active_tape::<B, _>(|t| {
        let mut arg_indices = Vec::with_capacity(args.len());
        for a in args {
            let idx = match a.index_on(t.id) {
                Some(idx) => idx,
                None => t.push_const(a.value.clone()),
            };
            arg_indices.push(idx);
        }
        (t.id, t.push_atomic(&entry, arg_indices, ty.clone()))
    });
    let (tape, first) =
        recorded.ok_or_else(|| Error::state("recording ended during an atomic call"))?;

    Ok(ty
        .into_iter()
        .zip(var_out)
        .enumerate()
        .map(|(i, (value, var))| {
            if var {
                AD::from_slot(
                    value,
                    Slot::TapeRef {
                        tape,
                        index: first + i as u32,
                    },
                )
            } else {
                AD::parameter(value)
            }
        })
        .collect())
}

fn single<B: Base>(mut results: Vec<AD<B>>) -> Result<AD<B>> {
    match results.len() {
        1 => results.pop().ok_or_else(|| Error::shape("atomic results", 1, 0)),
        n => Err(Error::shape("atomic results", 1, n)),
    }
}

/// Sum of the elements of `x`.
pub fn sum<B: Base>(x: &AD<B>) -> Result<AD<B>> {
    single(call_atomic(AtomicId::SUM, std::slice::from_ref(x))?)
}

/// Elements of `x` followed by the elements of `y`.
pub fn concat<B: Base>(x: &AD<B>, y: &AD<B>) -> Result<AD<B>> {
    single(call_atomic(AtomicId::CONCAT, &[x.clone(), y.clone()])?)
}

/// Elements of `x` in reverse order.
pub fn reverse<B: Base>(x: &AD<B>) -> Result<AD<B>> {
    single(call_atomic(AtomicId::REVERSE, std::slice::from_ref(x))?)
}

/// Array of `len` copies of the scalar `x`.
pub fn make<B: Base>(x: &AD<B>, len: usize) -> Result<AD<B>> {
    single(call_atomic(make_atomic::<B>(len), std::slice::from_ref(x))?)
}

/// Array whose elements are the scalars `xs`.
pub fn pack<B: Base>(xs: &[AD<B>]) -> Result<AD<B>> {
    single(call_atomic(AtomicId::PACK, xs)?)
}

/// The `len` elements of `x` as separate scalars.
pub fn unpack<B: Base>(x: &AD<B>, len: usize) -> Result<Vec<AD<B>>> {
    call_atomic(unpack_atomic::<B>(len), std::slice::from_ref(x))
}

/// Order `k` of argument (or result) `j` in a coefficient block of `q + 1`
/// orders per entry.
#[inline]
pub(crate) fn at(j: usize, k: usize, q: usize) -> usize {
    j * (q + 1) + k
}

/// Elements of `v` expanded to `len` when scalar, checked against `len`
/// otherwise.
pub(crate) fn expand<B: Base>(v: &B, len: usize, context: &'static str) -> Result<Vec<B::Elem>> {
    if v.is_scalar() {
        Ok(vec![v.sum_elements(); len])
    } else if v.len() == len {
        Ok(v.to_elements())
    } else {
        Err(Error::shape(context, len, v.len()))
    }
}

/// A value shaped like `shape` from `elems`: a scalar shape takes the sum.
pub(crate) fn shaped_like<B: Base>(elems: Vec<B::Elem>, shape: &B) -> Result<B> {
    if shape.is_scalar() {
        let total = elems
            .into_iter()
            .fold(<B::Elem as num_traits::Zero>::zero(), |acc, x| acc + x);
        Ok(B::from_elem(total))
    } else {
        B::from_elements(elems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn builtins_have_reserved_ids() {
        assert_eq!(lookup_atomic::<Value<f64>>("sum"), Some(AtomicId::SUM));
        assert_eq!(lookup_atomic::<Value<f64>>("concat"), Some(AtomicId::CONCAT));
        assert_eq!(lookup_atomic::<Value<f64>>("reverse"), Some(AtomicId::REVERSE));
        assert_eq!(lookup_atomic::<Value<f64>>("pack"), Some(AtomicId::PACK));
        assert_eq!(lookup_atomic::<f32>("sum"), Some(AtomicId::SUM));
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = register_atomic::<Value<f64>>("sum", Sum).unwrap_err();
        assert!(matches!(err, Error::State(_)));
    }

    #[test]
    fn sized_instances_are_shared() {
        let a = make_atomic::<Value<f64>>(7);
        let b = make_atomic::<Value<f64>>(7);
        assert_eq!(a, b);
        assert_ne!(a, make_atomic::<Value<f64>>(8));
        assert_eq!(
            Value::<f64>::atomic_registry().name(a).as_deref(),
            Some("make[7]")
        );
    }

    #[test]
    fn parameters_are_evaluated_eagerly() {
        let x = AD::parameter(Value::array(vec![1.0_f64, 2.0, 3.0]));
        let s = sum(&x).unwrap();
        assert_eq!(s.value(), &Value::scalar(6.0));
        assert!(!s.is_variable());
    }
}
