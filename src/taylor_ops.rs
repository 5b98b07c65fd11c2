//! Taylor coefficient propagation for the elementary opcodes.
//!
//! Convention: `c[k] = f^(k)(t₀) / k!` (scaled Taylor coefficients).
//! Forward rules compute the highest coefficient of a result from the
//! argument coefficients and the lower result coefficients. Reverse rules
//! walk the same recurrences backwards (Griewank & Walther, Ch. 13) and
//! accumulate partials with respect to every argument coefficient.
//!
//! All functions are generic over [`Base`], so an array-shaped coefficient
//! and a broadcast scalar coefficient mix freely.

use crate::base::Base;
use crate::error::Result;
use crate::opcode::{eval_binary, eval_unary, ratio, sign, BinaryOp, UnaryOp};

#[inline]
fn add_to<B: Base>(target: &mut B, v: &B) -> Result<()> {
    *target = target.try_add(v)?;
    Ok(())
}

#[inline]
fn sub_from<B: Base>(target: &mut B, v: &B) -> Result<()> {
    *target = target.try_sub(v)?;
    Ok(())
}

/// `(sin(a), cos(a))` coefficient series, same length as `a`.
///
/// `s[k] = (1/k) Σ_{j=1}^{k} j a[j] c[k-j]`
/// `c[k] = -(1/k) Σ_{j=1}^{k} j a[j] s[k-j]`
fn sin_cos_series<B: Base>(a: &[B]) -> Result<(Vec<B>, Vec<B>)> {
    let n = a.len();
    let mut s = Vec::with_capacity(n);
    let mut c = Vec::with_capacity(n);
    s.push(eval_unary(UnaryOp::Sin, &a[0]));
    c.push(eval_unary(UnaryOp::Cos, &a[0]));
    for k in 1..n {
        let mut sk = B::zero();
        let mut ck = B::zero();
        for j in 1..=k {
            let ja = a[j].scale(ratio::<B>(j, k));
            sk = sk.try_add(&ja.try_mul(&c[k - j])?)?;
            ck = ck.try_sub(&ja.try_mul(&s[k - j])?)?;
        }
        s.push(sk);
        c.push(ck);
    }
    Ok((s, c))
}

// ══════════════════════════════════════════════
//  Forward
// ══════════════════════════════════════════════

/// Compute `z[k]` for a unary op, `k = z.len() - 1`.
///
/// `a` holds argument orders `0..=k`; `z[..k]` must already be valid.
pub(crate) fn forward_unary<B: Base>(op: UnaryOp, a: &[B], z: &mut [B]) -> Result<()> {
    let k = z.len() - 1;
    if k == 0 {
        z[0] = eval_unary(op, &a[0]);
        return Ok(());
    }
    z[k] = match op {
        UnaryOp::Neg => a[k].negate(),
        UnaryOp::Abs => a[0].map(sign).try_mul(&a[k])?,
        UnaryOp::Exp => {
            // z[k] = (1/k) Σ_{j=1}^{k} j a[j] z[k-j]
            let mut sum = B::zero();
            for j in 1..=k {
                sum = sum.try_add(&a[j].try_mul(&z[k - j])?.scale(ratio::<B>(j, k)))?;
            }
            sum
        }
        UnaryOp::Ln => {
            // z[k] = (a[k] - (1/k) Σ_{j=1}^{k-1} j z[j] a[k-j]) / a[0]
            let mut sum = a[k].clone();
            for j in 1..k {
                sum = sum.try_sub(&z[j].try_mul(&a[k - j])?.scale(ratio::<B>(j, k)))?;
            }
            sum.try_div(&a[0])?
        }
        UnaryOp::Sqrt => {
            // z[k] = (a[k] - Σ_{j=1}^{k-1} z[j] z[k-j]) / (2 z[0])
            let mut sum = a[k].clone();
            for j in 1..k {
                sum = sum.try_sub(&z[j].try_mul(&z[k - j])?)?;
            }
            sum.try_div(&z[0].scale(ratio::<B>(2, 1)))?
        }
        UnaryOp::Sin | UnaryOp::Cos => {
            let (mut s, mut c) = sin_cos_series(a)?;
            if op == UnaryOp::Sin {
                s.swap_remove(k)
            } else {
                c.swap_remove(k)
            }
        }
    };
    Ok(())
}

/// Compute `z[k]` for a binary op, `k = z.len() - 1`.
pub(crate) fn forward_binary<B: Base>(op: BinaryOp, a: &[B], b: &[B], z: &mut [B]) -> Result<()> {
    let k = z.len() - 1;
    if k == 0 {
        z[0] = eval_binary(op, &a[0], &b[0])?;
        return Ok(());
    }
    z[k] = match op {
        BinaryOp::Add => a[k].try_add(&b[k])?,
        BinaryOp::Sub => a[k].try_sub(&b[k])?,
        BinaryOp::Mul => {
            // Cauchy product
            let mut sum = B::zero();
            for j in 0..=k {
                sum = sum.try_add(&a[j].try_mul(&b[k - j])?)?;
            }
            sum
        }
        BinaryOp::Div => {
            // z[k] = (a[k] - Σ_{j=1}^{k} b[j] z[k-j]) / b[0]
            let mut sum = a[k].clone();
            for j in 1..=k {
                sum = sum.try_sub(&b[j].try_mul(&z[k - j])?)?;
            }
            sum.try_div(&b[0])?
        }
    };
    Ok(())
}

// ══════════════════════════════════════════════
//  Reverse
// ══════════════════════════════════════════════

/// Accumulate partials of a unary op into `pa`.
///
/// `a` and `z` hold orders `0..=q`; `pz` holds the partials of the result
/// coefficients and is consumed as scratch space.
pub(crate) fn reverse_unary<B: Base>(
    op: UnaryOp,
    a: &[B],
    z: &[B],
    pz: &mut [B],
    pa: &mut [B],
) -> Result<()> {
    let q = a.len() - 1;
    match op {
        UnaryOp::Neg => {
            for k in 0..=q {
                sub_from(&mut pa[k], &pz[k])?;
            }
        }
        UnaryOp::Abs => {
            let s = a[0].map(sign);
            for k in 0..=q {
                add_to(&mut pa[k], &s.try_mul(&pz[k])?)?;
            }
        }
        UnaryOp::Exp => {
            for k in (1..=q).rev() {
                for j in 1..=k {
                    let w = pz[k].scale(ratio::<B>(j, k));
                    add_to(&mut pa[j], &w.try_mul(&z[k - j])?)?;
                    add_to(&mut pz[k - j], &w.try_mul(&a[j])?)?;
                }
            }
            add_to(&mut pa[0], &pz[0].try_mul(&z[0])?)?;
        }
        UnaryOp::Ln => {
            for k in (1..=q).rev() {
                pz[k] = pz[k].try_div(&a[0])?;
                sub_from(&mut pa[0], &pz[k].try_mul(&z[k])?)?;
                add_to(&mut pa[k], &pz[k])?;
                for j in 1..k {
                    let w = pz[k].scale(ratio::<B>(j, k));
                    sub_from(&mut pz[j], &w.try_mul(&a[k - j])?)?;
                    sub_from(&mut pa[k - j], &w.try_mul(&z[j])?)?;
                }
            }
            add_to(&mut pa[0], &pz[0].try_div(&a[0])?)?;
        }
        UnaryOp::Sqrt => {
            let half = ratio::<B>(1, 2);
            for k in (1..=q).rev() {
                pz[k] = pz[k].try_div(&z[0])?;
                let dz0 = pz[k].try_mul(&z[k])?;
                sub_from(&mut pz[0], &dz0)?;
                add_to(&mut pa[k], &pz[k].scale(half))?;
                for j in 1..k {
                    let d = pz[k].try_mul(&z[k - j])?;
                    sub_from(&mut pz[j], &d)?;
                }
            }
            add_to(&mut pa[0], &pz[0].try_div(&z[0])?.scale(half))?;
        }
        UnaryOp::Sin | UnaryOp::Cos => {
            let (s, c) = sin_cos_series(a)?;
            let zeros = vec![B::zero(); q + 1];
            let (mut ps, mut pc) = if op == UnaryOp::Sin {
                (pz.to_vec(), zeros)
            } else {
                (zeros, pz.to_vec())
            };
            for k in (1..=q).rev() {
                for j in 1..=k {
                    let r = ratio::<B>(j, k);
                    let ws = ps[k].scale(r);
                    let wc = pc[k].scale(r);
                    add_to(&mut pa[j], &ws.try_mul(&c[k - j])?)?;
                    sub_from(&mut pa[j], &wc.try_mul(&s[k - j])?)?;
                    add_to(&mut pc[k - j], &ws.try_mul(&a[j])?)?;
                    sub_from(&mut ps[k - j], &wc.try_mul(&a[j])?)?;
                }
            }
            add_to(&mut pa[0], &ps[0].try_mul(&c[0])?)?;
            sub_from(&mut pa[0], &pc[0].try_mul(&s[0])?)?;
        }
    }
    Ok(())
}

/// Accumulate partials of a binary op into `pa` and `pb`.
pub(crate) fn reverse_binary<B: Base>(
    op: BinaryOp,
    a: &[B],
    b: &[B],
    z: &[B],
    pz: &mut [B],
    pa: &mut [B],
    pb: &mut [B],
) -> Result<()> {
    let q = a.len() - 1;
    match op {
        BinaryOp::Add => {
            for k in 0..=q {
                add_to(&mut pa[k], &pz[k])?;
                add_to(&mut pb[k], &pz[k])?;
            }
        }
        BinaryOp::Sub => {
            for k in 0..=q {
                add_to(&mut pa[k], &pz[k])?;
                sub_from(&mut pb[k], &pz[k])?;
            }
        }
        BinaryOp::Mul => {
            for k in 0..=q {
                for j in 0..=k {
                    add_to(&mut pa[j], &pz[k].try_mul(&b[k - j])?)?;
                    add_to(&mut pb[k - j], &pz[k].try_mul(&a[j])?)?;
                }
            }
        }
        BinaryOp::Div => {
            for k in (0..=q).rev() {
                pz[k] = pz[k].try_div(&b[0])?;
                add_to(&mut pa[k], &pz[k])?;
                for j in 1..=k {
                    let dz = pz[k].try_mul(&b[j])?;
                    sub_from(&mut pz[k - j], &dz)?;
                    sub_from(&mut pb[j], &pz[k].try_mul(&z[k - j])?)?;
                }
                sub_from(&mut pb[0], &pz[k].try_mul(&z[k])?)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // exp(x0 + t): coefficients are exp(x0) / k!
    #[test]
    fn exp_series() {
        let a = [1.0_f64, 1.0, 0.0, 0.0];
        let mut z = [0.0_f64; 4];
        for k in 0..4 {
            forward_unary(UnaryOp::Exp, &a[..=k], &mut z[..=k]).unwrap();
        }
        let e = 1.0_f64.exp();
        assert_relative_eq!(z[0], e, max_relative = 1e-14);
        assert_relative_eq!(z[1], e, max_relative = 1e-14);
        assert_relative_eq!(z[2], e / 2.0, max_relative = 1e-14);
        assert_relative_eq!(z[3], e / 6.0, max_relative = 1e-14);
    }

    // sin(t) at 0: [0, 1, 0, -1/6]
    #[test]
    fn sin_series() {
        let a = [0.0_f64, 1.0, 0.0, 0.0];
        let mut z = [0.0_f64; 4];
        for k in 0..4 {
            forward_unary(UnaryOp::Sin, &a[..=k], &mut z[..=k]).unwrap();
        }
        assert_relative_eq!(z[1], 1.0, epsilon = 1e-15);
        assert_relative_eq!(z[2], 0.0, epsilon = 1e-15);
        assert_relative_eq!(z[3], -1.0 / 6.0, epsilon = 1e-15);
    }

    // sqrt(x) at x=4 along t: second coefficient -1/(8 x^{3/2}) / ... = f''/2
    #[test]
    fn sqrt_second_order() {
        let a = [4.0_f64, 1.0, 0.0];
        let mut z = [0.0_f64; 3];
        for k in 0..3 {
            forward_unary(UnaryOp::Sqrt, &a[..=k], &mut z[..=k]).unwrap();
        }
        assert_relative_eq!(z[1], 0.25, epsilon = 1e-15);
        assert_relative_eq!(z[2], -0.25 * 4.0_f64.powf(-1.5) / 2.0, epsilon = 1e-15);
    }

    // d/dx ln(x) = 1/x, and d/dx of the first-order coefficient x1/x0 w.r.t. x0.
    #[test]
    fn ln_reverse_two_orders() {
        let a = [2.0_f64, 1.0];
        let mut z = [0.0_f64; 2];
        for k in 0..2 {
            forward_unary(UnaryOp::Ln, &a[..=k], &mut z[..=k]).unwrap();
        }
        let mut pz = [0.0_f64, 1.0];
        let mut pa = [0.0_f64; 2];
        reverse_unary(UnaryOp::Ln, &a, &z, &mut pz, &mut pa).unwrap();
        // z1 = a1 / a0: dz1/da0 = -a1/a0^2, dz1/da1 = 1/a0
        assert_relative_eq!(pa[0], -0.25, epsilon = 1e-15);
        assert_relative_eq!(pa[1], 0.5, epsilon = 1e-15);
    }
}
