use adtape::{record, record_multi, Result, AD};
use approx::assert_relative_eq;

/// Exercises every elementary opcode.
fn mixed<T>(x: &[T]) -> T
where
    T: Clone
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>
        + std::ops::Neg<Output = T>
        + Elementary,
{
    let a = x[0].clone() * x[1].clone().exp();
    let b = x[0].clone().sin() / x[2].clone();
    let c = x[1].clone().sqrt().ln() - x[2].clone().cos();
    let d = -(x[0].clone() - x[2].clone()).abs();
    a + b + c + d
}

trait Elementary {
    fn exp(&self) -> Self;
    fn ln(&self) -> Self;
    fn sqrt(&self) -> Self;
    fn sin(&self) -> Self;
    fn cos(&self) -> Self;
    fn abs(&self) -> Self;
}

impl Elementary for f64 {
    fn exp(&self) -> Self {
        f64::exp(*self)
    }
    fn ln(&self) -> Self {
        f64::ln(*self)
    }
    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }
    fn sin(&self) -> Self {
        f64::sin(*self)
    }
    fn cos(&self) -> Self {
        f64::cos(*self)
    }
    fn abs(&self) -> Self {
        f64::abs(*self)
    }
}

impl Elementary for AD<f64> {
    fn exp(&self) -> Self {
        AD::exp(self)
    }
    fn ln(&self) -> Self {
        AD::ln(self)
    }
    fn sqrt(&self) -> Self {
        AD::sqrt(self)
    }
    fn sin(&self) -> Self {
        AD::sin(self)
    }
    fn cos(&self) -> Self {
        AD::cos(self)
    }
    fn abs(&self) -> Self {
        AD::abs(self)
    }
}

fn recorded(x: &[AD<f64>]) -> Result<AD<f64>> {
    Ok(mixed(x))
}

fn central_difference(f: impl Fn(&[f64]) -> f64, x: &[f64], h: f64) -> Vec<f64> {
    (0..x.len())
        .map(|j| {
            let mut xp = x.to_vec();
            let mut xm = x.to_vec();
            xp[j] += h;
            xm[j] -= h;
            (f(&xp) - f(&xm)) / (2.0 * h)
        })
        .collect()
}

const X: [f64; 3] = [0.7, 1.3, 2.1];

#[test]
fn recorded_value_matches_plain_evaluation() {
    let (mut tf, y) = record(recorded, &X).unwrap();
    assert_relative_eq!(y, mixed(&X), max_relative = 1e-14);
    let x2 = [0.4, 2.0, 1.5];
    let y2 = tf.forward_zero(&x2).unwrap();
    assert_relative_eq!(y2[0], mixed(&x2), max_relative = 1e-14);
}

#[test]
fn forward_and_reverse_agree() {
    let (mut tf, _) = record(recorded, &X).unwrap();
    let grad = tf.gradient(&X).unwrap();
    for j in 0..3 {
        let mut e = vec![0.0; 3];
        e[j] = 1.0;
        let dy = tf.forward_one(&e).unwrap();
        assert_relative_eq!(dy[0], grad[j], max_relative = 1e-12);
    }
}

#[test]
fn gradient_matches_finite_differences() {
    let (mut tf, _) = record(recorded, &X).unwrap();
    for x in [X, [1.1, 0.4, 0.9], [-0.5, 3.0, 1.2]] {
        let grad = tf.gradient(&x).unwrap();
        let fd = central_difference(|v| mixed(v), &x, 1e-3);
        for (g, f) in grad.iter().zip(&fd) {
            assert_relative_eq!(*g, *f, max_relative = 1e-5, epsilon = 1e-6);
        }
    }
}

#[test]
fn multiple_directions_share_order_zero() {
    let (mut tf, _) = record(recorded, &X).unwrap();
    tf.forward_zero(&X).unwrap();
    let seeds = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.5, 0.5, 2.0]];
    let batched = tf.forward(1, 3, &seeds).unwrap();
    for (d, seed) in seeds.iter().enumerate() {
        let single = tf.forward_one(seed).unwrap();
        assert_relative_eq!(batched[d][0], single[0], max_relative = 1e-14);
    }
}

// f(x) = x0^2 x1 + exp(x1)
fn quadratic(x: &[AD<f64>]) -> Result<AD<f64>> {
    Ok(&x[0] * &x[0] * &x[1] + x[1].exp())
}

fn hessian(x: &[f64]) -> [[f64; 2]; 2] {
    [[2.0 * x[1], 2.0 * x[0]], [2.0 * x[0], x[1].exp()]]
}

#[test]
fn second_order_coefficient_is_half_the_curvature() {
    let x = [0.8, 0.3];
    let v = [1.0, 2.0];
    let (mut tf, _) = record(quadratic, &x).unwrap();
    tf.forward_zero(&x).unwrap();
    tf.forward_one(&v).unwrap();
    let y2 = tf.forward(2, 1, &[vec![0.0, 0.0]]).unwrap();

    let h = hessian(&x);
    let vhv: f64 = (0..2)
        .map(|i| (0..2).map(|j| v[i] * h[i][j] * v[j]).sum::<f64>())
        .sum();
    assert_relative_eq!(y2[0][0], vhv / 2.0, max_relative = 1e-12);
}

#[test]
fn second_order_per_direction() {
    let x = [0.8, 0.3];
    let (mut tf, _) = record(quadratic, &x).unwrap();
    tf.forward_zero(&x).unwrap();
    tf.forward(1, 2, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    let y2 = tf.forward(2, 2, &[vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap();
    let h = hessian(&x);
    assert_relative_eq!(y2[0][0], h[0][0] / 2.0, max_relative = 1e-12);
    assert_relative_eq!(y2[1][0], h[1][1] / 2.0, max_relative = 1e-12);
}

#[test]
fn second_order_reverse_is_hessian_vector_product() {
    let x = [0.8, 0.3];
    let v = [1.0, 2.0];
    let (mut tf, _) = record(quadratic, &x).unwrap();

    let hv = tf.hessian_vector(&x, &v).unwrap();
    let h = hessian(&x);
    for i in 0..2 {
        let expected = h[i][0] * v[0] + h[i][1] * v[1];
        assert_relative_eq!(hv[i], expected, max_relative = 1e-12);
    }

    // The weight on y^(1) also yields the gradient against x^(1).
    let px = tf.reverse(2, &[vec![0.0, 1.0]]).unwrap();
    let grad = [2.0 * x[0] * x[1], x[0] * x[0] + x[1].exp()];
    for j in 0..2 {
        assert_relative_eq!(px[j][1], grad[j], max_relative = 1e-12);
    }
}

#[test]
fn third_order_exp_series() {
    // exp(x) along t: y^(k) = exp(x0) / k!
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(x[0].exp()), &[0.5]).unwrap();
    tf.forward_zero(&[0.5]).unwrap();
    tf.forward_one(&[1.0]).unwrap();
    tf.forward(2, 1, &[vec![0.0]]).unwrap();
    let y3 = tf.forward(3, 1, &[vec![0.0]]).unwrap();
    assert_relative_eq!(y3[0][0], 0.5_f64.exp() / 6.0, max_relative = 1e-13);

    // Reverse through all four orders: d y^(3) / d x^(0) = exp(x0) / 6.
    let px = tf.reverse(4, &[vec![0.0, 0.0, 0.0, 1.0]]).unwrap();
    assert_relative_eq!(px[0][0], 0.5_f64.exp() / 6.0, max_relative = 1e-13);
    // d y^(3) / d x^(3) = exp(x0)
    assert_relative_eq!(px[0][3], 0.5_f64.exp(), max_relative = 1e-13);
}

#[test]
fn second_order_trig_reverse_matches_finite_differences() {
    // g(x) = d/dt sin(x0 + t) cos(x1 + t) at t = 0, differentiated in x.
    let x = [0.3, 1.1];
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(x[0].sin() * x[1].cos()), &x).unwrap();
    tf.forward_zero(&x).unwrap();
    tf.forward_one(&[1.0, 1.0]).unwrap();
    let px = tf.reverse(2, &[vec![0.0, 1.0]]).unwrap();

    let g = |x: &[f64]| x[0].cos() * x[1].cos() - x[0].sin() * x[1].sin();
    let fd = central_difference(g, &x, 1e-3);
    for j in 0..2 {
        assert_relative_eq!(px[j][0], fd[j], max_relative = 1e-5, epsilon = 1e-6);
    }
}

#[test]
fn jacobian_modes_agree() {
    let f = |x: &[AD<f64>]| -> Result<Vec<AD<f64>>> {
        Ok(vec![
            &x[0] * &x[1],
            x[0].sin() + x[1].exp() / &x[0],
            (&x[1] - &x[0]).sqrt(),
        ])
    };
    let x = [0.5, 2.0];
    let (mut tf, values) = record_multi(f, &x).unwrap();
    assert_eq!(values.len(), 3);

    let jf = tf.jacobian_forward(&x).unwrap();
    let jr = tf.jacobian_reverse(&x).unwrap();
    let auto = tf.jacobian(&x).unwrap();
    assert_eq!(jf.len(), 3);
    for i in 0..3 {
        for j in 0..2 {
            assert_relative_eq!(jf[i][j], jr[i][j], max_relative = 1e-12);
            assert_relative_eq!(auto[i][j], jr[i][j], max_relative = 1e-12);
        }
    }
    assert_relative_eq!(jf[0][0], 2.0);
    assert_relative_eq!(jf[0][1], 0.5);
}

#[test]
fn f32_tapes_work() {
    let (mut tf, y) = record(|x: &[AD<f32>]| Ok(&x[0] * &x[0] * 3.0_f32), &[2.0_f32]).unwrap();
    assert_eq!(y, 12.0);
    assert_eq!(tf.gradient(&[1.0]).unwrap(), vec![6.0]);
}
