use adtape::{pack, record_multi, sum, JacobianPattern, Result, Value, AD};

type V = Value<f64>;

fn outputs(x: &[AD<V>]) -> Result<Vec<AD<V>>> {
    Ok(vec![
        &x[0] * &x[1],
        x[2].sin(),
        sum(&pack(&[x[0].clone(), x[2].clone()])?)?,
    ])
}

fn point() -> Vec<V> {
    vec![Value::scalar(1.0), Value::scalar(2.0), Value::scalar(3.0)]
}

#[test]
fn forward_pattern_lists_dependencies() {
    let (tf, _) = record_multi(outputs, &point()).unwrap();
    let pattern = tf.forward_sparsity();
    assert_eq!(pattern.num_outputs, 3);
    assert_eq!(pattern.num_inputs, 3);
    assert_eq!(pattern.nnz(), 5);
    for (i, j) in [(0, 0), (0, 1), (1, 2), (2, 0), (2, 2)] {
        assert!(pattern.contains(i, j), "missing ({i}, {j})");
    }
    assert!(!pattern.contains(1, 0));
    assert!(!pattern.contains(2, 1));
}

#[test]
fn forward_and_reverse_patterns_agree() {
    let (tf, _) = record_multi(outputs, &point()).unwrap();
    assert_eq!(tf.forward_sparsity(), tf.reverse_sparsity());
}

#[test]
fn pattern_matches_nonzero_jacobian_entries() {
    let (mut tf, _) = record_multi(outputs, &point()).unwrap();
    let pattern = tf.forward_sparsity();
    let jac = tf.jacobian(&point()).unwrap();
    for (i, row) in jac.iter().enumerate() {
        for (j, entry) in row.iter().enumerate() {
            if *entry != Value::scalar(0.0) {
                assert!(pattern.contains(i, j), "({i}, {j}) is nonzero");
            }
        }
    }
}

#[test]
fn constant_output_has_empty_row() {
    let f = |x: &[AD<f64>]| -> Result<Vec<AD<f64>>> { Ok(vec![AD::parameter(1.0), x[0].exp()]) };
    let (tf, _) = record_multi(f, &[0.5]).unwrap();
    let pattern = tf.reverse_sparsity();
    assert_eq!(
        pattern,
        JacobianPattern {
            num_outputs: 2,
            num_inputs: 1,
            rows: vec![1],
            cols: vec![0],
        }
    );
    assert_eq!(tf.forward_sparsity(), pattern);
}
