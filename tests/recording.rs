use adtape::{begin_recording, is_recording, record, Error, Value, AD};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn nested_recording_fails() {
    init_logging();
    let mut x = vec![AD::parameter(1.0_f64)];
    let session = begin_recording(&mut x).unwrap();
    assert!(is_recording());

    let mut z = vec![AD::parameter(2.0_f64)];
    let err = begin_recording(&mut z).err().expect("nested session must fail");
    assert!(matches!(err, Error::State(_)));
    // The failed attempt leaves its inputs untouched.
    assert_eq!(z[0].slot(), adtape::Slot::Inline);

    // A different base type shares the same thread slot.
    let mut v = vec![AD::parameter(Value::scalar(1.0_f64))];
    assert!(begin_recording(&mut v).is_err());

    let y = x[0].exp();
    let tf = session.freeze(&[y]).unwrap();
    assert!(!is_recording());
    assert_eq!(tf.num_inputs(), 1);
}

#[test]
fn dropped_session_releases_the_thread() {
    let mut x = vec![AD::parameter(1.0_f64)];
    {
        let _session = begin_recording(&mut x).unwrap();
        let _ = x[0].sin();
        assert!(is_recording());
    }
    assert!(!is_recording());
    // Nothing is recorded once the session is gone.
    assert!(!x[0].is_variable());
    let y = x[0].sin();
    assert_eq!(y.slot(), adtape::Slot::Inline);

    let mut x = vec![AD::parameter(1.0_f64)];
    assert!(begin_recording(&mut x).is_ok());
}

#[test]
fn early_error_in_closure_releases_the_thread() {
    let result = record(
        |x: &[AD<Value<f64>>]| {
            let bad = AD::parameter(Value::array(vec![1.0, 2.0]));
            let y = x[0].try_add(&bad)?;
            Ok(y)
        },
        &[Value::array(vec![1.0, 2.0, 3.0])],
    );
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    assert!(!is_recording());
}

#[test]
fn reverse_before_forward_fails() {
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(&x[0] * &x[0]), &[2.0]).unwrap();
    assert_eq!(tf.num_order(), 0);
    assert!(matches!(tf.reverse(1, &[vec![1.0]]), Err(Error::State(_))));

    tf.forward_zero(&[2.0]).unwrap();
    assert!(matches!(tf.reverse(2, &[vec![1.0, 0.0]]), Err(Error::State(_))));
    assert!(tf.reverse(1, &[vec![1.0]]).is_ok());
}

#[test]
fn forward_order_protocol() {
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(&x[0] * &x[1]), &[2.0, 3.0]).unwrap();

    // Higher orders need the lower ones first.
    assert!(matches!(tf.forward(1, 1, &[vec![1.0, 0.0]]), Err(Error::State(_))));
    // Order zero takes a single direction.
    let two = vec![vec![2.0, 3.0], vec![2.0, 3.0]];
    assert!(matches!(tf.forward(0, 2, &two), Err(Error::State(_))));

    tf.forward_zero(&[2.0, 3.0]).unwrap();
    assert!(matches!(tf.forward(2, 1, &[vec![0.0, 0.0]]), Err(Error::State(_))));

    tf.forward(1, 2, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
    assert_eq!(tf.num_direction(), 2);
    // Order two must keep the direction count of order one.
    assert!(matches!(tf.forward(2, 1, &[vec![0.0, 0.0]]), Err(Error::State(_))));
    assert!(tf.forward(2, 2, &[vec![0.0, 0.0], vec![0.0, 0.0]]).is_ok());

    // Wrong seed length.
    assert!(matches!(
        tf.forward_zero(&[1.0]),
        Err(Error::ShapeMismatch { expected: 2, actual: 1, .. })
    ));
}

#[test]
fn new_point_invalidates_higher_orders() {
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(x[0].exp()), &[0.0]).unwrap();
    tf.forward_zero(&[0.0]).unwrap();
    tf.forward_one(&[1.0]).unwrap();
    assert_eq!(tf.num_order(), 2);
    tf.forward_zero(&[1.0]).unwrap();
    assert_eq!(tf.num_order(), 1);
    assert!(tf.reverse(2, &[vec![0.0, 1.0]]).is_err());
}

#[test]
fn output_of_another_tape_is_rejected() {
    let mut x = vec![AD::parameter(1.0_f64)];
    let s1 = begin_recording(&mut x).unwrap();
    let foreign = x[0].exp();
    let _ = s1.freeze(&[foreign.clone()]).unwrap();

    let mut z = vec![AD::parameter(2.0_f64)];
    let s2 = begin_recording(&mut z).unwrap();
    let err = s2.freeze(&[foreign]).err().expect("foreign output must fail");
    assert!(matches!(err, Error::State(_)));
    assert!(!is_recording());
}

#[test]
fn foreign_variables_act_as_parameters() {
    let mut x = vec![AD::parameter(3.0_f64)];
    let s1 = begin_recording(&mut x).unwrap();
    let old = x[0].clone();
    let _ = s1.freeze(&[old.clone()]).unwrap();

    let mut z = vec![AD::parameter(2.0_f64)];
    let s2 = begin_recording(&mut z).unwrap();
    let y = &z[0] * &old;
    let mut tf = s2.freeze(&[y]).unwrap();
    let g = tf.gradient(&[5.0]).unwrap();
    assert_eq!(g, vec![3.0]);
}

#[test]
fn parameter_output_is_embedded() {
    let (mut tf, y) = record(|_x: &[AD<f64>]| Ok(AD::parameter(5.0)), &[1.0]).unwrap();
    assert_eq!(y, 5.0);
    assert_eq!(tf.forward_zero(&[7.0]).unwrap(), vec![5.0]);
    assert_eq!(tf.gradient(&[7.0]).unwrap(), vec![0.0]);
}

#[test]
fn unreachable_entries_are_pruned() {
    let (tf, _) = record(
        |x: &[AD<f64>]| {
            let _dead = x[0].exp() * 3.0;
            let _unused_input_op = x[1].sin();
            Ok(&x[0] * &x[1])
        },
        &[2.0, 3.0],
    )
    .unwrap();
    // Two inputs and the product.
    assert_eq!(tf.num_ops(), 3);
    assert_eq!(tf.outputs_at_zero(), vec![6.0]);
}

#[test]
fn inputs_survive_pruning() {
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(x[2].sqrt()), &[1.0, 2.0, 4.0]).unwrap();
    assert_eq!(tf.num_inputs(), 3);
    assert_eq!(tf.num_ops(), 4);
    let g = tf.gradient(&[1.0, 2.0, 4.0]).unwrap();
    assert_eq!(g, vec![0.0, 0.0, 0.25]);
}

#[test]
fn memory_is_side_effect_free() {
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(&x[0] * &x[1] + x[0].cos()), &[1.0, 2.0]).unwrap();
    let before = tf.memory();
    assert!(before > 0);
    assert_eq!(tf.memory(), before);

    tf.forward_zero(&[1.0, 2.0]).unwrap();
    tf.forward(1, 3, &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
    let order = tf.num_order();
    let grown = tf.memory();
    assert!(grown > before);
    assert_eq!(tf.num_order(), order);
}

#[test]
fn clones_evaluate_independently() {
    let (mut tf, _) = record(|x: &[AD<f64>]| Ok(&x[0] * &x[0]), &[1.0]).unwrap();
    tf.forward_zero(&[3.0]).unwrap();
    let mut other = tf.clone();
    other.forward_zero(&[5.0]).unwrap();
    assert_eq!(tf.reverse(1, &[vec![1.0]]).unwrap(), vec![vec![6.0]]);
    assert_eq!(other.reverse(1, &[vec![1.0]]).unwrap(), vec![vec![10.0]]);
}
