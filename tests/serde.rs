#![cfg(feature = "serde")]

use adtape::{record, sum, Value, AD};

#[test]
fn value_roundtrips_through_json() {
    let values = vec![Value::scalar(1.5_f64), Value::array(vec![1.0, -2.0, 3.25])];
    let json = serde_json::to_string(&values).unwrap();
    let back: Vec<Value<f64>> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, values);
}

#[test]
fn deserialized_point_replays_on_tape() {
    let x = Value::array(vec![1.0_f64, 2.0]);
    let (mut tf, _) = record(|v: &[AD<Value<f64>>]| sum(&(&v[0] * &v[0])), &[x.clone()]).unwrap();
    let json = serde_json::to_string(&x).unwrap();
    let restored: Value<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(tf.gradient(&[restored]).unwrap(), tf.gradient(&[x]).unwrap());
}
