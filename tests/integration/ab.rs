//! A/B comparison integration tests

use crate::helpers::*;
use chainrack::prelude::*;
use chainrack::Error;

#[test]
fn test_switch_to_missing_b_is_refused() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    assert!(!rack.switch_active(Selector::B));
    assert_eq!(rack.selector(), Selector::A);

    // Already active.
    assert!(rack.switch_active(Selector::A));
}

#[test]
fn test_toggle_creates_b_as_copy_of_a() {
    let mut rack = test_rack();
    rack.add("EffectX", params! { "gain" => -6.0 }).unwrap();
    rack.add("EffectY", params! { "freq" => 700.0 }).unwrap();
    let a_ids = rack.pipeline().ids();

    assert_eq!(rack.toggle_active().unwrap(), Selector::B);
    assert_eq!(types(&rack), vec!["EffectX", "EffectY"]);
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(-6.0));
    assert_eq!(param_at(&rack, 1, "freq"), ParamValue::Float(700.0));

    // Deep copy: B owns its own instances.
    for id in rack.pipeline().ids() {
        assert!(!a_ids.contains(&id));
    }

    assert_eq!(rack.toggle_active().unwrap(), Selector::A);
    assert_eq!(rack.pipeline().ids(), a_ids);
}

#[test]
fn test_edits_touch_only_the_active_pipeline() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    rack.toggle_active().unwrap();

    let x_b = rack.pipeline().ids()[0];
    rack.set_parameters(x_b, params! { "gain" => -20.0 }).unwrap();
    rack.add("Volume", params! {}).unwrap();

    assert!(rack.switch_active(Selector::A));
    assert_eq!(types(&rack), vec!["EffectX"]);
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(0.0));

    let b = rack.control().pipelines().b().unwrap();
    assert_eq!(b.type_ids(), vec!["EffectX", "Volume"]);
}

#[test]
fn test_switching_does_not_rebuild_pipelines() {
    let mut rack = test_rack();
    rack.add("EffectY", params! {}).unwrap();
    rack.toggle_active().unwrap();

    let a_version = rack.control().pipelines().a().version();
    let b_version = rack.control().pipelines().b().unwrap().version();
    for _ in 0..4 {
        rack.toggle_active().unwrap();
    }
    assert_eq!(rack.control().pipelines().a().version(), a_version);
    assert_eq!(rack.control().pipelines().b().unwrap().version(), b_version);
}

#[test]
fn test_copy_b_to_a_requires_b() {
    let mut rack = test_rack();
    assert!(matches!(
        rack.copy_b_to_a(),
        Err(Error::Core(chainrack::core::Error::MissingPipelineB))
    ));
}

#[test]
fn test_copy_between_pipelines() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    rack.copy_a_to_b().unwrap();
    assert_eq!(rack.selector(), Selector::B);
    rack.add("Delay", params! {}).unwrap();

    rack.copy_b_to_a().unwrap();
    assert_eq!(rack.selector(), Selector::A);
    assert_eq!(types(&rack), vec!["EffectX", "Delay"]);

    rack.add("Volume", params! {}).unwrap();
    rack.copy_a_to_b().unwrap();
    assert_eq!(rack.selector(), Selector::B);
    assert_eq!(types(&rack), vec!["EffectX", "Delay", "Volume"]);
}

#[test]
fn test_copy_is_heard_immediately() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let input = sine_block(440.0, &format);

    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    rack.copy_a_to_b().unwrap();
    let b = rack.pipeline().ids()[0];
    rack.set_parameters(b, params! { "gain" => 0.0 }).unwrap();
    let output = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(&output, &input, tolerances::FLOAT_EPSILON));

    rack.copy_b_to_a().unwrap();
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(0.0));
}

#[test]
fn test_switch_changes_what_renders() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let input = sine_block(440.0, &format);

    rack.toggle_active().unwrap();
    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    let b_out = render_block(&mut render, &input, &format);
    assert_relative_eq_ratio(&b_out, &input, tolerances::MINUS_6_DB);

    rack.switch_active(Selector::A);
    let a_out = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(&a_out, &input, tolerances::FLOAT_EPSILON));

    rack.switch_active(Selector::B);
    let b_again = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(&b_again, &b_out, tolerances::FLOAT_EPSILON));
}

#[test]
fn test_ab_switch_is_undoable() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    rack.toggle_active().unwrap();
    assert_eq!(rack.selector(), Selector::B);

    rack.undo();
    assert_eq!(rack.selector(), Selector::A);
    assert!(!rack.control().pipelines().has_b());
}

fn assert_relative_eq_ratio(output: &[f32], input: &[f32], ratio: f32) {
    for (o, i) in output.iter().zip(input) {
        approx::assert_abs_diff_eq!(*o, *i * ratio, epsilon = tolerances::DSP_EPSILON);
    }
}
