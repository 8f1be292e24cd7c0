//! Undo/redo integration tests

use crate::helpers::*;
use chainrack::prelude::*;

#[test]
fn test_undo_restores_removed_instance_with_parameters() {
    let mut rack = test_rack();
    rack.add("EffectX", params! { "gain" => -6.0 }).unwrap();
    let y = rack.add("EffectY", params! { "freq" => 700.0 }).unwrap();
    rack.save_state();

    rack.remove(y).unwrap();
    rack.save_state();
    assert_eq!(types(&rack), vec!["EffectX"]);

    assert!(rack.undo());
    assert_eq!(types(&rack), vec!["EffectX", "EffectY"]);
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(-6.0));
    assert_eq!(param_at(&rack, 1, "freq"), ParamValue::Float(700.0));

    assert!(rack.redo());
    assert_eq!(types(&rack), vec!["EffectX"]);
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(-6.0));
}

#[test]
fn test_explicit_saves_are_idempotent() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    let len = rack.control().history().history().len();

    // Every edit has already been recorded.
    assert!(!rack.save_state());
    assert!(!rack.save_state());
    assert_eq!(rack.control().history().history().len(), len);

    // Edits that change nothing observable are not recorded either.
    let x = rack.pipeline().ids()[0];
    rack.set_parameters(x, params! { "gain" => 0.0 }).unwrap();
    rack.set_enabled(x, true).unwrap();
    assert_eq!(rack.control().history().history().len(), len);
}

#[test]
fn test_undo_after_save_restores_preceding_state() {
    let mut rack = test_rack();
    let x = rack.add("EffectX", params! { "gain" => -3.0 }).unwrap();
    rack.add("Volume", params! {}).unwrap();
    rack.save_state();
    let before = rack.preset_json().unwrap();

    rack.set_parameters(x, params! { "gain" => -30.0 }).unwrap();
    rack.move_to(x, 1).unwrap();
    rack.save_state();
    let after = rack.preset_json().unwrap();

    assert!(rack.undo());
    assert!(rack.undo());
    assert_eq!(rack.preset_json().unwrap(), before);
    assert!(rack.redo());
    assert!(rack.redo());
    assert_eq!(rack.preset_json().unwrap(), after);
}

#[test]
fn test_undo_creates_fresh_instances() {
    let mut rack = test_rack();
    let x = rack.add("EffectX", params! {}).unwrap();
    rack.add("EffectY", params! {}).unwrap();

    rack.undo();
    rack.redo();
    assert_eq!(types(&rack), vec!["EffectX", "EffectY"]);
    assert_ne!(rack.pipeline().ids()[0], x);
}

#[test]
fn test_undo_and_redo_do_not_record() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    rack.add("EffectY", params! {}).unwrap();
    let len = rack.control().history().history().len();

    assert!(rack.undo());
    assert!(rack.undo());
    assert!(rack.pipeline().is_empty());
    assert!(!rack.undo());
    assert_eq!(rack.control().history().history().len(), len);

    assert!(rack.redo());
    assert!(rack.redo());
    assert!(!rack.redo());
    assert_eq!(types(&rack), vec!["EffectX", "EffectY"]);
    assert_eq!(rack.control().history().history().len(), len);
}

#[test]
fn test_new_edit_discards_redo() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    rack.add("EffectY", params! {}).unwrap();
    rack.undo();
    assert!(rack.control().history().history().can_redo());

    rack.add("Volume", params! {}).unwrap();
    assert!(!rack.control().history().history().can_redo());
    assert!(!rack.redo());
    assert_eq!(types(&rack), vec!["EffectX", "Volume"]);
}

#[test]
fn test_history_is_bounded() {
    let mut rack = test_rack_with_history(3);
    for _ in 0..5 {
        rack.add("EffectX", params! {}).unwrap();
    }
    let history = rack.control().history().history();
    assert_eq!(history.len(), 3);
    assert_eq!(history.capacity(), 3);

    // Only the three newest states (3, 4 and 5 instances) remain.
    assert!(rack.undo());
    assert!(rack.undo());
    assert!(!rack.undo());
    assert_eq!(rack.pipeline().len(), 3);
}

#[test]
fn test_parameter_edits_are_undoable() {
    let mut rack = test_rack();
    let x = rack.add("EffectX", params! {}).unwrap();
    rack.set_parameters(x, params! { "gain" => -12.0 }).unwrap();
    rack.set_parameters(x, params! { "gain" => -24.0 }).unwrap();

    rack.undo();
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(-12.0));
    rack.undo();
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(0.0));
}

#[test]
fn test_undo_restores_enabled_and_routing() {
    let mut rack = test_rack();
    let x = rack.add("EffectX", params! {}).unwrap();
    let routing = BusRouting::new(1, 2, ChannelSelection::Left);
    rack.set_routing(x, routing).unwrap();
    rack.set_enabled(x, false).unwrap();
    rack.set_enabled(x, true).unwrap();

    rack.undo();
    let instance = rack.pipeline().at(0).unwrap();
    assert!(!instance.is_enabled());
    assert_eq!(instance.routing(), routing);
}

#[test]
fn test_master_bypass_is_not_history() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    let len = rack.control().history().history().len();
    rack.set_master_bypass(true).unwrap();
    assert_eq!(rack.control().history().history().len(), len);
    assert!(rack.pipeline().is_master_bypassed());

    // Restores always leave master bypass off.
    rack.undo();
    rack.redo();
    assert!(!rack.pipeline().is_master_bypassed());
}

#[test]
fn test_undo_skips_unregistered_types() {
    let mut rack = test_rack();
    rack.add("EffectX", params! {}).unwrap();
    rack.add("EffectY", params! {}).unwrap();
    rack.add("Volume", params! {}).unwrap();
    let _ = rack.events();

    assert!(rack.registry().unregister("EffectY"));
    rack.undo();
    assert_eq!(types(&rack), vec!["EffectX"]);

    let events = rack.events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::RecordSkipped { type_id } if type_id == "EffectY"
    )));
}

#[test]
fn test_preset_load_is_one_undo_step() {
    let mut rack = test_rack();
    rack.add("Volume", params! { "gain" => -3.0 }).unwrap();
    let preset = r#"[
        { "type": "EffectX", "parameters": { "gain": -12.0 } },
        { "type": "EffectY", "parameters": { "freq": 250.0 } }
    ]"#;
    let skipped = rack.load_preset_json(preset).unwrap();
    assert!(skipped.is_empty());
    assert_eq!(types(&rack), vec!["EffectX", "EffectY"]);

    assert!(rack.undo());
    assert_eq!(types(&rack), vec!["Volume"]);
    assert_eq!(param_at(&rack, 0, "gain"), ParamValue::Float(-3.0));

    assert!(rack.redo());
    assert_eq!(types(&rack), vec!["EffectX", "EffectY"]);
}

#[test]
fn test_undo_reaches_render_engine() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let input = sine_block(440.0, &format);

    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    let quieter = render_block(&mut render, &input, &format);
    assert!(rms(&quieter) < rms(&input));

    rack.undo();
    let output = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(
        &output,
        &input,
        tolerances::FLOAT_EPSILON
    ));
}
