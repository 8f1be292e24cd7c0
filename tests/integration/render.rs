//! Render engine integration tests
//!
//! Audio-path behavior: gain, bypass flags, sections, routing, fault
//! isolation and generation hand-off.

use crate::helpers::*;
use approx::assert_abs_diff_eq;
use chainrack::prelude::*;

fn assert_scaled(output: &[f32], input: &[f32], factor: f32) {
    assert_eq!(output.len(), input.len());
    for (o, i) in output.iter().zip(input) {
        assert_abs_diff_eq!(*o, *i * factor, epsilon = tolerances::DSP_EPSILON);
    }
}

#[test]
fn test_empty_pipeline_is_passthrough() {
    let rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let input = sine_block(440.0, &format);
    let output = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(&output, &input, tolerances::FLOAT_EPSILON));
}

#[test]
fn test_volume_minus_6_db() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();

    let input = sine_block(440.0, &format);
    let output = render_block(&mut render, &input, &format);
    assert_scaled(&output, &input, tolerances::MINUS_6_DB);
}

#[test]
fn test_master_bypass_passes_input_through() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    rack.add("Volume", params! { "gain" => -20.0 }).unwrap();
    rack.set_master_bypass(true).unwrap();

    let input = sine_block(1000.0, &format);
    let output = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(&output, &input, tolerances::FLOAT_EPSILON));

    rack.set_master_bypass(false).unwrap();
    let output = render_block(&mut render, &input, &format);
    assert!(rms(&output) < rms(&input) * 0.2);
}

#[test]
fn test_disabled_instance_is_skipped() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let quiet = rack.add("Volume", params! { "gain" => -60.0 }).unwrap();
    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    rack.set_enabled(quiet, false).unwrap();

    let input = sine_block(440.0, &format);
    let output = render_block(&mut render, &input, &format);
    assert_scaled(&output, &input, tolerances::MINUS_6_DB);
}

#[test]
fn test_parameter_change_applies_next_block() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let volume = rack.add("Volume", params! {}).unwrap();
    let input = sine_block(440.0, &format);

    let unity = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(&unity, &input, tolerances::FLOAT_EPSILON));

    let version = render.current_version();
    rack.set_parameters(volume, params! { "gain" => -6.0 })
        .unwrap();
    let output = render_block(&mut render, &input, &format);
    assert_scaled(&output, &input, tolerances::MINUS_6_DB);
    assert_eq!(render.current_version(), version);
}

#[test]
fn test_panicking_plugin_is_quarantined() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let exploding = rack.add("Exploding", params! {}).unwrap();
    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    let _ = rack.events();

    let input = sine_block(440.0, &format);
    for _ in 0..3 {
        // The faulting slot acts as identity; the rest of the chain runs.
        let output = render_block(&mut render, &input, &format);
        assert_scaled(&output, &input, tolerances::MINUS_6_DB);
    }

    let faults: Vec<_> = rack
        .events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::RenderFault { .. }))
        .collect();
    assert_eq!(faults.len(), 1, "a quarantined slot is not retried");
    match &faults[0] {
        EngineEvent::RenderFault {
            instance,
            type_id,
            generation,
        } => {
            assert_eq!(*instance, exploding);
            assert_eq!(&**type_id, "Exploding");
            assert_eq!(*generation, rack.pipeline().version());
        }
        _ => unreachable!(),
    }
    assert!(render.current_generation().is_degraded());
    assert_eq!(
        render.current_generation().faulted_instances(),
        vec![exploding]
    );
}

#[test]
fn test_new_generation_clears_quarantine() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    rack.add("Exploding", params! {}).unwrap();
    let input = sine_block(440.0, &format);

    render_block(&mut render, &input, &format);
    rack.add("Volume", params! {}).unwrap();
    render_block(&mut render, &input, &format);

    let faults = rack
        .events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::RenderFault { .. }))
        .count();
    assert_eq!(faults, 2);
}

#[test]
fn test_context_rebuilds_on_sample_rate_change() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    rack.add("EffectY", params! {}).unwrap();

    let format = stereo_format();
    let input = vec![0.0; format.samples()];
    render_block(&mut render, &input, &format);
    render_block(&mut render, &input, &format);
    assert_eq!(rack.pipeline().at(0).unwrap().reinit_count(), 1);

    // Parameter changes alone keep the context.
    let id = rack.pipeline().ids()[0];
    rack.set_parameters(id, params! { "freq" => 500.0 }).unwrap();
    render_block(&mut render, &input, &format);
    assert_eq!(rack.pipeline().at(0).unwrap().reinit_count(), 1);

    let doubled = FormatDescriptor::new(TEST_SAMPLE_RATE * 2.0, 2, TEST_BUFFER_SIZE);
    render_block(&mut render, &input, &doubled);
    assert_eq!(rack.pipeline().at(0).unwrap().reinit_count(), 2);
}

#[test]
fn test_disabled_section_gates_members() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let section = rack.add("Section", params! { "name" => "Muted" }).unwrap();
    rack.add("Volume", params! { "gain" => -60.0 }).unwrap();
    rack.add("Section", params! { "name" => "Open" }).unwrap();
    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    rack.set_enabled(section, false).unwrap();

    let input = sine_block(440.0, &format);
    let output = render_block(&mut render, &input, &format);
    assert_scaled(&output, &input, tolerances::MINUS_6_DB);

    rack.set_enabled(section, true).unwrap();
    let output = render_block(&mut render, &input, &format);
    assert!(peak(&output) < 0.001);
}

#[test]
fn test_aux_bus_routing_sums_into_main() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();

    let send = rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    rack.set_routing(send, BusRouting::new(0, 1, ChannelSelection::Stereo))
        .unwrap();
    let ret = rack.add("Volume", params! {}).unwrap();
    rack.set_routing(ret, BusRouting::new(1, 0, ChannelSelection::Stereo))
        .unwrap();

    let input = sine_block(440.0, &format);
    let output = render_block(&mut render, &input, &format);
    assert_scaled(&output, &input, 1.0 + tolerances::MINUS_6_DB);
}

#[test]
fn test_aux_bus_output_alone_is_not_heard() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();

    let send = rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    rack.set_routing(send, BusRouting::new(0, 2, ChannelSelection::All))
        .unwrap();

    let input = sine_block(440.0, &format);
    let output = render_block(&mut render, &input, &format);
    assert!(signals_approx_equal(&output, &input, tolerances::FLOAT_EPSILON));
}

#[test]
fn test_channel_selection_limits_processing() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let volume = rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    rack.set_routing(volume, BusRouting::new(0, 0, ChannelSelection::Right))
        .unwrap();

    let input = sine_block(440.0, &format);
    let output = render_block(&mut render, &input, &format);
    let frames = format.block_size;
    assert!(signals_approx_equal(
        &output[..frames],
        &input[..frames],
        tolerances::FLOAT_EPSILON
    ));
    assert_scaled(&output[frames..], &input[frames..], tolerances::MINUS_6_DB);
}

#[test]
fn test_oversized_format_passes_through() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();
    let _ = rack.events();

    let format = FormatDescriptor::new(TEST_SAMPLE_RATE, 16, 64);
    let input = vec![0.5; format.samples()];
    for _ in 0..2 {
        let output = render_block(&mut render, &input, &format);
        assert!(signals_approx_equal(&output, &input, tolerances::FLOAT_EPSILON));
    }

    let rejected = rack
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                EngineEvent::FormatRejected {
                    channels: 16,
                    block_size: 64
                }
            )
        })
        .count();
    assert_eq!(rejected, 1);
}

#[test]
fn test_generation_adoption_and_garbage_collection() {
    let mut rack = test_rack();
    let mut render = rack.render_engine();
    let format = stereo_format();
    let input = vec![0.0; format.samples()];
    let _ = rack.events();

    for _ in 0..4 {
        rack.add("Volume", params! {}).unwrap();
    }
    render_block(&mut render, &input, &format);
    assert_eq!(render.current_version(), rack.pipeline().version());
    assert_eq!(render.blocks_rendered(), 1);

    // Only the newest generation is adopted; intermediate ones were never seen.
    let adopted: Vec<_> = rack
        .events()
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::GenerationAdopted { version } => Some(version),
            _ => None,
        })
        .collect();
    assert_eq!(adopted, vec![rack.pipeline().version()]);

    assert!(rack.collect_garbage() >= 1);
    assert_eq!(rack.collect_garbage(), 0);
    assert_eq!(render.current_version(), rack.pipeline().version());
}

#[test]
fn test_render_on_another_thread() {
    let mut rack = test_rack();
    let render = rack.render_engine();
    rack.add("Volume", params! { "gain" => -6.0 }).unwrap();

    let format = stereo_format();
    let input = sine_block(440.0, &format);
    let expected: Vec<f32> = input.iter().map(|s| s * tolerances::MINUS_6_DB).collect();

    let handle = std::thread::spawn(move || {
        let mut render = render;
        render_block(&mut render, &input, &format)
    });
    let output = handle.join().unwrap();
    assert_scaled(&output, &expected, 1.0);
}

#[test]
fn test_control_reads_never_bypass_a_plugin() {
    let mut rack = test_rack();
    let render = rack.render_engine();
    let volume = rack.add("Volume", params! { "gain" => -6.0 }).unwrap();

    let format = stereo_format();
    let input = sine_block(440.0, &format);
    let expected: Vec<f32> = input.iter().map(|s| s * tolerances::MINUS_6_DB).collect();

    let handle = std::thread::spawn(move || {
        let mut render = render;
        (0..500)
            .filter(|_| {
                let output = render_block(&mut render, &input, &format);
                !signals_approx_equal(&output, &expected, tolerances::DSP_EPSILON)
            })
            .count()
    });

    // History snapshots and serialization read every instance's parameters.
    while !handle.is_finished() {
        rack.save_state();
        assert_eq!(
            rack.pipeline().get(volume).unwrap().parameters()["gain"],
            ParamValue::Float(-6.0)
        );
        rack.preset_json().unwrap();
    }
    assert_eq!(handle.join().unwrap(), 0, "blocks rendered without the plugin");
}
