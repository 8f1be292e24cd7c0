//! Per-block pipeline execution on the render context.
//!
//! # RT Safety
//!
//! - Buffers are sized from [`EngineConfig`] once, at construction.
//! - The published generation is read through `ArcSwap` without locking and
//!   adopted only at block boundaries.
//! - Plugins are reached with `try_lock`. Parameter edits are staged on the
//!   slot and applied here at the start of the plugin's block. The lock is
//!   only contended by writes to plugins without a declared parameter set and
//!   by releases; such a plugin is skipped for that block, never waited on.
//! - A panic inside `process` is caught, the slot is bypassed for the rest of
//!   its generation and an event is queued with `try_send`.
//! - Nothing here logs; diagnostics travel through the event queue.

use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventSender};
use crate::format::{AudioBlock, FormatDescriptor};
use crate::generation::{Generation, GenerationReader, GenerationState};
use crate::plugin::PluginRole;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub struct RenderEngine {
    reader: GenerationReader,
    current: Arc<Generation>,
    events: EventSender,
    max_channels: usize,
    max_block_size: usize,
    bus_count: usize,
    /// `bus_count` planar buses, laid out back to back.
    buses: Vec<f32>,
    scratch: Vec<f32>,
    backup: Vec<f32>,
    rejected: Option<(usize, usize)>,
    blocks: u64,
}

impl RenderEngine {
    pub fn new(reader: GenerationReader, events: EventSender, config: &EngineConfig) -> Self {
        let bus_len = config.max_channels * config.max_block_size;
        let current = Arc::clone(&*reader.load());
        Self {
            reader,
            current,
            events,
            max_channels: config.max_channels,
            max_block_size: config.max_block_size,
            bus_count: config.bus_count,
            buses: vec![0.0; config.bus_count * bus_len],
            scratch: vec![0.0; bus_len],
            backup: vec![0.0; bus_len],
            rejected: None,
            blocks: 0,
        }
    }

    /// Version of the generation currently rendered.
    pub fn current_version(&self) -> u64 {
        self.current.version()
    }

    pub fn current_generation(&self) -> &Arc<Generation> {
        &self.current
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.blocks
    }

    /// Pick up a newly published generation, if any.
    fn adopt_latest(&mut self) {
        let latest = self.reader.load();
        if Arc::ptr_eq(&*latest, &self.current) {
            if self.current.state() == GenerationState::Staged {
                self.current.set_state(GenerationState::Active);
            }
            return;
        }
        let next = arc_swap::Guard::into_inner(latest);
        self.current.set_state(GenerationState::Superseded);
        next.set_state(GenerationState::Active);
        self.events.emit(EngineEvent::GenerationAdopted {
            version: next.version(),
        });
        // The hand-off still holds the old generation; this is never the
        // final reference.
        self.current = next;
    }

    /// Process one planar block in place.
    ///
    /// `block` holds `format.channels` channels of `format.block_size`
    /// frames each, channel-major.
    pub fn render(&mut self, block: &mut [f32], format: &FormatDescriptor) {
        self.adopt_latest();
        self.blocks += 1;

        let generation = Arc::clone(&self.current);
        if generation.is_master_bypassed() || generation.is_empty() {
            return;
        }

        let channels = format.channels;
        let frames = format.block_size;
        let bus_len = channels * frames;
        if channels > self.max_channels || frames > self.max_block_size || block.len() < bus_len
        {
            if self.rejected != Some((channels, frames)) {
                self.rejected = Some((channels, frames));
                self.events.emit(EngineEvent::FormatRejected {
                    channels,
                    block_size: frames,
                });
            }
            return;
        }
        if bus_len == 0 {
            return;
        }

        let Self {
            buses,
            scratch,
            backup,
            events,
            bus_count,
            ..
        } = self;
        let bus_count = *bus_count;

        buses[..bus_len].copy_from_slice(&block[..bus_len]);
        buses[bus_len..bus_count * bus_len].fill(0.0);

        let mut section_open = true;
        for entry in generation.entries() {
            let slot = entry.slot();
            if entry.role() == PluginRole::Section {
                section_open = slot.is_enabled() && !slot.is_retired();
                continue;
            }
            if !section_open || !slot.is_enabled() || slot.is_retired() || entry.is_faulted() {
                continue;
            }

            let routing = entry.routing();
            let input = routing.input_bus as usize;
            let output = routing.output_bus as usize;
            if input >= bus_count || output >= bus_count {
                continue;
            }
            let span = routing.channels.span(channels);
            let selected = span.len();
            if selected == 0 {
                continue;
            }
            let Some(mut plugin) = slot.try_lock() else {
                continue;
            };

            let used = selected * frames;
            let input_base = input * bus_len;
            for (i, ch) in span.clone().enumerate() {
                let src = input_base + ch * frames;
                scratch[i * frames..(i + 1) * frames].copy_from_slice(&buses[src..src + frames]);
            }
            backup[..used].copy_from_slice(&scratch[..used]);

            let slot_format = format.with_channels(selected);
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let mut view = AudioBlock::new(&mut scratch[..used], selected, frames);
                slot.process_locked(&mut **plugin, &mut view, &slot_format);
            }));
            drop(plugin);

            if outcome.is_err() {
                entry.quarantine();
                generation.mark_degraded();
                events.emit(EngineEvent::RenderFault {
                    instance: entry.id(),
                    type_id: Arc::clone(slot.type_id()),
                    generation: generation.version(),
                });
                // Identity for the faulting block.
                continue;
            }

            let output_base = output * bus_len;
            let in_place = routing.is_in_place();
            for (i, ch) in span.enumerate() {
                let dst = output_base + ch * frames;
                let src = &scratch[i * frames..(i + 1) * frames];
                let dst = &mut buses[dst..dst + frames];
                if in_place {
                    dst.copy_from_slice(src);
                } else {
                    for (d, s) in dst.iter_mut().zip(src) {
                        *d += *s;
                    }
                }
            }
        }

        block[..bus_len].copy_from_slice(&buses[..bus_len]);
    }
}
