//! The mixer graph: channels, subgroups, return buses, and the block
//! routing pass.

use std::collections::{HashMap, HashSet};

use log::trace;

use crate::automation::{AutomationEvent, AutomationTimeline};
use crate::buffer::AudioBuffer;
use crate::engine::config::EngineConfig;
use crate::engine::module::AudioModule;
use crate::engine::params::ParameterSpec;
use crate::error::{EngineError, EngineResult};
use crate::level::db_to_linear;
use crate::mixer::address::{self, ChannelParam, ParsedAddress, ReturnParam, SubgroupParam};
use crate::mixer::bus::MixerReturnBus;
use crate::mixer::channel::MixerChannel;
use crate::mixer::meter::MeterReading;
use crate::mixer::subgroup::MixerSubgroup;
use crate::sequencing::TempoMap;

/// Block-based mixer that sums channels, subgroups, and return buses
/// into a master output.
///
/// Registries are Vec-backed so channels sum in registration order and
/// identical call sequences produce bit-identical output. The graph owns
/// its own automation timeline; scheduled events are drained at block
/// boundaries and applied at the start of the block whose interval
/// contains them.
pub struct MixerGraph {
    config: EngineConfig,
    channels: Vec<MixerChannel>,
    subgroups: Vec<MixerSubgroup>,
    returns: Vec<MixerReturnBus>,
    /// channel name -> subgroup name; absent means direct to master.
    channel_routes: HashMap<String, String>,
    /// child subgroup name -> parent subgroup name.
    subgroup_routes: HashMap<String, String>,
    master_fader_db: f32,
    master_gain: f32,
    timeline: AutomationTimeline,
    processed_frames: u64,
    last_master_meter: MeterReading,
    last_channel_meters: HashMap<String, MeterReading>,
    last_subgroup_meters: HashMap<String, MeterReading>,
}

impl MixerGraph {
    /// Create an empty graph at unity master fader.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            channels: Vec::new(),
            subgroups: Vec::new(),
            returns: Vec::new(),
            channel_routes: HashMap::new(),
            subgroup_routes: HashMap::new(),
            master_fader_db: 0.0,
            master_gain: 1.0,
            timeline: AutomationTimeline::new(),
            processed_frames: 0,
            last_master_meter: MeterReading::SILENCE,
            last_channel_meters: HashMap::new(),
            last_subgroup_meters: HashMap::new(),
        }
    }

    /// The shared engine configuration.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    // ------------------------------------------------------------------
    // Registration and routing
    // ------------------------------------------------------------------

    /// Register a channel; duplicate names are rejected.
    pub fn add_channel(&mut self, channel: MixerChannel) -> EngineResult<()> {
        if self.channel_index(channel.name()).is_some() {
            return Err(EngineError::DuplicateRegistration {
                kind: "channel",
                name: channel.name().to_string(),
            });
        }
        self.channels.push(channel);
        Ok(())
    }

    /// Register a subgroup; duplicate names are rejected.
    pub fn add_subgroup(&mut self, subgroup: MixerSubgroup) -> EngineResult<()> {
        if self.subgroup_index(subgroup.name()).is_some() {
            return Err(EngineError::DuplicateRegistration {
                kind: "subgroup",
                name: subgroup.name().to_string(),
            });
        }
        self.subgroups.push(subgroup);
        Ok(())
    }

    /// Register a return bus; duplicate names are rejected.
    pub fn add_return_bus(&mut self, bus: MixerReturnBus) -> EngineResult<()> {
        if self.return_index(bus.name()).is_some() {
            return Err(EngineError::DuplicateRegistration {
                kind: "return bus",
                name: bus.name().to_string(),
            });
        }
        self.returns.push(bus);
        Ok(())
    }

    /// Route a channel's main output into a subgroup.
    ///
    /// A channel has at most one subgroup target; reassignment replaces
    /// the previous route.
    pub fn assign_channel_to_group(&mut self, channel: &str, group: &str) -> EngineResult<()> {
        if self.channel_index(channel).is_none() {
            return Err(EngineError::UnknownTarget {
                kind: "channel",
                name: channel.to_string(),
            });
        }
        if self.subgroup_index(group).is_none() {
            return Err(EngineError::UnknownTarget {
                kind: "subgroup",
                name: group.to_string(),
            });
        }
        self.channel_routes
            .insert(channel.to_string(), group.to_string());
        Ok(())
    }

    /// Route a channel's main output directly to the master again.
    pub fn clear_channel_group(&mut self, channel: &str) {
        self.channel_routes.remove(channel);
    }

    /// Nest a subgroup under a parent subgroup.
    ///
    /// Self-routing and anything that would close a cycle are rejected
    /// here, at assignment time.
    pub fn assign_subgroup_to_group(&mut self, subgroup: &str, parent: &str) -> EngineResult<()> {
        if self.subgroup_index(subgroup).is_none() {
            return Err(EngineError::UnknownTarget {
                kind: "subgroup",
                name: subgroup.to_string(),
            });
        }
        if self.subgroup_index(parent).is_none() {
            return Err(EngineError::UnknownTarget {
                kind: "subgroup",
                name: parent.to_string(),
            });
        }
        if subgroup == parent {
            return Err(EngineError::RoutingCycle(subgroup.to_string()));
        }
        // Walk up from the proposed parent; reaching the child means the
        // new edge would close a loop.
        let mut current = Some(parent);
        while let Some(name) = current {
            if name == subgroup {
                return Err(EngineError::RoutingCycle(subgroup.to_string()));
            }
            current = self.subgroup_routes.get(name).map(String::as_str);
        }
        self.subgroup_routes
            .insert(subgroup.to_string(), parent.to_string());
        Ok(())
    }

    /// Detach a subgroup from its parent; it feeds the master directly.
    pub fn clear_subgroup_group(&mut self, subgroup: &str) {
        self.subgroup_routes.remove(subgroup);
    }

    /// Master fader level in dB.
    pub fn master_fader_db(&self) -> f32 {
        self.master_fader_db
    }

    /// Update the master fader and its derived linear gain.
    pub fn set_master_fader_db(&mut self, value: f32) {
        self.master_fader_db = value;
        self.master_gain = db_to_linear(value);
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name() == name)
    }

    fn subgroup_index(&self, name: &str) -> Option<usize> {
        self.subgroups.iter().position(|s| s.name() == name)
    }

    fn return_index(&self, name: &str) -> Option<usize> {
        self.returns.iter().position(|r| r.name() == name)
    }

    /// A registered channel by name.
    pub fn channel(&self, name: &str) -> Option<&MixerChannel> {
        self.channels.iter().find(|c| c.name() == name)
    }

    /// A registered channel by name, mutably.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut MixerChannel> {
        self.channels.iter_mut().find(|c| c.name() == name)
    }

    /// A registered subgroup by name.
    pub fn subgroup(&self, name: &str) -> Option<&MixerSubgroup> {
        self.subgroups.iter().find(|s| s.name() == name)
    }

    /// A registered subgroup by name, mutably.
    pub fn subgroup_mut(&mut self, name: &str) -> Option<&mut MixerSubgroup> {
        self.subgroups.iter_mut().find(|s| s.name() == name)
    }

    /// A registered return bus by name.
    pub fn return_bus(&self, name: &str) -> Option<&MixerReturnBus> {
        self.returns.iter().find(|r| r.name() == name)
    }

    /// A registered return bus by name, mutably.
    pub fn return_bus_mut(&mut self, name: &str) -> Option<&mut MixerReturnBus> {
        self.returns.iter_mut().find(|r| r.name() == name)
    }

    /// The subgroup a channel feeds, if any.
    pub fn channel_group(&self, channel: &str) -> Option<&str> {
        self.channel_routes.get(channel).map(String::as_str)
    }

    /// The parent of a subgroup, if any.
    pub fn subgroup_parent(&self, subgroup: &str) -> Option<&str> {
        self.subgroup_routes.get(subgroup).map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Meters
    // ------------------------------------------------------------------

    /// Master meter for the most recently processed block.
    pub fn master_meter(&self) -> MeterReading {
        self.last_master_meter
    }

    /// Post-fader channel meter for the most recently processed block.
    ///
    /// Channels inactive under solo have no reading for that block.
    pub fn channel_meter(&self, name: &str) -> Option<MeterReading> {
        self.last_channel_meters.get(name).copied()
    }

    /// Subgroup meter for the most recently processed block.
    pub fn subgroup_meter(&self, name: &str) -> Option<MeterReading> {
        self.last_subgroup_meters.get(name).copied()
    }

    /// All subgroup meters for the most recently processed block.
    pub fn subgroup_meters(&self) -> &HashMap<String, MeterReading> {
        &self.last_subgroup_meters
    }

    // ------------------------------------------------------------------
    // Automation
    // ------------------------------------------------------------------

    /// Validate and queue a mixer automation event.
    ///
    /// The target address is parsed against the grammar immediately;
    /// malformed addresses never enter the timeline. Whether the named
    /// entity exists is checked when the event is applied.
    pub fn schedule_event(&mut self, event: AutomationEvent) -> EngineResult<()> {
        address::parse(&event.target, &event.parameter)?;
        self.timeline.schedule(event);
        Ok(())
    }

    /// Queue a parameter change at an absolute time in seconds.
    pub fn schedule_parameter_change(
        &mut self,
        target: &str,
        parameter: &str,
        value: Option<f32>,
        time_seconds: f64,
        source: &str,
    ) -> EngineResult<()> {
        self.schedule_event(AutomationEvent {
            time_seconds,
            target: target.to_string(),
            parameter: parameter.to_string(),
            value,
            source: source.to_string(),
        })
    }

    /// Queue a parameter change at a beat position via `tempo`.
    pub fn schedule_parameter_change_in_beats(
        &mut self,
        target: &str,
        parameter: &str,
        value: Option<f32>,
        beats: f64,
        tempo: &TempoMap,
        source: &str,
    ) -> EngineResult<()> {
        address::parse(target, parameter)?;
        self.timeline
            .schedule_in_beats(target, parameter, beats, value, tempo, source);
        Ok(())
    }

    /// Number of queued automation events.
    pub fn pending_automation(&self) -> usize {
        self.timeline.len()
    }

    /// Clear processed time so a subsequent render replays automation
    /// timing from zero.
    pub fn reset_automation_state(&mut self) {
        self.processed_frames = 0;
    }

    fn require_value(event: &AutomationEvent) -> EngineResult<f32> {
        event
            .value
            .ok_or_else(|| EngineError::NullParameter(event.parameter.clone()))
    }

    fn apply_automation_event(&mut self, event: &AutomationEvent) -> EngineResult<()> {
        match address::parse(&event.target, &event.parameter)? {
            ParsedAddress::Channel { name, param } => {
                let channel =
                    self.channel_mut(&name)
                        .ok_or_else(|| EngineError::UnknownTarget {
                            kind: "channel",
                            name: name.clone(),
                        })?;
                match param {
                    ChannelParam::FaderDb => channel.set_fader_db(Self::require_value(event)?),
                    ChannelParam::Pan => channel.set_pan(Self::require_value(event)?),
                    ChannelParam::Mute => {
                        channel.set_muted(event.value.is_some_and(|v| v >= 0.5))
                    }
                    ChannelParam::Send(bus) => {
                        // Null pulls the send down to exact silence.
                        let level = event.value.unwrap_or(f32::NEG_INFINITY);
                        channel.set_send_level_db(&bus, level);
                    }
                }
            }
            ParsedAddress::Subgroup { name, param } => {
                let subgroup =
                    self.subgroup_mut(&name)
                        .ok_or_else(|| EngineError::UnknownTarget {
                            kind: "subgroup",
                            name: name.clone(),
                        })?;
                match param {
                    SubgroupParam::FaderDb => subgroup.set_fader_db(Self::require_value(event)?),
                    SubgroupParam::Mute => {
                        subgroup.set_muted(event.value.is_some_and(|v| v >= 0.5))
                    }
                }
            }
            ParsedAddress::Return { name, param } => {
                let bus = self
                    .return_bus_mut(&name)
                    .ok_or_else(|| EngineError::UnknownTarget {
                        kind: "return bus",
                        name: name.clone(),
                    })?;
                match param {
                    ReturnParam::LevelDb => bus.set_level_db(Self::require_value(event)?),
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Block processing
    // ------------------------------------------------------------------

    /// The solo set: explicitly soloed channels plus channels whose
    /// subgroup chain passes through a soloed subgroup.
    fn active_channels(&self) -> HashSet<String> {
        let mut soloed: HashSet<String> = self
            .channels
            .iter()
            .filter(|c| c.solo())
            .map(|c| c.name().to_string())
            .collect();

        let solo_groups: HashSet<&str> = self
            .subgroups
            .iter()
            .filter(|s| s.solo())
            .map(|s| s.name())
            .collect();
        if !solo_groups.is_empty() {
            for channel in &self.channels {
                let mut current = self.channel_routes.get(channel.name()).map(String::as_str);
                while let Some(group) = current {
                    if solo_groups.contains(group) {
                        soloed.insert(channel.name().to_string());
                        break;
                    }
                    current = self.subgroup_routes.get(group).map(String::as_str);
                }
            }
        }

        if soloed.is_empty() {
            self.channels
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        } else {
            soloed
        }
    }

    fn visit_subgroup(
        &self,
        index: usize,
        visited: &mut [bool],
        in_stack: &mut [bool],
        order: &mut Vec<usize>,
    ) -> EngineResult<()> {
        if visited[index] {
            return Ok(());
        }
        if in_stack[index] {
            return Err(EngineError::RoutingCycle(
                self.subgroups[index].name().to_string(),
            ));
        }
        in_stack[index] = true;
        let parent_name = self.subgroups[index].name();
        for child in 0..self.subgroups.len() {
            let routed_here = self
                .subgroup_routes
                .get(self.subgroups[child].name())
                .map(String::as_str)
                == Some(parent_name);
            if routed_here {
                self.visit_subgroup(child, visited, in_stack, order)?;
            }
        }
        in_stack[index] = false;
        visited[index] = true;
        order.push(index);
        Ok(())
    }

    /// Subgroup indices in processing order, leaves before parents.
    fn ordered_subgroups(&self) -> EngineResult<Vec<usize>> {
        let count = self.subgroups.len();
        let mut visited = vec![false; count];
        let mut in_stack = vec![false; count];
        let mut order = Vec::with_capacity(count);
        for index in 0..count {
            if !self
                .subgroup_routes
                .contains_key(self.subgroups[index].name())
            {
                self.visit_subgroup(index, &mut visited, &mut in_stack, &mut order)?;
            }
        }
        for index in 0..count {
            self.visit_subgroup(index, &mut visited, &mut in_stack, &mut order)?;
        }
        Ok(order)
    }

    /// Render one block of `frames` frames.
    ///
    /// Applies due automation, resolves solo, runs the channel,
    /// subgroup, and return passes, scales by the master fader, and
    /// commits the block's meters. A failure anywhere leaves meters and
    /// the processed-frame counter untouched.
    pub fn process_block(&mut self, frames: usize) -> EngineResult<AudioBuffer> {
        let rate = self.config.sample_rate as f64;
        let block_start = self.processed_frames as f64 / rate;
        // Drain through the block's final frame so an event lands in the
        // block whose interval contains it.
        let horizon = block_start + frames.saturating_sub(1) as f64 / rate;
        let due: Vec<AutomationEvent> = self.timeline.pop_events_up_to(horizon).collect();
        if !due.is_empty() {
            trace!(
                "mixer block at {:.6}s applying {} automation event(s)",
                block_start,
                due.len()
            );
        }
        for event in &due {
            self.apply_automation_event(event)?;
        }

        let channels = self.config.channels;
        let mut master = AudioBuffer::new(frames, channels);
        let mut group_sums: Vec<AudioBuffer> = self
            .subgroups
            .iter()
            .map(|_| AudioBuffer::new(frames, channels))
            .collect();
        let mut send_sums: Vec<AudioBuffer> = self
            .returns
            .iter()
            .map(|_| AudioBuffer::new(frames, channels))
            .collect();

        let active = self.active_channels();
        let mut channel_meters = HashMap::new();

        for index in 0..self.channels.len() {
            let name = self.channels[index].name().to_string();
            if !active.contains(&name) {
                continue;
            }
            let (main, sends) = self.channels[index].process(frames)?;
            match self.channel_routes.get(&name) {
                Some(group) => {
                    let group_index =
                        self.subgroup_index(group)
                            .ok_or_else(|| EngineError::UnknownTarget {
                                kind: "subgroup",
                                name: group.clone(),
                            })?;
                    group_sums[group_index].add_from(&main);
                }
                None => master.add_from(&main),
            }
            for (bus, signal) in sends {
                let return_index =
                    self.return_index(&bus)
                        .ok_or_else(|| EngineError::UnknownTarget {
                            kind: "return bus",
                            name: bus.clone(),
                        })?;
                send_sums[return_index].add_from(&signal);
            }
            channel_meters.insert(name, MeterReading::from_buffer(&main));
        }

        let mut subgroup_meters = HashMap::new();
        for index in self.ordered_subgroups()? {
            let name = self.subgroups[index].name().to_string();
            let sum = std::mem::replace(&mut group_sums[index], AudioBuffer::new(0, channels));
            let processed = self.subgroups[index].process(sum)?;
            subgroup_meters.insert(name.clone(), self.subgroups[index].last_meter());
            match self.subgroup_routes.get(&name) {
                Some(parent) => {
                    let parent_index =
                        self.subgroup_index(parent)
                            .ok_or_else(|| EngineError::UnknownTarget {
                                kind: "subgroup",
                                name: parent.clone(),
                            })?;
                    group_sums[parent_index].add_from(&processed);
                }
                None => master.add_from(&processed),
            }
        }

        for index in 0..self.returns.len() {
            let sum = std::mem::replace(&mut send_sums[index], AudioBuffer::new(0, channels));
            let processed = self.returns[index].process(sum)?;
            master.add_from(&processed);
        }

        master.scale(self.master_gain);

        self.last_master_meter = MeterReading::from_buffer(&master);
        self.last_channel_meters = channel_meters;
        self.last_subgroup_meters = subgroup_meters;
        self.processed_frames += frames as u64;
        Ok(master)
    }

    /// Render `duration_seconds` of output through the block loop,
    /// replaying automation timing from zero.
    pub fn render(&mut self, duration_seconds: f64) -> EngineResult<AudioBuffer> {
        self.reset_automation_state();
        let total_frames = (duration_seconds * self.config.sample_rate as f64).round() as usize;
        let mut output = AudioBuffer::new(total_frames, self.config.channels);
        let mut frame_start = 0;
        while frame_start < total_frames {
            let block_frames = self.config.block_size.min(total_frames - frame_start);
            let block = self.process_block(block_frames)?;
            output.write_block(frame_start, &block);
            frame_start += block_frames;
        }
        Ok(output)
    }
}

/// A mixer graph can stand in as a single engine module, which lets the
/// offline engine host an entire mix as its output.
impl AudioModule for MixerGraph {
    fn name(&self) -> &str {
        "mixer"
    }

    fn describe_parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    fn get_parameter(&self, name: &str) -> EngineResult<Option<f32>> {
        Err(EngineError::UnknownParameter {
            module: "mixer".to_string(),
            parameter: name.to_string(),
        })
    }

    fn set_parameter(&mut self, name: &str, _value: Option<f32>) -> EngineResult<()> {
        Err(EngineError::UnknownParameter {
            module: "mixer".to_string(),
            parameter: name.to_string(),
        })
    }

    fn process(&mut self, frames: usize) -> EngineResult<AudioBuffer> {
        self.process_block(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::send::MixerSendConfig;
    use crate::modules::ConstantSource;

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: 48_000,
            block_size: 8,
            channels: 2,
        }
    }

    fn constant_channel(name: &str, value: f32) -> MixerChannel {
        let cfg = config();
        MixerChannel::new(
            name,
            Box::new(ConstantSource::new(format!("{name}_src"), cfg, value)),
            cfg,
        )
    }

    #[test]
    fn single_channel_reaches_the_master() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        let out = graph.process_block(4).unwrap();
        assert_eq!(out.frames(), 4);
        assert!(out.samples().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        assert!(matches!(
            graph.add_channel(constant_channel("lead", 0.1)),
            Err(EngineError::DuplicateRegistration { kind: "channel", .. })
        ));
        graph
            .add_subgroup(MixerSubgroup::new("drums", config()))
            .unwrap();
        assert!(graph
            .add_subgroup(MixerSubgroup::new("drums", config()))
            .is_err());
        graph.add_return_bus(MixerReturnBus::new("fx")).unwrap();
        assert!(graph.add_return_bus(MixerReturnBus::new("fx")).is_err());
    }

    #[test]
    fn assignments_validate_both_ends() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        graph
            .add_subgroup(MixerSubgroup::new("drums", config()))
            .unwrap();
        assert!(graph.assign_channel_to_group("ghost", "drums").is_err());
        assert!(graph.assign_channel_to_group("lead", "ghost").is_err());
        assert!(graph.assign_channel_to_group("lead", "drums").is_ok());
    }

    #[test]
    fn subgroup_self_and_cycle_routes_are_rejected_at_assignment() {
        let mut graph = MixerGraph::new(config());
        for name in ["a", "b", "c"] {
            graph
                .add_subgroup(MixerSubgroup::new(name, config()))
                .unwrap();
        }
        assert!(matches!(
            graph.assign_subgroup_to_group("a", "a"),
            Err(EngineError::RoutingCycle(_))
        ));
        graph.assign_subgroup_to_group("a", "b").unwrap();
        graph.assign_subgroup_to_group("b", "c").unwrap();
        assert!(matches!(
            graph.assign_subgroup_to_group("c", "a"),
            Err(EngineError::RoutingCycle(_))
        ));
    }

    #[test]
    fn channel_sum_is_registration_ordered_and_deterministic() {
        let run = || {
            let mut graph = MixerGraph::new(config());
            graph.add_channel(constant_channel("a", 0.1)).unwrap();
            graph.add_channel(constant_channel("b", 0.2)).unwrap();
            graph.add_channel(constant_channel("c", 0.3)).unwrap();
            graph.process_block(8).unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second, "same construction must give identical output");
        assert!((first.sample(0, 0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn solo_drops_everything_else() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("a", 0.25)).unwrap();
        graph.add_channel(constant_channel("b", 0.5)).unwrap();
        graph.channel_mut("a").unwrap().set_solo(true);
        let out = graph.process_block(4).unwrap();
        assert!(out.samples().iter().all(|&s| s == 0.25));

        graph.channel_mut("a").unwrap().set_solo(false);
        let restored = graph.process_block(4).unwrap();
        assert!(restored.samples().iter().all(|&s| s == 0.75));
    }

    #[test]
    fn soloed_subgroup_activates_its_channels() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("in_group", 0.25)).unwrap();
        graph.add_channel(constant_channel("outside", 0.5)).unwrap();
        graph
            .add_subgroup(MixerSubgroup::new("drums", config()))
            .unwrap();
        graph.assign_channel_to_group("in_group", "drums").unwrap();
        graph.subgroup_mut("drums").unwrap().set_solo(true);

        let out = graph.process_block(4).unwrap();
        assert!(out.samples().iter().all(|&s| s == 0.25));
    }

    #[test]
    fn sends_from_solo_excluded_channels_are_suppressed() {
        let mut graph = MixerGraph::new(config());
        let sender = constant_channel("sender", 0.5)
            .with_send(MixerSendConfig::new("fx").with_level_db(0.0));
        graph.add_channel(sender).unwrap();
        graph.add_channel(constant_channel("soloed", 0.25)).unwrap();
        graph.add_return_bus(MixerReturnBus::new("fx")).unwrap();
        graph.channel_mut("soloed").unwrap().set_solo(true);

        let out = graph.process_block(4).unwrap();
        // Only the soloed channel: no direct 0.5, no 0.5 via the return.
        assert!(out.samples().iter().all(|&s| s == 0.25));
    }

    #[test]
    fn unknown_send_target_fails_the_block() {
        let mut graph = MixerGraph::new(config());
        let channel = constant_channel("lead", 0.5)
            .with_send(MixerSendConfig::new("ghost").with_level_db(0.0));
        graph.add_channel(channel).unwrap();
        assert!(matches!(
            graph.process_block(4),
            Err(EngineError::UnknownTarget { kind: "return bus", .. })
        ));
    }

    #[test]
    fn master_fader_scales_the_final_sum() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        graph.set_master_fader_db(-6.0);
        let out = graph.process_block(4).unwrap();
        let expected = 0.5 * db_to_linear(-6.0);
        assert!((out.sample(0, 0) - expected).abs() < 1e-6);
    }

    #[test]
    fn meters_cover_master_channels_and_subgroups() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        graph
            .add_subgroup(MixerSubgroup::new("drums", config()))
            .unwrap();
        graph.assign_channel_to_group("lead", "drums").unwrap();
        graph.process_block(8).unwrap();

        assert!(graph.master_meter().peak_db.is_finite());
        assert!(graph.channel_meter("lead").unwrap().peak_db.is_finite());
        assert!(graph.subgroup_meter("drums").unwrap().peak_db.is_finite());
        assert!(graph.channel_meter("ghost").is_none());
    }

    #[test]
    fn malformed_automation_is_rejected_at_schedule_time() {
        let mut graph = MixerGraph::new(config());
        assert!(matches!(
            graph.schedule_parameter_change("lead", "fader_db", Some(0.0), 0.0, ""),
            Err(EngineError::MalformedAddress(_))
        ));
        assert!(matches!(
            graph.schedule_parameter_change("channel:lead", "wrong", Some(0.0), 0.0, ""),
            Err(EngineError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn automation_to_missing_entity_fails_the_block() {
        let mut graph = MixerGraph::new(config());
        graph
            .schedule_parameter_change("channel:ghost", "fader_db", Some(-6.0), 0.0, "")
            .unwrap();
        assert!(matches!(
            graph.process_block(4),
            Err(EngineError::UnknownTarget { kind: "channel", .. })
        ));
    }

    #[test]
    fn automation_rewrites_send_levels() {
        let mut graph = MixerGraph::new(config());
        let channel = constant_channel("lead", 0.5)
            .with_send(MixerSendConfig::new("fx").with_level_db(-3.0));
        graph.add_channel(channel).unwrap();
        graph.add_return_bus(MixerReturnBus::new("fx")).unwrap();
        graph
            .schedule_parameter_change("channel:lead", "send:fx", None, 0.0, "fade out send")
            .unwrap();
        graph.process_block(4).unwrap();
        assert_eq!(
            graph.channel("lead").unwrap().get_send_level_db("fx"),
            f32::NEG_INFINITY
        );
    }

    #[test]
    fn mute_automation_uses_the_half_threshold() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        graph
            .schedule_parameter_change("channel:lead", "mute", Some(1.0), 0.0, "")
            .unwrap();
        graph.process_block(4).unwrap();
        assert!(graph.channel("lead").unwrap().muted());

        graph
            .schedule_parameter_change("channel:lead", "mute", Some(0.4), 5.0 / 48_000.0, "")
            .unwrap();
        graph.process_block(4).unwrap();
        assert!(!graph.channel("lead").unwrap().muted());
    }

    #[test]
    fn render_replays_automation_from_zero() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        graph
            .schedule_parameter_change("channel:lead", "fader_db", Some(-6.0), 0.0, "")
            .unwrap();
        let out = graph.render(0.001).unwrap();
        assert_eq!(out.frames(), 48);
        let expected = 0.5 * db_to_linear(-6.0);
        assert!((out.sample(0, 0) - expected).abs() < 1e-6);
    }

    #[test]
    fn graph_acts_as_an_audio_module() {
        let mut graph = MixerGraph::new(config());
        graph.add_channel(constant_channel("lead", 0.5)).unwrap();
        let module: &mut dyn AudioModule = &mut graph;
        let out = module.process(4).unwrap();
        assert_eq!(out.channels(), 2);
        assert!(module.get_parameter("anything").is_err());
    }
}
