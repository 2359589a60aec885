//! Editor-to-engine command handoff.
//!
//! The mixing core is single-threaded; an editor or pattern worker on
//! another thread never touches the graph directly. Instead it moves
//! fully-formed [`MixerCommand`] values through a SPSC ring, and the
//! block loop drains the batch at a block boundary before any audio is
//! pulled. Commands are immutable once sent, so there is no shared
//! mutable state to guard.

#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::automation::AutomationEvent;
use crate::error::EngineResult;
use crate::mixer::MixerGraph;

/// A control message from an editor thread.
#[derive(Debug, Clone)]
pub enum MixerCommand {
    /// Queue an automation event on the graph's timeline.
    Schedule(AutomationEvent),
    /// Move the master fader.
    SetMasterFaderDb(f32),
    /// Replay automation timing from zero on the next block.
    ResetAutomation,
}

/// Anything the block loop can drain commands from.
pub trait CommandReceiver {
    /// Take the next pending command, if any.
    fn pop(&mut self) -> Option<MixerCommand>;
}

#[cfg(feature = "rtrb")]
impl CommandReceiver for Consumer<MixerCommand> {
    fn pop(&mut self) -> Option<MixerCommand> {
        Consumer::pop(self).ok()
    }
}

/// Drain every pending command into the graph.
///
/// Call between blocks. Returns the number of commands applied; the
/// first invalid command (for example a malformed automation address)
/// aborts the drain with its error.
pub fn drain_commands(
    graph: &mut MixerGraph,
    receiver: &mut impl CommandReceiver,
) -> EngineResult<usize> {
    let mut applied = 0;
    while let Some(command) = receiver.pop() {
        match command {
            MixerCommand::Schedule(event) => graph.schedule_event(event)?,
            MixerCommand::SetMasterFaderDb(value) => graph.set_master_fader_db(value),
            MixerCommand::ResetAutomation => graph.reset_automation_state(),
        }
        applied += 1;
    }
    Ok(applied)
}
