use std::fmt;
use thiserror::Error;

/// Shutdown progress of a [`Shuttle`](crate::shuttle::Shuttle).
///
/// | from                 | to                   | trigger                              |
/// |----------------------|----------------------|--------------------------------------|
/// | `Running`            | `InputClosed`        | end of input, or reader dropped      |
/// | `InputClosed`        | `BatchersDraining`   | waiting on the batcher pool          |
/// | `BatchersDraining`   | `BatchChannelClosed` | last back-channel sender dropped     |
/// | `BatchChannelClosed` | `OutletsDraining`    | waiting on the outlet pool           |
/// | `OutletsDraining`    | `StatsChannelClosed` | observation sender dropped, final push done |
/// | `StatsChannelClosed` | `Terminated`         | stats endpoint stopped               |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ShutdownPhase {
    #[default]
    Running,
    InputClosed,
    BatchersDraining,
    BatchChannelClosed,
    OutletsDraining,
    StatsChannelClosed,
    Terminated,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid shutdown transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: ShutdownPhase,
    pub to: ShutdownPhase,
}

impl ShutdownPhase {
    /// The only phase reachable from this one.
    pub fn successor(self) -> Option<ShutdownPhase> {
        use ShutdownPhase::*;
        match self {
            Running => Some(InputClosed),
            InputClosed => Some(BatchersDraining),
            BatchersDraining => Some(BatchChannelClosed),
            BatchChannelClosed => Some(OutletsDraining),
            OutletsDraining => Some(StatsChannelClosed),
            StatsChannelClosed => Some(Terminated),
            Terminated => None,
        }
    }

    /// Move to `next`, which must be the immediate successor.
    pub fn advance(&mut self, next: ShutdownPhase) -> Result<(), InvalidTransition> {
        if self.successor() != Some(next) {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_terminated(self) -> bool {
        self == ShutdownPhase::Terminated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownPhase::Running => "running",
            ShutdownPhase::InputClosed => "input_closed",
            ShutdownPhase::BatchersDraining => "batchers_draining",
            ShutdownPhase::BatchChannelClosed => "batch_channel_closed",
            ShutdownPhase::OutletsDraining => "outlets_draining",
            ShutdownPhase::StatsChannelClosed => "stats_channel_closed",
            ShutdownPhase::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
