//! Scheduler delegate that drives one control-loop tick.
//!
//! Borrowed fresh each tick from the loop's owned parts, so the scheduler
//! stays ignorant of sensors, sockets and logging.

use log::warn;

use crate::diagnostics::RuntimeMetrics;
use crate::stream::{Distributor, PushOutcome};

use super::events::{CameraEvent, StatusReport};
use super::ports::{Activity, ChannelPort, EventSink, SchedulerDelegate, ThermalSource};
use super::service::CameraService;

pub struct PipelineTick<'a, S, C, E> {
    pub service: &'a mut CameraService,
    pub source: &'a mut S,
    pub distributor: &'a Distributor,
    pub channel: &'a mut C,
    pub sink: &'a mut E,
    pub now_ms: u64,
}

impl<S, C, E> PipelineTick<'_, S, C, E>
where
    S: ThermalSource,
    C: ChannelPort,
    E: EventSink,
{
    fn acquire(&mut self) {
        if !self.service.is_running() {
            return;
        }
        // Failures are already reported through the sink.
        let _ = self.service.acquire(&mut *self.source, self.distributor, &mut *self.sink);
    }

    fn push(&mut self) {
        match self.distributor.push(&mut *self.channel) {
            Ok(PushOutcome::Sent { recipients, bytes }) => {
                self.sink.emit(&CameraEvent::FramePushed { recipients, bytes });
            }
            Ok(PushOutcome::Idle | PushOutcome::NoFrame) => {}
            Err(e) => warn!("PUSH | encode failed: {}", e),
        }
    }

    fn housekeeping(&mut self) {
        for (id, reason) in self.distributor.evict_stale(self.now_ms, &mut *self.channel) {
            self.sink.emit(&CameraEvent::SubscriberRemoved { id, reason });
        }

        self.sink.emit(&CameraEvent::Status(StatusReport {
            subscribers: self.distributor.subscriber_count(),
            capacity: self.distributor.capacity(),
            connections: self.channel.connection_count(),
            frames_published: self.distributor.frames_published(),
            runtime: RuntimeMetrics::collect(
                self.now_ms / 1_000,
                self.service.frames_acquired(),
                self.service.failed_attempts(),
            ),
        }));
    }
}

impl<S, C, E> SchedulerDelegate for PipelineTick<'_, S, C, E>
where
    S: ThermalSource,
    C: ChannelPort,
    E: EventSink,
{
    fn on_activity_due(&mut self, activity: Activity) {
        match activity {
            Activity::Acquire => self.acquire(),
            Activity::Push => self.push(),
            Activity::Housekeeping => self.housekeeping(),
        }
    }
}
