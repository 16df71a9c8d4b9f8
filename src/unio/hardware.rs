use std::thread;
use std::time::{
	Duration,
	Instant,
};

// `thread::sleep` is allowed to wake early; retry until the full
// duration really passed.
pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum LineDirection {
	/// Actively drive the output latch onto the bus.
	Drive,
	/// Tri-state; the pull-up or the slave determines the level.
	Release,
}

/// Pin-level access to the single bus line, one implementation per
/// target board (or the software simulation in `crate::sim`).
///
/// The driver assumes a single cooperative caller. On a threaded host
/// `suspend_interrupts` must also exclude concurrent callers of the
/// driver, not just asynchronous preemption.
pub trait Hardware {
	/// Saved preemption state, handed out by `suspend_interrupts` and
	/// consumed by `restore_interrupts`. Opaque to the protocol code.
	type InterruptState;

	fn set_direction(&mut self, direction: LineDirection);

	/// Set the output latch; only visible on the bus while driving.
	fn set_line(&mut self, level: bool);

	fn read_line(&mut self) -> bool;

	/// Block for at least `us` microseconds.
	fn delay_us(&mut self, us: u32) {
		reliable_sleep(Duration::from_micros(u64::from(us)));
	}

	/// Disable preemption, returning the prior state.
	fn suspend_interrupts(&mut self) -> Self::InterruptState;

	/// Restore exactly the state returned by `suspend_interrupts`; must
	/// not unconditionally re-enable.
	fn restore_interrupts(&mut self, saved: Self::InterruptState);
}
