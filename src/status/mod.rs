
//! Process-wide channel status store.  Every decoder writes here and the
//! PVT engine reads a point-in-time copy; one coarse mutex covers both,
//! held only for the map mutation or copy itself.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::types::{ChannelSample, MonitorPvt};

/// Everything the aggregator accepts.  The closed enum is this crate's
/// rendering of the original dynamically-typed status port; anything
/// else simply cannot be constructed, and handling is total.
#[derive(Debug, Clone)]
pub enum StatusMessage {
	Sample(ChannelSample),
	Pvt(MonitorPvt),
}

#[derive(Default)]
struct StatusInner {
	channels:HashMap<i32, ChannelSample>,
	pvt:MonitorPvt,
}

#[derive(Default)]
pub struct ChannelStatusAggregator {
	inner:Mutex<StatusInner>,
}

impl ChannelStatusAggregator {

	pub fn new() -> Self { Self::default() }

	// Keep serving even if a writer panicked while holding the lock
	fn lock(&self) -> std::sync::MutexGuard<StatusInner> {
		match self.inner.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	/// Applies one status update.  A sample with a valid pseudorange
	/// inserts or overwrites its channel's entry; one without removes
	/// the entry.  Re-applying the same update is a no-op.
	pub fn update(&self, msg:StatusMessage) {
		match msg {
			StatusMessage::Sample(rec) => {
				let mut inner = self.lock();
				if rec.flag_valid_pseudorange {
					inner.channels.insert(rec.channel_id, rec);
				} else if inner.channels.remove(&rec.channel_id).is_some() {
					debug!("channel {} dropped from the status map", rec.channel_id);
				}
			},
			StatusMessage::Pvt(pvt) => {
				self.lock().pvt = pvt;
			},
		}
	}

	/// Consistent point-in-time copy of the channel map; never a live
	/// reference, so a solve can run on it outside the lock.
	pub fn snapshot(&self) -> HashMap<i32, ChannelSample> {
		self.lock().channels.clone()
	}

	pub fn pvt_snapshot(&self) -> MonitorPvt {
		self.lock().pvt
	}

	pub fn active_channels(&self) -> usize {
		self.lock().channels.len()
	}

}
