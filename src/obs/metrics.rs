// self
use crate::obs::{CallKind, CallOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"strava_dispatch_call_total",
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records that the limiter suspended a caller until the quota window reset.
pub fn record_throttle() {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("strava_dispatch_throttle_total").increment(1);
	}
}
