// self
use crate::{
	obs::{FlowKind, FlowOutcome},
	provider::GrantType,
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_conductor_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a fallback from a rejected `from` grant to a fresh `to` acquisition.
pub fn record_fallback(from: GrantType, to: GrantType) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_conductor_fallback_total",
			"from" => from.as_str(),
			"to" => to.as_str()
		)
		.increment(1);
	}
	#[cfg(feature = "tracing")]
	{
		tracing::info!(from = from.as_str(), to = to.as_str(), "Refresh rejected; falling back.");
	}

	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	{
		let _ = (from, to);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_callable_without_features() {
		record_flow_outcome(FlowKind::AccessToken, FlowOutcome::Failure);
		record_fallback(GrantType::RefreshToken, GrantType::AuthorizationCode);
	}
}
