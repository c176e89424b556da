use crate::ephemeris::Observer;
use crate::motor::MountLimits;
use crate::tracker::types::TrackingState;

/// Above the observer's horizon mask. An inactive state is never observable.
pub fn is_observable(state: &TrackingState, observer: &Observer) -> bool {
    state
        .position()
        .is_some_and(|p| p.altitude_deg >= observer.horizon_deg)
}

/// Both axes within reach of their motor, offsets included.
pub fn is_trackable(state: &TrackingState, limits: &MountLimits) -> bool {
    state.position().is_some_and(|p| {
        limits.azimuth.accepts(p.azimuth_deg) && limits.altitude.accepts(p.altitude_deg)
    })
}
