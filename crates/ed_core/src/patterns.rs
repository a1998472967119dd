//! Hour-of-day profiles for arrivals and EMS offload staffing.
//!
//! Index 0 is midnight to 1 AM. Arrival profiles are Poisson rates (patients
//! per hour); the staffing profile is a bay count.

/// Walk-in arrivals per hour.
pub const WALK_IN_HOURLY_RATE: [f64; 24] = [
    5.0,  // 12 AM - 1 AM
    5.0,  // 1 AM - 2 AM
    6.0,  // 2 AM - 3 AM
    7.0,  // 3 AM - 4 AM
    8.0,  // 4 AM - 5 AM
    10.0, // 5 AM - 6 AM
    12.0, // 6 AM - 7 AM
    14.0, // 7 AM - 8 AM
    16.0, // 8 AM - 9 AM
    18.0, // 9 AM - 10 AM (peak)
    18.0, // 10 AM - 11 AM (peak)
    17.0, // 11 AM - 12 PM
    16.0, // 12 PM - 1 PM
    15.0, // 1 PM - 2 PM
    14.0, // 2 PM - 3 PM
    12.0, // 3 PM - 4 PM
    11.0, // 4 PM - 5 PM
    10.0, // 5 PM - 6 PM
    9.0,  // 6 PM - 7 PM
    8.0,  // 7 PM - 8 PM
    7.0,  // 8 PM - 9 PM
    6.0,  // 9 PM - 10 PM
    5.0,  // 10 PM - 11 PM
    5.0,  // 11 PM - 12 AM
];

/// Ambulance arrivals per hour.
pub const EMS_HOURLY_RATE: [f64; 24] = [
    0.5, 0.5, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 7.0, 7.0, // midnight to noon
    7.0, 6.0, 6.0, 5.0, 4.0, 3.0, 2.0, 2.0, 1.0, 1.0, 0.5, 0.5, // noon to midnight
];

/// Offload bays staffed per hour.
pub const OFFLOAD_BAYS_PER_HOUR: [u32; 24] = [
    1, 1, 1, 1, 1, 1, 2, 2, 3, 3, 3, 3, // midnight to noon
    3, 3, 3, 3, 3, 3, 2, 2, 1, 1, 1, 1, // noon to midnight
];

/// CTAS mix of ambulance arrivals, level 1 (resuscitation) to 5.
pub const EMS_CTAS_MIX: [(u8, f64); 5] = [(1, 0.04), (2, 0.15), (3, 0.48), (4, 0.28), (5, 0.05)];

/// Hourly sign-up caps for acute physicians, cycled over the day.
pub const ACUTE_SIGNUP_CAPS: [u32; 12] = [3, 3, 3, 3, 2, 2, 2, 2, 2, 2, 2, 2];

/// Hourly sign-up caps for fast-track physicians, cycled over the day.
pub const FAST_TRACK_SIGNUP_CAPS: [u32; 12] = [8, 8, 7, 7, 6, 6, 6, 5, 5, 5, 4, 4];

/// Value of a 24-entry profile at an absolute hour index, wrapping daily.
pub fn hourly_value<T: Copy + Default>(profile: &[T], hour_index: u64) -> T {
    if profile.is_empty() {
        return T::default();
    }
    profile[(hour_index % profile.len() as u64) as usize]
}
