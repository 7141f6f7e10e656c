/// This module contains the acquisition engine, its search tiers and its downstream outputs
pub mod acquisition;

pub mod constants;

/// Signal definitions for GPS L1 C/A
pub mod gps_l1_ca;
