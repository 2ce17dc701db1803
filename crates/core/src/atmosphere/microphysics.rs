//! Cloud microphysics: freezing, graupel and droplet growth
//!
//! Operates on one cell's hydrometeor budget at a time. All rates are per
//! simulated hour and scaled by the time factor.

/// Droplet radius of freshly condensed cloud (µm)
pub const INITIAL_DROPLET_SIZE: f32 = 10.0;
/// Droplet radius above which coalescence boosts precipitation (µm)
pub const COALESCENCE_THRESHOLD: f32 = 20.0;
const MAX_DROPLET_SIZE: f32 = 50.0;
const FREEZING_RATE: f32 = 0.1;
/// Fraction of the freezing potential realised per step
const FREEZING_FRACTION: f32 = 0.5;
const GRAUPEL_BAND: (f32, f32) = (-10.0, -2.0);
/// Minimum updraft for riming into graupel (m/s)
const GRAUPEL_UPDRAFT: f32 = 2.0;
const GRAUPEL_RATE: f32 = 0.05;
const DROPLET_GROWTH_RATE: f32 = 0.1;
/// Cloud water needed before droplets grow
const GROWTH_WATER_THRESHOLD: f32 = 0.3;
const ICE_DECAY: f32 = 0.05;
const ICE_MELT: f32 = 0.2;
const GRAUPEL_DECAY: f32 = 0.1;
/// Scale from `sqrt(2 × CAPE)` to a grid-scale updraft
const UPDRAFT_SCALE: f32 = 0.1;

/// Hydrometeor budget of one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hydrometeors {
    pub cloud_water: f32,
    pub ice_content: f32,
    pub graupel: f32,
    /// Mean droplet radius (µm)
    pub droplet_size: f32,
}

/// Parcel-theory updraft estimate from convective energy (m/s)
#[inline]
pub fn updraft_speed(convective_energy: f32) -> f32 {
    (2.0 * convective_energy.max(0.0)).sqrt() * UPDRAFT_SCALE
}

/// Extra precipitation efficiency from large droplets, in [0, 0.5]
#[inline]
pub fn coalescence_bonus(droplet_size: f32) -> f32 {
    if droplet_size > COALESCENCE_THRESHOLD {
        ((droplet_size - COALESCENCE_THRESHOLD) / COALESCENCE_THRESHOLD).min(0.5)
    } else {
        0.0
    }
}

/// Advance the hydrometeor budget of one cell.
///
/// Below freezing part of the cloud water freezes to ice (exponential
/// freezing-rate model); in the riming band strong updrafts turn water into
/// graupel. Above freezing, droplets grow with the updraft and ice melts back
/// into cloud water.
pub fn update_microphysics(
    mut h: Hydrometeors,
    temperature: f32,
    updraft: f32,
    time_factor: f32,
) -> Hydrometeors {
    if temperature < 0.0 {
        let frozen = h.cloud_water
            * (1.0 - (-FREEZING_RATE * -temperature * time_factor).exp())
            * FREEZING_FRACTION;
        h.cloud_water -= frozen;
        h.ice_content += frozen;

        if temperature >= GRAUPEL_BAND.0 && temperature <= GRAUPEL_BAND.1 && updraft > GRAUPEL_UPDRAFT
        {
            let rimed = (GRAUPEL_RATE * h.cloud_water * time_factor).min(h.cloud_water);
            h.cloud_water -= rimed;
            h.graupel += rimed;
        }

        h.ice_content -= h.ice_content * (ICE_DECAY * time_factor).min(1.0);
    } else {
        let melted = h.ice_content * (ICE_MELT * time_factor).min(1.0);
        h.ice_content -= melted;
        h.cloud_water += melted;

        if h.cloud_water > GROWTH_WATER_THRESHOLD {
            h.droplet_size = (h.droplet_size + updraft * DROPLET_GROWTH_RATE * time_factor)
                .min(MAX_DROPLET_SIZE);
        }
    }

    h.graupel -= h.graupel * (GRAUPEL_DECAY * time_factor).min(1.0);

    if h.cloud_water <= 0.01 {
        h.droplet_size = INITIAL_DROPLET_SIZE;
    }

    h.cloud_water = h.cloud_water.max(0.0);
    h.ice_content = h.ice_content.max(0.0);
    h.graupel = h.graupel.max(0.0);
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cloud(water: f32) -> Hydrometeors {
        Hydrometeors {
            cloud_water: water,
            ice_content: 0.0,
            graupel: 0.0,
            droplet_size: INITIAL_DROPLET_SIZE,
        }
    }

    #[test]
    fn test_freezing_moves_water_to_ice() {
        let before = cloud(1.0);
        let after = update_microphysics(before, -15.0, 0.0, 1.0);
        assert!(after.cloud_water < 1.0);
        assert!(after.ice_content > 0.0);
        // Mass only leaves through ice decay
        assert!(after.cloud_water + after.ice_content <= 1.0 + 1e-6);
    }

    #[test]
    fn test_colder_freezes_faster() {
        let mild = update_microphysics(cloud(1.0), -2.0, 0.0, 1.0);
        let cold = update_microphysics(cloud(1.0), -20.0, 0.0, 1.0);
        assert!(cold.cloud_water < mild.cloud_water);
    }

    #[test]
    fn test_graupel_needs_updraft_in_band() {
        let calm = update_microphysics(cloud(1.0), -5.0, 0.5, 1.0);
        assert_eq!(calm.graupel, 0.0);
        let stormy = update_microphysics(cloud(1.0), -5.0, 5.0, 1.0);
        assert!(stormy.graupel > 0.0);
        let too_cold = update_microphysics(cloud(1.0), -15.0, 5.0, 1.0);
        assert_eq!(too_cold.graupel, 0.0);
    }

    #[test]
    fn test_droplets_grow_in_warm_updraft() {
        let after = update_microphysics(cloud(0.8), 10.0, 5.0, 1.0);
        assert_relative_eq!(after.droplet_size, INITIAL_DROPLET_SIZE + 0.5);
        assert_eq!(coalescence_bonus(after.droplet_size), 0.0);
        assert_relative_eq!(coalescence_bonus(30.0), 0.5);
        assert_relative_eq!(coalescence_bonus(25.0), 0.25);
    }

    #[test]
    fn test_no_change_with_zero_time_factor() {
        let before = Hydrometeors {
            cloud_water: 0.6,
            ice_content: 0.2,
            graupel: 0.1,
            droplet_size: 15.0,
        };
        assert_eq!(update_microphysics(before, -5.0, 5.0, 0.0), before);
        assert_eq!(update_microphysics(before, 5.0, 5.0, 0.0), before);
    }

    #[test]
    fn test_updraft_from_energy() {
        assert_eq!(updraft_speed(0.0), 0.0);
        assert_eq!(updraft_speed(-10.0), 0.0);
        assert_relative_eq!(updraft_speed(1250.0), 5.0);
    }
}
