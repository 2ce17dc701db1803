//! Cloud formation, water budget and precipitation
//!
//! Each tick the strongest of three formation mechanisms picks the cloud
//! type of a cell:
//! - Orographic lift on windward slopes once forced lift exceeds the LCL
//! - Midday convection from surface thermal excess (CAPE proxy)
//! - Stratus seeded by thick fog
//!
//! Cloud water integrates formation against solar dissipation, decay and
//! precipitation loss. Precipitation feeds snow depth, soil moisture and the
//! latent heating consumed by the thermodynamics pass.

use crate::atmosphere::fog::{fog_cloud_potential, update_fog};
use crate::atmosphere::humidity::{
    dew_point, evaporation_source, integrate_humidity, precipitation_sink,
};
use crate::atmosphere::microphysics::{
    coalescence_bonus, update_microphysics, updraft_speed, Hydrometeors,
};
use crate::atmosphere::precipitation::{calculate_precipitation, classify_precipitation};
use crate::atmosphere::wind::elevation_gradient;
use crate::atmosphere::Environment;
use crate::core_types::climate::wrap_hour;
use crate::core_types::{LandCover, SoilType, Vec2, WindVector};
use crate::grid::{
    clamp_finite, CloudType, Grid, Precipitation, PrecipitationType, SimulationState,
    MAX_CLOUD_WATER,
};
use rand::Rng;

/// Orographic clouds need at least this wind (m/s)
const OROGRAPHIC_MIN_WIND: f32 = 3.0;
/// Minimum windward slope component (m/m)
const WINDWARD_THRESHOLD: f32 = 0.02;
/// Forced lift per unit windward slope per m/s (m)
const LIFT_SCALE: f32 = 150.0;
/// LCL height per °C of dew-point deficit (m)
const LCL_PER_DEFICIT: f32 = 125.0;
const LCL_OFFSET: f32 = 100.0;
/// Deficit scale of the temperature-closeness factor (°C)
const CLOSENESS_SCALE: f32 = 5.0;
const OROGRAPHIC_SCALE: f32 = 0.3;
/// Convection window (hours, inclusive)
const CONVECTIVE_HOURS: (f32, f32) = (10.0, 17.0);
/// CAPE per °C of thermal excess at saturation (J/kg)
const CAPE_PER_DEGREE: f32 = 400.0;
const CUMULUS_CAPE: f32 = 300.0;
const CUMULONIMBUS_CAPE: f32 = 1000.0;
const CAPE_NORM: f32 = 1500.0;
const CONVECTIVE_SCALE: f32 = 0.4;
/// Potentials at or below this do not form cloud
const MIN_FORMATION: f32 = 0.01;
/// Nimbostratus needs this much water and humidity
const NIMBOSTRATUS_WATER: f32 = 0.7;
const NIMBOSTRATUS_HUMIDITY: f32 = 0.8;
/// Minimum cloud base above ground (m)
const MIN_CLOUD_BASE: f32 = 100.0;
const SOLAR_DISSIPATION: f32 = 0.15;
/// Decay of cloud with no active mechanism (per hour)
const ORPHAN_DECAY: f32 = 0.05;
/// Cloud water lost per unit precipitation rate
const PRECIPITATION_WATER_LOSS: f32 = 0.2;
/// Optical depth per unit cloud water
const OPTICAL_DEPTH_SCALE: f32 = 10.0;
/// Snow depth per unit snowfall rate (m/h)
const SNOW_ACCUMULATION: f32 = 0.01;
const SNOW_LATENT_HEAT: f32 = 0.3;
const CONDENSATION_LATENT_HEAT: f32 = 0.2;
/// Soil moisture gained per unit rain rate, scaled by retention
const INFILTRATION: f32 = 0.02;

/// Driving parameters of one cloud step
#[derive(Debug, Clone, Copy)]
pub struct CloudOptions {
    pub month: f32,
    pub hour: f32,
    /// Prevailing wind speed (m/s)
    pub wind_speed: f32,
    /// Direction the wind blows toward, counter-clockwise from +x (degrees)
    pub wind_direction: f32,
    pub sun_altitude: f32,
    pub time_factor: f32,
}

/// Winning formation mechanism of a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudFormation {
    pub cloud_type: CloudType,
    /// Cloud water formed per hour
    pub potential: f32,
    /// Lifted condensation level above ground (m)
    pub lcl: f32,
}

impl CloudFormation {
    const NONE: Self = Self {
        cloud_type: CloudType::None,
        potential: 0.0,
        lcl: 0.0,
    };
}

/// Orographic formation potential for a windward cell.
///
/// Forced lift has to exceed the LCL estimated from the dew-point deficit;
/// the excess, humidity and how close the air is to saturation scale the
/// result.
pub fn orographic_potential(
    gradient: Vec2,
    wind_direction: Vec2,
    wind_speed: f32,
    humidity: f32,
    deficit: f32,
) -> f32 {
    if wind_speed <= OROGRAPHIC_MIN_WIND {
        return 0.0;
    }
    let windward = gradient.dot(&wind_direction);
    if windward <= WINDWARD_THRESHOLD {
        return 0.0;
    }
    let lift = windward * wind_speed * LIFT_SCALE;
    let lcl = LCL_PER_DEFICIT * deficit;
    if lift <= lcl {
        return 0.0;
    }
    let excess = ((lift - lcl) / (lcl + LCL_OFFSET)).min(1.0);
    let closeness = 1.0 / (1.0 + deficit / CLOSENESS_SCALE);
    excess * humidity * closeness * OROGRAPHIC_SCALE
}

/// Land-cover weighting of surface thermals
pub fn thermal_weight(land: LandCover, soil: SoilType) -> f32 {
    match land {
        LandCover::Urban => 1.5,
        LandCover::Settlement => 1.2,
        LandCover::Water => 0.3,
        LandCover::Forest => 0.6,
        LandCover::Grassland if soil == SoilType::Sand => 1.3,
        LandCover::Grassland => 1.0,
    }
}

/// Whether `hour` is in the convective window
#[inline]
pub fn is_convective_hour(hour: f32) -> bool {
    let hour = wrap_hour(hour);
    hour >= CONVECTIVE_HOURS.0 && hour <= CONVECTIVE_HOURS.1
}

/// Convective type and potential for a CAPE value
pub fn convective_cloud(cape: f32) -> (CloudType, f32) {
    let potential = (cape / CAPE_NORM).min(1.0) * CONVECTIVE_SCALE;
    if cape > CUMULONIMBUS_CAPE {
        (CloudType::Cumulonimbus, potential)
    } else if cape > CUMULUS_CAPE {
        (CloudType::Cumulus, potential)
    } else {
        (CloudType::None, 0.0)
    }
}

/// Pick the strongest mechanism.
///
/// Thick, humid layered cloud driven by lift or fog becomes Nimbostratus.
pub fn classify_cloud(
    orographic: f32,
    convective: (CloudType, f32),
    fog: f32,
    cloud_water: f32,
    humidity: f32,
    lcl: f32,
) -> CloudFormation {
    let (convective_type, convective_potential) = convective;
    let candidates = [
        (CloudType::Orographic, orographic),
        (convective_type, convective_potential),
        (CloudType::Stratus, fog),
    ];
    let (mut cloud_type, potential) = candidates
        .into_iter()
        .fold((CloudType::None, 0.0_f32), |best, c| if c.1 > best.1 { c } else { best });

    if potential <= MIN_FORMATION || cloud_type == CloudType::None {
        return CloudFormation::NONE;
    }
    let layered = matches!(cloud_type, CloudType::Orographic | CloudType::Stratus);
    if layered && cloud_water > NIMBOSTRATUS_WATER && humidity > NIMBOSTRATUS_HUMIDITY {
        cloud_type = CloudType::Nimbostratus;
    }
    CloudFormation {
        cloud_type,
        potential,
        lcl,
    }
}

/// Advance fog, clouds, precipitation and the humidity budget one step.
///
/// Skipped entirely when `time_factor <= 0`. Precipitation gating draws from
/// `rng` in row-major order.
pub fn update_cloud_dynamics<R: Rng + ?Sized>(
    state: &mut SimulationState,
    options: &CloudOptions,
    env: &Environment<'_>,
    rng: &mut R,
) {
    let tf = options.time_factor;
    if !tf.is_finite() || tf <= 0.0 {
        return;
    }
    let sun = clamp_finite(options.sun_altitude, 0.0, 1.0, 0.0);

    update_fog(state, sun, tf);

    let size = state.size;
    let baseline = env.climate.baseline_temperature(options.month, options.hour);
    let direction_degrees = if options.wind_direction.is_finite() {
        options.wind_direction
    } else {
        0.0
    };
    let wind_speed = if options.wind_speed.is_finite() {
        options.wind_speed.max(0.0)
    } else {
        0.0
    };
    let wind_direction = WindVector::from_direction(direction_degrees, 1.0).vector();
    let convective_hour = is_convective_hour(options.hour);

    let mut cloud_water = state.cloud_water.clone();
    let mut cloud_type = Grid::filled(size, CloudType::None);
    let mut cloud_base = Grid::filled(size, 0.0_f32);
    let mut cloud_top = Grid::filled(size, 0.0_f32);
    let mut ice = state.ice_content.clone();
    let mut graupel = state.graupel.clone();
    let mut droplets = state.droplet_size.clone();
    let mut cape_field = Grid::filled(size, 0.0_f32);
    let mut thermal_field = Grid::filled(size, 0.0_f32);
    let mut latent = Grid::filled(size, 0.0_f32);
    let mut precipitation = Grid::filled(size, Precipitation::NONE);
    let mut humidity = state.humidity.clone();
    let mut dew = state.dew_point.clone();
    let mut snow_depth = state.snow_depth.clone();
    let mut moisture = state.soil_moisture.clone();

    for y in 0..size {
        for x in 0..size {
            let idx = y * size + x;
            let props = state.thermal_properties(env.materials, x as i32, y as i32);
            let land = state.land_cover[idx];
            let temp = state.air_temperature[idx];
            let h = state.humidity[idx];
            let deficit = (temp - state.dew_point[idx]).max(0.0);
            let water = state.cloud_water[idx];
            let elevation = state.elevation[idx];

            let interior = x > 0 && y > 0 && x + 1 < size && y + 1 < size;
            let orographic = if interior {
                let gradient = elevation_gradient(&state.elevation, state.cell_size, x, y);
                orographic_potential(gradient, wind_direction, wind_speed, h, deficit)
            } else {
                0.0
            };

            let (thermal, cape) = if convective_hour {
                let weight = thermal_weight(land, state.soil_type[idx]);
                let thermal = (temp - baseline).max(0.0) * weight;
                (thermal, thermal * h * CAPE_PER_DEGREE)
            } else {
                (0.0, 0.0)
            };
            thermal_field[idx] = thermal;
            cape_field[idx] = cape;

            let lcl = LCL_PER_DEFICIT * deficit;
            let formation = classify_cloud(
                orographic,
                convective_cloud(cape),
                fog_cloud_potential(state.fog_density[idx]),
                water,
                h,
                lcl,
            );
            cloud_type[idx] = formation.cloud_type;
            if formation.cloud_type != CloudType::None {
                cloud_base[idx] = elevation + formation.lcl.max(MIN_CLOUD_BASE);
                cloud_top[idx] = cloud_base[idx] + formation.cloud_type.vertical_extent();
            }

            // Precipitation falls from the water present at the start of the step
            let rate = calculate_precipitation(
                water,
                formation.cloud_type,
                coalescence_bonus(state.droplet_size[idx]),
                rng,
            );
            let precip = classify_precipitation(rate, temp);
            precipitation[idx] = precip;

            let dissipation = SOLAR_DISSIPATION * water * sun;
            let decay = if formation.cloud_type == CloudType::None {
                ORPHAN_DECAY * water
            } else {
                0.0
            };
            let loss = precip.rate * PRECIPITATION_WATER_LOSS;
            let budget = (water + (formation.potential - dissipation - decay - loss) * tf)
                .clamp(0.0, MAX_CLOUD_WATER);

            let micro = update_microphysics(
                Hydrometeors {
                    cloud_water: budget,
                    ice_content: state.ice_content[idx],
                    graupel: state.graupel[idx],
                    droplet_size: state.droplet_size[idx],
                },
                temp,
                updraft_speed(cape),
                tf,
            );
            cloud_water[idx] = micro.cloud_water.clamp(0.0, MAX_CLOUD_WATER);
            ice[idx] = micro.ice_content;
            graupel[idx] = micro.graupel;
            droplets[idx] = micro.droplet_size;

            let source = evaporation_source(
                land,
                &props,
                temp,
                state.wind[idx].speed,
                state.soil_moisture[idx],
            );
            humidity[idx] = integrate_humidity(h, source, precipitation_sink(precip), tf);
            dew[idx] = dew_point(temp, humidity[idx]);

            let mut latent_heat = formation.potential * CONDENSATION_LATENT_HEAT;
            match precip.kind {
                PrecipitationType::Snow => {
                    snow_depth[idx] += precip.rate * SNOW_ACCUMULATION * tf;
                    latent_heat += precip.rate * SNOW_LATENT_HEAT;
                }
                PrecipitationType::Rain | PrecipitationType::Sleet => {
                    moisture[idx] = (moisture[idx]
                        + precip.rate * INFILTRATION * props.water_retention * tf)
                        .min(1.0);
                }
                PrecipitationType::None => {}
            }
            latent[idx] = latent_heat;
        }
    }

    let coverage = cloud_water.map(|&w| w.min(1.0));
    state.cloud_coverage = Grid::from_fn(size, |x, y| coverage.mean_3x3(x, y).clamp(0.0, 1.0));
    state.cloud_optical_depth = cloud_water.map(|&w| w * OPTICAL_DEPTH_SCALE);
    state.cloud_water = cloud_water;
    state.cloud_type = cloud_type;
    state.cloud_base = cloud_base;
    state.cloud_top = cloud_top;
    state.ice_content = ice;
    state.graupel = graupel;
    state.droplet_size = droplets;
    state.convective_energy = cape_field;
    state.thermal_strength = thermal_field;
    state.latent_heat_effect = latent;
    state.precipitation = precipitation;
    state.humidity = humidity;
    state.dew_point = dew;
    state.snow_depth = snow_depth;
    state.soil_moisture = moisture;
}
