//! Core types and collaborators shared by every engine

pub mod climate;
pub mod land;
pub mod noise;
pub mod vec2;

pub use climate::{
    sun_altitude, sun_azimuth, wrap_hour, BaselineClimate, Daylight, SeasonalClimate,
};
pub use land::{DefaultMaterials, LandCover, MaterialTable, SoilType, ThermalProperties};
pub use vec2::{Vec2, WindVector};
