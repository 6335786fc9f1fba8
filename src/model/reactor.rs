//! Reactor design parameters and the per-design lookup tables.
use crate::input::{check_finite_in_range, check_non_negative};
use crate::units::Capacity;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::EnumIter;

/// The reactor design family
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum ReactorType {
    /// Pressurised water reactor
    #[string = "PWR"]
    #[strum(to_string = "PWR")]
    Pwr,
    /// Boiling water reactor
    #[string = "BWR"]
    #[strum(to_string = "BWR")]
    Bwr,
    /// Small modular reactor
    #[string = "SMR"]
    #[strum(to_string = "SMR")]
    Smr,
    /// Thorium-fuelled design
    #[string = "Thorium"]
    #[strum(to_string = "Thorium")]
    Thorium,
    /// Heavy-water reactor
    #[string = "CANDU"]
    #[strum(to_string = "CANDU")]
    Candu,
    /// Fast breeder reactor
    #[string = "Fast Breeder"]
    #[strum(to_string = "Fast Breeder")]
    FastBreeder,
}

impl ReactorType {
    /// Relative accident frequency compared to a PWR
    pub fn accident_factor(self) -> f64 {
        match self {
            Self::Pwr => 1.0,
            Self::Bwr => 1.1,
            Self::Smr => 0.5,
            Self::Thorium => 0.3,
            Self::Candu => 0.7,
            Self::FastBreeder => 1.3,
        }
    }

    /// Years between major maintenance outages
    pub fn maintenance_cycle_years(self) -> u32 {
        match self {
            Self::Smr => 4,
            _ => 6,
        }
    }
}

/// The fissile fuel loaded into the core
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum FuelType {
    /// Enriched uranium
    #[string = "U-235"]
    #[strum(to_string = "U-235")]
    U235,
    /// Plutonium reprocessed from spent fuel
    #[string = "Pu-239"]
    #[strum(to_string = "Pu-239")]
    Pu239,
    /// Thorium fuel cycle (bred U-233)
    #[string = "Thorium-232"]
    #[strum(to_string = "Thorium-232")]
    Th232,
    /// Mixed uranium/plutonium oxides
    #[string = "MOX"]
    #[strum(to_string = "MOX")]
    Mox,
}

/// Properties of a fuel relative to standard enriched uranium
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelProperties {
    /// Relative energy extracted per unit of rated output
    pub energy_density: f64,
    /// Relative high-level waste produced per MWh
    pub waste_factor: f64,
    /// Relative fuel cost
    pub cost_multiplier: f64,
    /// Relative neutron flux for the same power rating
    pub flux_factor: f64,
}

impl FuelType {
    /// Look up the properties of this fuel
    pub fn properties(self) -> FuelProperties {
        match self {
            Self::U235 => FuelProperties {
                energy_density: 1.0,
                waste_factor: 1.0,
                cost_multiplier: 1.0,
                flux_factor: 1.0,
            },
            Self::Pu239 => FuelProperties {
                energy_density: 1.2,
                waste_factor: 0.8,
                cost_multiplier: 1.5,
                flux_factor: 1.15,
            },
            Self::Th232 => FuelProperties {
                energy_density: 1.1,
                waste_factor: 0.3,
                cost_multiplier: 0.8,
                flux_factor: 0.85,
            },
            Self::Mox => FuelProperties {
                energy_density: 1.15,
                waste_factor: 0.9,
                cost_multiplier: 1.3,
                flux_factor: 1.08,
            },
        }
    }
}

/// The material used to slow neutrons down
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum ModeratorType {
    #[string = "Light Water"]
    #[strum(to_string = "Light Water")]
    LightWater,
    #[string = "Heavy Water"]
    #[strum(to_string = "Heavy Water")]
    HeavyWater,
    #[string = "Graphite"]
    #[strum(to_string = "Graphite")]
    Graphite,
    /// Unmoderated (fast spectrum)
    #[string = "None"]
    #[strum(to_string = "None")]
    None,
}

/// Nuclear properties of a moderator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeratorProperties {
    /// Density (kg/m³)
    pub density: f64,
    /// Scattering cross section (barns)
    pub scattering_cross_section: f64,
    /// Absorption cross section (barns)
    pub absorption_cross_section: f64,
    /// Moderating ratio (slowing-down power over absorption)
    pub moderating_ratio: f64,
    /// Temperature coefficient of reactivity (pcm/°C)
    pub temperature_coefficient: f64,
}

impl ModeratorType {
    /// Look up the properties of this moderator
    pub fn properties(self) -> ModeratorProperties {
        match self {
            Self::LightWater => ModeratorProperties {
                density: 1000.0,
                scattering_cross_section: 103.0,
                absorption_cross_section: 0.664,
                moderating_ratio: 72.0,
                temperature_coefficient: -30.0,
            },
            Self::HeavyWater => ModeratorProperties {
                density: 1105.0,
                scattering_cross_section: 13.6,
                absorption_cross_section: 0.001,
                moderating_ratio: 5670.0,
                temperature_coefficient: -10.0,
            },
            Self::Graphite => ModeratorProperties {
                density: 1600.0,
                scattering_cross_section: 4.8,
                absorption_cross_section: 0.0045,
                moderating_ratio: 192.0,
                temperature_coefficient: 5.0,
            },
            Self::None => ModeratorProperties {
                density: 0.0,
                scattering_cross_section: 0.0,
                absorption_cross_section: 0.0,
                moderating_ratio: 0.0,
                temperature_coefficient: 0.0,
            },
        }
    }

    /// Reactivity bonus used by the simplified thermal model
    pub fn reactivity_bonus(self) -> f64 {
        match self {
            Self::HeavyWater => 0.05,
            Self::Graphite => 0.03,
            Self::LightWater | Self::None => 0.0,
        }
    }

    /// Multiplier applied to the prompt neutron lifetime
    pub fn generation_time_multiplier(self) -> f64 {
        match self {
            Self::LightWater => 1.5,
            Self::HeavyWater => 2.0,
            Self::Graphite => 1.8,
            Self::None => 1.0,
        }
    }
}

/// The shape of the reactor core
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum Geometry {
    #[string = "Cylindrical"]
    #[strum(to_string = "Cylindrical")]
    Cylindrical,
    #[string = "Spherical"]
    #[strum(to_string = "Spherical")]
    Spherical,
    #[string = "Rectangular"]
    #[strum(to_string = "Rectangular")]
    Rectangular,
}

impl Geometry {
    /// Approximate core volume (m³)
    pub fn core_volume(self) -> f64 {
        match self {
            Self::Cylindrical => 150.0,
            Self::Spherical => 120.0,
            Self::Rectangular => 180.0,
        }
    }

    /// Fundamental-mode radial flux shape at normalised radius `r` in [0, 1]
    pub fn radial_profile(self, r: f64) -> f64 {
        use std::f64::consts::PI;

        match self {
            // 2.405 is the first zero of the Bessel function J0
            Self::Cylindrical => (2.405 * r).cos(),
            Self::Spherical => {
                if r > 0.0 {
                    (PI * r).sin() / (PI * r)
                } else {
                    1.0
                }
            }
            Self::Rectangular => (PI * (r - 0.5)).cos(),
        }
    }
}

/// The design and operating parameters of a reactor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorParameters {
    /// Design family
    #[serde(rename = "type")]
    pub reactor_type: ReactorType,
    /// Fuel loaded into the core
    pub fuel_type: FuelType,
    /// Fissile enrichment (%)
    pub enrichment_percent: f64,
    /// Fraction of thermal energy converted to electricity
    pub thermal_efficiency: f64,
    /// Percentage of the year the plant is generating
    pub uptime_percent: f64,
    /// Rated electrical capacity (MW)
    #[serde(rename = "capacity_mw")]
    pub capacity: Capacity,
    /// Operating lifetime
    pub plant_lifespan_years: u32,
    /// Moderator material
    pub moderator_type: ModeratorType,
    /// Core shape
    pub geometry: Geometry,
    /// Control rod insertion (%)
    pub control_rod_insertion: f64,
    /// Primary coolant flow rate (kg/s)
    pub coolant_flow_rate: f64,
}

impl ReactorParameters {
    /// Check that the parameters describe a physically meaningful plant
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.capacity.is_finite() && self.capacity > Capacity(0.0),
            "capacity_mw must be a finite number greater than zero"
        );
        ensure!(
            self.plant_lifespan_years > 0,
            "plant_lifespan_years cannot be zero"
        );
        ensure!(
            self.thermal_efficiency.is_finite()
                && self.thermal_efficiency > 0.0
                && self.thermal_efficiency <= 1.0,
            "thermal_efficiency must be greater than 0 and at most 1"
        );
        ensure!(
            self.uptime_percent.is_finite()
                && self.uptime_percent > 0.0
                && self.uptime_percent <= 100.0,
            "uptime_percent must be greater than 0 and at most 100"
        );
        check_finite_in_range(
            "control_rod_insertion",
            self.control_rod_insertion,
            0.0,
            100.0,
        )?;
        ensure!(
            self.enrichment_percent.is_finite() && self.enrichment_percent >= 0.0,
            "enrichment_percent must be a finite, non-negative number"
        );
        check_non_negative("coolant_flow_rate", self.coolant_flow_rate)?;

        Ok(())
    }

    /// Thermal power of the core (MW)
    pub fn thermal_power(&self) -> f64 {
        self.capacity.value() / self.thermal_efficiency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::reactor;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[test]
    fn test_enum_labels_round_trip() {
        for reactor_type in ReactorType::iter() {
            let label = reactor_type.to_string();
            let toml_str = format!("value = \"{label}\"");

            #[derive(Deserialize)]
            struct Wrapper {
                value: ReactorType,
            }
            let parsed: Wrapper = toml::from_str(&toml_str).unwrap();
            assert_eq!(parsed.value, reactor_type);
        }
    }

    #[test]
    fn test_fast_breeder_label() {
        assert_eq!(ReactorType::FastBreeder.to_string(), "Fast Breeder");
        assert_eq!(ModeratorType::LightWater.to_string(), "Light Water");
        assert_eq!(FuelType::Th232.to_string(), "Thorium-232");
    }

    #[test]
    fn test_thorium_has_lowest_waste_factor() {
        let thorium = FuelType::Th232.properties().waste_factor;
        assert_eq!(thorium, 0.3);
        assert!(
            FuelType::iter()
                .filter(|fuel| *fuel != FuelType::Th232)
                .all(|fuel| fuel.properties().waste_factor > thorium)
        );
    }

    #[rstest]
    #[case(Geometry::Cylindrical, 0.0, 1.0)]
    #[case(Geometry::Spherical, 0.0, 1.0)]
    #[case(Geometry::Rectangular, 0.5, 1.0)]
    #[case(Geometry::Spherical, 1.0, 0.0)]
    fn test_radial_profile(#[case] geometry: Geometry, #[case] r: f64, #[case] expected: f64) {
        assert!((geometry.radial_profile(r) - expected).abs() < 1e-12);
    }

    #[rstest]
    fn test_validate_ok(reactor: ReactorParameters) {
        assert!(reactor.validate().is_ok());
    }

    #[rstest]
    fn test_validate_zero_capacity(mut reactor: ReactorParameters) {
        reactor.capacity = Capacity(0.0);
        assert_eq!(
            reactor.validate().unwrap_err().to_string(),
            "capacity_mw must be a finite number greater than zero"
        );
    }

    #[rstest]
    fn test_validate_zero_lifespan(mut reactor: ReactorParameters) {
        reactor.plant_lifespan_years = 0;
        assert!(reactor.validate().is_err());
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(0.33, true)]
    #[case(1.0, true)]
    #[case(1.1, false)]
    #[case(f64::NAN, false)]
    fn test_validate_thermal_efficiency(
        mut reactor: ReactorParameters,
        #[case] value: f64,
        #[case] expected_valid: bool,
    ) {
        reactor.thermal_efficiency = value;
        assert_eq!(reactor.validate().is_ok(), expected_valid);
    }

    #[rstest]
    #[case(-1.0, false)]
    #[case(0.0, true)]
    #[case(100.0, true)]
    #[case(100.5, false)]
    fn test_validate_control_rods(
        mut reactor: ReactorParameters,
        #[case] value: f64,
        #[case] expected_valid: bool,
    ) {
        reactor.control_rod_insertion = value;
        assert_eq!(reactor.validate().is_ok(), expected_valid);
    }
}
