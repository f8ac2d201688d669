//! Physical constants for the machine and its rectifier/battery load.

use crate::error::MachineResult;
use pm_core::units::constants::ke_from_kv;
use pm_core::{PmError, ensure_finite, ensure_non_negative, ensure_positive};

/// Stator, rotor and mechanical constants of the machine.
#[derive(Clone, Debug, PartialEq)]
pub struct MotorParameters {
    /// Stator resistance Rs (Ω)
    pub rs_ohm: f64,
    /// d-axis inductance Ld (H)
    pub ld_h: f64,
    /// q-axis inductance Lq (H)
    pub lq_h: f64,
    /// Pole-pair count p
    pub pole_pairs: u32,
    /// Velocity constant Kv (RPM/V)
    pub kv_rpm_per_v: f64,
    /// Rotor inertia J (kg·m²)
    pub inertia_kg_m2: f64,
    /// Viscous friction coefficient B (N·m·s/rad)
    pub friction_n_m_s: f64,
}

impl MotorParameters {
    /// A2212-class outrunner, 1000 Kv.
    pub fn a2212_1000kv() -> Self {
        Self {
            rs_ohm: 0.5,
            ld_h: 0.001,
            lq_h: 0.001,
            pole_pairs: 4,
            kv_rpm_per_v: 1000.0,
            inertia_kg_m2: 0.01,
            friction_n_m_s: 1e-3,
        }
    }

    /// Check that the constants describe a physical machine.
    ///
    /// # Errors
    /// Returns error if `Ld`, `Lq`, `J`, `Kv` or `p` is zero or negative,
    /// if `Rs` or `B` is negative, or if anything is non-finite.
    pub fn validate(&self) -> MachineResult<()> {
        ensure_non_negative(self.rs_ohm, "stator resistance Rs")?;
        ensure_positive(self.ld_h, "d-axis inductance Ld")?;
        ensure_positive(self.lq_h, "q-axis inductance Lq")?;
        if self.pole_pairs == 0 {
            return Err(PmError::NonPositive {
                what: "pole-pair count p",
                value: 0.0,
            }
            .into());
        }
        ensure_positive(self.kv_rpm_per_v, "velocity constant Kv")?;
        ensure_positive(self.inertia_kg_m2, "rotor inertia J")?;
        ensure_non_negative(self.friction_n_m_s, "viscous friction B")?;
        Ok(())
    }
}

impl Default for MotorParameters {
    fn default() -> Self {
        Self::a2212_1000kv()
    }
}

/// Rectifier and battery constants.
///
/// Only `rectifier_efficiency` enters the dynamics. Voltage, capacity and
/// internal resistance are carried for reporting and do not affect the
/// current equations.
#[derive(Clone, Debug, PartialEq)]
pub struct BatteryParameters {
    /// Nominal voltage Vbatt (V)
    pub voltage_v: f64,
    /// Capacity Cbatt (Ah)
    pub capacity_ah: f64,
    /// Internal resistance Rbat_int (Ω)
    pub internal_resistance_ohm: f64,
    /// Rectifier efficiency η in (0, 1]
    pub rectifier_efficiency: f64,
}

impl BatteryParameters {
    /// Small 9 V pack behind a 90% efficient rectifier.
    pub fn nine_volt_pack() -> Self {
        Self {
            voltage_v: 9.0,
            capacity_ah: 2.0,
            internal_resistance_ohm: 0.05,
            rectifier_efficiency: 0.9,
        }
    }

    pub fn validate(&self) -> MachineResult<()> {
        ensure_finite(self.voltage_v, "battery voltage Vbatt")?;
        ensure_non_negative(self.capacity_ah, "battery capacity Cbatt")?;
        ensure_non_negative(self.internal_resistance_ohm, "battery resistance Rbat_int")?;
        let eta = ensure_positive(self.rectifier_efficiency, "rectifier efficiency")?;
        if eta > 1.0 {
            return Err(PmError::InvalidArg {
                what: "rectifier efficiency must not exceed 1",
            }
            .into());
        }
        Ok(())
    }
}

impl Default for BatteryParameters {
    fn default() -> Self {
        Self::nine_volt_pack()
    }
}

/// Validated, immutable parameter set closing the machine equations.
///
/// The back-EMF constant and flux linkage are derived once at construction:
///
/// ```text
/// Ke  = (1/Kv)·(2π/60)      V per rad/s
/// λ_m = Ke / (1.5·p)        Wb
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSet {
    motor: MotorParameters,
    battery: BatteryParameters,
    back_emf_constant: f64,
    flux_linkage: f64,
}

impl ParameterSet {
    /// Validate both parameter groups and derive the flux linkage.
    ///
    /// # Errors
    /// Returns error if either group fails validation.
    pub fn new(motor: MotorParameters, battery: BatteryParameters) -> MachineResult<Self> {
        motor.validate()?;
        battery.validate()?;

        let back_emf_constant = ke_from_kv(motor.kv_rpm_per_v);
        let flux_linkage = back_emf_constant / (1.5 * f64::from(motor.pole_pairs));

        Ok(Self {
            motor,
            battery,
            back_emf_constant,
            flux_linkage,
        })
    }

    /// Reference machine and battery of the bench experiment.
    pub fn reference() -> MachineResult<Self> {
        Self::new(MotorParameters::a2212_1000kv(), BatteryParameters::nine_volt_pack())
    }

    pub fn motor(&self) -> &MotorParameters {
        &self.motor
    }

    pub fn battery(&self) -> &BatteryParameters {
        &self.battery
    }

    /// Back-EMF constant Ke (V per rad/s).
    pub fn back_emf_constant(&self) -> f64 {
        self.back_emf_constant
    }

    /// Rotor flux linkage λ_m (Wb).
    pub fn flux_linkage(&self) -> f64 {
        self.flux_linkage
    }

    /// Torque per q-axis ampere, `1.5·p·λ_m` (N·m/A).
    pub fn torque_constant(&self) -> f64 {
        1.5 * f64::from(self.motor.pole_pairs) * self.flux_linkage
    }
}
