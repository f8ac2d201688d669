// pm-core/src/units.rs

use uom::si::f64::{
    AngularVelocity as UomAngularVelocity, ElectricCharge as UomElectricCharge,
    ElectricCurrent as UomElectricCurrent, Time as UomTime, Torque as UomTorque,
};

// Public canonical unit types (SI, f64)
pub type AngularVelocity = UomAngularVelocity;
pub type Charge = UomElectricCharge;
pub type Current = UomElectricCurrent;
pub type Time = UomTime;
pub type Torque = UomTorque;

#[inline]
pub fn rad_per_s(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::radian_per_second;
    AngularVelocity::new::<radian_per_second>(v)
}

#[inline]
pub fn rpm(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::revolution_per_minute;
    AngularVelocity::new::<revolution_per_minute>(v)
}

#[inline]
pub fn n_m(v: f64) -> Torque {
    use uom::si::torque::newton_meter;
    Torque::new::<newton_meter>(v)
}

#[inline]
pub fn amp(v: f64) -> Current {
    use uom::si::electric_current::ampere;
    Current::new::<ampere>(v)
}

#[inline]
pub fn coulomb(v: f64) -> Charge {
    use uom::si::electric_charge::coulomb;
    Charge::new::<coulomb>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// Mechanical speed in rad/s to revolutions per minute: `ω·60/(2π)`.
#[inline]
pub fn rad_s_to_rpm(omega_rad_s: f64) -> f64 {
    omega_rad_s * 60.0 / (2.0 * core::f64::consts::PI)
}

/// Speed reading in RPM.
#[inline]
pub fn as_rpm(w: AngularVelocity) -> f64 {
    use uom::si::angular_velocity::revolution_per_minute;
    w.get::<revolution_per_minute>()
}

/// Torque reading in N·m.
#[inline]
pub fn as_n_m(t: Torque) -> f64 {
    use uom::si::torque::newton_meter;
    t.get::<newton_meter>()
}

/// Current reading in amperes.
#[inline]
pub fn as_amps(i: Current) -> f64 {
    use uom::si::electric_current::ampere;
    i.get::<ampere>()
}

/// Time reading in seconds.
#[inline]
pub fn as_seconds(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

/// Charge reading in coulombs (A·s).
#[inline]
pub fn as_coulombs(q: Charge) -> f64 {
    use uom::si::electric_charge::coulomb;
    q.get::<coulomb>()
}

/// Charge reading in ampere-hours.
#[inline]
pub fn as_amp_hours(q: Charge) -> f64 {
    use uom::si::electric_charge::ampere_hour;
    q.get::<ampere_hour>()
}

pub mod constants {
    /// Seconds per minute, used by the RPM-based motor constants.
    pub const SECONDS_PER_MINUTE: f64 = 60.0;

    /// Back-EMF constant (V per rad/s) from a velocity constant in RPM/V.
    #[inline]
    pub fn ke_from_kv(kv_rpm_per_v: f64) -> f64 {
        (1.0 / kv_rpm_per_v) * (2.0 * core::f64::consts::PI / SECONDS_PER_MINUTE)
    }
}
