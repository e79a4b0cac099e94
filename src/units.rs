//! Photometric unit conversions.
//!
//! Flux densities are in millijansky throughout, integrated fluxes in
//! erg s^-1 cm^-2, frequencies in Hz and wavelengths in Angstrom.

use std::f64::consts::LN_10;

/// AB magnitude zero-point in Jansky.
pub const AB_ZERO_POINT_JY: f64 = 3631.0;

/// Speed of light in cm/s.
pub const SPEED_OF_LIGHT_CGS: f64 = 2.997_924_58e10;

pub const EV_TO_ERG: f64 = 1.60218e-12;

const MJY_TO_CGS: f64 = 1.0e-26;
const JY_TO_MJY: f64 = 1.0e3;
const ANGSTROM_TO_CM: f64 = 1.0e-8;

/// AB magnitude to flux density in mJy.
pub fn flux_density_from_ab_mag(magnitude: f64) -> f64 {
    flux_density_from_mag(magnitude, AB_ZERO_POINT_JY)
}

/// Magnitude to flux density in mJy for an arbitrary zero-point given in Jy.
pub fn flux_density_from_mag(magnitude: f64, reference_flux_jy: f64) -> f64 {
    JY_TO_MJY * reference_flux_jy * 10f64.powf(-0.4 * magnitude)
}

/// Flux density in mJy to AB magnitude. Non-positive fluxes have no magnitude.
pub fn ab_mag_from_flux_density(flux_density_mjy: f64) -> Option<f64> {
    mag_from_flux_density(flux_density_mjy, AB_ZERO_POINT_JY)
}

pub fn mag_from_flux_density(flux_density_mjy: f64, reference_flux_jy: f64) -> Option<f64> {
    if flux_density_mjy <= 0.0 {
        return None;
    }
    Some(-2.5 * (flux_density_mjy / (JY_TO_MJY * reference_flux_jy)).log10())
}

/// First-order propagation of a magnitude error into a flux density error (mJy).
pub fn flux_density_error_from_mag(
    magnitude: f64,
    magnitude_error: f64,
    reference_flux_jy: f64,
) -> f64 {
    let prefactor = LN_10 / -2.5;
    let dfdm = JY_TO_MJY * prefactor * reference_flux_jy * (prefactor * magnitude).exp();
    (dfdm * magnitude_error).abs()
}

/// Inverse of [`flux_density_error_from_mag`].
pub fn mag_error_from_flux_density(flux_density_mjy: f64, flux_density_error_mjy: f64) -> f64 {
    (2.5 / LN_10 * flux_density_error_mjy / flux_density_mjy).abs()
}

/// nu * F_nu in erg s^-1 cm^-2.
pub fn flux_from_flux_density(flux_density_mjy: f64, frequency_hz: f64) -> f64 {
    flux_density_mjy * MJY_TO_CGS * frequency_hz
}

pub fn flux_density_from_flux(flux_cgs: f64, frequency_hz: f64) -> f64 {
    flux_cgs / (MJY_TO_CGS * frequency_hz)
}

pub fn frequency_from_wavelength(wavelength_angstrom: f64) -> f64 {
    SPEED_OF_LIGHT_CGS / (wavelength_angstrom * ANGSTROM_TO_CM)
}

pub fn wavelength_from_frequency(frequency_hz: f64) -> f64 {
    SPEED_OF_LIGHT_CGS / frequency_hz / ANGSTROM_TO_CM
}

pub fn kev_to_erg(energy_kev: f64) -> f64 {
    energy_kev * 1.0e3 * EV_TO_ERG
}
