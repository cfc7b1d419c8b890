//! Translates a desired sample rate in Hz into the three device registers
//! (`srate`, `dec`, `deca`) that actually produce it.
//!
//! The device has no notion of "Hz"; it free-runs an internal 60 MHz/`srate`
//! tick, decimated twice (`dec`, then `deca`). The host must invert that
//! relationship and reject anything the device's register widths can't
//! represent.

use crate::error::Error;

const TICK_HZ: f64 = 60_000_000.0;
const SRATE_MIN: u32 = 375;
const SRATE_MAX: u32 = 65535;
const DEC_MAX: u32 = 512;
const DECA_MAX: u32 = 40000;

/// The three registers programmed by `SRATE`/`DEC`/`DECA` sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateParameters {
    pub srate: u32,
    pub dec: u32,
    pub deca: u32,
}

impl RateParameters {
    /// The rate, in Hz, these registers actually produce. Recovers the
    /// input to [`plan`], modulo the rounding `plan` performs.
    pub fn effective_hz(self) -> f64 {
        TICK_HZ / (self.srate as f64 * self.dec as f64 * self.deca as f64)
    }
}

/// A row in the fixed-point lookup table below: (requested Hz, dec, deca).
/// `srate` is derived from these two, not looked up, so the table only
/// needs to record the decimation factors the reference firmware expects
/// for each of its named rates.
const TABLE: &[(u32, u32, u32)] = &[
    (1, 512, 2),
    (10, 300, 2),
    (100, 10, 1),
    (250, 60, 1),
    (500, 30, 1),
    (750, 20, 1),
    (1000, 1, 1),
    (2500, 1, 1),
    (5000, 1, 1),
    (7500, 1, 1),
    (10000, 1, 1),
];

/// Plan `(srate, dec, deca)` for a desired sample rate in Hz.
///
/// Known rates use [`TABLE`]'s decimation factors directly; any other rate
/// falls back to `dec = deca = 1` and solves for `srate` alone, which is
/// exact for every multiple of 1000 up to 60 kHz and otherwise the nearest
/// achievable rate.
pub fn plan(rate_hz: u32) -> Result<RateParameters, Error> {
    if rate_hz == 0 {
        return Err(Error::Config("sample rate must be nonzero"));
    }

    let (dec, deca) = TABLE
        .iter()
        .find(|(hz, _, _)| *hz == rate_hz)
        .map(|(_, dec, deca)| (*dec, *deca))
        .unwrap_or((1, 1));

    let srate = (TICK_HZ / (rate_hz as f64 * dec as f64 * deca as f64)).round();
    if !(SRATE_MIN as f64..=SRATE_MAX as f64).contains(&srate) {
        return Err(Error::Config(
            "requested sample rate is outside the device's representable range",
        ));
    }
    if dec == 0 || dec > DEC_MAX || deca == 0 || deca > DECA_MAX {
        return Err(Error::Config("decimation factors out of range"));
    }

    Ok(RateParameters {
        srate: srate as u32,
        dec,
        deca,
    })
}
