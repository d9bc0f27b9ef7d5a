//! Unit codes for control values (IEEE 1722.1 clause 7.3.3).
//!
//! Every ranged value carries one of these codes. The code travels on the wire
//! in CONTROL descriptors; the suffix is what a human-facing adapter appends to
//! a printed value (`-12.5 dB`).

use std::fmt;

macro_rules! units_table {
    ($( $variant:ident = $code:literal => $suffix:literal ),+ $(,)?) => {
        /// A physical or audio unit, with its 1722.1 code as discriminant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(u8)]
        pub enum UnitsCode {
            #[default]
            $( $variant = $code ),+
        }

        impl UnitsCode {
            /// All defined unit codes, in code order.
            pub const ALL: &'static [UnitsCode] = &[ $( UnitsCode::$variant ),+ ];

            /// Look up a unit from its wire code.
            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $( $code => Some(UnitsCode::$variant), )+
                    _ => None,
                }
            }

            /// Suffix appended to values displayed with units.
            pub fn suffix(&self) -> &'static str {
                match self {
                    $( UnitsCode::$variant => $suffix, )+
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( UnitsCode::$variant => stringify!($variant), )+
                }
            }
        }
    };
}

units_table! {
    Unitless = 0x00 => "",
    Count = 0x01 => "",
    Percent = 0x02 => "%",
    FStop = 0x03 => "Fstop",
    TimeSeconds = 0x08 => "sec",
    TimeMinutes = 0x09 => "min",
    TimeHours = 0x0a => "hours",
    TimeDays = 0x0b => "days",
    TimeMonths = 0x0c => "months",
    TimeYears = 0x0d => "years",
    TimeSamples = 0x0e => "samples",
    TimeFrames = 0x0f => "frames",
    FrequencyHertz = 0x10 => "Hz",
    FrequencySemitones = 0x11 => "Semitones",
    FrequencyCents = 0x12 => "Cents",
    FrequencyOctaves = 0x13 => "Octaves",
    FrequencyFps = 0x14 => "frames/sec",
    DistanceMetres = 0x18 => "metres",
    TemperatureKelvin = 0x20 => "ºK",
    MassGrams = 0x28 => "g",
    VoltageVolts = 0x30 => "V",
    VoltageDbv = 0x31 => "dBV",
    VoltageDbu = 0x32 => "dbU",
    CurrentAmps = 0x38 => "A",
    PowerWatts = 0x40 => "W",
    PowerDbm = 0x41 => "dBM",
    PowerDbw = 0x42 => "dBW",
    PressurePascals = 0x48 => "Pa",
    MemoryBits = 0x50 => "bits",
    MemoryBytes = 0x51 => "Bytes",
    MemoryKibiBytes = 0x52 => "KiB",
    MemoryMebiBytes = 0x53 => "MiB",
    MemoryGibiBytes = 0x54 => "GiB",
    MemoryTebiBytes = 0x55 => "TiB",
    BandwidthBitsPerSec = 0x58 => "bps",
    BandwidthBytesPerSec = 0x59 => "Bps",
    BandwidthKibiBytesPerSec = 0x5a => "KiB/s",
    BandwidthMebiBytesPerSec = 0x5b => "MiB/s",
    BandwidthGibiBytesPerSec = 0x5c => "GiB/s",
    BandwidthTebiBytesPerSec = 0x5d => "TiB/s",
    LuminosityCandelas = 0x60 => "cd",
    EnergyJoules = 0x68 => "J",
    AngleRadians = 0x70 => "Rads",
    ForceNewtons = 0x78 => "Newtons",
    ResistanceOhms = 0x80 => "Ω",
    VelocityMetresPerSec = 0x88 => "m/s",
    VelocityRadiansPerSec = 0x89 => "rad/s",
    AccelerationMetresPerSecSquared = 0x90 => "m/s²",
    AccelerationRadiansPerSecSquared = 0x91 => "rad/s²",
    MagneticFluxTeslas = 0x98 => "T",
    AreaMetresSquared = 0xa0 => "m²",
    VolumeMetresCubed = 0xa8 => "m³",
    VolumeLitres = 0xa9 => "L",
    LevelDb = 0xb0 => "dB",
    LevelDbPeak = 0xb1 => "dB (Peak)",
    LevelDbRms = 0xb2 => "dB (RMS)",
    LevelDbFs = 0xb3 => "dBFS",
    LevelDbFsPeak = 0xb4 => "dBFS (Peak)",
    LevelDbFsRms = 0xb5 => "dBFS (RMS)",
    LevelDbTp = 0xb6 => "dBTP",
    LevelDbA = 0xb7 => "dB (A)",
    LevelDbB = 0xb8 => "dB (B)",
    LevelDbC = 0xb9 => "dB (C)",
    LevelDbSpl = 0xba => "dB (SPL)",
    LevelLu = 0xbb => "LU",
    LevelLufs = 0xbc => "LUFS",
}

impl UnitsCode {
    /// Wire code for this unit.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for UnitsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lookup() {
        assert_eq!(UnitsCode::from_code(0xb0), Some(UnitsCode::LevelDb));
        assert_eq!(UnitsCode::from_code(0x10), Some(UnitsCode::FrequencyHertz));
        assert_eq!(UnitsCode::from_code(0x04), None);
        assert_eq!(UnitsCode::from_code(0xff), None);
    }

    #[test]
    fn test_codes_roundtrip_through_table() {
        for unit in UnitsCode::ALL {
            assert_eq!(UnitsCode::from_code(unit.code()), Some(*unit));
        }
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(UnitsCode::Unitless.suffix(), "");
        assert_eq!(UnitsCode::LevelDbFsPeak.to_string(), "dBFS (Peak)");
        assert_eq!(UnitsCode::Percent.suffix(), "%");
        assert_eq!(UnitsCode::default(), UnitsCode::Unitless);
    }
}
