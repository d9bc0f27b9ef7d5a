//! Preset value declarations for common audio controls.

use crate::encoding::EncodingType;
use crate::ranged_value::{BoolValue, Eui64Value, Numeric, RangedValue, TextValue};
use crate::units::UnitsCode;

/// Gain in dB, -90.0 to +10.0 in 0.1 dB steps, carried as an `Int32` of tenths.
pub fn gain() -> RangedValue {
    numeric::<f32>("gain", UnitsCode::LevelDb, -900, 100, 0, 10, -1, EncodingType::Int32)
}

/// Peak meter in dBFS, -12.8 to 0.0, carried as an `Int8` of tenths.
pub fn vu_meter_dbfs_peak() -> RangedValue {
    numeric::<f32>("vu_meter_dbfs_peak", UnitsCode::LevelDbFsPeak, -128, 0, -128, 1, -1, EncodingType::Int8)
}

/// Mute flag, encoded as 0 or 1.
pub fn mute() -> RangedValue {
    BoolValue::new(UnitsCode::Unitless, 1, false, EncodingType::UInt8).into()
}

/// Polarity invert flag, encoded as 0 or 1.
pub fn polarity() -> RangedValue {
    BoolValue::new(UnitsCode::Unitless, 1, false, EncodingType::UInt8).into()
}

/// Generic boolean, encoded as 0 or 255.
pub fn flag(default: bool) -> RangedValue {
    BoolValue::new(UnitsCode::Unitless, 0xff, default, EncodingType::UInt8).into()
}

/// Free-form control string.
pub fn control_string(initial: &str) -> RangedValue {
    TextValue::new(EncodingType::String406, initial).into()
}

/// Descriptor name string.
pub fn descriptor_string(initial: &str) -> RangedValue {
    TextValue::new(EncodingType::String64, initial).into()
}

pub fn eui64(value: u64) -> RangedValue {
    Eui64Value::new(value).into()
}

// Preset bounds are constants checked by the tests below.
#[allow(clippy::too_many_arguments)]
fn numeric<T>(
    preset: &str,
    units: UnitsCode,
    min: i64,
    max: i64,
    default: i64,
    step: i64,
    power: i8,
    encoding: EncodingType,
) -> RangedValue
where
    T: crate::ranged_value::Primitive,
    Numeric<T>: Into<RangedValue>,
{
    Numeric::<T>::new(units, min, max, default, step, power, encoding)
        .map(Into::into)
        .unwrap_or_else(|e| panic!("invalid {} preset: {}", preset, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodedValue;
    use crate::ranged_value::Value;

    #[test]
    fn test_gain_preset() {
        let g = gain();
        assert_eq!(g.value_string(true), "0 dB");
        assert_eq!(g.minimum_string(true), "-90 dB");
        assert_eq!(g.maximum_string(true), "10 dB");
        assert_eq!(g.encoding_type(), EncodingType::Int32);
        assert_eq!(g.storage_type(), EncodingType::Float);
    }

    #[test]
    fn test_meter_preset() {
        let mut m = vu_meter_dbfs_peak();
        assert_eq!(m.encoded().unwrap(), EncodedValue::Int8(-128));
        m.set_value(-3.2, false).unwrap();
        assert_eq!(m.encoded().unwrap(), EncodedValue::Int8(-32));
        assert_eq!(m.units_suffix(), "dBFS (Peak)");
    }

    #[test]
    fn test_flag_presets() {
        let mut mute = mute();
        assert_eq!(mute.value(), Value::Bool(false));
        mute.set_value(true, false).unwrap();
        assert_eq!(mute.encoded().unwrap(), EncodedValue::UInt8(1));

        let f = flag(true);
        assert_eq!(f.encoded().unwrap(), EncodedValue::UInt8(0xff));
        assert_eq!(polarity().encoded_maximum().unwrap(), EncodedValue::UInt8(1));
    }

    #[test]
    #[should_panic(expected = "invalid trim preset")]
    fn test_bad_preset_names_itself() {
        numeric::<f32>("trim", UnitsCode::LevelDb, 0, 10, 20, 1, -1, EncodingType::Int16);
    }

    #[test]
    fn test_string_presets() {
        assert_eq!(control_string("x").encoding_type(), EncodingType::String406);
        assert_eq!(descriptor_string("Main").value_string(false), "Main");
        assert_eq!(eui64(0x0102).value_string(false), "0000000000000102");
    }
}
