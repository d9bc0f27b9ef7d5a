//! Ranged, unit-aware, fixed-point encodable control values.
//!
//! A control's state is a [`RangedValue`]: a closed sum over the storage kinds
//! a device can expose. Every arm shares one uniform surface, so the schema and
//! the notification engine never need to know which concrete kind they hold.
//!
//! - **Numeric** arms (`i8`..`u64`, `f32`, `f64`) carry minimum, maximum,
//!   default and step as *encoded* integers plus a power of ten relating the
//!   wire integer to the application value.
//! - **Bool** holds a flag whose encoded form is the minimum (false) or the
//!   maximum (true).
//! - **Text** holds a string bounded by a fixed wire capacity.
//! - **Eui64** holds a 64 bit identifier.
//!
//! Application values cross the surface as [`Value`]. Wire values cross it as
//! [`EncodedValue`].
//!
//! ```
//! use controlplane::values;
//!
//! let mut gain = values::gain();
//! assert!(gain.set_value(-12.5, false).unwrap());
//! assert_eq!(gain.value_string(true), "-12.5 dB");
//! assert_eq!(gain.encoded().unwrap().to_string(), "-125");
//! ```

use std::fmt;

use crate::encoding::{EncodedValue, EncodingType};
use crate::error::ValueError;
use crate::units::UnitsCode;

/// Largest supported multiplier power magnitude.
pub const MAX_MULTIPLIER_POWER: i8 = 18;

/// An application-level value, independent of any control's storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Result<f64, ValueError> {
        match self {
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int(v) => Ok(*v as f64),
            Value::UInt(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            Value::Text(s) => s.trim().parse::<f64>().map_err(|_| ValueError::Parse {
                input: s.clone(),
                expected: "number",
            }),
        }
    }

    pub fn as_i64(&self) -> Result<i64, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b as i64),
            Value::Int(v) => Ok(*v),
            Value::UInt(v) => Ok((*v).min(i64::MAX as u64) as i64),
            Value::Float(v) => Ok(v.trunc() as i64),
            Value::Text(s) => match s.trim().parse::<i64>() {
                Ok(v) => Ok(v),
                Err(_) => Value::Float(self.as_f64()?).as_i64(),
            },
        }
    }

    pub fn as_u64(&self) -> Result<u64, ValueError> {
        match self {
            Value::UInt(v) => Ok(*v),
            Value::Text(s) => match s.trim().parse::<u64>() {
                Ok(v) => Ok(v),
                Err(_) => Ok(self.as_i64()?.max(0) as u64),
            },
            _ => Ok(self.as_i64()?.max(0) as u64),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Text(s) => match s.trim() {
                "true" | "on" => Ok(true),
                "false" | "off" => Ok(false),
                _ => Ok(self.as_f64()? != 0.0),
            },
            _ => Ok(self.as_f64()? != 0.0),
        }
    }

    /// Parse into the widest representation of a numeric storage kind.
    fn to_wide(&self, integer_storage: bool) -> Result<Wide, ValueError> {
        match self {
            Value::Bool(b) => Ok(Wide::Int(*b as i128)),
            Value::Int(v) => Ok(Wide::Int(*v as i128)),
            Value::UInt(v) => Ok(Wide::Int(*v as i128)),
            Value::Float(v) => Ok(Wide::Float(*v)),
            Value::Text(s) => {
                let trimmed = s.trim();
                if integer_storage {
                    if let Ok(v) = trimmed.parse::<i128>() {
                        return Ok(Wide::Int(v));
                    }
                }
                trimmed
                    .parse::<f64>()
                    .map(Wide::Float)
                    .map_err(|_| ValueError::Parse {
                        input: s.clone(),
                        expected: "number",
                    })
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )+
    };
}

value_from!(Int as i64: i8, i16, i32, i64);
value_from!(UInt as u64: u8, u16, u32, u64);
value_from!(Float as f64: f32, f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Intermediate used for range checks: exact for integers, f64 otherwise.
#[derive(Debug, Clone, Copy)]
enum Wide {
    Int(i128),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Below,
    Within,
    Above,
}

fn pow10(exp: u32) -> i128 {
    10i128.checked_pow(exp).unwrap_or(i128::MAX)
}

/// A primitive numeric storage type.
pub trait Primitive:
    Copy + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const STORAGE: EncodingType;
    const IS_FLOAT: bool;

    fn to_f64(self) -> f64;
    /// Exact integer value, `None` for float storage.
    fn to_i128(self) -> Option<i128>;
    fn saturating_from_i128(v: i128) -> Self;
    fn saturating_from_f64(v: f64) -> Self;
}

macro_rules! primitive_int {
    ($($t:ty => $storage:ident),+) => {
        $(
            impl Primitive for $t {
                const STORAGE: EncodingType = EncodingType::$storage;
                const IS_FLOAT: bool = false;

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn to_i128(self) -> Option<i128> {
                    Some(self as i128)
                }

                fn saturating_from_i128(v: i128) -> Self {
                    v.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t
                }

                fn saturating_from_f64(v: f64) -> Self {
                    // `as` saturates and maps NaN to zero
                    v.trunc() as $t
                }
            }
        )+
    };
}

primitive_int!(
    i8 => Int8, u8 => UInt8, i16 => Int16, u16 => UInt16,
    i32 => Int32, u32 => UInt32, i64 => Int64, u64 => UInt64
);

impl Primitive for f32 {
    const STORAGE: EncodingType = EncodingType::Float;
    const IS_FLOAT: bool = true;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn to_i128(self) -> Option<i128> {
        None
    }

    fn saturating_from_i128(v: i128) -> Self {
        v as f32
    }

    fn saturating_from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Primitive for f64 {
    const STORAGE: EncodingType = EncodingType::Double;
    const IS_FLOAT: bool = true;

    fn to_f64(self) -> f64 {
        self
    }

    fn to_i128(self) -> Option<i128> {
        None
    }

    fn saturating_from_i128(v: i128) -> Self {
        v as f64
    }

    fn saturating_from_f64(v: f64) -> Self {
        v
    }
}

/// Behavior shared by every arm of [`RangedValue`].
trait ValueOps {
    fn units(&self) -> UnitsCode;
    fn storage_type(&self) -> EncodingType;
    fn encoding_type(&self) -> EncodingType;
    fn set_value(&mut self, v: &Value, force: bool) -> Result<bool, ValueError>;
    fn set_value_with_clamp(&mut self, v: &Value) -> Result<bool, ValueError>;
    fn inc_value(&mut self) -> bool;
    fn dec_value(&mut self) -> bool;
    fn reset(&mut self) -> bool;
    fn value(&self) -> Value;
    fn value_string(&self) -> String;
    fn minimum_string(&self) -> String;
    fn maximum_string(&self) -> String;
    fn default_string(&self) -> String;
    fn step_string(&self) -> String;
    fn encoded(&self) -> Result<EncodedValue, ValueError>;
    fn encoded_minimum(&self) -> Result<EncodedValue, ValueError>;
    fn encoded_maximum(&self) -> Result<EncodedValue, ValueError>;
    fn encoded_default(&self) -> Result<EncodedValue, ValueError>;
    fn set_from_encoded(&mut self, e: &EncodedValue, force: bool) -> Result<bool, ValueError>;
    fn set_from_encoded_with_clamp(&mut self, e: &EncodedValue) -> Result<bool, ValueError>;
}

/// A numeric control stored as `T`.
///
/// Bounds are declared as encoded integers; the application value is
/// `encoded * 10^power`. With power `-1` an `Int32` wire value of `-900`
/// is the application value `-90.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Numeric<T: Primitive> {
    units: UnitsCode,
    encoding: EncodingType,
    power: i8,
    encoded_min: i64,
    encoded_max: i64,
    encoded_default: i64,
    encoded_step: i64,
    min: T,
    max: T,
    default: T,
    step: T,
    value: T,
}

impl<T: Primitive> Numeric<T> {
    /// Declare a numeric control. The value starts at the decoded default.
    pub fn new(
        units: UnitsCode,
        min: i64,
        max: i64,
        default: i64,
        step: i64,
        power: i8,
        encoding: EncodingType,
    ) -> Result<Self, ValueError> {
        if !(min <= default && default <= max) {
            return Err(ValueError::InvalidRange(format!(
                "expected min <= default <= max, got {} <= {} <= {}",
                min, default, max
            )));
        }
        if power.abs() > MAX_MULTIPLIER_POWER {
            return Err(ValueError::InvalidRange(format!(
                "multiplier power {} out of range",
                power
            )));
        }
        if encoding.is_string() {
            return Err(ValueError::InvalidType("numeric value with string encoding"));
        }

        let decode = |encoded: i64| {
            let decoded = decode_wide::<T>(Wide::Int(encoded as i128), power);
            to_storage::<T>(decoded).ok_or_else(|| {
                ValueError::InvalidRange(format!(
                    "{} does not fit {} storage",
                    encoded,
                    T::STORAGE
                ))
            })
        };

        let default_value = decode(default)?;
        Ok(Self {
            units,
            encoding,
            power,
            encoded_min: min,
            encoded_max: max,
            encoded_default: default,
            encoded_step: step,
            min: decode(min)?,
            max: decode(max)?,
            default: default_value,
            step: decode(step)?,
            value: default_value,
        })
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn minimum(&self) -> T {
        self.min
    }

    pub fn maximum(&self) -> T {
        self.max
    }

    pub fn default_value(&self) -> T {
        self.default
    }

    pub fn step(&self) -> T {
        self.step
    }

    pub fn multiplier_power(&self) -> i8 {
        self.power
    }

    /// Declared bounds as encoded integers: (min, max, default, step).
    pub fn encoded_bounds(&self) -> (i64, i64, i64, i64) {
        (
            self.encoded_min,
            self.encoded_max,
            self.encoded_default,
            self.encoded_step,
        )
    }

    fn place(&self, wide: Wide) -> Result<(Bound, T), ValueError> {
        match (wide, self.min.to_i128(), self.max.to_i128()) {
            (Wide::Int(v), Some(lo), Some(hi)) => Ok((bound_of(v, lo, hi), T::saturating_from_i128(v))),
            (Wide::Float(v), Some(lo), Some(hi)) => {
                check_nan(v)?;
                let v = v.trunc();
                let bound = if v < lo as f64 {
                    Bound::Below
                } else if v > hi as f64 {
                    Bound::Above
                } else {
                    Bound::Within
                };
                Ok((bound, T::saturating_from_f64(v)))
            }
            (wide, _, _) => {
                let v = match wide {
                    Wide::Int(v) => v as f64,
                    Wide::Float(v) => v,
                };
                check_nan(v)?;
                let bound = if v < self.min.to_f64() {
                    Bound::Below
                } else if v > self.max.to_f64() {
                    Bound::Above
                } else {
                    Bound::Within
                };
                Ok((bound, T::saturating_from_f64(v)))
            }
        }
    }

    fn store(&mut self, v: T) -> bool {
        if v != self.value {
            self.value = v;
            true
        } else {
            false
        }
    }

    fn set_wide(&mut self, wide: Wide, force: bool) -> Result<bool, ValueError> {
        let (bound, v) = self.place(wide)?;
        match bound {
            Bound::Below if !force => Err(ValueError::TooSmall {
                value: wide_string(wide),
                minimum: self.min.to_string(),
            }),
            Bound::Above if !force => Err(ValueError::TooLarge {
                value: wide_string(wide),
                maximum: self.max.to_string(),
            }),
            _ => Ok(self.store(v)),
        }
    }

    fn clamp_wide(&mut self, wide: Wide) -> Result<bool, ValueError> {
        let (bound, v) = self.place(wide)?;
        let v = match bound {
            Bound::Below => self.min,
            Bound::Above => self.max,
            Bound::Within => v,
        };
        Ok(self.store(v))
    }

    fn wide_from_value(&self, v: &Value) -> Result<Wide, ValueError> {
        match v {
            // a flag selects an end of the range
            Value::Bool(b) => Ok(wide_of(if *b { self.max } else { self.min })),
            other => other.to_wide(!T::IS_FLOAT),
        }
    }

    fn stepped(&self, up: bool) -> Wide {
        match (self.value.to_i128(), self.step.to_i128()) {
            (Some(v), Some(s)) => Wide::Int(if up { v.saturating_add(s) } else { v.saturating_sub(s) }),
            _ => {
                let (v, s) = (self.value.to_f64(), self.step.to_f64());
                Wide::Float(if up { v + s } else { v - s })
            }
        }
    }

    fn scaled_float(&self, v: T) -> f64 {
        let f = v.to_f64();
        if self.power <= 0 {
            f * 10f64.powi(-(self.power as i32))
        } else {
            f / 10f64.powi(self.power as i32)
        }
    }

    fn scaled_integer(&self, v: T) -> i128 {
        match v.to_i128() {
            Some(i) if self.power <= 0 => i.saturating_mul(pow10((-self.power) as u32)),
            Some(i) => i / pow10(self.power as u32),
            // float storage onto an integer wire rounds first
            None => self.scaled_float(v).round() as i128,
        }
    }

    fn check_encoding_domain(&self) -> Result<(), ValueError> {
        if let Some((lo, hi)) = self.encoding.numeric_bounds() {
            let scaled = |v: T| {
                let f = self.scaled_float(v);
                if self.encoding.is_integer() {
                    f.round()
                } else {
                    f
                }
            };
            if scaled(self.max) > hi {
                return Err(ValueError::MaxTooLargeForEncoding {
                    maximum: self.max.to_string(),
                    encoding: self.encoding,
                });
            }
            if scaled(self.min) < lo {
                return Err(ValueError::MinTooSmallForEncoding {
                    minimum: self.min.to_string(),
                    encoding: self.encoding,
                });
            }
        }
        Ok(())
    }

    fn encode(&self, v: T) -> Result<EncodedValue, ValueError> {
        self.check_encoding_domain()?;
        match self.encoding {
            EncodingType::Float => Ok(EncodedValue::Float(self.scaled_float(v) as f32)),
            EncodingType::Double => Ok(EncodedValue::Double(self.scaled_float(v))),
            EncodingType::String406 | EncodingType::String64 => Ok(EncodedValue::Text(v.to_string())),
            encoding => {
                let scaled = self.scaled_integer(v);
                EncodedValue::from_integer(encoding, scaled).ok_or_else(|| {
                    // only reachable for values forced outside the declared range
                    if scaled < 0 {
                        ValueError::MinTooSmallForEncoding {
                            minimum: v.to_string(),
                            encoding,
                        }
                    } else {
                        ValueError::MaxTooLargeForEncoding {
                            maximum: v.to_string(),
                            encoding,
                        }
                    }
                })
            }
        }
    }

    fn wide_from_encoded(&self, e: &EncodedValue) -> Result<Wide, ValueError> {
        match e {
            EncodedValue::Text(s) => Value::Text(s.clone()).to_wide(!T::IS_FLOAT),
            other => match other.as_i128() {
                Some(i) => Ok(decode_wide::<T>(Wide::Int(i), self.power)),
                None => {
                    let f = other.as_f64().unwrap_or(f64::NAN);
                    Ok(decode_wide::<T>(Wide::Float(f), self.power))
                }
            },
        }
    }
}

impl<T: Primitive> ValueOps for Numeric<T> {
    fn units(&self) -> UnitsCode {
        self.units
    }

    fn storage_type(&self) -> EncodingType {
        T::STORAGE
    }

    fn encoding_type(&self) -> EncodingType {
        self.encoding
    }

    fn set_value(&mut self, v: &Value, force: bool) -> Result<bool, ValueError> {
        let wide = self.wide_from_value(v)?;
        self.set_wide(wide, force)
    }

    fn set_value_with_clamp(&mut self, v: &Value) -> Result<bool, ValueError> {
        let wide = self.wide_from_value(v)?;
        self.clamp_wide(wide)
    }

    fn inc_value(&mut self) -> bool {
        let next = self.stepped(true);
        self.clamp_wide(next).unwrap_or(false)
    }

    fn dec_value(&mut self) -> bool {
        let next = self.stepped(false);
        self.clamp_wide(next).unwrap_or(false)
    }

    fn reset(&mut self) -> bool {
        self.store(self.default)
    }

    fn value(&self) -> Value {
        match self.value.to_i128() {
            Some(i) if i < 0 => Value::Int(i as i64),
            Some(i) => i64::try_from(i)
                .map(Value::Int)
                .unwrap_or(Value::UInt(i as u64)),
            None => Value::Float(self.value.to_f64()),
        }
    }

    fn value_string(&self) -> String {
        self.value.to_string()
    }

    fn minimum_string(&self) -> String {
        self.min.to_string()
    }

    fn maximum_string(&self) -> String {
        self.max.to_string()
    }

    fn default_string(&self) -> String {
        self.default.to_string()
    }

    fn step_string(&self) -> String {
        self.step.to_string()
    }

    fn encoded(&self) -> Result<EncodedValue, ValueError> {
        self.encode(self.value)
    }

    fn encoded_minimum(&self) -> Result<EncodedValue, ValueError> {
        self.encode(self.min)
    }

    fn encoded_maximum(&self) -> Result<EncodedValue, ValueError> {
        self.encode(self.max)
    }

    fn encoded_default(&self) -> Result<EncodedValue, ValueError> {
        self.encode(self.default)
    }

    fn set_from_encoded(&mut self, e: &EncodedValue, force: bool) -> Result<bool, ValueError> {
        let wide = self.wide_from_encoded(e)?;
        self.set_wide(wide, force)
    }

    fn set_from_encoded_with_clamp(&mut self, e: &EncodedValue) -> Result<bool, ValueError> {
        let wide = self.wide_from_encoded(e)?;
        self.clamp_wide(wide)
    }
}

fn bound_of(v: i128, lo: i128, hi: i128) -> Bound {
    if v < lo {
        Bound::Below
    } else if v > hi {
        Bound::Above
    } else {
        Bound::Within
    }
}

fn check_nan(v: f64) -> Result<(), ValueError> {
    if v.is_nan() {
        Err(ValueError::Parse {
            input: "NaN".to_string(),
            expected: "number",
        })
    } else {
        Ok(())
    }
}

fn wide_of<T: Primitive>(v: T) -> Wide {
    match v.to_i128() {
        Some(i) => Wide::Int(i),
        None => Wide::Float(v.to_f64()),
    }
}

fn wide_string(w: Wide) -> String {
    match w {
        Wide::Int(v) => v.to_string(),
        Wide::Float(v) => v.to_string(),
    }
}

/// Apply `10^power` to a wire value, exactly for integer storage.
fn decode_wide<T: Primitive>(encoded: Wide, power: i8) -> Wide {
    match encoded {
        Wide::Int(i) if !T::IS_FLOAT => {
            if power >= 0 {
                Wide::Int(i.saturating_mul(pow10(power as u32)))
            } else {
                Wide::Int(i / pow10((-power) as u32))
            }
        }
        Wide::Int(i) => Wide::Float(scale_f64(i as f64, power)),
        Wide::Float(f) => Wide::Float(scale_f64(f, power)),
    }
}

fn scale_f64(f: f64, power: i8) -> f64 {
    if power >= 0 {
        f * 10f64.powi(power as i32)
    } else {
        f / 10f64.powi(-(power as i32))
    }
}

fn to_storage<T: Primitive>(w: Wide) -> Option<T> {
    match w {
        Wide::Int(i) => {
            let v = T::saturating_from_i128(i);
            match v.to_i128() {
                Some(back) if back != i => None,
                _ => Some(v),
            }
        }
        Wide::Float(f) if f.is_finite() => Some(T::saturating_from_f64(f)),
        Wide::Float(_) => None,
    }
}

/// A boolean control. False encodes as the minimum, true as the maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolValue {
    units: UnitsCode,
    encoding: EncodingType,
    encoded_false: i64,
    encoded_true: i64,
    default: bool,
    value: bool,
}

impl BoolValue {
    /// A flag whose encoded true value is `encoded_true` (false is 0).
    pub fn new(units: UnitsCode, encoded_true: i64, default: bool, encoding: EncodingType) -> Self {
        Self {
            units,
            encoding,
            encoded_false: 0,
            encoded_true,
            default,
            value: default,
        }
    }

    pub fn get(&self) -> bool {
        self.value
    }

    fn store(&mut self, v: bool) -> bool {
        let changed = self.value != v;
        self.value = v;
        changed
    }

    fn endpoint_error(&self, value: String) -> ValueError {
        ValueError::NotAnEndpoint {
            value,
            minimum: self.encoded_false.to_string(),
            maximum: self.encoded_true.to_string(),
        }
    }

    fn from_integer(&self, v: i128, force: bool) -> Result<bool, ValueError> {
        if v == self.encoded_false as i128 {
            Ok(false)
        } else if v == self.encoded_true as i128 {
            Ok(true)
        } else if force {
            Ok(v != 0)
        } else {
            Err(self.endpoint_error(v.to_string()))
        }
    }

    fn flag_from_value(&self, v: &Value, force: bool) -> Result<bool, ValueError> {
        match v {
            Value::Bool(b) => Ok(*b),
            // the unencoded true value is 1 regardless of the wire form
            Value::Int(1) | Value::UInt(1) => Ok(true),
            Value::Text(s) => match s.trim() {
                "true" | "on" => Ok(true),
                "false" | "off" => Ok(false),
                _ => match v.to_wide(true)? {
                    Wide::Int(i) => self.from_integer(i, force),
                    Wide::Float(f) => self.from_float(f, force),
                },
            },
            Value::Float(f) => self.from_float(*f, force),
            other => self.from_integer(other.as_i64()? as i128, force),
        }
    }

    fn from_float(&self, f: f64, force: bool) -> Result<bool, ValueError> {
        check_nan(f)?;
        if f == 1.0 {
            return Ok(true);
        }
        if f.fract() == 0.0 {
            return self.from_integer(f as i128, force);
        }
        if force {
            Ok(f != 0.0)
        } else {
            Err(self.endpoint_error(f.to_string()))
        }
    }

    fn nearest(&self, v: f64) -> bool {
        let lo = self.encoded_false as f64;
        let hi = self.encoded_true as f64;
        (v - lo).abs() > (hi - v).abs()
    }

    fn encode_flag(&self, v: bool) -> Result<EncodedValue, ValueError> {
        let raw = if v { self.encoded_true } else { self.encoded_false };
        match self.encoding {
            EncodingType::Float => Ok(EncodedValue::Float(raw as f32)),
            EncodingType::Double => Ok(EncodedValue::Double(raw as f64)),
            EncodingType::String406 | EncodingType::String64 => Ok(EncodedValue::Text(flag_string(v))),
            // 0xff on a signed byte is -1
            EncodingType::Int8 => Ok(EncodedValue::Int8(raw as i8)),
            encoding => EncodedValue::from_integer(encoding, raw as i128).ok_or_else(|| {
                ValueError::MaxTooLargeForEncoding {
                    maximum: raw.to_string(),
                    encoding,
                }
            }),
        }
    }
}

fn flag_string(v: bool) -> String {
    if v { "true" } else { "false" }.to_string()
}

impl ValueOps for BoolValue {
    fn units(&self) -> UnitsCode {
        self.units
    }

    fn storage_type(&self) -> EncodingType {
        EncodingType::UInt8
    }

    fn encoding_type(&self) -> EncodingType {
        self.encoding
    }

    fn set_value(&mut self, v: &Value, force: bool) -> Result<bool, ValueError> {
        let flag = self.flag_from_value(v, force)?;
        Ok(self.store(flag))
    }

    fn set_value_with_clamp(&mut self, v: &Value) -> Result<bool, ValueError> {
        let flag = match self.flag_from_value(v, false) {
            Ok(flag) => flag,
            Err(ValueError::NotAnEndpoint { .. }) => self.nearest(v.as_f64()?),
            Err(e) => return Err(e),
        };
        Ok(self.store(flag))
    }

    fn inc_value(&mut self) -> bool {
        self.store(true)
    }

    fn dec_value(&mut self) -> bool {
        self.store(false)
    }

    fn reset(&mut self) -> bool {
        self.store(self.default)
    }

    fn value(&self) -> Value {
        Value::Bool(self.value)
    }

    fn value_string(&self) -> String {
        flag_string(self.value)
    }

    fn minimum_string(&self) -> String {
        flag_string(false)
    }

    fn maximum_string(&self) -> String {
        flag_string(true)
    }

    fn default_string(&self) -> String {
        flag_string(self.default)
    }

    fn step_string(&self) -> String {
        self.encoded_true.to_string()
    }

    fn encoded(&self) -> Result<EncodedValue, ValueError> {
        self.encode_flag(self.value)
    }

    fn encoded_minimum(&self) -> Result<EncodedValue, ValueError> {
        self.encode_flag(false)
    }

    fn encoded_maximum(&self) -> Result<EncodedValue, ValueError> {
        self.encode_flag(true)
    }

    fn encoded_default(&self) -> Result<EncodedValue, ValueError> {
        self.encode_flag(self.default)
    }

    fn set_from_encoded(&mut self, e: &EncodedValue, force: bool) -> Result<bool, ValueError> {
        let flag = match e {
            EncodedValue::Text(s) => self.flag_from_value(&Value::Text(s.clone()), force)?,
            // a signed byte carries true as -1
            EncodedValue::Int8(-1) if self.encoded_true == 0xff => true,
            other => match other.as_i128() {
                Some(i) => self.from_integer(i, force)?,
                None => self.from_float(other.as_f64().unwrap_or(f64::NAN), force)?,
            },
        };
        Ok(self.store(flag))
    }

    fn set_from_encoded_with_clamp(&mut self, e: &EncodedValue) -> Result<bool, ValueError> {
        match self.set_from_encoded(e, false) {
            Err(ValueError::NotAnEndpoint { .. }) => {
                let flag = self.nearest(e.as_f64().unwrap_or(0.0));
                Ok(self.store(flag))
            }
            other => other,
        }
    }
}

/// A string control bounded by a fixed wire capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct TextValue {
    encoding: EncodingType,
    value: String,
}

impl TextValue {
    /// `encoding` must be one of the string encodings; anything else is
    /// treated as the 64 byte name string.
    pub fn new(encoding: EncodingType, initial: impl Into<String>) -> Self {
        let encoding = if encoding.is_string() {
            encoding
        } else {
            EncodingType::String64
        };
        let mut value: String = initial.into();
        truncate_at_boundary(&mut value, encoding.max_string_len().unwrap_or(64));
        Self { encoding, value }
    }

    pub fn get(&self) -> &str {
        &self.value
    }

    pub fn capacity(&self) -> usize {
        self.encoding.max_string_len().unwrap_or(64)
    }

    fn store(&mut self, v: String) -> bool {
        if v != self.value {
            self.value = v;
            true
        } else {
            false
        }
    }

    fn text_of(v: &Value) -> String {
        v.to_string()
    }
}

fn truncate_at_boundary(s: &mut String, max: usize) {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
}

impl ValueOps for TextValue {
    fn units(&self) -> UnitsCode {
        UnitsCode::Unitless
    }

    fn storage_type(&self) -> EncodingType {
        self.encoding
    }

    fn encoding_type(&self) -> EncodingType {
        self.encoding
    }

    fn set_value(&mut self, v: &Value, force: bool) -> Result<bool, ValueError> {
        let mut text = Self::text_of(v);
        if text.len() > self.capacity() {
            if !force {
                return Err(ValueError::TooLong {
                    len: text.len(),
                    capacity: self.capacity(),
                    encoding: self.encoding,
                });
            }
            truncate_at_boundary(&mut text, self.capacity());
        }
        Ok(self.store(text))
    }

    fn set_value_with_clamp(&mut self, v: &Value) -> Result<bool, ValueError> {
        self.set_value(v, true)
    }

    fn inc_value(&mut self) -> bool {
        false
    }

    fn dec_value(&mut self) -> bool {
        false
    }

    fn reset(&mut self) -> bool {
        self.store(String::new())
    }

    fn value(&self) -> Value {
        Value::Text(self.value.clone())
    }

    fn value_string(&self) -> String {
        self.value.clone()
    }

    fn minimum_string(&self) -> String {
        String::new()
    }

    fn maximum_string(&self) -> String {
        String::new()
    }

    fn default_string(&self) -> String {
        String::new()
    }

    fn step_string(&self) -> String {
        String::new()
    }

    fn encoded(&self) -> Result<EncodedValue, ValueError> {
        Ok(EncodedValue::Text(self.value.clone()))
    }

    fn encoded_minimum(&self) -> Result<EncodedValue, ValueError> {
        Ok(EncodedValue::Text(String::new()))
    }

    fn encoded_maximum(&self) -> Result<EncodedValue, ValueError> {
        Ok(EncodedValue::Text(String::new()))
    }

    fn encoded_default(&self) -> Result<EncodedValue, ValueError> {
        Ok(EncodedValue::Text(String::new()))
    }

    fn set_from_encoded(&mut self, e: &EncodedValue, force: bool) -> Result<bool, ValueError> {
        match e {
            EncodedValue::Text(s) => self.set_value(&Value::Text(s.clone()), force),
            _ => Err(ValueError::InvalidType("string value")),
        }
    }

    fn set_from_encoded_with_clamp(&mut self, e: &EncodedValue) -> Result<bool, ValueError> {
        self.set_from_encoded(e, true)
    }
}

/// A 64 bit extended unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Eui64Value {
    value: u64,
}

impl Eui64Value {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    /// Parse hex, optionally prefixed with `0x` or grouped with `:` or `-`.
    pub fn parse(s: &str) -> Result<u64, ValueError> {
        let trimmed = s.trim();
        let digits: String = trimmed
            .strip_prefix("0x")
            .unwrap_or(trimmed)
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if digits.is_empty() || digits.len() > 16 {
            return Err(ValueError::Parse {
                input: s.to_string(),
                expected: "EUI-64",
            });
        }
        u64::from_str_radix(&digits, 16).map_err(|_| ValueError::Parse {
            input: s.to_string(),
            expected: "EUI-64",
        })
    }

    fn store(&mut self, v: u64) -> bool {
        let changed = self.value != v;
        self.value = v;
        changed
    }

    fn from_value(v: &Value) -> Result<u64, ValueError> {
        match v {
            Value::UInt(u) => Ok(*u),
            Value::Int(i) if *i >= 0 => Ok(*i as u64),
            Value::Text(s) => Self::parse(s),
            _ => Err(ValueError::InvalidType("EUI64")),
        }
    }
}

impl ValueOps for Eui64Value {
    fn units(&self) -> UnitsCode {
        UnitsCode::Unitless
    }

    fn storage_type(&self) -> EncodingType {
        EncodingType::UInt64
    }

    fn encoding_type(&self) -> EncodingType {
        EncodingType::UInt64
    }

    fn set_value(&mut self, v: &Value, _force: bool) -> Result<bool, ValueError> {
        let v = Self::from_value(v)?;
        Ok(self.store(v))
    }

    fn set_value_with_clamp(&mut self, v: &Value) -> Result<bool, ValueError> {
        self.set_value(v, false)
    }

    fn inc_value(&mut self) -> bool {
        false
    }

    fn dec_value(&mut self) -> bool {
        false
    }

    fn reset(&mut self) -> bool {
        self.store(0)
    }

    fn value(&self) -> Value {
        Value::UInt(self.value)
    }

    fn value_string(&self) -> String {
        format!("{:016x}", self.value)
    }

    fn minimum_string(&self) -> String {
        String::new()
    }

    fn maximum_string(&self) -> String {
        String::new()
    }

    fn default_string(&self) -> String {
        String::new()
    }

    fn step_string(&self) -> String {
        String::new()
    }

    fn encoded(&self) -> Result<EncodedValue, ValueError> {
        Ok(EncodedValue::UInt64(self.value))
    }

    fn encoded_minimum(&self) -> Result<EncodedValue, ValueError> {
        Err(ValueError::InvalidType("EUI64"))
    }

    fn encoded_maximum(&self) -> Result<EncodedValue, ValueError> {
        Err(ValueError::InvalidType("EUI64"))
    }

    fn encoded_default(&self) -> Result<EncodedValue, ValueError> {
        Err(ValueError::InvalidType("EUI64"))
    }

    fn set_from_encoded(&mut self, e: &EncodedValue, _force: bool) -> Result<bool, ValueError> {
        match e {
            EncodedValue::UInt64(v) => Ok(self.store(*v)),
            EncodedValue::Text(s) => Ok(self.store(Self::parse(s)?)),
            _ => Err(ValueError::InvalidType("EUI64")),
        }
    }

    fn set_from_encoded_with_clamp(&mut self, e: &EncodedValue) -> Result<bool, ValueError> {
        self.set_from_encoded(e, false)
    }
}

/// A control value of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RangedValue {
    Int8(Numeric<i8>),
    UInt8(Numeric<u8>),
    Int16(Numeric<i16>),
    UInt16(Numeric<u16>),
    Int32(Numeric<i32>),
    UInt32(Numeric<u32>),
    Int64(Numeric<i64>),
    UInt64(Numeric<u64>),
    Float(Numeric<f32>),
    Double(Numeric<f64>),
    Bool(BoolValue),
    Text(TextValue),
    Eui64(Eui64Value),
}

macro_rules! dispatch {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            RangedValue::Int8($v) => $body,
            RangedValue::UInt8($v) => $body,
            RangedValue::Int16($v) => $body,
            RangedValue::UInt16($v) => $body,
            RangedValue::Int32($v) => $body,
            RangedValue::UInt32($v) => $body,
            RangedValue::Int64($v) => $body,
            RangedValue::UInt64($v) => $body,
            RangedValue::Float($v) => $body,
            RangedValue::Double($v) => $body,
            RangedValue::Bool($v) => $body,
            RangedValue::Text($v) => $body,
            RangedValue::Eui64($v) => $body,
        }
    };
}

macro_rules! ranged_from_numeric {
    ($($t:ty => $variant:ident),+) => {
        $(
            impl From<Numeric<$t>> for RangedValue {
                fn from(n: Numeric<$t>) -> Self {
                    RangedValue::$variant(n)
                }
            }
        )+
    };
}

ranged_from_numeric!(
    i8 => Int8, u8 => UInt8, i16 => Int16, u16 => UInt16, i32 => Int32,
    u32 => UInt32, i64 => Int64, u64 => UInt64, f32 => Float, f64 => Double
);

impl From<BoolValue> for RangedValue {
    fn from(v: BoolValue) -> Self {
        RangedValue::Bool(v)
    }
}

impl From<TextValue> for RangedValue {
    fn from(v: TextValue) -> Self {
        RangedValue::Text(v)
    }
}

impl From<Eui64Value> for RangedValue {
    fn from(v: Eui64Value) -> Self {
        RangedValue::Eui64(v)
    }
}

impl RangedValue {
    pub fn units(&self) -> UnitsCode {
        dispatch!(self, v => v.units())
    }

    /// Representation held in memory.
    pub fn storage_type(&self) -> EncodingType {
        dispatch!(self, v => v.storage_type())
    }

    /// Representation used on the wire.
    pub fn encoding_type(&self) -> EncodingType {
        dispatch!(self, v => v.encoding_type())
    }

    pub fn is_string(&self) -> bool {
        matches!(self, RangedValue::Text(_))
    }

    /// Set the application value. Out of range values are rejected unless
    /// `force` is set. Returns whether the stored value changed.
    pub fn set_value(&mut self, v: impl Into<Value>, force: bool) -> Result<bool, ValueError> {
        let v = v.into();
        dispatch!(self, r => r.set_value(&v, force))
    }

    /// Set the application value, saturating at the declared bounds.
    pub fn set_value_with_clamp(&mut self, v: impl Into<Value>) -> Result<bool, ValueError> {
        let v = v.into();
        dispatch!(self, r => r.set_value_with_clamp(&v))
    }

    /// Step up by the decoded step size. Returns false once saturated.
    pub fn inc_value(&mut self) -> bool {
        dispatch!(self, v => v.inc_value())
    }

    /// Step down by the decoded step size. Returns false once saturated.
    pub fn dec_value(&mut self) -> bool {
        dispatch!(self, v => v.dec_value())
    }

    /// Return to the declared default.
    pub fn reset(&mut self) -> bool {
        dispatch!(self, v => v.reset())
    }

    pub fn value(&self) -> Value {
        dispatch!(self, v => v.value())
    }

    pub fn as_f64(&self) -> Result<f64, ValueError> {
        match self {
            RangedValue::Eui64(_) => Err(ValueError::InvalidType("EUI64")),
            other => other.value().as_f64(),
        }
    }

    pub fn as_i64(&self) -> Result<i64, ValueError> {
        match self {
            RangedValue::Eui64(_) => Err(ValueError::InvalidType("EUI64")),
            other => other.value().as_i64(),
        }
    }

    pub fn as_u64(&self) -> Result<u64, ValueError> {
        self.value().as_u64()
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            RangedValue::Text(t) => Ok(t.get() == "true"),
            RangedValue::Eui64(_) => Err(ValueError::InvalidType("EUI64")),
            other => other.value().as_bool(),
        }
    }

    pub fn value_string(&self, with_units: bool) -> String {
        self.with_suffix(dispatch!(self, v => v.value_string()), with_units)
    }

    pub fn minimum_string(&self, with_units: bool) -> String {
        self.with_suffix(dispatch!(self, v => v.minimum_string()), with_units)
    }

    pub fn maximum_string(&self, with_units: bool) -> String {
        self.with_suffix(dispatch!(self, v => v.maximum_string()), with_units)
    }

    pub fn default_string(&self, with_units: bool) -> String {
        self.with_suffix(dispatch!(self, v => v.default_string()), with_units)
    }

    pub fn step_string(&self, with_units: bool) -> String {
        self.with_suffix(dispatch!(self, v => v.step_string()), with_units)
    }

    pub fn units_suffix(&self) -> &'static str {
        self.units().suffix()
    }

    fn with_suffix(&self, s: String, with_units: bool) -> String {
        let suffix = self.units_suffix();
        if with_units && !suffix.is_empty() && !s.is_empty() {
            format!("{} {}", s, suffix)
        } else {
            s
        }
    }

    /// The current value in its wire representation.
    pub fn encoded(&self) -> Result<EncodedValue, ValueError> {
        dispatch!(self, v => v.encoded())
    }

    pub fn encoded_minimum(&self) -> Result<EncodedValue, ValueError> {
        dispatch!(self, v => v.encoded_minimum())
    }

    pub fn encoded_maximum(&self) -> Result<EncodedValue, ValueError> {
        dispatch!(self, v => v.encoded_maximum())
    }

    pub fn encoded_default(&self) -> Result<EncodedValue, ValueError> {
        dispatch!(self, v => v.encoded_default())
    }

    /// Decode a wire value and set it, rejecting out of range values unless
    /// `force` is set.
    pub fn set_from_encoded(&mut self, e: &EncodedValue, force: bool) -> Result<bool, ValueError> {
        dispatch!(self, v => v.set_from_encoded(e, force))
    }

    /// Decode a wire value and set it, saturating at the declared bounds.
    pub fn set_from_encoded_with_clamp(&mut self, e: &EncodedValue) -> Result<bool, ValueError> {
        dispatch!(self, v => v.set_from_encoded_with_clamp(e))
    }
}

impl fmt::Display for RangedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value_string(true))
    }
}
