//! Typed parameter values and their conversion from request text.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::error::HandlerError;

/// The declared type of a bindable handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Text, passed through unchanged.
    Text,
    /// `true`/`false`.
    Bool,
    /// Exactly one character.
    Char,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
    /// Big integer.
    I128,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Arbitrary precision decimal.
    Decimal,
    /// UUID in canonical hyphenated (or simple) form.
    Uuid,
    /// ISO-8601 calendar date.
    Date,
    /// ISO-8601 wall clock time.
    Time,
    /// ISO-8601 local date and time.
    DateTime,
    /// RFC 3339 timestamp with offset.
    OffsetDateTime,
    /// Enumeration, matched by variant name.
    Enum(&'static [&'static str]),
}

impl ValueType {
    /// Returns `true` for types whose empty-string value is kept as text.
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Converts non-empty request text into a typed value.
    pub fn parse(self, raw: &str) -> Result<Value, ConversionError> {
        let fail = || ConversionError {
            value: raw.to_string(),
            expected: self,
        };

        let value = match self {
            Self::Text => Value::Text(raw.to_string()),
            Self::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if raw.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    return Err(fail());
                }
            }
            Self::Char => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Char(c),
                    _ => return Err(fail()),
                }
            }
            Self::I8 => Value::Int(raw.parse::<i8>().map_err(|_| fail())?.into()),
            Self::I16 => Value::Int(raw.parse::<i16>().map_err(|_| fail())?.into()),
            Self::I32 => Value::Int(raw.parse::<i32>().map_err(|_| fail())?.into()),
            Self::I64 => Value::Int(raw.parse::<i64>().map_err(|_| fail())?.into()),
            Self::I128 => Value::Int(raw.parse::<i128>().map_err(|_| fail())?),
            Self::U8 => Value::Int(raw.parse::<u8>().map_err(|_| fail())?.into()),
            Self::U16 => Value::Int(raw.parse::<u16>().map_err(|_| fail())?.into()),
            Self::U32 => Value::Int(raw.parse::<u32>().map_err(|_| fail())?.into()),
            Self::U64 => Value::Int(raw.parse::<u64>().map_err(|_| fail())?.into()),
            Self::F32 => Value::Float(raw.parse::<f32>().map_err(|_| fail())?.into()),
            Self::F64 => Value::Float(raw.parse::<f64>().map_err(|_| fail())?),
            Self::Decimal => Value::Decimal(Decimal::from_str(raw).map_err(|_| fail())?),
            Self::Uuid => Value::Uuid(Uuid::parse_str(raw).map_err(|_| fail())?),
            Self::Date => Value::Date(raw.parse::<NaiveDate>().map_err(|_| fail())?),
            Self::Time => Value::Time(parse_time(raw).ok_or_else(fail)?),
            Self::DateTime => Value::DateTime(parse_date_time(raw).ok_or_else(fail)?),
            Self::OffsetDateTime => {
                Value::OffsetDateTime(DateTime::parse_from_rfc3339(raw).map_err(|_| fail())?)
            }
            Self::Enum(variants) => {
                let index = variants
                    .iter()
                    .position(|v| *v == raw)
                    .or_else(|| variants.iter().position(|v| v.eq_ignore_ascii_case(raw)))
                    .ok_or_else(fail)?;
                Value::Variant(index)
            }
        };

        Ok(value)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(variants) => write!(f, "one of [{}]", variants.join(", ")),
            other => write!(f, "{other:?}"),
        }
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// A request value converted to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Character value.
    Char(char),
    /// Any integer, range-checked against the declared width.
    Int(i128),
    /// Any float.
    Float(f64),
    /// Decimal value.
    Decimal(Decimal),
    /// UUID value.
    Uuid(Uuid),
    /// Date value.
    Date(NaiveDate),
    /// Time value.
    Time(NaiveTime),
    /// Local date-time value.
    DateTime(NaiveDateTime),
    /// Date-time with offset.
    OffsetDateTime(DateTime<FixedOffset>),
    /// Index of an enumeration variant.
    Variant(usize),
}

/// A request value that could not be converted to the declared type.
#[derive(Debug, Clone, Error)]
#[error("cannot convert '{value}' to {expected}")]
pub struct ConversionError {
    /// The raw text.
    pub value: String,
    /// The declared type.
    pub expected: ValueType,
}

/// Types that can be bound from request text.
///
/// `value` is `None` when the request carried nothing usable for the
/// parameter; non-`Option` implementations then return their zero value.
pub trait FromParam: Sized {
    /// The conversion applied to request text.
    const TYPE: ValueType;

    /// Builds the parameter from an already converted value.
    fn from_value(value: Option<Value>) -> Result<Self, HandlerError>;
}

fn mismatch<T>(value: &Value) -> HandlerError {
    HandlerError::msg(format!(
        "bound value {value:?} does not fit {}",
        std::any::type_name::<T>()
    ))
}

impl FromParam for String {
    const TYPE: ValueType = ValueType::Text;

    fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
        match value {
            None => Ok(Self::new()),
            Some(Value::Text(s)) => Ok(s),
            Some(other) => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromParam for bool {
    const TYPE: ValueType = ValueType::Bool;

    fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
        match value {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(other) => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromParam for char {
    const TYPE: ValueType = ValueType::Char;

    fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
        match value {
            None => Ok('\0'),
            Some(Value::Char(c)) => Ok(c),
            Some(other) => Err(mismatch::<Self>(&other)),
        }
    }
}

macro_rules! int_from_param {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromParam for $ty {
                const TYPE: ValueType = ValueType::$kind;

                fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
                    match value {
                        None => Ok(0),
                        Some(Value::Int(i)) => {
                            <$ty>::try_from(i).map_err(|_| mismatch::<Self>(&Value::Int(i)))
                        }
                        Some(other) => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

int_from_param! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

impl FromParam for f32 {
    const TYPE: ValueType = ValueType::F32;

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
        match value {
            None => Ok(0.0),
            // Parsed as f32 first, so the narrowing is exact.
            Some(Value::Float(f)) => Ok(f as f32),
            Some(other) => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromParam for f64 {
    const TYPE: ValueType = ValueType::F64;

    fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
        match value {
            None => Ok(0.0),
            Some(Value::Float(f)) => Ok(f),
            Some(other) => Err(mismatch::<Self>(&other)),
        }
    }
}

macro_rules! structured_from_param {
    ($($ty:ty => $kind:ident, $zero:expr);* $(;)?) => {
        $(
            impl FromParam for $ty {
                const TYPE: ValueType = ValueType::$kind;

                fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
                    match value {
                        None => Ok($zero),
                        Some(Value::$kind(v)) => Ok(v),
                        Some(other) => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

structured_from_param! {
    Decimal => Decimal, Decimal::ZERO;
    Uuid => Uuid, Uuid::nil();
    NaiveDate => Date, NaiveDate::default();
    NaiveTime => Time, NaiveTime::default();
    NaiveDateTime => DateTime, NaiveDateTime::default();
    DateTime<FixedOffset> => OffsetDateTime, DateTime::<FixedOffset>::default();
}

impl<T: FromParam> FromParam for Option<T> {
    const TYPE: ValueType = T::TYPE;

    fn from_value(value: Option<Value>) -> Result<Self, HandlerError> {
        match value {
            None => Ok(None),
            Some(v) => T::from_value(Some(v)).map(Some),
        }
    }
}

/// Fieldless enums bindable by variant name.
///
/// Usually derived with `#[derive(ParamEnum)]`. The first variant is the zero
/// value used when the request carries nothing for the parameter.
pub trait ParamEnum: Sized {
    /// Variant names in declaration order.
    const VARIANTS: &'static [&'static str];

    /// Returns the variant at `index` in [`Self::VARIANTS`].
    fn from_index(index: usize) -> Option<Self>;
}

/// Binds a [`ParamEnum`] parameter; used by the derive.
pub fn enum_from_value<T: ParamEnum>(value: Option<Value>) -> Result<T, HandlerError> {
    match value {
        None => T::from_index(0).ok_or_else(|| HandlerError::msg("enumeration has no variants")),
        Some(Value::Variant(index)) => {
            T::from_index(index).ok_or_else(|| mismatch::<T>(&Value::Variant(index)))
        }
        Some(other) => Err(mismatch::<T>(&other)),
    }
}
