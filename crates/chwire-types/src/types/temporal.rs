//! Date、Date32、DateTime、DateTime64、Time、Time64 的读写

use super::ClickHouseType;
use crate::codec::{BinaryReader, BinaryWriter};
use crate::temporal::{
    date_from_days, date_of, days_since_epoch, duration_from_ticks, duration_to_ticks, from_ticks,
    instant_of, to_ticks, DateTimeValue,
};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use chrono::{DateTime, TimeDelta};

pub(super) fn read(ty: &ClickHouseType, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
    match ty {
        ClickHouseType::Date => Ok(Value::Date(date_from_days(reader.read_u16()? as i64)?)),
        ClickHouseType::Date32 => Ok(Value::Date(date_from_days(reader.read_i32()? as i64)?)),
        ClickHouseType::DateTime(tz) => {
            let seconds = reader.read_u32()?;
            let instant = DateTime::from_timestamp(seconds as i64, 0).ok_or_else(|| {
                CodecError::InvalidData(format!("DateTime seconds {} out of range", seconds))
            })?;
            Ok(Value::DateTime(DateTimeValue::from_utc(instant, *tz)))
        }
        ClickHouseType::DateTime64 { scale, timezone } => {
            let instant = from_ticks(reader.read_i64()?, *scale)?;
            Ok(Value::DateTime(DateTimeValue::from_utc(instant, *timezone)))
        }
        ClickHouseType::Time => Ok(Value::Time(TimeDelta::seconds(reader.read_i32()? as i64))),
        ClickHouseType::Time64(scale) => {
            Ok(Value::Time(duration_from_ticks(reader.read_i64()?, *scale)?))
        }
        other => Err(CodecError::NotSupported(format!("{} is not temporal", other))),
    }
}

pub(super) fn write(
    ty: &ClickHouseType,
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    match ty {
        ClickHouseType::Date => {
            let days = days_since_epoch(&date_of(value, None)?);
            let days = u16::try_from(days)
                .map_err(|_| CodecError::Overflow(format!("{} does not fit Date", value)))?;
            writer.put_u16(days);
        }
        ClickHouseType::Date32 => {
            let days = days_since_epoch(&date_of(value, None)?);
            let days = i32::try_from(days)
                .map_err(|_| CodecError::Overflow(format!("{} does not fit Date32", value)))?;
            writer.put_i32(days);
        }
        ClickHouseType::DateTime(tz) => {
            let seconds = instant_of(value, *tz)?.timestamp();
            let seconds = u32::try_from(seconds)
                .map_err(|_| CodecError::Overflow(format!("{} does not fit DateTime", value)))?;
            writer.put_u32(seconds);
        }
        ClickHouseType::DateTime64 { scale, timezone } => {
            writer.put_i64(to_ticks(&instant_of(value, *timezone)?, *scale)?);
        }
        ClickHouseType::Time => {
            let seconds = duration_to_ticks(&coerce_duration(value)?, 0)?;
            let seconds = i32::try_from(seconds)
                .map_err(|_| CodecError::Overflow(format!("{} does not fit Time", value)))?;
            writer.put_i32(seconds);
        }
        ClickHouseType::Time64(scale) => {
            writer.put_i64(duration_to_ticks(&coerce_duration(value)?, *scale)?);
        }
        other => return Err(CodecError::NotSupported(format!("{} is not temporal", other))),
    }
    Ok(())
}

/// 时长值；整数按秒解释
fn coerce_duration(value: &Value) -> CodecResult<TimeDelta> {
    match value {
        Value::Time(delta) => Ok(*delta),
        other => match other.as_i128() {
            Some(seconds) => i64::try_from(seconds)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .ok_or_else(|| CodecError::Overflow(format!("{} seconds", seconds))),
            None => Err(CodecError::mismatch("Time", other)),
        },
    }
}
