//! 时区感知的时间转换模块
//!
//! 在墙上时间、时刻与列时区之间转换:
//! - 明确的时刻(UTC 或带偏移)按原时刻写入
//! - 本地系统时间经宿主系统时区换算为时刻
//! - 未指定时区的墙上时间按列时区解释(列无时区时按 UTC)
//!
//! 读取时，时刻投影到列时区；列无时区时返回未指定时区的 UTC 墙上时间。

use crate::value::Value;
use crate::{CodecError, CodecResult};
use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use std::fmt;

/// 1970-01-01 距公元元年的天数
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// 日期时间值
///
/// 保留写入方对时区的声明，区分“未指定时区”与“明确时刻”。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeValue {
    /// 未指定时区的墙上时间
    Naive(NaiveDateTime),
    /// 宿主系统时区的本地时间
    Local(DateTime<Local>),
    /// UTC 时刻
    Utc(DateTime<Utc>),
    /// 带固定偏移的时刻
    Fixed(DateTime<FixedOffset>),
    /// 带 IANA 时区的时刻
    Zoned(DateTime<Tz>),
}

impl DateTimeValue {
    /// 转换为 UTC 时刻
    ///
    /// # Brief
    /// 明确时刻直接换算；未指定时区的墙上时间按 `column_tz` 解释
    ///
    /// # Arguments
    /// * `column_tz` - 目标列时区，`None` 表示 UTC
    pub fn to_utc(&self, column_tz: Option<Tz>) -> DateTime<Utc> {
        match self {
            DateTimeValue::Naive(naive) => match column_tz {
                Some(tz) => wall_clock_to_utc(naive, &tz),
                None => Utc.from_utc_datetime(naive),
            },
            DateTimeValue::Local(dt) => dt.with_timezone(&Utc),
            DateTimeValue::Utc(dt) => *dt,
            DateTimeValue::Fixed(dt) => dt.with_timezone(&Utc),
            DateTimeValue::Zoned(dt) => dt.with_timezone(&Utc),
        }
    }

    /// 将时刻投影到列时区
    ///
    /// 列无时区时返回 UTC 墙上时间，标记为未指定时区。
    pub fn from_utc(instant: DateTime<Utc>, column_tz: Option<Tz>) -> Self {
        match column_tz {
            Some(tz) => DateTimeValue::Zoned(instant.with_timezone(&tz)),
            None => DateTimeValue::Naive(instant.naive_utc()),
        }
    }

    /// 墙上时间字段
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            DateTimeValue::Naive(naive) => *naive,
            DateTimeValue::Local(dt) => dt.naive_local(),
            DateTimeValue::Utc(dt) => dt.naive_utc(),
            DateTimeValue::Fixed(dt) => dt.naive_local(),
            DateTimeValue::Zoned(dt) => dt.naive_local(),
        }
    }

    /// 相对 UTC 的偏移(秒)；未指定时区时为 None
    pub fn offset_seconds(&self) -> Option<i32> {
        match self {
            DateTimeValue::Naive(_) => None,
            DateTimeValue::Local(dt) => Some(dt.offset().fix().local_minus_utc()),
            DateTimeValue::Utc(_) => Some(0),
            DateTimeValue::Fixed(dt) => Some(dt.offset().local_minus_utc()),
            DateTimeValue::Zoned(dt) => Some(dt.offset().fix().local_minus_utc()),
        }
    }

    pub fn is_naive(&self) -> bool {
        matches!(self, DateTimeValue::Naive(_))
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTimeValue::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%d %H:%M:%S%.f")),
            DateTimeValue::Local(dt) => write!(f, "{}", dt.to_rfc3339()),
            DateTimeValue::Utc(dt) => write!(f, "{}", dt.to_rfc3339()),
            DateTimeValue::Fixed(dt) => write!(f, "{}", dt.to_rfc3339()),
            DateTimeValue::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<NaiveDateTime> for DateTimeValue {
    fn from(value: NaiveDateTime) -> Self {
        DateTimeValue::Naive(value)
    }
}

impl From<DateTime<Utc>> for DateTimeValue {
    fn from(value: DateTime<Utc>) -> Self {
        DateTimeValue::Utc(value)
    }
}

impl From<DateTime<Local>> for DateTimeValue {
    fn from(value: DateTime<Local>) -> Self {
        DateTimeValue::Local(value)
    }
}

impl From<DateTime<FixedOffset>> for DateTimeValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        DateTimeValue::Fixed(value)
    }
}

impl From<DateTime<Tz>> for DateTimeValue {
    fn from(value: DateTime<Tz>) -> Self {
        DateTimeValue::Zoned(value)
    }
}

/// 将某时区的墙上时间解释为 UTC 时刻
///
/// # Brief
/// 歧义时间(夏令时回拨)取较早的时刻；不存在的时间(夏令时跳变)
/// 使用跳变前生效的偏移
pub fn wall_clock_to_utc(naive: &NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let before = *naive - TimeDelta::days(1);
            let offset = tz.offset_from_utc_datetime(&before).fix();
            Utc.from_utc_datetime(&(*naive - TimeDelta::seconds(offset.local_minus_utc() as i64)))
        }
    }
}

/// 日期距 1970-01-01 的天数
pub fn days_since_epoch(date: &NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - UNIX_EPOCH_DAYS_FROM_CE
}

/// 由距 1970-01-01 的天数构造日期
pub fn date_from_days(days: i64) -> CodecResult<NaiveDate> {
    i32::try_from(days + UNIX_EPOCH_DAYS_FROM_CE)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| CodecError::InvalidData(format!("Day number {} is out of range", days)))
}

/// 取值对应的日期
///
/// # Brief
/// `Date` 原样返回；未指定时区的日期时间取其日期部分；
/// 明确时刻投影到列时区(无则 UTC)后取日期
pub fn date_of(value: &Value, column_tz: Option<Tz>) -> CodecResult<NaiveDate> {
    match value {
        Value::Date(date) => Ok(*date),
        Value::DateTime(DateTimeValue::Naive(naive)) => Ok(naive.date()),
        Value::DateTime(dt) => {
            let instant = dt.to_utc(None);
            Ok(match column_tz {
                Some(tz) => instant.with_timezone(&tz).date_naive(),
                None => instant.date_naive(),
            })
        }
        other => Err(CodecError::mismatch("Date or DateTime", other)),
    }
}

/// 取值对应的 UTC 时刻
///
/// `Date` 视为列时区当日零点。
pub fn instant_of(value: &Value, column_tz: Option<Tz>) -> CodecResult<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Ok(dt.to_utc(column_tz)),
        Value::Date(date) => {
            let midnight = date.and_time(chrono::NaiveTime::MIN);
            Ok(DateTimeValue::Naive(midnight).to_utc(column_tz))
        }
        other => Err(CodecError::mismatch("DateTime", other)),
    }
}

fn ticks_per_second(scale: u8) -> i128 {
    10i128.pow(scale as u32)
}

/// 时刻转换为 `10^-scale` 秒为单位的计数(向负无穷取整)
pub fn to_ticks(instant: &DateTime<Utc>, scale: u8) -> CodecResult<i64> {
    let nanos = instant.timestamp() as i128 * NANOS_PER_SECOND + instant.timestamp_subsec_nanos() as i128;
    let ticks = nanos.div_euclid(NANOS_PER_SECOND / ticks_per_second(scale));
    i64::try_from(ticks).map_err(|_| {
        CodecError::Overflow(format!("{} does not fit DateTime64({})", instant, scale))
    })
}

/// 由 `10^-scale` 秒为单位的计数构造时刻
pub fn from_ticks(ticks: i64, scale: u8) -> CodecResult<DateTime<Utc>> {
    let per_second = ticks_per_second(scale);
    let ticks = ticks as i128;
    let seconds = ticks.div_euclid(per_second);
    let nanos = ticks.rem_euclid(per_second) * (NANOS_PER_SECOND / per_second);
    i64::try_from(seconds)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, nanos as u32))
        .ok_or_else(|| CodecError::InvalidData(format!("DateTime64 ticks {} out of range", ticks)))
}

/// 时长转换为 `10^-scale` 秒为单位的计数(向负无穷取整)
pub fn duration_to_ticks(duration: &TimeDelta, scale: u8) -> CodecResult<i64> {
    let nanos = duration.num_seconds() as i128 * NANOS_PER_SECOND + duration.subsec_nanos() as i128;
    let ticks = nanos.div_euclid(NANOS_PER_SECOND / ticks_per_second(scale));
    i64::try_from(ticks)
        .map_err(|_| CodecError::Overflow(format!("Duration {} does not fit Time64({})", duration, scale)))
}

/// 由 `10^-scale` 秒为单位的计数构造时长
pub fn duration_from_ticks(ticks: i64, scale: u8) -> CodecResult<TimeDelta> {
    let per_second = ticks_per_second(scale);
    let ticks = ticks as i128;
    let seconds = ticks.div_euclid(per_second) as i64;
    let nanos = (ticks.rem_euclid(per_second) * (NANOS_PER_SECOND / per_second)) as i64;
    TimeDelta::try_seconds(seconds)
        .map(|d| d + TimeDelta::nanoseconds(nanos))
        .ok_or_else(|| CodecError::InvalidData(format!("Time64 ticks {} out of range", ticks)))
}

/// 解析时区名称
pub fn parse_timezone(name: &str) -> CodecResult<Tz> {
    Ok(chwire_common::config::parse_timezone(name)?)
}
