//! 任意精度十进制模块
//!
//! [`ClickHouseDecimal`] 以 `尾数 × 10^-标度` 表示十进制数，独立于类型系统。
//! 比较、加减乘、取模都先对齐标度再运算；除法结果的标度受
//! [`MAX_DIVISION_PRECISION`] 限制，避免无限展开。
//! 字符串解析与格式化始终使用 `.` 作为小数点，与区域设置无关。

use crate::{CodecError, CodecResult};
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

/// 除法结果允许的最大标度
pub const MAX_DIVISION_PRECISION: u32 = 50;

/// rust_decimal 支持的最大标度
const NATIVE_MAX_SCALE: u32 = 28;

/// 文本解析允许的最大标度与指数绝对值，覆盖 f64 的全部有限值
pub const MAX_LITERAL_SCALE: u32 = 512;

/// 任意精度十进制数
///
/// 值 = `mantissa × 10^-scale`。相等、排序与哈希均按数值进行，
/// 因此 `1.50` 与 `1.5` 相等且哈希一致。
#[derive(Clone, Debug)]
pub struct ClickHouseDecimal {
    mantissa: BigInt,
    scale: u32,
}

/// 计算 10 的 n 次方
pub fn pow10(n: u32) -> BigInt {
    BigInt::from(10u32).pow(n)
}

impl ClickHouseDecimal {
    /// 由尾数与标度构造
    ///
    /// # Arguments
    /// * `mantissa` - 未缩放的整数尾数
    /// * `scale` - 小数位数
    pub fn new(mantissa: impl Into<BigInt>, scale: u32) -> Self {
        Self {
            mantissa: mantissa.into(),
            scale,
        }
    }

    pub fn zero() -> Self {
        Self::new(BigInt::zero(), 0)
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.sign() == Sign::Minus
    }

    /// 尾数的十进制位数(0 记为 1 位)
    pub fn precision(&self) -> u32 {
        if self.mantissa.is_zero() {
            return 1;
        }
        self.mantissa.magnitude().to_string().len() as u32
    }

    /// 是否为整数值
    pub fn is_integer(&self) -> bool {
        self.scale == 0 || (&self.mantissa % pow10(self.scale)).is_zero()
    }

    /// 整数值对应的 BigInt；有小数部分时返回 None
    pub fn to_integer(&self) -> Option<BigInt> {
        if self.is_integer() {
            Some(&self.mantissa / pow10(self.scale))
        } else {
            None
        }
    }

    /// 调整到指定标度
    ///
    /// # Brief
    /// 增大标度时精确放大尾数；减小标度时向零截断
    ///
    /// # Arguments
    /// * `target` - 目标标度
    pub fn rescale(&self, target: u32) -> Self {
        match target.cmp(&self.scale) {
            Ordering::Equal => self.clone(),
            Ordering::Greater => Self::new(&self.mantissa * pow10(target - self.scale), target),
            Ordering::Less => Self::new(&self.mantissa / pow10(self.scale - target), target),
        }
    }

    /// 去掉尾部无意义的零
    pub fn normalize(&self) -> Self {
        if self.mantissa.is_zero() {
            return Self::zero();
        }
        let ten = BigInt::from(10u32);
        let mut mantissa = self.mantissa.clone();
        let mut scale = self.scale;
        while scale > 0 && (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            scale -= 1;
        }
        Self::new(mantissa, scale)
    }

    /// 向负无穷取整，结果标度为 0
    pub fn floor(&self) -> Self {
        if self.scale == 0 {
            return self.clone();
        }
        let divisor = pow10(self.scale);
        let mut quotient = &self.mantissa / &divisor;
        if self.is_negative() && !(&self.mantissa % &divisor).is_zero() {
            quotient -= 1;
        }
        Self::new(quotient, 0)
    }

    /// 向零截断到指定小数位数
    ///
    /// 标度不大于 `scale` 时原样返回。
    pub fn truncate(&self, scale: u32) -> Self {
        if self.scale <= scale {
            self.clone()
        } else {
            self.rescale(scale)
        }
    }

    /// 四舍五入(远离零)到指定小数位数
    pub fn round_to(&self, scale: u32) -> Self {
        if self.scale <= scale {
            return self.clone();
        }
        let divisor = pow10(self.scale - scale);
        let quotient = &self.mantissa / &divisor;
        let remainder = (&self.mantissa % &divisor).abs();
        let rounded = if remainder * 2 >= divisor {
            if self.is_negative() {
                quotient - 1
            } else {
                quotient + 1
            }
        } else {
            quotient
        };
        Self::new(rounded, scale)
    }

    /// 将值缩放到线上标度并检查宽度
    ///
    /// # Brief
    /// 返回目标标度下的尾数(减小标度时向零截断)；
    /// 尾数无法用 `byte_width` 字节的有符号补码表示时返回 Overflow
    ///
    /// # Arguments
    /// * `target_scale` - 列声明的标度
    /// * `byte_width` - 存储宽度(4/8/16/32)
    pub fn scale_mantissa(&self, target_scale: u32, byte_width: usize) -> CodecResult<BigInt> {
        if self.is_zero() {
            return Ok(BigInt::zero());
        }
        // 每字节至多约 2.41 位十进制数
        let capacity = (byte_width as u32).saturating_mul(3);
        if target_scale > self.scale && target_scale - self.scale > capacity {
            return Err(CodecError::Overflow(format!(
                "Decimal value {} does not fit in {} bytes at scale {}",
                self, byte_width, target_scale
            )));
        }
        if self.scale > target_scale && self.scale - target_scale > self.precision() {
            return Ok(BigInt::zero());
        }
        let mantissa = self.rescale(target_scale).mantissa;
        if mantissa.to_signed_bytes_le().len() > byte_width {
            return Err(CodecError::Overflow(format!(
                "Decimal value {} does not fit in {} bytes at scale {}",
                self, byte_width, target_scale
            )));
        }
        Ok(mantissa)
    }

    /// 除法
    ///
    /// # Brief
    /// 结果先以 [`MAX_DIVISION_PRECISION`] 位小数计算(向零截断)，
    /// 再去掉尾部零，但不低于两个操作数的最大标度
    ///
    /// # Returns
    /// 除数为零时返回 DivisionByZero
    pub fn checked_div(&self, other: &Self) -> CodecResult<Self> {
        if other.is_zero() {
            return Err(CodecError::DivisionByZero);
        }
        let numerator = &self.mantissa * pow10(MAX_DIVISION_PRECISION + other.scale);
        let denominator = &other.mantissa * pow10(self.scale);
        let quotient = Self::new(numerator / denominator, MAX_DIVISION_PRECISION).normalize();
        let min_scale = self.scale.max(other.scale);
        if quotient.scale < min_scale {
            Ok(quotient.rescale(min_scale))
        } else {
            Ok(quotient)
        }
    }

    /// 取模，符号跟随被除数
    pub fn checked_rem(&self, other: &Self) -> CodecResult<Self> {
        if other.is_zero() {
            return Err(CodecError::DivisionByZero);
        }
        let scale = self.scale.max(other.scale);
        let a = self.rescale(scale).mantissa;
        let b = other.rescale(scale).mantissa;
        Ok(Self::new(a % b, scale))
    }

    pub fn to_f64(&self) -> f64 {
        // 经由字符串转换，避免大尾数除法的精度损失
        self.to_string().parse::<f64>().unwrap_or_else(|_| {
            self.mantissa.to_f64().unwrap_or(f64::NAN) / 10f64.powi(self.scale as i32)
        })
    }

    /// 由 f64 构造(使用最短往返十进制表示)
    ///
    /// # Returns
    /// NaN 或无穷返回 InvalidValue
    pub fn from_f64(value: f64) -> CodecResult<Self> {
        if !value.is_finite() {
            return Err(CodecError::InvalidValue(format!(
                "Cannot convert {} to decimal",
                value
            )));
        }
        value.to_string().parse()
    }

    /// 转换为 96 位定宽十进制
    ///
    /// # Brief
    /// 标度超过 28 或尾数过宽时逐步四舍五入降低标度；仍无法表示则返回 Overflow
    pub fn to_native(&self) -> CodecResult<rust_decimal::Decimal> {
        let mut value = self.round_to(NATIVE_MAX_SCALE);
        loop {
            if let Some(mantissa) = value.mantissa.to_i128() {
                if let Ok(d) = rust_decimal::Decimal::try_from_i128_with_scale(mantissa, value.scale) {
                    return Ok(d);
                }
            }
            if value.scale == 0 {
                return Err(CodecError::Overflow(format!(
                    "Decimal value {} does not fit in a 96-bit decimal",
                    self
                )));
            }
            value = value.round_to(value.scale - 1);
        }
    }
}

impl Default for ClickHouseDecimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for ClickHouseDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ClickHouseDecimal {}

impl PartialOrd for ClickHouseDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClickHouseDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.rescale(scale).mantissa.cmp(&other.rescale(scale).mantissa)
    }
}

impl Hash for ClickHouseDecimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let normalized = self.normalize();
        normalized.mantissa.hash(state);
        normalized.scale.hash(state);
    }
}

impl Add for &ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn add(self, rhs: Self) -> ClickHouseDecimal {
        let scale = self.scale.max(rhs.scale);
        ClickHouseDecimal::new(self.rescale(scale).mantissa + rhs.rescale(scale).mantissa, scale)
    }
}

impl Sub for &ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn sub(self, rhs: Self) -> ClickHouseDecimal {
        let scale = self.scale.max(rhs.scale);
        ClickHouseDecimal::new(self.rescale(scale).mantissa - rhs.rescale(scale).mantissa, scale)
    }
}

impl Mul for &ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn mul(self, rhs: Self) -> ClickHouseDecimal {
        let product = ClickHouseDecimal::new(&self.mantissa * &rhs.mantissa, self.scale + rhs.scale);
        product.rescale(self.scale.max(rhs.scale))
    }
}

impl Add for ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn add(self, rhs: Self) -> ClickHouseDecimal {
        &self + &rhs
    }
}

impl Sub for ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn sub(self, rhs: Self) -> ClickHouseDecimal {
        &self - &rhs
    }
}

impl Mul for ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn mul(self, rhs: Self) -> ClickHouseDecimal {
        &self * &rhs
    }
}

impl Neg for ClickHouseDecimal {
    type Output = ClickHouseDecimal;

    fn neg(self) -> ClickHouseDecimal {
        ClickHouseDecimal::new(-self.mantissa, self.scale)
    }
}

impl FromStr for ClickHouseDecimal {
    type Err = CodecError;

    /// 解析十进制文本，支持符号、小数点与指数(如 `-1.5e3`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidValue(format!("Invalid decimal literal: {:?}", s));
        let text = s.trim();
        let (number, exponent) = match text.find(|c| c == 'e' || c == 'E') {
            Some(idx) => {
                let exp = text[idx + 1..].parse::<i64>().map_err(|_| invalid())?;
                (&text[..idx], exp)
            }
            None => (text, 0),
        };
        let (negative, digits) = match number.as_bytes().first() {
            Some(b'-') => (true, &number[1..]),
            Some(b'+') => (false, &number[1..]),
            _ => (false, number),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let all_digits = format!("{}{}", int_part, frac_part);
        let mut mantissa = BigInt::parse_bytes(all_digits.as_bytes(), 10).ok_or_else(invalid)?;
        if negative {
            mantissa = -mantissa;
        }
        let bound = MAX_LITERAL_SCALE as i64;
        if !(-bound..=bound).contains(&exponent) {
            return Err(CodecError::InvalidValue(format!(
                "Decimal exponent out of range in {:?}",
                s
            )));
        }
        let scale = frac_part.len() as i64 - exponent;
        if !(-bound..=bound).contains(&scale) {
            return Err(CodecError::InvalidValue(format!(
                "Decimal scale out of range in {:?}",
                s
            )));
        }
        if scale < 0 {
            let shift = u32::try_from(-scale).map_err(|_| invalid())?;
            Ok(Self::new(mantissa * pow10(shift), 0))
        } else {
            let scale = u32::try_from(scale).map_err(|_| invalid())?;
            Ok(Self::new(mantissa, scale))
        }
    }
}

impl fmt::Display for ClickHouseDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.magnitude().to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        if self.scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl From<rust_decimal::Decimal> for ClickHouseDecimal {
    fn from(value: rust_decimal::Decimal) -> Self {
        Self::new(value.mantissa(), value.scale())
    }
}

impl From<BigInt> for ClickHouseDecimal {
    fn from(value: BigInt) -> Self {
        Self::new(value, 0)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ClickHouseDecimal {
                fn from(value: $t) -> Self {
                    Self::new(BigInt::from(value), 0)
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);

impl TryFrom<f64> for ClickHouseDecimal {
    type Error = CodecError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_f64(value)
    }
}

impl Serialize for ClickHouseDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ClickHouseDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
