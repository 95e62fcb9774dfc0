//! 二进制游标模块
//!
//! 提供线上格式的底层读写游标:
//! - [`BinaryWriter`]: 基于 `BytesMut` 的小端写入器
//! - [`BinaryReader`]: 基于字节切片的小端读取器
//!
//! 两者都只操作内存缓冲区，不做任何 I/O；同一游标同一时间只能被一个读写操作使用。

use crate::spec::{MAX_NESTING_DEPTH, MAX_STRING_LENGTH};
use crate::types::ClickHouseType;
use crate::value::Value;
use crate::{CodecError, CodecResult};
use bytes::{BufMut, BytesMut};

/// 按类型编码单个值到 Vec<u8>
///
/// # Brief
/// 创建临时缓冲区，按 `ty` 的线上格式写入 `value`
///
/// # Arguments
/// * `ty` - 目标类型
/// * `value` - 要编码的值
///
/// # Returns
/// 成功返回字节向量, 值与类型不匹配或溢出时返回错误
pub fn encode_value(ty: &ClickHouseType, value: &Value) -> CodecResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(64);
    let mut writer = BinaryWriter::new(&mut buf);
    ty.write(&mut writer, value)?;
    Ok(buf.to_vec())
}

/// 按类型解码单个值
///
/// # Brief
/// 从字节切片读取一个值，并要求输入被完整消费
///
/// # Arguments
/// * `ty` - 值的类型
/// * `data` - 线上字节
///
/// # Returns
/// 成功返回值, 数据不足或有多余字节时返回错误
pub fn decode_value(ty: &ClickHouseType, data: &[u8]) -> CodecResult<Value> {
    let mut reader = BinaryReader::new(data);
    let value = ty.read(&mut reader)?;
    if !reader.is_empty() {
        return Err(CodecError::InvalidData(format!(
            "{} trailing bytes after {} value",
            reader.remaining(),
            ty.name()
        )));
    }
    Ok(value)
}

/// 线上格式写入器
pub struct BinaryWriter<'a> {
    buf: &'a mut BytesMut,
    depth: usize,
    max_depth: usize,
}

impl<'a> BinaryWriter<'a> {
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self {
            buf,
            depth: 0,
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    pub fn with_max_depth(buf: &'a mut BytesMut, max_depth: usize) -> Self {
        Self {
            buf,
            depth: 0,
            max_depth,
        }
    }

    /// 写入另一缓冲区的子写入器，继承当前深度与深度上限
    pub(crate) fn fork<'b>(&self, buf: &'b mut BytesMut) -> BinaryWriter<'b> {
        BinaryWriter {
            buf,
            depth: self.depth,
            max_depth: self.max_depth,
        }
    }

    /// 已写入的字节数(包含写入器创建前缓冲区已有的内容)
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn enter(&mut self) -> CodecResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(CodecError::NestingTooDeep(self.max_depth));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn put_u8(&mut self, n: u8) {
        self.buf.put_u8(n);
    }

    pub fn put_i8(&mut self, n: i8) {
        self.buf.put_i8(n);
    }

    pub fn put_u16(&mut self, n: u16) {
        self.buf.put_u16_le(n);
    }

    pub fn put_i16(&mut self, n: i16) {
        self.buf.put_i16_le(n);
    }

    pub fn put_u32(&mut self, n: u32) {
        self.buf.put_u32_le(n);
    }

    pub fn put_i32(&mut self, n: i32) {
        self.buf.put_i32_le(n);
    }

    pub fn put_u64(&mut self, n: u64) {
        self.buf.put_u64_le(n);
    }

    pub fn put_i64(&mut self, n: i64) {
        self.buf.put_i64_le(n);
    }

    pub fn put_u128(&mut self, n: u128) {
        self.buf.put_u128_le(n);
    }

    pub fn put_i128(&mut self, n: i128) {
        self.buf.put_i128_le(n);
    }

    pub fn put_f32(&mut self, n: f32) {
        self.buf.put_f32_le(n);
    }

    pub fn put_f64(&mut self, n: f64) {
        self.buf.put_f64_le(n);
    }

    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// 写入变长整数(每字节 7 位负载，低位组在前，最高位为延续标志)
    pub fn put_varint(&mut self, mut n: u64) {
        while n >= 0x80 {
            self.buf.put_u8((n as u8) | 0x80);
            n >>= 7;
        }
        self.buf.put_u8(n as u8);
    }

    /// 写入长度前缀的字节串
    pub fn put_binary(&mut self, bytes: &[u8]) {
        self.put_varint(bytes.len() as u64);
        self.buf.put_slice(bytes);
    }

    /// 写入长度前缀的 UTF-8 字符串
    pub fn put_string(&mut self, s: &str) {
        self.put_binary(s.as_bytes());
    }
}

/// 线上格式读取器
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    pub fn with_max_depth(data: &'a [u8], max_depth: usize) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub(crate) fn enter(&mut self) -> CodecResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(CodecError::NestingTooDeep(self.max_depth));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        if self.pos >= self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    pub fn read_i8(&mut self) -> CodecResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> CodecResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u128(&mut self) -> CodecResult<u128> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    pub fn read_i128(&mut self) -> CodecResult<i128> {
        Ok(i128::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> CodecResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> CodecResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    pub fn read_varint(&mut self) -> CodecResult<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            // 第 10 个字节只剩最高 1 位可用
            if shift == 63 && byte > 1 {
                return Err(CodecError::InvalidData("Varint exceeds 64 bits".to_string()));
            }
            result |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift > 63 {
                return Err(CodecError::InvalidData("Varint too large".to_string()));
            }
        }
        Ok(result)
    }

    /// 读取长度前缀，并检查剩余字节是否足够
    pub fn read_length(&mut self) -> CodecResult<usize> {
        let len = self.read_varint()?;
        usize::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_STRING_LENGTH)
            .ok_or_else(|| CodecError::InvalidData(format!("Length prefix too large: {}", len)))
    }

    /// 读取长度前缀的字节串
    pub fn read_binary(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_length()?;
        self.read_bytes(len)
    }

    /// 读取长度前缀的字符串，非法 UTF-8 序列以替换字符代替
    pub fn read_string(&mut self) -> CodecResult<String> {
        let bytes = self.read_binary()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// 读取长度前缀的字符串，要求严格 UTF-8
    pub fn read_utf8(&mut self) -> CodecResult<String> {
        let bytes = self.read_binary()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::InvalidData(format!("Invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_varint_layout() {
        let mut buf = BytesMut::new();
        let mut writer = BinaryWriter::new(&mut buf);
        writer.put_varint(0);
        writer.put_varint(127);
        writer.put_varint(128);
        writer.put_varint(300);
        assert_eq!(&buf[..], &[0x00, 0x7F, 0x80, 0x01, 0xAC, 0x02]);
    }

    #[test]
    fn test_string_prefix() {
        let mut buf = BytesMut::new();
        BinaryWriter::new(&mut buf).put_string("abc");
        assert_eq!(&buf[..], &[3, b'a', b'b', b'c']);
        let mut reader = BinaryReader::new(&buf);
        assert_eq!(reader.read_string().unwrap(), "abc");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_unexpected_eof() {
        let mut reader = BinaryReader::new(&[1, 2]);
        assert!(matches!(reader.read_u32(), Err(CodecError::UnexpectedEof)));
        let mut reader = BinaryReader::new(&[5, b'a']);
        assert!(matches!(reader.read_string(), Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn test_varint_too_large() {
        let data = [0xFFu8; 11];
        let mut reader = BinaryReader::new(&data);
        assert!(matches!(reader.read_varint(), Err(CodecError::InvalidData(_))));
    }

    #[test]
    fn test_varint_tenth_byte_overflow() {
        let mut data = [0xFFu8; 10];
        data[9] = 0x01;
        assert_eq!(BinaryReader::new(&data).read_varint().unwrap(), u64::MAX);
        data[9] = 0x02;
        assert!(matches!(
            BinaryReader::new(&data).read_varint(),
            Err(CodecError::InvalidData(_))
        ));
    }

    #[test]
    fn test_fork_keeps_depth() {
        let mut buf = BytesMut::new();
        let mut writer = BinaryWriter::with_max_depth(&mut buf, 2);
        writer.enter().unwrap();
        let mut scratch = BytesMut::new();
        let mut child = writer.fork(&mut scratch);
        assert!(child.enter().is_ok());
        assert!(matches!(child.enter(), Err(CodecError::NestingTooDeep(2))));
    }

    #[test]
    fn test_depth_guard() {
        let mut reader = BinaryReader::with_max_depth(&[], 2);
        assert!(reader.enter().is_ok());
        assert!(reader.enter().is_ok());
        assert!(matches!(reader.enter(), Err(CodecError::NestingTooDeep(2))));
    }

    proptest! {
        #[test]
        fn varint_roundtrip(n in any::<u64>()) {
            let mut buf = BytesMut::new();
            BinaryWriter::new(&mut buf).put_varint(n);
            let mut reader = BinaryReader::new(&buf);
            prop_assert_eq!(reader.read_varint().unwrap(), n);
            prop_assert!(reader.is_empty());
        }
    }
}
