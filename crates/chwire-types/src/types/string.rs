//! String、FixedString、UUID、IPv4、IPv6 的读写

use crate::codec::{BinaryReader, BinaryWriter};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use std::net::{Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

pub(super) fn read_string(reader: &mut BinaryReader<'_>, as_bytes: bool) -> CodecResult<Value> {
    if as_bytes {
        Ok(Value::Bytes(reader.read_binary()?.to_vec()))
    } else {
        Ok(Value::String(reader.read_string()?))
    }
}

pub(super) fn write_string(writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
    match value {
        Value::String(s) => writer.put_string(s),
        Value::Bytes(b) => writer.put_binary(b),
        Value::Json(json) => writer.put_string(&json.to_string()),
        other => return Err(CodecError::mismatch("String", other)),
    }
    Ok(())
}

pub(super) fn read_fixed(reader: &mut BinaryReader<'_>, length: usize) -> CodecResult<Value> {
    Ok(Value::Bytes(reader.read_bytes(length)?.to_vec()))
}

/// 写入定长字符串，不足部分补零
pub(super) fn write_fixed(
    writer: &mut BinaryWriter<'_>,
    length: usize,
    value: &Value,
) -> CodecResult<()> {
    let bytes = match value {
        Value::String(s) => s.as_bytes(),
        Value::Bytes(b) => b.as_slice(),
        other => return Err(CodecError::mismatch(format!("FixedString({})", length), other)),
    };
    if bytes.len() > length {
        return Err(CodecError::Overflow(format!(
            "{} bytes do not fit FixedString({})",
            bytes.len(),
            length
        )));
    }
    writer.put_slice(bytes);
    for _ in bytes.len()..length {
        writer.put_u8(0);
    }
    Ok(())
}

/// UUID 按高 64 位、低 64 位两个小端整数写入
pub(super) fn read_uuid(reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
    let high = reader.read_u64()?;
    let low = reader.read_u64()?;
    Ok(Value::Uuid(Uuid::from_u64_pair(high, low)))
}

pub(super) fn write_uuid(writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
    let uuid = match value {
        Value::Uuid(u) => *u,
        Value::String(s) => Uuid::parse_str(s)
            .map_err(|e| CodecError::InvalidValue(format!("Invalid UUID '{}': {}", s, e)))?,
        other => return Err(CodecError::mismatch("UUID", other)),
    };
    let (high, low) = uuid.as_u64_pair();
    writer.put_u64(high);
    writer.put_u64(low);
    Ok(())
}

pub(super) fn read_ipv4(reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
    Ok(Value::Ipv4(Ipv4Addr::from(reader.read_u32()?)))
}

pub(super) fn write_ipv4(writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
    let ip = match value {
        Value::Ipv4(ip) => *ip,
        Value::String(s) => s
            .parse::<Ipv4Addr>()
            .map_err(|e| CodecError::InvalidValue(format!("Invalid IPv4 '{}': {}", s, e)))?,
        Value::UInt32(n) => Ipv4Addr::from(*n),
        other => return Err(CodecError::mismatch("IPv4", other)),
    };
    writer.put_u32(u32::from(ip));
    Ok(())
}

/// IPv6 按网络字节序写入 16 字节
pub(super) fn read_ipv6(reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
    Ok(Value::Ipv6(Ipv6Addr::from(reader.read_array::<16>()?)))
}

pub(super) fn write_ipv6(writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
    let ip = match value {
        Value::Ipv6(ip) => *ip,
        Value::Ipv4(ip) => ip.to_ipv6_mapped(),
        Value::String(s) => s
            .parse::<Ipv6Addr>()
            .map_err(|e| CodecError::InvalidValue(format!("Invalid IPv6 '{}': {}", s, e)))?,
        other => return Err(CodecError::mismatch("IPv6", other)),
    };
    writer.put_slice(&ip.octets());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::codec::{decode_value, encode_value};
    use crate::types::ClickHouseType;
    use crate::value::Value;
    use crate::CodecError;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use uuid::Uuid;

    #[test]
    fn test_string_modes() {
        let text = ClickHouseType::String { as_bytes: false };
        let raw = ClickHouseType::String { as_bytes: true };
        let bytes = encode_value(&text, &Value::from("héllo")).unwrap();
        assert_eq!(decode_value(&text, &bytes).unwrap(), Value::from("héllo"));
        assert_eq!(
            decode_value(&raw, &bytes).unwrap(),
            Value::Bytes("héllo".as_bytes().to_vec())
        );
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let text = ClickHouseType::String { as_bytes: false };
        let value = decode_value(&text, &[2, 0xFF, b'a']).unwrap();
        assert_eq!(value, Value::from("\u{FFFD}a"));
    }

    #[test]
    fn test_fixed_string_padding() {
        let ty = ClickHouseType::FixedString(4);
        let bytes = encode_value(&ty, &Value::from("ab")).unwrap();
        assert_eq!(bytes, vec![b'a', b'b', 0, 0]);
        assert_eq!(
            decode_value(&ty, &bytes).unwrap(),
            Value::Bytes(vec![b'a', b'b', 0, 0])
        );
        assert!(matches!(
            encode_value(&ty, &Value::from("abcde")),
            Err(CodecError::Overflow(_))
        ));
    }

    #[test]
    fn test_uuid_layout() {
        let uuid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        let bytes = encode_value(&ClickHouseType::Uuid, &Value::Uuid(uuid)).unwrap();
        assert_eq!(&bytes[..8], &0x0011223344556677u64.to_le_bytes());
        assert_eq!(&bytes[8..], &0x8899aabbccddeeffu64.to_le_bytes());
        assert_eq!(decode_value(&ClickHouseType::Uuid, &bytes).unwrap(), Value::Uuid(uuid));
        let from_text = encode_value(
            &ClickHouseType::Uuid,
            &Value::from("00112233-4455-6677-8899-aabbccddeeff"),
        )
        .unwrap();
        assert_eq!(from_text, bytes);
    }

    #[test]
    fn test_ip_layout() {
        let ip = Ipv4Addr::new(192, 168, 0, 1);
        let bytes = encode_value(&ClickHouseType::Ipv4, &Value::Ipv4(ip)).unwrap();
        assert_eq!(bytes, vec![1, 0, 168, 192]);
        assert_eq!(decode_value(&ClickHouseType::Ipv4, &bytes).unwrap(), Value::Ipv4(ip));

        let ip6: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let bytes = encode_value(&ClickHouseType::Ipv6, &Value::Ipv6(ip6)).unwrap();
        assert_eq!(bytes[0], 0x20);
        assert_eq!(bytes[15], 0x01);
        assert_eq!(decode_value(&ClickHouseType::Ipv6, &bytes).unwrap(), Value::Ipv6(ip6));
    }
}
