//! 几何类型的读写
//!
//! Point = Tuple(Float64, Float64)；Ring / LineString = Array(Point)；
//! Polygon / MultiLineString = Array(Ring / LineString)；MultiPolygon = Array(Polygon)。
//! Geometry 是上述种类的标记联合，判别字节按种类名称排序，0xFF 表示 NULL。

use super::ClickHouseType;
use crate::codec::{BinaryReader, BinaryWriter};
use crate::spec::NULL_DISCRIMINATOR;
use crate::value::Value;
use crate::{CodecError, CodecResult};

/// 几何种类，声明顺序即 Geometry 判别字节的顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeoKind {
    LineString,
    MultiLineString,
    MultiPolygon,
    Point,
    Polygon,
    Ring,
}

impl GeoKind {
    pub const ALL: [GeoKind; 6] = [
        GeoKind::LineString,
        GeoKind::MultiLineString,
        GeoKind::MultiPolygon,
        GeoKind::Point,
        GeoKind::Polygon,
        GeoKind::Ring,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GeoKind::LineString => "LineString",
            GeoKind::MultiLineString => "MultiLineString",
            GeoKind::MultiPolygon => "MultiPolygon",
            GeoKind::Point => "Point",
            GeoKind::Polygon => "Polygon",
            GeoKind::Ring => "Ring",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn discriminator(&self) -> u8 {
        *self as u8
    }

    pub fn from_discriminator(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// 对应的独立几何类型
    pub fn column_type(&self) -> ClickHouseType {
        match self {
            GeoKind::LineString => ClickHouseType::LineString,
            GeoKind::MultiLineString => ClickHouseType::MultiLineString,
            GeoKind::MultiPolygon => ClickHouseType::MultiPolygon,
            GeoKind::Point => ClickHouseType::Point,
            GeoKind::Polygon => ClickHouseType::Polygon,
            GeoKind::Ring => ClickHouseType::Ring,
        }
    }

    /// 数组嵌套层数(Point 为 0)
    fn depth(&self) -> usize {
        match self {
            GeoKind::Point => 0,
            GeoKind::Ring | GeoKind::LineString => 1,
            GeoKind::Polygon | GeoKind::MultiLineString => 2,
            GeoKind::MultiPolygon => 3,
        }
    }
}

pub(super) fn read_shape(depth: usize, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
    if depth == 0 {
        let x = reader.read_f64()?;
        let y = reader.read_f64()?;
        return Ok(Value::Tuple(vec![Value::Float64(x), Value::Float64(y)]));
    }
    reader.enter()?;
    let count = reader.read_length()?;
    let mut items = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        items.push(read_shape(depth - 1, reader)?);
    }
    reader.leave();
    Ok(Value::Array(items))
}

/// 写入几何形状；也接受种类匹配的 `Value::Geometry`
pub(super) fn write_shape(
    depth: usize,
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    if let Value::Geometry(kind, inner) = value {
        if kind.depth() != depth {
            return Err(CodecError::mismatch(shape_name(depth), value));
        }
        return write_shape(depth, writer, inner);
    }
    if depth == 0 {
        let coords = match value {
            Value::Tuple(items) | Value::Array(items) if items.len() == 2 => items,
            other => return Err(CodecError::mismatch("Point", other)),
        };
        writer.put_f64(coords[0].to_f64()?);
        writer.put_f64(coords[1].to_f64()?);
        return Ok(());
    }
    let items = match value {
        Value::Array(items) => items,
        other => return Err(CodecError::mismatch(shape_name(depth), other)),
    };
    writer.enter()?;
    writer.put_varint(items.len() as u64);
    for item in items {
        write_shape(depth - 1, writer, item)?;
    }
    writer.leave();
    Ok(())
}

fn shape_name(depth: usize) -> &'static str {
    match depth {
        0 => "Point",
        1 => "Ring or LineString",
        2 => "Polygon or MultiLineString",
        _ => "MultiPolygon",
    }
}

pub(super) fn read_geometry(reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
    let discriminator = reader.read_u8()?;
    if discriminator == NULL_DISCRIMINATOR {
        return Ok(Value::Null);
    }
    let kind = GeoKind::from_discriminator(discriminator).ok_or_else(|| {
        CodecError::InvalidData(format!("Unknown Geometry discriminator {}", discriminator))
    })?;
    let inner = read_shape(kind.depth(), reader)?;
    Ok(Value::Geometry(kind, Box::new(inner)))
}

/// 写入 Geometry；未标记种类的二元组按 Point 处理
pub(super) fn write_geometry(writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
    let (kind, inner) = match value {
        Value::Null => {
            writer.put_u8(NULL_DISCRIMINATOR);
            return Ok(());
        }
        Value::Geometry(kind, inner) => (*kind, inner.as_ref()),
        Value::Tuple(items) if items.len() == 2 => (GeoKind::Point, value),
        other => return Err(CodecError::mismatch("Geometry", other)),
    };
    writer.put_u8(kind.discriminator());
    write_shape(kind.depth(), writer, inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_value, encode_value};

    fn point(x: f64, y: f64) -> Value {
        Value::Tuple(vec![Value::Float64(x), Value::Float64(y)])
    }

    #[test]
    fn test_discriminators_sorted_by_name() {
        let mut names: Vec<&str> = GeoKind::ALL.iter().map(|k| k.name()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);
        assert_eq!(GeoKind::Point.discriminator(), 3);
        assert_eq!(GeoKind::from_name("Ring"), Some(GeoKind::Ring));
    }

    #[test]
    fn test_point_and_ring_roundtrip() {
        let bytes = encode_value(&ClickHouseType::Point, &point(1.5, -2.0)).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_value(&ClickHouseType::Point, &bytes).unwrap(), point(1.5, -2.0));

        let ring = Value::Array(vec![point(0.0, 0.0), point(1.0, 0.0), point(0.0, 1.0)]);
        let bytes = encode_value(&ClickHouseType::Ring, &ring).unwrap();
        assert_eq!(bytes[0], 3);
        assert_eq!(decode_value(&ClickHouseType::Ring, &bytes).unwrap(), ring);
    }

    #[test]
    fn test_multipolygon_roundtrip() {
        let ring = Value::Array(vec![point(0.0, 0.0), point(1.0, 1.0)]);
        let polygon = Value::Array(vec![ring]);
        let multi = Value::Array(vec![polygon.clone(), polygon]);
        let bytes = encode_value(&ClickHouseType::MultiPolygon, &multi).unwrap();
        assert_eq!(decode_value(&ClickHouseType::MultiPolygon, &bytes).unwrap(), multi);
    }

    #[test]
    fn test_geometry_roundtrip() {
        let line = Value::Geometry(
            GeoKind::LineString,
            Box::new(Value::Array(vec![point(0.0, 0.0), point(2.0, 2.0)])),
        );
        let bytes = encode_value(&ClickHouseType::Geometry, &line).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(decode_value(&ClickHouseType::Geometry, &bytes).unwrap(), line);

        let bytes = encode_value(&ClickHouseType::Geometry, &point(3.0, 4.0)).unwrap();
        assert_eq!(bytes[0], 3);
        assert_eq!(
            decode_value(&ClickHouseType::Geometry, &bytes).unwrap(),
            Value::Geometry(GeoKind::Point, Box::new(point(3.0, 4.0)))
        );

        assert_eq!(encode_value(&ClickHouseType::Geometry, &Value::Null).unwrap(), vec![0xFF]);
        assert_eq!(decode_value(&ClickHouseType::Geometry, &[0xFF]).unwrap(), Value::Null);
        assert!(matches!(
            decode_value(&ClickHouseType::Geometry, &[9]),
            Err(CodecError::InvalidData(_))
        ));
    }

    #[test]
    fn test_geometry_kind_mismatch() {
        let tagged = Value::Geometry(GeoKind::Polygon, Box::new(Value::Array(vec![])));
        assert!(encode_value(&ClickHouseType::Ring, &tagged).is_err());
        assert!(encode_value(&ClickHouseType::Polygon, &tagged).is_ok());
    }
}
