//! 类型注册表
//!
//! 将类型描述语法树解析为 [`ClickHouseType`]。名称匹配区分大小写，
//! 参数(精度、标度、时区、枚举成员、命名字段等)在此处校验。

use crate::json::JsonType;
use crate::settings::TypeSettings;
use crate::spec::{MAX_DATETIME64_SCALE, DEFAULT_MAX_DYNAMIC_TYPES};
use crate::temporal::parse_timezone;
use crate::types::{ClickHouseType, DecimalType, DynamicType, EnumType, GeoKind};
use crate::{CodecError, CodecResult};
use chrono_tz::Tz;
use chwire_common::{MapMode, StringMode};
use chwire_grammar::ast::unquote;
use chwire_grammar::SyntaxTreeNode;
use indexmap::IndexMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;

/// 解析类型描述字符串
///
/// # Brief
/// 语法分析后交由 [`resolve`] 构造类型对象
///
/// # Arguments
/// * `text` - 类型描述，如 `Map(String, Array(Nullable(Int32)))`
/// * `settings` - 解析设置
///
/// # Returns
/// 语法错误返回 `CodecError::Grammar`，未知类型返回 `UnsupportedType`，
/// 参数错误返回 `InvalidParameter`
pub fn parse_type_descriptor(text: &str, settings: &TypeSettings) -> CodecResult<Arc<ClickHouseType>> {
    let node = chwire_grammar::parse(text)?;
    Ok(Arc::new(resolve(&node, settings)?))
}

/// 由语法树构造类型对象
///
/// # Arguments
/// * `node` - 语法树根节点
/// * `settings` - 解析设置
pub fn resolve(node: &SyntaxTreeNode, settings: &TypeSettings) -> CodecResult<ClickHouseType> {
    let ty = resolve_node(node, settings)?;
    trace!(descriptor = %node, resolved = %ty.name(), "Resolved type");
    Ok(ty)
}

fn resolve_node(node: &SyntaxTreeNode, settings: &TypeSettings) -> CodecResult<ClickHouseType> {
    let name = node.value.as_str();
    let args = node.children.as_slice();

    let simple = match name {
        "Nothing" => Some(ClickHouseType::Nothing),
        "Bool" | "Boolean" => Some(ClickHouseType::Bool),
        "Int8" => Some(ClickHouseType::Int8),
        "Int16" => Some(ClickHouseType::Int16),
        "Int32" => Some(ClickHouseType::Int32),
        "Int64" => Some(ClickHouseType::Int64),
        "Int128" => Some(ClickHouseType::Int128),
        "Int256" => Some(ClickHouseType::Int256),
        "UInt8" => Some(ClickHouseType::UInt8),
        "UInt16" => Some(ClickHouseType::UInt16),
        "UInt32" => Some(ClickHouseType::UInt32),
        "UInt64" => Some(ClickHouseType::UInt64),
        "UInt128" => Some(ClickHouseType::UInt128),
        "UInt256" => Some(ClickHouseType::UInt256),
        "Float32" => Some(ClickHouseType::Float32),
        "Float64" => Some(ClickHouseType::Float64),
        "BFloat16" => Some(ClickHouseType::BFloat16),
        "String" => Some(ClickHouseType::String {
            as_bytes: settings.string_mode() == StringMode::Bytes,
        }),
        "UUID" => Some(ClickHouseType::Uuid),
        "IPv4" => Some(ClickHouseType::Ipv4),
        "IPv6" => Some(ClickHouseType::Ipv6),
        "Date" => Some(ClickHouseType::Date),
        "Date32" => Some(ClickHouseType::Date32),
        "Time" => Some(ClickHouseType::Time),
        "Geometry" => Some(ClickHouseType::Geometry),
        _ => GeoKind::from_name(name).map(|kind| kind.column_type()),
    };
    if let Some(ty) = simple {
        expect_args(name, args, 0, 0)?;
        return Ok(ty);
    }

    match name {
        "FixedString" => {
            expect_args(name, args, 1, 1)?;
            ClickHouseType::fixed_string(parse_number(name, &args[0])?)
        }
        "Decimal" => {
            expect_args(name, args, 1, 2)?;
            let precision = parse_number(name, &args[0])?;
            let scale = match args.get(1) {
                Some(arg) => parse_number(name, arg)?,
                None => 0,
            };
            decimal(precision, scale, settings)
        }
        "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
            expect_args(name, args, 1, 1)?;
            let precision = match name {
                "Decimal32" => 9,
                "Decimal64" => 18,
                "Decimal128" => 38,
                _ => 76,
            };
            decimal(precision, parse_number(name, &args[0])?, settings)
        }
        "DateTime" | "DateTime32" => {
            expect_args(name, args, 0, 1)?;
            let timezone = match args.first() {
                Some(arg) => Some(timezone(name, arg)?),
                None => settings.default_timezone(),
            };
            Ok(ClickHouseType::DateTime(timezone))
        }
        "DateTime64" => {
            expect_args(name, args, 1, 2)?;
            let scale = parse_scale(name, &args[0])?;
            let timezone = match args.get(1) {
                Some(arg) => Some(timezone(name, arg)?),
                None => settings.default_timezone(),
            };
            Ok(ClickHouseType::DateTime64 { scale, timezone })
        }
        "Time64" => {
            expect_args(name, args, 1, 1)?;
            Ok(ClickHouseType::Time64(parse_scale(name, &args[0])?))
        }
        "Enum8" => Ok(ClickHouseType::Enum8(EnumType::enum8(enum_members(name, args)?)?)),
        "Enum16" => Ok(ClickHouseType::Enum16(EnumType::enum16(enum_members(name, args)?)?)),
        "Array" => {
            expect_args(name, args, 1, 1)?;
            Ok(ClickHouseType::Array(Box::new(resolve(&args[0], settings)?)))
        }
        "Nullable" => {
            expect_args(name, args, 1, 1)?;
            Ok(ClickHouseType::Nullable(Box::new(resolve(&args[0], settings)?)))
        }
        "LowCardinality" => {
            expect_args(name, args, 1, 1)?;
            Ok(ClickHouseType::LowCardinality(Box::new(resolve(&args[0], settings)?)))
        }
        "Map" => {
            expect_args(name, args, 2, 2)?;
            Ok(ClickHouseType::Map {
                key: Box::new(resolve(&args[0], settings)?),
                value: Box::new(resolve(&args[1], settings)?),
                as_pairs: settings.map_mode() == MapMode::Pairs,
            })
        }
        "Tuple" => resolve_tuple(args, settings),
        "Nested" => {
            expect_args(name, args, 1, usize::MAX)?;
            let fields = named_fields(args, settings)?.ok_or_else(|| {
                CodecError::invalid_parameter(name, "every field must be named")
            })?;
            Ok(ClickHouseType::Nested(fields))
        }
        "Variant" => {
            expect_args(name, args, 1, usize::MAX)?;
            let members = args
                .iter()
                .map(|arg| resolve(arg, settings))
                .collect::<CodecResult<Vec<_>>>()?;
            ClickHouseType::variant(members)
        }
        "Dynamic" => {
            expect_args(name, args, 0, 1)?;
            let max_types = match args.first() {
                Some(arg) => match setting(arg) {
                    Some(("max_types", value)) => parse_text(name, value)?,
                    _ => {
                        return Err(CodecError::invalid_parameter(
                            name,
                            format!("unexpected argument '{}'", arg),
                        ))
                    }
                },
                None => DEFAULT_MAX_DYNAMIC_TYPES,
            };
            Ok(ClickHouseType::Dynamic(DynamicType::new(max_types, settings.clone())))
        }
        "JSON" => Ok(ClickHouseType::Json(Box::new(resolve_json(args, settings)?))),
        "Object" => {
            expect_args(name, args, 1, 1)?;
            if !unquote(&args[0].value).eq_ignore_ascii_case("json") {
                return Err(CodecError::UnsupportedType(node.to_string()));
            }
            Ok(ClickHouseType::Json(Box::new(JsonType::new(IndexMap::new(), settings.clone()))))
        }
        "QBit" => {
            expect_args(name, args, 2, 2)?;
            let element = resolve(&args[0], settings)?;
            ClickHouseType::qbit(element, parse_number(name, &args[1])?)
        }
        "SimpleAggregateFunction" => {
            expect_args(name, args, 2, 2)?;
            Ok(ClickHouseType::SimpleAggregateFunction {
                function: args[0].to_string(),
                inner: Box::new(resolve(&args[1], settings)?),
            })
        }
        "AggregateFunction" => {
            expect_args(name, args, 1, usize::MAX)?;
            let arguments = args[1..]
                .iter()
                .map(|arg| resolve(arg, settings))
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(ClickHouseType::AggregateFunction {
                function: args[0].to_string(),
                arguments,
            })
        }
        _ => Err(CodecError::UnsupportedType(node.to_string())),
    }
}

fn expect_args(name: &str, args: &[SyntaxTreeNode], min: usize, max: usize) -> CodecResult<()> {
    if args.len() < min || args.len() > max {
        let expected = match (min, max) {
            (0, 0) => "no parameters".to_string(),
            (min, usize::MAX) => format!("at least {} parameters", min),
            (min, max) if min == max => format!("{} parameters", min),
            (min, max) => format!("{} to {} parameters", min, max),
        };
        return Err(CodecError::invalid_parameter(
            name,
            format!("expected {}, got {}", expected, args.len()),
        ));
    }
    Ok(())
}

fn parse_number<T: FromStr>(type_name: &str, node: &SyntaxTreeNode) -> CodecResult<T> {
    if !node.is_leaf() {
        return Err(CodecError::invalid_parameter(
            type_name,
            format!("expected a number, got '{}'", node),
        ));
    }
    parse_text(type_name, &node.value)
}

fn parse_text<T: FromStr>(type_name: &str, text: &str) -> CodecResult<T> {
    text.trim().parse().map_err(|_| {
        CodecError::invalid_parameter(type_name, format!("expected a number, got '{}'", text.trim()))
    })
}

fn parse_scale(type_name: &str, node: &SyntaxTreeNode) -> CodecResult<u8> {
    let scale: u8 = parse_number(type_name, node)?;
    if scale > MAX_DATETIME64_SCALE {
        return Err(CodecError::invalid_parameter(
            type_name,
            format!("scale {} exceeds {}", scale, MAX_DATETIME64_SCALE),
        ));
    }
    Ok(scale)
}

fn decimal(precision: u8, scale: u8, settings: &TypeSettings) -> CodecResult<ClickHouseType> {
    Ok(ClickHouseType::Decimal(DecimalType::new(
        precision,
        scale,
        settings.decimal_mode(),
    )?))
}

fn timezone(type_name: &str, node: &SyntaxTreeNode) -> CodecResult<Tz> {
    let name = node.unquote();
    parse_timezone(&name)
        .map_err(|_| CodecError::invalid_parameter(type_name, format!("unknown timezone '{}'", name)))
}

/// 解析 `'label' = n` 形式的枚举成员，省略序号时从上一个序号递增(首个为 1)
fn enum_members(type_name: &str, args: &[SyntaxTreeNode]) -> CodecResult<Vec<(String, i16)>> {
    expect_args(type_name, args, 1, usize::MAX)?;
    let mut members = Vec::with_capacity(args.len());
    let mut next = 1i16;
    for arg in args {
        let text = arg.value.trim();
        let end = literal_end(text).filter(|_| arg.is_leaf()).ok_or_else(|| {
            CodecError::invalid_parameter(type_name, format!("expected 'label' = value, got '{}'", arg))
        })?;
        let label = unquote(&text[..end]);
        let rest = text[end..].trim();
        let ordinal = if rest.is_empty() {
            next
        } else {
            let value = rest.strip_prefix('=').ok_or_else(|| {
                CodecError::invalid_parameter(type_name, format!("expected '=' after {}", &text[..end]))
            })?;
            parse_text(type_name, value)?
        };
        next = ordinal.saturating_add(1);
        members.push((label, ordinal));
    }
    Ok(members)
}

/// 单引号字面量的结束位置(不含)
fn literal_end(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    if chars.next()?.1 != '\'' {
        return None;
    }
    let mut escaped = false;
    for (i, c) in chars {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '\'' => {
                // SQL 风格的 '' 转义
                if text[i + 1..].starts_with('\'') {
                    escaped = true;
                } else {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn resolve_tuple(args: &[SyntaxTreeNode], settings: &TypeSettings) -> CodecResult<ClickHouseType> {
    if args.is_empty() {
        return Ok(ClickHouseType::Tuple(Vec::new()));
    }
    if let Some(fields) = named_fields(args, settings)? {
        return Ok(ClickHouseType::NamedTuple(fields));
    }
    if args.iter().any(|arg| split_named(arg).is_some()) {
        return Err(CodecError::invalid_parameter(
            "Tuple",
            "cannot mix named and unnamed elements",
        ));
    }
    let items = args
        .iter()
        .map(|arg| resolve(arg, settings))
        .collect::<CodecResult<Vec<_>>>()?;
    Ok(ClickHouseType::Tuple(items))
}

/// 全部参数均为 `name Type` 时返回命名字段，否则返回 None
fn named_fields(
    args: &[SyntaxTreeNode],
    settings: &TypeSettings,
) -> CodecResult<Option<Vec<(String, ClickHouseType)>>> {
    let mut fields = Vec::with_capacity(args.len());
    for arg in args {
        let Some((name, type_node)) = split_named(arg) else {
            return Ok(None);
        };
        if fields.iter().any(|(existing, _)| *existing == name) {
            return Err(CodecError::invalid_parameter(
                "Tuple",
                format!("duplicate field name '{}'", name),
            ));
        }
        let ty = resolve(&type_node, settings)?;
        fields.push((name, ty));
    }
    Ok(Some(fields))
}

/// 拆分 `name Type`，名称可用反引号括起
fn split_named(node: &SyntaxTreeNode) -> Option<(String, SyntaxTreeNode)> {
    let text = node.value.trim();
    let (name, head) = match text.strip_prefix('`') {
        Some(rest) => {
            let mut name = String::new();
            let mut chars = rest.char_indices();
            let mut end = None;
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => name.extend(chars.next().map(|(_, c)| c)),
                    '`' => {
                        end = Some(i + 1);
                        break;
                    }
                    c => name.push(c),
                }
            }
            (name, rest[end?..].trim())
        }
        None => {
            let (name, head) = text.split_once(char::is_whitespace)?;
            (name.to_string(), head.trim())
        }
    };
    if name.is_empty() || head.is_empty() {
        return None;
    }
    Some((name, SyntaxTreeNode::new(head, node.children.clone())))
}

/// 拆分 `key=value` 形式的设置参数
fn setting(node: &SyntaxTreeNode) -> Option<(&str, &str)> {
    if !node.is_leaf() {
        return None;
    }
    let (key, value) = node.value.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn resolve_json(args: &[SyntaxTreeNode], settings: &TypeSettings) -> CodecResult<JsonType> {
    let defaults = JsonType::new(IndexMap::new(), settings.clone());
    let mut max_dynamic_paths = defaults.max_dynamic_paths;
    let mut max_dynamic_types = defaults.max_dynamic_types;
    let mut typed_paths = IndexMap::new();
    let mut skip_paths = Vec::new();
    let mut skip_regexps = Vec::new();

    for arg in args {
        let text = arg.value.trim();
        if arg.is_leaf() {
            if let Some(rest) = text.strip_prefix("SKIP REGEXP ") {
                skip_regexps.push(unquote(rest));
                continue;
            }
            if let Some(rest) = text.strip_prefix("SKIP ") {
                skip_paths.push(unquote_identifier(rest.trim()));
                continue;
            }
            match setting(arg) {
                Some(("max_dynamic_paths", value)) => {
                    max_dynamic_paths = parse_text("JSON", value)?;
                    continue;
                }
                Some(("max_dynamic_types", value)) => {
                    max_dynamic_types = parse_text("JSON", value)?;
                    continue;
                }
                _ => {}
            }
        }
        let (path, type_node) = split_named(arg).ok_or_else(|| {
            CodecError::invalid_parameter("JSON", format!("unexpected argument '{}'", arg))
        })?;
        let ty = resolve(&type_node, settings)?;
        if typed_paths.insert(path.clone(), ty).is_some() {
            return Err(CodecError::DuplicatePath(path));
        }
    }

    JsonType::new(typed_paths, settings.clone())
        .with_limits(max_dynamic_paths, max_dynamic_types)
        .with_skips(skip_paths, skip_regexps)
}

fn unquote_identifier(text: &str) -> String {
    match text.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')) {
        Some(inner) => inner.replace("\\`", "`"),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chwire_common::CodecConfig;

    fn parse(text: &str) -> CodecResult<Arc<ClickHouseType>> {
        parse_type_descriptor(text, &TypeSettings::default())
    }

    fn name_of(text: &str) -> String {
        parse(text).unwrap().name()
    }

    #[test]
    fn test_canonical_roundtrip() {
        let descriptors = [
            "Int32",
            "Array(Nullable(Int32))",
            "Map(String, Array(UInt8))",
            "Tuple(Int8, String)",
            "Tuple(id UInt64, `my field` String)",
            "Nested(a Int32, b Array(String))",
            "Decimal(38, 10)",
            "DateTime64(3, 'Europe/Amsterdam')",
            "Enum8('a' = 1, 'b''s' = 2)",
            "Enum16('x' = -1000, 'y' = 1000)",
            "LowCardinality(Nullable(String))",
            "Variant(Int64, String)",
            "Dynamic(max_types=8)",
            "JSON(max_dynamic_paths=10, a.b UInt32, c Array(String), SKIP d, SKIP REGEXP '^x.*')",
            "QBit(Float32, 16)",
            "SimpleAggregateFunction(sum, UInt64)",
            "AggregateFunction(quantiles(0.5, 0.9), UInt64)",
            "MultiPolygon",
        ];
        for descriptor in descriptors {
            let ty = parse(descriptor).unwrap();
            let reparsed = parse(&ty.name()).unwrap();
            assert_eq!(ty.name(), reparsed.name(), "{}", descriptor);
            assert_eq!(ty, reparsed, "{}", descriptor);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(name_of("Boolean"), "Bool");
        assert_eq!(name_of("DateTime32"), "DateTime");
        assert_eq!(name_of("Decimal32(4)"), "Decimal(9, 4)");
        assert_eq!(name_of("Decimal64(4)"), "Decimal(18, 4)");
        assert_eq!(name_of("Decimal128(4)"), "Decimal(38, 4)");
        assert_eq!(name_of("Decimal256(4)"), "Decimal(76, 4)");
        assert_eq!(name_of("Decimal(10)"), "Decimal(10, 0)");
        assert_eq!(name_of("Object('json')"), "JSON");
    }

    #[test]
    fn test_named_tuple() {
        let ty = parse("Tuple(id UInt64, `my field` Array(String))").unwrap();
        match ty.as_ref() {
            ClickHouseType::NamedTuple(fields) => {
                assert_eq!(fields[0].0, "id");
                assert_eq!(fields[1].0, "my field");
                assert_eq!(fields[1].1.name(), "Array(String)");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse("Tuple(a Int8, String)"),
            Err(CodecError::InvalidParameter { .. })
        ));
        assert!(matches!(
            parse("Nested(Int8, String)"),
            Err(CodecError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_enum_auto_numbering() {
        assert_eq!(name_of("Enum8('a', 'b', 'c' = 10, 'd')"), "Enum8('a' = 1, 'b' = 2, 'c' = 10, 'd' = 11)");
        assert!(matches!(parse("Enum8('a' = 200)"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("Enum8(a = 1)"), Err(CodecError::InvalidParameter { .. })));
    }

    #[test]
    fn test_errors_are_distinguished() {
        assert!(matches!(parse("Foo"), Err(CodecError::UnsupportedType(_))));
        assert!(matches!(parse("int32"), Err(CodecError::UnsupportedType(_))));
        assert!(matches!(parse("Array(Int32"), Err(CodecError::Grammar(_))));
        assert!(matches!(parse("DateTime64(10)"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("Decimal(77, 2)"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("Decimal(5, 6)"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("FixedString(x)"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("Int32(4)"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("DateTime('Mars/Base')"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("QBit(String, 4)"), Err(CodecError::InvalidParameter { .. })));
        assert!(matches!(parse("Object('other')"), Err(CodecError::UnsupportedType(_))));
    }

    #[test]
    fn test_variant_members_sorted() {
        assert_eq!(name_of("Variant(String, Array(Int8), Int64)"), "Variant(Array(Int8), Int64, String)");
        assert!(matches!(parse("Variant(Int8, Int8)"), Err(CodecError::InvalidParameter { .. })));
        let members = |n: usize| {
            (1..=n)
                .map(|i| format!("FixedString({})", i))
                .collect::<Vec<_>>()
                .join(", ")
        };
        assert!(parse(&format!("Variant({})", members(255))).is_ok());
        assert!(matches!(
            parse(&format!("Variant({})", members(256))),
            Err(CodecError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_settings_drive_resolution() {
        let config = CodecConfig {
            default_timezone: Some("Europe/Amsterdam".to_string()),
            map_mode: MapMode::Pairs,
            string_mode: StringMode::Bytes,
            ..Default::default()
        };
        let settings = TypeSettings::from_config(&config).unwrap();

        let ty = parse_type_descriptor("DateTime", &settings).unwrap();
        assert_eq!(ty.name(), "DateTime('Europe/Amsterdam')");
        let ty = parse_type_descriptor("DateTime('UTC')", &settings).unwrap();
        assert_eq!(ty.name(), "DateTime('UTC')");

        let ty = parse_type_descriptor("Map(String, Int8)", &settings).unwrap();
        match ty.as_ref() {
            ClickHouseType::Map { key, as_pairs, .. } => {
                assert!(*as_pairs);
                assert_eq!(**key, ClickHouseType::String { as_bytes: true });
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_parameters() {
        let ty = parse("JSON(max_dynamic_types=4, `a b` Int64, SKIP c.d)").unwrap();
        match ty.as_ref() {
            ClickHouseType::Json(json) => {
                assert_eq!(json.max_dynamic_types, 4);
                assert_eq!(json.max_dynamic_paths, 1024);
                assert_eq!(json.typed_paths().get("a b"), Some(&ClickHouseType::Int64));
                assert_eq!(json.skip_paths(), ["c.d".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse("JSON(a Int8, a String)"), Err(CodecError::DuplicatePath(_))));
        assert!(matches!(parse("JSON(SKIP REGEXP '[')"), Err(CodecError::InvalidParameter { .. })));
    }
}
