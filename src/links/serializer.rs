//! Wire serialization of WDL values
//!
//! Primitives map onto JSON scalars. Composites map onto JSON objects and
//! arrays with fixed shapes: pairs are `{"left", "right"}`, maps are
//! `{"keys": [...], "values": [...]}` (keys may be any type), structs are
//! objects keyed by member name. Platform fields only hold native types, so a
//! composite travels as `{"___": v}` next to a `<name>___dxfiles` field listing
//! every file inside it.

use super::{DxLink, WdlVarLinks, ESCAPE_KEY, FLAT_FILES_SUFFIX};
use crate::dx::{is_native_dx_type, DxFile, FileInfoCache, DX_URI_PREFIX};
use crate::error::WdlError;
use crate::types::Type;
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Map as JsonMap, Number, Value as JsonValue};
use tracing::debug;

/// Converts values to wire JSON.
///
/// With a [`FileInfoCache`] attached, every remote file is checked to be live
/// while serializing; the cache must already hold its description.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireSerializer<'a> {
    files: Option<&'a FileInfoCache>,
}

impl<'a> WireSerializer<'a> {
    pub fn new() -> Self {
        Self { files: None }
    }

    pub fn with_file_checks(files: &'a FileInfoCache) -> Self {
        Self { files: Some(files) }
    }

    pub fn to_wire(&self, wdl_type: &Type, value: &Value) -> Result<JsonValue, WdlError> {
        if wdl_type.contains_double_optional() {
            return Err(WdlError::double_optional(wdl_type, value));
        }
        self.encode(wdl_type, value)
    }

    fn encode(&self, wdl_type: &Type, value: &Value) -> Result<JsonValue, WdlError> {
        if value.is_double_optional() {
            return Err(WdlError::double_optional(wdl_type, value));
        }
        match (wdl_type, value) {
            (Type::Optional(_), Value::Null) => Ok(JsonValue::Null),
            (Type::Optional(inner), Value::Optional(v)) => self.encode(inner, v),

            (Type::Boolean, Value::Boolean(b)) => Ok(JsonValue::Bool(*b)),
            (Type::Int, Value::Int(n)) => Ok(json!(n)),
            (Type::Float, Value::Float(x)) => float_to_wire(wdl_type, value, *x),
            (Type::Float, Value::Int(n)) => float_to_wire(wdl_type, value, *n as f64),
            (Type::String, Value::String(s)) => Ok(JsonValue::String(s.clone())),
            (Type::File, Value::File(path) | Value::String(path)) => {
                self.file_to_wire(wdl_type, value, path)
            }

            (Type::Boolean, Value::String(s)) => match s.trim() {
                "true" => Ok(JsonValue::Bool(true)),
                "false" => Ok(JsonValue::Bool(false)),
                _ => Err(WdlError::unsupported_conversion(wdl_type, value)),
            },
            (Type::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(|n| json!(n))
                .map_err(|_| WdlError::unsupported_conversion(wdl_type, value)),
            (Type::Float, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(x) => float_to_wire(wdl_type, value, x),
                Err(_) => Err(WdlError::unsupported_conversion(wdl_type, value)),
            },

            (Type::Array { item_type, .. }, Value::Array(items)) => {
                let items = items
                    .iter()
                    .map(|item| self.encode(item_type, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(JsonValue::Array(items))
            }
            (
                Type::Map {
                    key_type,
                    value_type,
                },
                Value::Map(pairs),
            ) => {
                let mut keys = Vec::with_capacity(pairs.len());
                let mut values = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    keys.push(self.encode(key_type, k)?);
                    values.push(self.encode(value_type, v)?);
                }
                Ok(json!({ "keys": keys, "values": values }))
            }
            (
                Type::Pair {
                    left_type,
                    right_type,
                },
                Value::Pair { left, right },
            ) => Ok(json!({
                "left": self.encode(left_type, left)?,
                "right": self.encode(right_type, right)?,
            })),
            (Type::Struct { members: types, .. }, Value::Struct { members, .. }) => {
                let mut fields = JsonMap::new();
                for (name, member) in members {
                    let member_type = types
                        .get(name)
                        .ok_or_else(|| WdlError::missing_struct_field(name.clone(), wdl_type, value))?;
                    fields.insert(name.clone(), self.encode(member_type, member)?);
                }
                // optional members must be present too, as `Null`
                if let Some(name) = types.keys().find(|name| !members.contains_key(*name)) {
                    return Err(WdlError::missing_struct_field(name.clone(), wdl_type, value));
                }
                Ok(JsonValue::Object(fields))
            }

            _ => Err(WdlError::unsupported_conversion(wdl_type, value)),
        }
    }

    fn file_to_wire(
        &self,
        wdl_type: &Type,
        value: &Value,
        path: &str,
    ) -> Result<JsonValue, WdlError> {
        match DxFile::parse_uri(path) {
            Some(file) => {
                if let Some(cache) = self.files {
                    cache.ensure_live(&file)?;
                }
                Ok(file.to_wire_reference())
            }
            // a link has nowhere to keep anything past the file id
            None if path.starts_with(DX_URI_PREFIX) => {
                Err(WdlError::unsupported_conversion(wdl_type, value))
            }
            None => Ok(JsonValue::String(path.to_string())),
        }
    }
}

fn float_to_wire(wdl_type: &Type, value: &Value, x: f64) -> Result<JsonValue, WdlError> {
    Number::from_f64(x)
        .map(JsonValue::Number)
        .ok_or_else(|| WdlError::unsupported_conversion(wdl_type, value))
}

/// Serialize without file state checks.
pub fn to_wire(wdl_type: &Type, value: &Value) -> Result<JsonValue, WdlError> {
    WireSerializer::new().to_wire(wdl_type, value)
}

/// Decode wire JSON as a value of `wdl_type`.
pub fn from_wire(wdl_type: &Type, json: &JsonValue) -> Result<Value, WdlError> {
    if wdl_type.contains_double_optional() {
        return Err(WdlError::double_optional(wdl_type, json));
    }
    decode(wdl_type, json)
}

fn decode(wdl_type: &Type, json: &JsonValue) -> Result<Value, WdlError> {
    let json = unwrap_escape(wdl_type, json)?;
    match wdl_type {
        Type::Optional(inner) => match json {
            JsonValue::Null => Ok(Value::Null),
            other => Ok(Value::some(decode(inner, other)?)),
        },
        Type::Boolean => match json {
            JsonValue::Bool(b) => Ok(Value::boolean(*b)),
            JsonValue::String(s) if s == "true" || s == "false" => Ok(Value::boolean(s == "true")),
            _ => Err(WdlError::unsupported_conversion(wdl_type, json)),
        },
        Type::Int => match json {
            JsonValue::Number(n) => n
                .as_i64()
                .map(Value::int)
                .ok_or_else(|| WdlError::unsupported_conversion(wdl_type, json)),
            JsonValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::int)
                .map_err(|_| WdlError::unsupported_conversion(wdl_type, json)),
            _ => Err(WdlError::unsupported_conversion(wdl_type, json)),
        },
        Type::Float => match json {
            JsonValue::Number(n) => n
                .as_f64()
                .map(Value::float)
                .ok_or_else(|| WdlError::unsupported_conversion(wdl_type, json)),
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::float)
                .map_err(|_| WdlError::unsupported_conversion(wdl_type, json)),
            _ => Err(WdlError::unsupported_conversion(wdl_type, json)),
        },
        Type::String => match json {
            JsonValue::String(s) => Ok(Value::string(s.clone())),
            _ => Err(WdlError::unsupported_conversion(wdl_type, json)),
        },
        Type::File => match json {
            JsonValue::String(path) => Ok(Value::file(path.clone())),
            other => DxFile::from_wire_reference(other)
                .map(|file| Value::file(file.to_uri()))
                .ok_or_else(|| WdlError::unsupported_conversion(wdl_type, json)),
        },
        Type::Array { item_type, .. } => match json {
            JsonValue::Array(items) => Ok(Value::array(
                items
                    .iter()
                    .map(|item| decode(item_type, item))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            _ => Err(WdlError::unsupported_conversion(wdl_type, json)),
        },
        Type::Map {
            key_type,
            value_type,
        } => {
            let (keys, values) = match (json.get("keys"), json.get("values")) {
                (Some(JsonValue::Array(keys)), Some(JsonValue::Array(values))) => (keys, values),
                _ => return Err(WdlError::unsupported_conversion(wdl_type, json)),
            };
            if keys.len() != values.len() {
                return Err(WdlError::MapLengthMismatch {
                    keys: keys.len(),
                    values: values.len(),
                    wdl_type: wdl_type.to_string(),
                    value: json.to_string(),
                });
            }
            let pairs = keys
                .iter()
                .zip(values)
                .map(|(k, v)| Ok((decode(key_type, k)?, decode(value_type, v)?)))
                .collect::<Result<Vec<_>, WdlError>>()?;
            Ok(Value::map(pairs))
        }
        Type::Pair {
            left_type,
            right_type,
        } => match (json.get("left"), json.get("right")) {
            (Some(left), Some(right)) => Ok(Value::pair(
                decode(left_type, left)?,
                decode(right_type, right)?,
            )),
            _ => Err(WdlError::unsupported_conversion(wdl_type, json)),
        },
        Type::Struct { type_name, members } => {
            let fields = json
                .as_object()
                .ok_or_else(|| WdlError::unsupported_conversion(wdl_type, json))?;
            if let Some(unknown) = fields.keys().find(|name| !members.contains_key(*name)) {
                return Err(WdlError::missing_struct_field(unknown.clone(), wdl_type, json));
            }
            let mut decoded = IndexMap::new();
            for (name, member_type) in members {
                let member = match fields.get(name) {
                    Some(field) => decode(member_type, field)?,
                    None if member_type.is_optional() => Value::Null,
                    None => {
                        return Err(WdlError::missing_struct_field(name.clone(), wdl_type, json))
                    }
                };
                decoded.insert(name.clone(), member);
            }
            Ok(Value::struct_value(type_name.clone(), decoded))
        }
    }
}

/// Strip the `{"___": v}` wrapper of a structured field value.
fn unwrap_escape<'j>(wdl_type: &Type, json: &'j JsonValue) -> Result<&'j JsonValue, WdlError> {
    match json {
        JsonValue::Object(fields) => match fields.get(ESCAPE_KEY) {
            Some(inner) if fields.len() == 1 => Ok(inner),
            Some(_) => Err(WdlError::MalformedEscapeHash {
                wdl_type: wdl_type.to_string(),
                value: json.to_string(),
            }),
            None => Ok(json),
        },
        other => Ok(other),
    }
}

/// Every remote file link inside `json`, deduplicated, in discovery order.
pub fn find_dx_files(json: &JsonValue) -> Vec<DxFile> {
    let mut found = IndexSet::new();
    collect_files(json, &mut found);
    found.into_iter().collect()
}

fn collect_files(json: &JsonValue, found: &mut IndexSet<DxFile>) {
    if let Some(file) = DxFile::from_wire_reference(json) {
        found.insert(file);
        return;
    }
    match json {
        JsonValue::Array(items) => items.iter().for_each(|item| collect_files(item, found)),
        JsonValue::Object(fields) => fields.values().for_each(|field| collect_files(field, found)),
        _ => {}
    }
}

/// Replace `.` with `___` so dotted names are valid platform field names.
///
/// Names already containing `___` cannot be decoded again and are rejected.
pub fn encode_dots(name: &str) -> Result<String, WdlError> {
    if name.contains(ESCAPE_KEY) {
        return Err(WdlError::InvalidVarName {
            name: name.to_string(),
        });
    }
    Ok(name.replace('.', ESCAPE_KEY))
}

pub fn decode_dots(name: &str) -> String {
    name.replace(ESCAPE_KEY, ".")
}

fn field_name(name: &str, encode: bool) -> Result<String, WdlError> {
    if encode {
        encode_dots(name)
    } else {
        Ok(name.to_string())
    }
}

/// Platform fields carrying `links` under `name`.
///
/// Native types take a single field. Anything else takes the escaped value
/// plus a `<name>___dxfiles` field listing its files, so the platform can
/// stage them.
pub fn gen_fields(
    links: &WdlVarLinks,
    name: &str,
    encode: bool,
) -> Result<Vec<(String, JsonValue)>, WdlError> {
    let field = field_name(name, encode)?;

    if is_native_dx_type(&links.wdl_type) {
        let json = match &links.link {
            DxLink::Value(json) => json.clone(),
            other => other
                .port_reference("")
                .ok_or_else(|| WdlError::unsupported_operation(other.kind(), "gen_fields"))?,
        };
        return Ok(vec![(field, json)]);
    }

    let files_field = format!("{}{}", field, FLAT_FILES_SUFFIX);
    let fields = match &links.link {
        DxLink::Value(json) => {
            let files: Vec<JsonValue> = find_dx_files(json)
                .iter()
                .map(DxFile::to_wire_reference)
                .collect();
            debug!(field = %field, files = files.len(), "escaping structured value");
            vec![
                (field, json!({ ESCAPE_KEY: json })),
                (files_field, JsonValue::Array(files)),
            ]
        }
        other => {
            let value_ref = other.port_reference("");
            let files_ref = other.port_reference(FLAT_FILES_SUFFIX);
            match (value_ref, files_ref) {
                (Some(value_ref), Some(files_ref)) => {
                    vec![(field, value_ref), (files_field, files_ref)]
                }
                _ => return Err(WdlError::unsupported_operation(other.kind(), "gen_fields")),
            }
        }
    };
    Ok(fields)
}

/// Read the value stored under `name` in a stage's field object.
pub fn read_field(
    fields: &JsonMap<String, JsonValue>,
    name: &str,
    wdl_type: &Type,
    encode: bool,
) -> Result<Value, WdlError> {
    let field = field_name(name, encode)?;
    match fields.get(&field) {
        Some(json) => from_wire(wdl_type, json),
        None if wdl_type.is_optional() => Ok(Value::Null),
        None => Err(WdlError::platform(format!("no field {} in stage fields", field))),
    }
}
