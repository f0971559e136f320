//! Copy a returned V8 value out of the isolate as a [`ScriptValue`] tree.

use crate::error::SandboxError;
use crate::value::ScriptValue;
use deno_core::v8;

/// Nesting below this depth is reported as opaque.
pub const MAX_DEPTH: usize = 64;

/// Upper bound on nodes copied out of one result. Shared references are copied once per
/// occurrence, so this also bounds results built from aliased subtrees. Going over it is
/// reported as [`SandboxError::ResultTooLarge`], not as a heap failure.
pub const MAX_NODES: usize = 100_000;

pub struct Extractor<'s> {
    object_prototype: v8::Local<'s, v8::Value>,
    nodes: usize,
}

impl<'s> Extractor<'s> {
    pub fn new(scope: &mut v8::HandleScope<'s>) -> Option<Self> {
        // Plain objects are exactly those whose prototype is the realm's Object.prototype.
        let object_prototype = v8::Object::new(scope).get_prototype(scope)?;
        Some(Self {
            object_prototype,
            nodes: 0,
        })
    }

    pub fn extract(
        &mut self,
        scope: &mut v8::HandleScope<'s>,
        value: v8::Local<'s, v8::Value>,
    ) -> Result<ScriptValue, SandboxError> {
        self.walk(scope, value, 0)
    }

    fn walk(
        &mut self,
        scope: &mut v8::HandleScope<'s>,
        value: v8::Local<'s, v8::Value>,
        depth: usize,
    ) -> Result<ScriptValue, SandboxError> {
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(SandboxError::ResultTooLarge {
                max_nodes: MAX_NODES,
            });
        }

        if value.is_undefined() {
            return Ok(ScriptValue::Undefined);
        }
        if value.is_null() {
            return Ok(ScriptValue::Null);
        }
        if value.is_boolean() {
            return Ok(ScriptValue::Bool(value.is_true()));
        }
        if value.is_number() {
            let number = v8::Local::<v8::Number>::try_from(value)
                .map(|n| n.value())
                .unwrap_or(f64::NAN);
            return Ok(ScriptValue::Number(number));
        }
        if value.is_string() {
            return Ok(ScriptValue::String(value.to_rust_string_lossy(scope)));
        }
        if let Some(kind) = opaque_kind(value) {
            return Ok(ScriptValue::Opaque(kind));
        }
        if depth >= MAX_DEPTH {
            return Ok(ScriptValue::Opaque("nested too deep"));
        }

        if value.is_array() {
            let array = v8::Local::<v8::Array>::try_from(value).map_err(|_| unreadable())?;
            let mut items = Vec::new();
            for index in 0..array.length() {
                let item = array.get_index(scope, index).ok_or_else(unreadable)?;
                items.push(self.walk(scope, item, depth + 1)?);
            }
            return Ok(ScriptValue::Array(items));
        }

        let object = v8::Local::<v8::Object>::try_from(value).map_err(|_| unreadable())?;
        match object.get_prototype(scope) {
            Some(proto) if proto.strict_equals(self.object_prototype) => {}
            _ => return Ok(ScriptValue::Opaque("object instance")),
        }

        let names = object
            .get_own_property_names(
                scope,
                v8::GetPropertyNamesArgs {
                    key_conversion: v8::KeyConversionMode::ConvertToString,
                    ..Default::default()
                },
            )
            .ok_or_else(unreadable)?;
        let mut entries = Vec::new();
        for index in 0..names.length() {
            let key = names.get_index(scope, index).ok_or_else(unreadable)?;
            let name = key.to_rust_string_lossy(scope);
            let item = object.get(scope, key).ok_or_else(unreadable)?;
            entries.push((name, self.walk(scope, item, depth + 1)?));
        }
        Ok(ScriptValue::Object(entries))
    }
}

/// Kinds that never cross the boundary. Checked before arrays so a proxied array stays opaque.
fn opaque_kind(value: v8::Local<v8::Value>) -> Option<&'static str> {
    let kind = if value.is_proxy() {
        "proxy"
    } else if value.is_function() {
        "function"
    } else if value.is_symbol() {
        "symbol"
    } else if value.is_big_int() {
        "bigint"
    } else if value.is_promise() {
        "promise"
    } else if value.is_date() {
        "date"
    } else if value.is_reg_exp() {
        "regexp"
    } else if value.is_map() || value.is_weak_map() {
        "map"
    } else if value.is_set() || value.is_weak_set() {
        "set"
    } else if value.is_array_buffer() || value.is_array_buffer_view() {
        "buffer"
    } else if value.is_native_error() {
        "error"
    } else if !value.is_object() {
        "unknown"
    } else {
        return None;
    };
    Some(kind)
}

/// A property read returned nothing: a getter threw or execution was terminated.
fn unreadable() -> SandboxError {
    SandboxError::runtime("Validation result could not be read")
}
