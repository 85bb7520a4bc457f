//! Runtime values of the host evaluator

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tgpu_ast::Function;

use crate::interp::{Env, Interpreter};
use crate::registry::SharedRegistry;
use crate::HostError;

/// Built-in function implemented in Rust; receives `this` and the arguments
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, HostError>>;

/// Nested data deeper than this is cut off when converted to JSON
const JSON_DEPTH: usize = 64;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Obj),
}

/// Shared handle to a heap object; equality is identity
#[derive(Clone)]
pub struct Obj(pub(crate) Rc<RefCell<Object>>);

pub struct Object {
    pub(crate) props: Vec<(String, Value)>,
    pub(crate) kind: ObjectKind,
}

pub(crate) enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Function(Callable),
    WeakMap(SharedRegistry),
    Error,
}

#[derive(Clone)]
pub(crate) enum Callable {
    Closure { function: Rc<Function>, env: Env },
    Native(NativeFn),
}

impl Obj {
    pub(crate) fn new(kind: ObjectKind) -> Self {
        Obj(Rc::new(RefCell::new(Object {
            props: Vec::new(),
            kind,
        })))
    }

    pub fn plain() -> Self {
        Obj::new(ObjectKind::Plain)
    }

    pub fn array(items: Vec<Value>) -> Self {
        Obj::new(ObjectKind::Array(items))
    }

    pub fn error(message: &str) -> Self {
        let obj = Obj::new(ObjectKind::Error);
        obj.set("name", Value::string("Error"));
        obj.set("message", Value::string(message));
        obj
    }

    pub fn native(f: impl Fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, HostError> + 'static) -> Self {
        Obj::new(ObjectKind::Function(Callable::Native(Rc::new(f))))
    }

    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self, key: &str) -> Value {
        let object = self.0.borrow();
        if let ObjectKind::Array(items) = &object.kind {
            if key == "length" {
                return Value::Number(items.len() as f64);
            }
            if let Some(index) = array_index(key) {
                return items.get(index).cloned().unwrap_or_default();
            }
        }
        object
            .props
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        let object = self.0.borrow();
        match &object.kind {
            ObjectKind::Array(items)
                if key == "length" || array_index(key).is_some_and(|i| i < items.len()) =>
            {
                true
            }
            _ => object.props.iter().any(|(name, _)| name == key),
        }
    }

    pub fn set(&self, key: &str, value: Value) {
        let mut object = self.0.borrow_mut();
        if let ObjectKind::Array(items) = &mut object.kind {
            if let Some(index) = array_index(key) {
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
                return;
            }
        }
        match object.props.iter_mut().find(|(name, _)| name == key) {
            Some(slot) => slot.1 = value,
            None => object.props.push((key.to_string(), value)),
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut object = self.0.borrow_mut();
        object.props.retain(|(name, _)| name != key);
        true
    }

    /// Own enumerable keys, array indices first
    pub fn keys(&self) -> Vec<String> {
        let object = self.0.borrow();
        let mut keys = match &object.kind {
            ObjectKind::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        keys.extend(object.props.iter().map(|(name, _)| name.clone()));
        keys
    }

    /// Elements when this is an array
    pub fn items(&self) -> Option<Vec<Value>> {
        match &self.0.borrow().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub(crate) fn push(&self, value: Value) -> usize {
        let mut object = self.0.borrow_mut();
        match &mut object.kind {
            ObjectKind::Array(items) => {
                items.push(value);
                items.len()
            }
            _ => 0,
        }
    }

    pub(crate) fn callable(&self) -> Option<Callable> {
        match &self.0.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        }
    }

    pub(crate) fn weak_map(&self) -> Option<SharedRegistry> {
        match &self.0.borrow().kind {
            ObjectKind::WeakMap(registry) => Some(registry.clone()),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Function(_))
    }

    pub(crate) fn is_array(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Array(_))
    }
}

fn array_index(key: &str) -> Option<usize> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse().ok()
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::String(Rc::from(text))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_obj(&self) -> Option<&Obj> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        self.as_obj().is_some_and(Obj::is_function)
    }

    /// Property read that never fails; nullish values yield `undefined`
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::String(text) if key == "length" => Value::Number(text.encode_utf16().count() as f64),
            _ => Value::Undefined,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) if obj.is_function() => "function",
            Value::Object(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Object(_) => Value::string(&self.to_string()).to_number(),
        }
    }

    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Object(_), Value::Object(_)) => self.strict_eq(other),
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.to_number() == other.to_number(),
        }
    }

    /// Plain data view; functions and `undefined` become `null`
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> serde_json::Value {
        use serde_json::Value as Json;
        if depth > JSON_DEPTH {
            return Json::Null;
        }
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Json::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.to_string()),
            Value::Object(obj) if obj.is_function() => Json::Null,
            Value::Object(obj) => match obj.items() {
                Some(items) => Json::Array(items.iter().map(|v| v.to_json_at(depth + 1)).collect()),
                None => Json::Object(
                    obj.keys()
                        .into_iter()
                        .map(|key| {
                            let value = obj.get(&key).to_json_at(depth + 1);
                            (key, value)
                        })
                        .collect(),
                ),
            },
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::string(s),
            Json::Array(items) => Value::Object(Obj::array(items.iter().map(Value::from_json).collect())),
            Json::Object(map) => {
                let obj = Obj::plain();
                for (key, value) in map {
                    obj.set(key, Value::from_json(value));
                }
                Value::Object(obj)
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Obj> for Value {
    fn from(obj: Obj) -> Self {
        Value::Object(obj)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Object(obj) => write!(f, "{}", obj),
        }
    }
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(items) = self.items() {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    Value::Object(obj) if obj.is_array() => "[array]".to_string(),
                    other => other.to_string(),
                })
                .collect();
            return f.write_str(&parts.join(","));
        }
        let label = match &self.0.borrow().kind {
            ObjectKind::Error => None,
            ObjectKind::Function(_) => Some("function"),
            ObjectKind::WeakMap(_) => Some("[object WeakMap]"),
            _ => Some("[object Object]"),
        };
        match label {
            Some(label) => f.write_str(label),
            None => write!(f, "{}: {}", self.get("name"), self.get("message")),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_properties() {
        let array = Obj::array(vec![Value::Number(1.0)]);
        array.set("2", Value::string("x"));
        assert_eq!(array.get("length"), Value::Number(3.0));
        assert_eq!(array.get("1"), Value::Undefined);
        assert_eq!(array.to_string(), "1,,x");
    }

    #[test]
    fn test_equality() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(Value::string("2").loose_eq(&Value::Number(2.0)));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        let obj = Obj::plain();
        assert_eq!(Value::Object(obj.clone()), Value::Object(obj));
        assert_ne!(Value::Object(Obj::plain()), Value::Object(Obj::plain()));
    }

    #[test]
    fn test_json_conversion() {
        let data = json!({ "v": 2, "params": [{ "type": "i", "name": "a" }], "ok": true, "x": 0.5 });
        let value = Value::from_json(&data);
        assert_eq!(value.to_json(), data);
        assert_eq!(value.get("params").get("0").get("name"), Value::string("a"));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-0.25), "-0.25");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }
}
