//! The per-kernel IR record

use serde::{Deserialize, Serialize};

use crate::{is_known_version, IrError, Statement};

/// One entry of a destructured parameter: `{ name: alias }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestructuredProp {
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParamDescriptor {
    #[serde(rename = "i")]
    Identifier { name: String },
    #[serde(rename = "d")]
    Destructured { props: Vec<DestructuredProp> },
}

impl ParamDescriptor {
    /// Names this parameter binds inside the body
    pub fn bound_names(&self) -> Vec<&str> {
        match self {
            ParamDescriptor::Identifier { name } => vec![name.as_str()],
            ParamDescriptor::Destructured { props } => {
                props.iter().map(|prop| prop.alias.as_str()).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelIr {
    pub v: u32,
    pub params: Vec<ParamDescriptor>,
    pub body: Statement,
    pub external_names: Vec<String>,
}

impl KernelIr {
    /// Check that the version is known and every tag in the body exists in it
    pub fn validate(&self) -> Result<(), IrError> {
        if !is_known_version(self.v) {
            return Err(IrError::UnsupportedVersion(self.v));
        }
        let mut result = Ok(());
        self.body.for_each_tag(&mut |tag| {
            if result.is_ok() && !tag.available_in(self.v) {
                result = Err(IrError::TagNotInVersion {
                    tag,
                    since: tag.since(),
                    version: self.v,
                });
            }
        });
        result
    }

    /// Lowest format version able to carry this body
    pub fn min_version(&self) -> u32 {
        let mut version = crate::BASE_VERSION;
        self.body
            .for_each_tag(&mut |tag| version = version.max(tag.since()));
        version
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "v": self.v,
            "params": self.params,
            "body": self.body.to_json(),
            "externalNames": self.external_names,
        })
    }

    /// Compact single-line JSON, the form embedded in emitted code.
    /// Keys keep the `v, params, body, externalNames` order.
    pub fn to_json_string(&self) -> String {
        // Tags, names and strings always serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, IrError> {
        let ir: KernelIr = serde_json::from_str(text)
            .map_err(|e| IrError::malformed("kernel", e.to_string()))?;
        ir.validate()?;
        Ok(ir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expression, NodeTag};
    use serde_json::json;

    fn add_kernel() -> KernelIr {
        KernelIr {
            v: 1,
            params: vec![
                ParamDescriptor::Identifier { name: "a".into() },
                ParamDescriptor::Identifier { name: "b".into() },
            ],
            body: Statement::Block(vec![Statement::Return(Some(Expression::Binary {
                lhs: Box::new(Expression::ident("a")),
                op: "+".into(),
                rhs: Box::new(Expression::ident("b")),
            }))]),
            external_names: vec![],
        }
    }

    #[test]
    fn test_kernel_json_shape() {
        assert_eq!(
            add_kernel().to_json(),
            json!({
                "v": 1,
                "params": [{"type": "i", "name": "a"}, {"type": "i", "name": "b"}],
                "body": [0, [[1, [100, "a", "+", "b"]]]],
                "externalNames": []
            })
        );
    }

    #[test]
    fn test_json_string_key_order() {
        assert_eq!(
            add_kernel().to_json_string(),
            r#"{"v":1,"params":[{"type":"i","name":"a"},{"type":"i","name":"b"}],"body":[0,[[1,[100,"a","+","b"]]]],"externalNames":[]}"#
        );
    }

    #[test]
    fn test_round_trip_through_text() {
        let ir = KernelIr {
            params: vec![ParamDescriptor::Destructured {
                props: vec![DestructuredProp {
                    name: "pos".into(),
                    alias: "p".into(),
                }],
            }],
            external_names: vec!["scale".into()],
            ..add_kernel()
        };
        let text = ir.to_json_string();
        assert!(!text.contains('\n'));
        assert_eq!(KernelIr::from_json_str(&text), Ok(ir));
    }

    #[test]
    fn test_validate_rejects_newer_tags() {
        let ir = KernelIr {
            body: Statement::Return(Some(Expression::Deref(Box::new(Expression::ident("x"))))),
            ..add_kernel()
        };
        assert_eq!(ir.min_version(), 2);
        assert_eq!(
            ir.validate(),
            Err(IrError::TagNotInVersion {
                tag: NodeTag::Deref,
                since: 2,
                version: 1
            })
        );
        assert!(KernelIr { v: 2, ..ir.clone() }.validate().is_ok());
        assert_eq!(
            KernelIr { v: 9, ..ir }.validate(),
            Err(IrError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn test_bound_names() {
        let param = ParamDescriptor::Destructured {
            props: vec![
                DestructuredProp {
                    name: "a".into(),
                    alias: "a".into(),
                },
                DestructuredProp {
                    name: "b".into(),
                    alias: "c".into(),
                },
            ],
        };
        assert_eq!(param.bound_names(), vec!["a", "c"]);
    }
}
