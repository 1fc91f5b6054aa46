//! ABI encoding of constructor arguments.
//!
//! Constructor arguments are written as loosely typed literals (strings,
//! numbers, nested lists) and coerced against the parameter types declared
//! in the contract's ABI before encoding.

use std::str::FromStr;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi::JsonAbi,
    primitives::{hex, Address, Bytes, B256, I256, U256},
};
use serde_json::Value;

use crate::errors::ScriptError;

/// The constructor arguments of a single deployment.
///
/// The arguments are encoded once; the deployment transaction and the
/// verification request both read from the same instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArgs {
    /// The literal arguments, in declaration order
    values: Vec<Value>,
    /// The ABI encoding of the arguments
    encoded: Bytes,
}

impl ConstructorArgs {
    /// Coerce `values` against the constructor declared in `abi` and encode them
    pub fn new(abi: &JsonAbi, values: Vec<Value>) -> Result<Self, ScriptError> {
        let inputs = abi.constructor.as_ref().map(|c| c.inputs.as_slice()).unwrap_or_default();
        if inputs.len() != values.len() {
            return Err(ScriptError::CalldataConstruction(format!(
                "constructor takes {} arguments, got {}",
                inputs.len(),
                values.len()
            )));
        }

        let coerced = inputs
            .iter()
            .zip(values.iter())
            .map(|(param, value)| {
                let ty = param
                    .resolve()
                    .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
                coerce(&ty, value).map_err(|e| match e {
                    ScriptError::CalldataConstruction(msg) => ScriptError::CalldataConstruction(
                        format!("argument `{}`: {}", param.name, msg),
                    ),
                    e => e,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let encoded = DynSolValue::Tuple(coerced).abi_encode_params().into();
        Ok(Self { values, encoded })
    }

    /// The literal arguments, in declaration order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The ABI encoding of the arguments
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    /// The ABI encoding in hex, without a `0x` prefix, as explorers expect it
    pub fn encoded_hex(&self) -> String {
        hex::encode(&self.encoded)
    }
}

/// Coerce a literal into a value of the given Solidity type
pub fn coerce(ty: &DynSolType, value: &Value) -> Result<DynSolValue, ScriptError> {
    let mismatch = || {
        ScriptError::CalldataConstruction(format!("expected {}, got {}", ty.sol_type_name(), value))
    };

    match ty {
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) if s == "true" || s == "false" => Ok(DynSolValue::Bool(s == "true")),
            _ => Err(mismatch()),
        },
        DynSolType::Uint(bits) => {
            let uint = parse_uint(value).ok_or_else(mismatch)?;
            if *bits < 256 && uint.bit_len() > *bits {
                return Err(out_of_range(ty, value));
            }
            Ok(DynSolValue::Uint(uint, *bits))
        }
        DynSolType::Int(bits) => {
            let int = parse_int(value).ok_or_else(mismatch)?;
            if *bits < 256 {
                let limit = U256::from(1) << (*bits - 1);
                let magnitude = int.unsigned_abs();
                let fits = if int.is_negative() { magnitude <= limit } else { magnitude < limit };
                if !fits {
                    return Err(out_of_range(ty, value));
                }
            }
            Ok(DynSolValue::Int(int, *bits))
        }
        DynSolType::Address => {
            let s = value.as_str().ok_or_else(mismatch)?;
            let address = Address::from_str(s).map_err(|_| mismatch())?;
            Ok(DynSolValue::Address(address))
        }
        DynSolType::String => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Ok(DynSolValue::String(s.to_string()))
        }
        DynSolType::Bytes => {
            let s = value.as_str().ok_or_else(mismatch)?;
            let bytes = hex::decode(s).map_err(|_| mismatch())?;
            Ok(DynSolValue::Bytes(bytes))
        }
        DynSolType::FixedBytes(size) => {
            let s = value.as_str().ok_or_else(mismatch)?;
            let bytes = hex::decode(s).map_err(|_| mismatch())?;
            if bytes.len() != *size {
                return Err(mismatch());
            }
            let mut word = B256::ZERO;
            word[..*size].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(word, *size))
        }
        DynSolType::Array(inner) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            let values = items.iter().map(|item| coerce(inner, item)).collect::<Result<_, _>>()?;
            Ok(DynSolValue::Array(values))
        }
        DynSolType::FixedArray(inner, len) => {
            let items = value.as_array().filter(|items| items.len() == *len).ok_or_else(mismatch)?;
            let values = items.iter().map(|item| coerce(inner, item)).collect::<Result<_, _>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        DynSolType::Tuple(types) => {
            let items =
                value.as_array().filter(|items| items.len() == types.len()).ok_or_else(mismatch)?;
            let values = types
                .iter()
                .zip(items.iter())
                .map(|(ty, item)| coerce(ty, item))
                .collect::<Result<_, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }
        _ => Err(ScriptError::CalldataConstruction(format!(
            "unsupported constructor parameter type {}",
            ty.sol_type_name()
        ))),
    }
}

/// Parse an unsigned integer from a JSON number or a decimal / `0x` hex string
fn parse_uint(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => U256::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Parse a signed integer from a JSON number or a decimal string
fn parse_int(value: &Value) -> Option<I256> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| I256::from_dec_str(&n.to_string()).ok()),
        Value::String(s) => I256::from_dec_str(s.trim()).ok(),
        _ => None,
    }
}

/// The error for an integer literal that does not fit its declared type
fn out_of_range(ty: &DynSolType, value: &Value) -> ScriptError {
    ScriptError::CalldataConstruction(format!("{} does not fit in {}", value, ty.sol_type_name()))
}

#[cfg(test)]
mod tests {
    use alloy::{
        dyn_abi::{DynSolType, DynSolValue},
        json_abi::JsonAbi,
        primitives::{address, Address, B256, U256},
        sol_types::{sol_data, SolType, SolValue},
    };
    use serde_json::json;

    use crate::errors::ScriptError;

    use super::{coerce, ConstructorArgs};

    /// Build an ABI holding only a constructor with the given parameter types
    fn constructor_abi(types: &[&str]) -> JsonAbi {
        let inputs = types
            .iter()
            .enumerate()
            .map(|(i, ty)| json!({ "name": format!("arg{i}"), "type": ty, "internalType": ty }))
            .collect::<Vec<_>>();
        serde_json::from_value(json!([{
            "type": "constructor",
            "inputs": inputs,
            "stateMutability": "nonpayable",
        }]))
        .unwrap()
    }

    #[test]
    fn test_game_args_encoding() {
        let abi = constructor_abi(&["uint256", "uint256", "string"]);
        let args = ConstructorArgs::new(&abi, vec![json!(20), json!(20), json!("FantasyLand")])
            .unwrap();

        let expected = (U256::from(20), U256::from(20), String::from("FantasyLand"))
            .abi_encode_params();
        assert_eq!(args.encoded().as_ref(), expected.as_slice());
        assert_eq!(args.values(), &[json!(20), json!(20), json!("FantasyLand")]);
    }

    #[test]
    fn test_building_args_encoding() {
        let abi = constructor_abi(&[
            "string", "string", "string", "address", "address[]", "address[]", "uint8[]", "uint8",
        ]);
        let values = vec![
            json!("Castle"),
            json!("CSTL"),
            json!(""),
            json!("0xC3a99178Ea1Ca514De13225Ccb907287667417FA"),
            json!([]),
            json!([]),
            json!([1, 4]),
            json!(1),
        ];
        let args = ConstructorArgs::new(&abi, values.clone()).unwrap();

        type BuildingConstructor = (
            sol_data::String,
            sol_data::String,
            sol_data::String,
            sol_data::Address,
            sol_data::Array<sol_data::Address>,
            sol_data::Array<sol_data::Address>,
            sol_data::Array<sol_data::Uint<8>>,
            sol_data::Uint<8>,
        );
        let expected = BuildingConstructor::abi_encode_params(&(
            String::from("Castle"),
            String::from("CSTL"),
            String::new(),
            address!("C3a99178Ea1Ca514De13225Ccb907287667417FA"),
            Vec::<Address>::new(),
            Vec::<Address>::new(),
            vec![1u8, 4],
            1u8,
        ));
        assert_eq!(args.encoded().as_ref(), expected.as_slice());
        assert_eq!(args.values(), values.as_slice());
        assert!(!args.encoded_hex().starts_with("0x"));
    }

    #[test]
    fn test_no_constructor() {
        let abi = JsonAbi::new();
        let args = ConstructorArgs::new(&abi, vec![]).unwrap();
        assert!(args.encoded().is_empty());

        let err = ConstructorArgs::new(&abi, vec![json!(1)]).unwrap_err();
        assert!(matches!(err, ScriptError::CalldataConstruction(_)));
    }

    #[test]
    fn test_arity_mismatch() {
        let abi = constructor_abi(&["uint256", "uint256", "string"]);
        let err = ConstructorArgs::new(&abi, vec![json!(20), json!("FantasyLand")]).unwrap_err();
        assert!(matches!(err, ScriptError::CalldataConstruction(msg) if msg.contains("takes 3")));
    }

    #[test]
    fn test_invalid_address() {
        let abi = constructor_abi(&["address"]);
        let err = ConstructorArgs::new(&abi, vec![json!("0x1234")]).unwrap_err();
        assert!(matches!(err, ScriptError::CalldataConstruction(msg) if msg.contains("arg0")));
    }

    #[test]
    fn test_uint_range() {
        assert_eq!(
            coerce(&DynSolType::Uint(8), &json!(255)).unwrap(),
            DynSolValue::Uint(U256::from(255), 8)
        );
        assert!(coerce(&DynSolType::Uint(8), &json!(256)).is_err());
        assert!(coerce(&DynSolType::Uint(8), &json!(-1)).is_err());
        assert!(coerce(&DynSolType::Uint(256), &json!(1.5)).is_err());
        assert_eq!(
            coerce(&DynSolType::Uint(256), &json!("0x10")).unwrap(),
            DynSolValue::Uint(U256::from(16), 256)
        );
    }

    #[test]
    fn test_int_range() {
        assert!(coerce(&DynSolType::Int(8), &json!(-128)).is_ok());
        assert!(coerce(&DynSolType::Int(8), &json!(127)).is_ok());
        assert!(coerce(&DynSolType::Int(8), &json!(128)).is_err());
        assert!(coerce(&DynSolType::Int(8), &json!(-129)).is_err());
    }

    #[test]
    fn test_nested_types() {
        let ty = DynSolType::FixedArray(Box::new(DynSolType::Bool), 2);
        assert!(coerce(&ty, &json!([true, "false"])).is_ok());
        assert!(coerce(&ty, &json!([true])).is_err());

        let ty = DynSolType::Tuple(vec![DynSolType::String, DynSolType::FixedBytes(2)]);
        assert_eq!(
            coerce(&ty, &json!(["a", "0xbeef"])).unwrap(),
            DynSolValue::Tuple(vec![
                DynSolValue::String("a".to_string()),
                DynSolValue::FixedBytes(B256::right_padding_from(&[0xbe, 0xef]), 2),
            ])
        );
    }
}
