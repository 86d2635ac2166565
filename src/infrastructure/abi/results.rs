//! Results parser - endpoint outputs, return codes and events
//!
//! Contract outputs arrive as a list of raw buffers, each one a top-level
//! encoded value. Multi-value types (`variadic`, `optional`, `multi`,
//! `counted-variadic`) span a variable number of those buffers.

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::abi::{
    AbiCodec, AbiError, AbiRegistry, AbiResult, EndpointDefinition, EventDefinition, FieldValue,
    TypeDescriptor, TypedValue,
};

use super::codec::{numeric, BinaryCodec};

/// Status reported by the VM for a contract call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Ok,
    FunctionNotFound,
    FunctionWrongSignature,
    ContractNotFound,
    UserError,
    OutOfGas,
    AccountCollision,
    OutOfFunds,
    CallStackOverflow,
    ContractInvalid,
    ExecutionFailed,
    UpgradeFailed,
    SimulateFailed,
    /// Anything the VM reports that is not in the table above
    Unknown(String),
}

const RETURN_CODES: [(ReturnCode, u64, &str); 13] = [
    (ReturnCode::Ok, 0, "ok"),
    (ReturnCode::FunctionNotFound, 1, "function not found"),
    (ReturnCode::FunctionWrongSignature, 2, "wrong signature"),
    (ReturnCode::ContractNotFound, 3, "contract not found"),
    (ReturnCode::UserError, 4, "user error"),
    (ReturnCode::OutOfGas, 5, "out of gas"),
    (ReturnCode::AccountCollision, 6, "account collision"),
    (ReturnCode::OutOfFunds, 7, "out of funds"),
    (ReturnCode::CallStackOverflow, 8, "call stack overflow"),
    (ReturnCode::ContractInvalid, 9, "contract invalid"),
    (ReturnCode::ExecutionFailed, 10, "execution failed"),
    (ReturnCode::UpgradeFailed, 11, "upgrade failed"),
    (ReturnCode::SimulateFailed, 12, "simulate failed"),
];

impl ReturnCode {
    pub fn from_code(code: u64) -> Self {
        RETURN_CODES
            .iter()
            .find(|(_, value, _)| *value == code)
            .map(|(rc, _, _)| rc.clone())
            .unwrap_or_else(|| Self::Unknown(code.to_string()))
    }

    /// Parse a textual status such as `"ok"` or `"user error"`
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        RETURN_CODES
            .iter()
            .find(|(_, _, name)| name.eq_ignore_ascii_case(text))
            .map(|(rc, _, _)| rc.clone())
            .unwrap_or_else(|| Self::Unknown(text.to_string()))
    }

    /// Parse the first raw output of a call: a textual name first,
    /// otherwise a top-level unsigned integer.
    pub fn from_raw(raw: &[u8]) -> Self {
        if let Ok(text) = std::str::from_utf8(raw) {
            if let Some((rc, _, _)) = RETURN_CODES.iter().find(|(_, _, name)| *name == text) {
                return rc.clone();
            }
        }
        let code = numeric::from_bytes(raw, false);
        match u64::try_from(&code) {
            Ok(code) => Self::from_code(code),
            Err(_) => Self::Unknown(hex::encode(raw)),
        }
    }

    /// Numeric VM code, if known
    pub fn code(&self) -> Option<u64> {
        RETURN_CODES
            .iter()
            .find(|(rc, _, _)| rc == self)
            .map(|(_, code, _)| *code)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown(text) => text,
            known => RETURN_CODES
                .iter()
                .find(|(rc, _, _)| rc == known)
                .map(|(_, _, name)| *name)
                .unwrap_or("unknown"),
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Ok
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReturnCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A call that reached the contract but did not succeed
///
/// This is an outcome, not a decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractErrorOutcome {
    pub code: ReturnCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success(Vec<TypedValue>),
    ContractError(ContractErrorOutcome),
}

impl CallOutcome {
    pub fn values(&self) -> Option<&[TypedValue]> {
        match self {
            Self::Success(values) => Some(values),
            Self::ContractError(_) => None,
        }
    }
}

impl Serialize for CallOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Rendered<'a> {
            return_code: &'a ReturnCode,
            #[serde(skip_serializing_if = "str::is_empty")]
            return_message: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            values: Option<&'a [TypedValue]>,
        }

        let ok = ReturnCode::Ok;
        let rendered = match self {
            Self::Success(values) => Rendered {
                return_code: &ok,
                return_message: "",
                values: Some(values),
            },
            Self::ContractError(error) => Rendered {
                return_code: &error.code,
                return_message: &error.message,
                values: None,
            },
        };
        rendered.serialize(serializer)
    }
}

/// Raw outputs split into status, message and remaining buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntypedOutcome {
    pub return_code: ReturnCode,
    pub return_message: String,
    pub values: Vec<Vec<u8>>,
}

impl UntypedOutcome {
    /// `None` when the call succeeded
    pub fn contract_error(&self) -> Option<ContractErrorOutcome> {
        (!self.return_code.is_success()).then(|| ContractErrorOutcome {
            code: self.return_code.clone(),
            message: self.return_message.clone(),
        })
    }
}

/// A VM query response as returned by the gateway/API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub return_code: String,
    #[serde(default)]
    pub return_message: String,
    /// Base64-encoded outputs
    #[serde(default)]
    pub return_data: Vec<String>,
}

impl QueryResponse {
    pub fn raw_outputs(&self) -> AbiResult<Vec<Vec<u8>>> {
        self.return_data
            .iter()
            .map(|item| {
                base64::engine::general_purpose::STANDARD
                    .decode(item)
                    .map_err(|e| AbiError::malformed(format!("return data '{item}': {e}")))
            })
            .collect()
    }
}

/// One event log: identifier, topics and data blocks, already decoded to bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    pub address: String,
    pub identifier: String,
    pub topics: Vec<Vec<u8>>,
    pub data: Vec<Vec<u8>>,
}

/// Split `@`-separated hex result data (`"@6f6b@0a"`) into raw outputs
pub fn split_result_data(data: &str) -> AbiResult<Vec<Vec<u8>>> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let data = data.strip_prefix('@').unwrap_or(data);
    data.split('@')
        .map(|part| {
            hex::decode(part).map_err(|e| AbiError::malformed(format!("result part '{part}': {e}")))
        })
        .collect()
}

/// Parses contract outputs and events against ABI definitions
#[derive(Debug, Clone, Copy)]
pub struct ResultsParser<'r> {
    codec: BinaryCodec<'r>,
}

impl<'r> ResultsParser<'r> {
    pub fn new(registry: &'r AbiRegistry) -> Self {
        Self {
            codec: BinaryCodec::new(registry),
        }
    }

    pub fn with_codec(codec: BinaryCodec<'r>) -> Self {
        Self { codec }
    }

    /// Decode raw outputs positionally against `output_types`
    pub fn parse_outcome(
        &self,
        raw_outputs: &[Vec<u8>],
        output_types: &[TypeDescriptor],
    ) -> AbiResult<Vec<TypedValue>> {
        let mut outputs = Outputs::new(raw_outputs, "output");
        let values = output_types
            .iter()
            .map(|ty| self.take_value(&mut outputs, ty))
            .collect::<AbiResult<Vec<_>>>()?;
        outputs.finish()?;
        Ok(values)
    }

    /// Status first, then message on failure, then the values
    pub fn parse_untyped_outcome(&self, raw_outputs_with_status: &[Vec<u8>]) -> UntypedOutcome {
        let Some((status, rest)) = raw_outputs_with_status.split_first() else {
            return UntypedOutcome {
                return_code: ReturnCode::Ok,
                return_message: String::new(),
                values: Vec::new(),
            };
        };

        let return_code = ReturnCode::from_raw(status);
        if return_code.is_success() {
            return UntypedOutcome {
                return_code,
                return_message: String::new(),
                values: rest.to_vec(),
            };
        }

        let (message, values) = match rest.split_first() {
            Some((message, values)) => (String::from_utf8_lossy(message).into_owned(), values),
            None => (String::new(), rest),
        };
        UntypedOutcome {
            return_code,
            return_message: message,
            values: values.to_vec(),
        }
    }

    /// Outputs of a call whose first raw output is the status
    pub fn parse_call_outcome(
        &self,
        raw_outputs_with_status: &[Vec<u8>],
        endpoint: &EndpointDefinition,
    ) -> AbiResult<CallOutcome> {
        let untyped = self.parse_untyped_outcome(raw_outputs_with_status);
        if let Some(error) = untyped.contract_error() {
            tracing::debug!(
                endpoint = %endpoint.name,
                code = %error.code,
                numeric = ?error.code.code(),
                "call returned an error"
            );
            return Ok(CallOutcome::ContractError(error));
        }
        let values = self.parse_outcome(&untyped.values, &endpoint.output_types())?;
        Ok(CallOutcome::Success(values))
    }

    /// Outputs of a VM query, where the status travels beside the data
    pub fn parse_query_response(
        &self,
        response: &QueryResponse,
        endpoint: &EndpointDefinition,
    ) -> AbiResult<CallOutcome> {
        let code = if response.return_code.is_empty() {
            ReturnCode::Ok
        } else {
            ReturnCode::from_text(&response.return_code)
        };
        if !code.is_success() {
            return Ok(CallOutcome::ContractError(ContractErrorOutcome {
                code,
                message: response.return_message.clone(),
            }));
        }
        let raw = response.raw_outputs()?;
        let values = self.parse_outcome(&raw, &endpoint.output_types())?;
        Ok(CallOutcome::Success(values))
    }

    /// Decode an event from its topics (identifier already removed) and data
    ///
    /// The result is a struct value named after the event, one field per input
    /// in declaration order.
    pub fn parse_event(
        &self,
        topics: &[Vec<u8>],
        data: &[Vec<u8>],
        event: &EventDefinition,
    ) -> AbiResult<TypedValue> {
        let mut topics = Outputs::new(topics, "topic");
        let mut data = Outputs::new(data, "data block");

        let fields = event
            .inputs
            .iter()
            .map(|input| {
                let source = if input.indexed { &mut topics } else { &mut data };
                let value = self.take_value(source, &input.ty)?;
                Ok(FieldValue::new(&input.name, value))
            })
            .collect::<AbiResult<Vec<_>>>()?;

        topics.finish()?;
        data.finish()?;
        Ok(TypedValue::structure(&event.identifier, fields))
    }

    /// Decode a full log; its first topic carries the event identifier
    pub fn parse_event_log(
        &self,
        log: &EventLog,
        event: &EventDefinition,
    ) -> AbiResult<TypedValue> {
        let topics = log.topics.get(1..).unwrap_or_default();
        self.parse_event(topics, &log.data, event)
    }

    fn take_value(&self, outputs: &mut Outputs<'_>, ty: &TypeDescriptor) -> AbiResult<TypedValue> {
        match ty {
            TypeDescriptor::Variadic(item) => {
                let mut items = Vec::new();
                while !outputs.is_empty() {
                    items.push(self.take_item(outputs, item)?);
                }
                Ok(TypedValue::List(items))
            }
            TypeDescriptor::OptionalValue(inner) => {
                if outputs.is_empty() {
                    Ok(TypedValue::none())
                } else {
                    Ok(TypedValue::some(self.take_item(outputs, inner)?))
                }
            }
            TypeDescriptor::CountedVariadic(item) => {
                let raw = outputs.next(ty)?;
                let count = self.codec.decode_top_level(raw, &TypeDescriptor::u32())?;
                let count = count
                    .as_integer()
                    .and_then(|count| usize::try_from(count).ok())
                    .ok_or_else(|| AbiError::malformed(format!("bad count for {ty}")))?;
                if count > outputs.remaining() {
                    return Err(AbiError::ResultArity(format!(
                        "{ty} announces {count} items, only {} {}s left",
                        outputs.remaining(),
                        outputs.kind
                    )));
                }
                (0..count)
                    .map(|_| self.take_item(outputs, item))
                    .collect::<AbiResult<Vec<_>>>()
                    .map(TypedValue::List)
            }
            other => self.take_item(outputs, other),
        }
    }

    /// One logical item: a single buffer, or one buffer per `multi` component
    fn take_item(&self, outputs: &mut Outputs<'_>, ty: &TypeDescriptor) -> AbiResult<TypedValue> {
        match ty {
            TypeDescriptor::Composite(items) => items
                .iter()
                .map(|item| self.take_item(outputs, item))
                .collect::<AbiResult<Vec<_>>>()
                .map(TypedValue::Tuple),
            other => {
                let raw = outputs.next(other)?;
                self.codec.decode_top_level(raw, other)
            }
        }
    }
}

/// Cursor over raw buffers
struct Outputs<'a> {
    items: &'a [Vec<u8>],
    position: usize,
    kind: &'static str,
}

impl<'a> Outputs<'a> {
    fn new(items: &'a [Vec<u8>], kind: &'static str) -> Self {
        Self {
            items,
            position: 0,
            kind,
        }
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn remaining(&self) -> usize {
        self.items.len() - self.position
    }

    fn next(&mut self, ty: &TypeDescriptor) -> AbiResult<&'a [u8]> {
        let item = self.items.get(self.position).ok_or_else(|| {
            AbiError::ResultArity(format!(
                "missing {} #{} for {ty} ({} available)",
                self.kind,
                self.position,
                self.items.len()
            ))
        })?;
        self.position += 1;
        Ok(item)
    }

    fn finish(&self) -> AbiResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AbiError::ResultArity(format!(
                "{} unexpected {}(s) left over out of {}",
                self.remaining(),
                self.kind,
                self.items.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const EXAMPLE_ABI: &str = include_str!("../../../tests/data/example.abi.json");

    fn registry() -> AbiRegistry {
        AbiRegistry::from_json_str(EXAMPLE_ABI).unwrap()
    }

    fn raw(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|part| hex::decode(part).unwrap()).collect()
    }

    #[test]
    fn test_return_code_parsing() {
        assert_eq!(ReturnCode::from_raw(b"ok"), ReturnCode::Ok);
        assert_eq!(ReturnCode::from_raw(&[]), ReturnCode::Ok);
        assert_eq!(ReturnCode::from_raw(&[0x04]), ReturnCode::UserError);
        assert_eq!(ReturnCode::from_raw(b"user error"), ReturnCode::UserError);
        assert_eq!(ReturnCode::from_raw(&[0x63]), ReturnCode::Unknown("99".into()));
        assert_eq!(ReturnCode::from_text("out of gas"), ReturnCode::OutOfGas);
        assert_eq!(ReturnCode::SimulateFailed.code(), Some(12));
        assert_eq!(ReturnCode::Unknown("x".into()).code(), None);
        assert_eq!(ReturnCode::ExecutionFailed.to_string(), "execution failed");
    }

    #[test]
    fn test_split_result_data() {
        assert_eq!(
            split_result_data("@6f6b@0a").unwrap(),
            vec![b"ok".to_vec(), vec![0x0a]]
        );
        assert_eq!(split_result_data("@6f6b@@01").unwrap()[1], Vec::<u8>::new());
        assert!(split_result_data("").unwrap().is_empty());
        assert!(matches!(
            split_result_data("@zz"),
            Err(AbiError::MalformedData(_))
        ));
    }

    #[test]
    fn test_positional_outputs() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);
        let endpoint = registry.get_endpoint("getPair").unwrap();

        let values = parser
            .parse_outcome(&raw(&["2a", "01"]), &endpoint.output_types())
            .unwrap();
        assert_eq!(values, vec![TypedValue::integer(42), TypedValue::Bool(true)]);

        let err = parser
            .parse_outcome(&raw(&["2a", "01", "02"]), &endpoint.output_types())
            .unwrap_err();
        assert!(matches!(err, AbiError::ResultArity(_)));

        let err = parser
            .parse_outcome(&raw(&["2a"]), &endpoint.output_types())
            .unwrap_err();
        assert!(matches!(err, AbiError::ResultArity(_)));
    }

    #[test]
    fn test_variadic_multi_outputs() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);
        let endpoint = registry.get_endpoint("getBalances").unwrap();

        let outputs = raw(&["45474c44", "03e8", "555344432d313233343536", ""]);
        let values = parser.parse_outcome(&outputs, &endpoint.output_types()).unwrap();
        assert_eq!(
            values,
            vec![TypedValue::List(vec![
                TypedValue::Tuple(vec![
                    TypedValue::TokenIdentifier("EGLD".into()),
                    TypedValue::integer(1000),
                ]),
                TypedValue::Tuple(vec![
                    TypedValue::TokenIdentifier("USDC-123456".into()),
                    TypedValue::integer(0),
                ]),
            ])]
        );

        // half a group
        let err = parser
            .parse_outcome(&outputs[..3], &endpoint.output_types())
            .unwrap_err();
        assert!(matches!(err, AbiError::ResultArity(_)));
    }

    #[test]
    fn test_optional_and_counted_outputs() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);

        let last_action = registry.get_endpoint("getLastAction").unwrap();
        assert_eq!(
            parser.parse_outcome(&[], &last_action.output_types()).unwrap(),
            vec![TypedValue::none()]
        );
        assert_eq!(
            parser
                .parse_outcome(&raw(&["01"]), &last_action.output_types())
                .unwrap(),
            vec![TypedValue::some(TypedValue::variant("Pause", 1, vec![]))]
        );

        let nonces = registry.get_endpoint("getRecentNonces").unwrap();
        assert_eq!(
            parser
                .parse_outcome(&raw(&["02", "07", "09"]), &nonces.output_types())
                .unwrap(),
            vec![TypedValue::List(vec![TypedValue::integer(7), TypedValue::integer(9)])]
        );
        let err = parser
            .parse_outcome(&raw(&["03", "07"]), &nonces.output_types())
            .unwrap_err();
        assert!(matches!(err, AbiError::ResultArity(_)));
    }

    #[test]
    fn test_call_outcome_with_status() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);
        let endpoint = registry.get_endpoint("getSum").unwrap();

        let outcome = parser
            .parse_call_outcome(&split_result_data("@6f6b@03e9").unwrap(), endpoint)
            .unwrap();
        assert_eq!(outcome, CallOutcome::Success(vec![TypedValue::integer(1001)]));

        let failed = split_result_data(&format!(
            "@{}@{}",
            hex::encode("user error"),
            hex::encode("not allowed")
        ))
        .unwrap();
        let outcome = parser.parse_call_outcome(&failed, endpoint).unwrap();
        assert_eq!(
            outcome,
            CallOutcome::ContractError(ContractErrorOutcome {
                code: ReturnCode::UserError,
                message: "not allowed".into(),
            })
        );
        assert_eq!(outcome.values(), None);
    }

    #[test]
    fn test_untyped_outcome() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);

        let untyped = parser.parse_untyped_outcome(&raw(&["6f6b", "0a", "0b"]));
        assert_eq!(untyped.return_code, ReturnCode::Ok);
        assert_eq!(untyped.values, raw(&["0a", "0b"]));
        assert!(untyped.contract_error().is_none());

        let untyped = parser.parse_untyped_outcome(&raw(&["05"]));
        assert_eq!(untyped.return_code, ReturnCode::OutOfGas);
        assert_eq!(untyped.return_message, "");
    }

    #[test]
    fn test_query_response() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);
        let endpoint = registry.get_endpoint("getStatus").unwrap();

        let response: QueryResponse = serde_json::from_value(serde_json::json!({
            "returnCode": "ok",
            "returnMessage": "",
            "returnData": ["AQ=="]
        }))
        .unwrap();
        assert_eq!(
            parser.parse_query_response(&response, endpoint).unwrap(),
            CallOutcome::Success(vec![TypedValue::variant("Active", 1, vec![])])
        );

        let response = QueryResponse {
            return_code: "function not found".into(),
            return_message: "invalid function (not found)".into(),
            return_data: vec![],
        };
        let outcome = parser.parse_query_response(&response, endpoint).unwrap();
        assert!(matches!(
            outcome,
            CallOutcome::ContractError(ContractErrorOutcome {
                code: ReturnCode::FunctionNotFound,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_event_log_skips_identifier_topic() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);
        let event = registry.get_event("deposit").unwrap();

        let log = EventLog {
            address: String::new(),
            identifier: "deposit".into(),
            topics: vec![b"deposit".to_vec(), vec![0x22; 32], b"EGLD".to_vec()],
            data: raw(&["00000000000003db000000"]),
        };
        let value = parser.parse_event_log(&log, event).unwrap();

        assert_eq!(
            value.field("token"),
            Some(&TypedValue::TokenIdentifier("EGLD".into()))
        );
        let nonce = value
            .field("event_data")
            .and_then(|data| data.field("tx_nonce"))
            .cloned();
        assert_eq!(nonce, Some(TypedValue::integer(987)));
    }

    #[test]
    fn test_event_variadic_folds_remaining_blocks() {
        let registry = registry();
        let parser = ResultsParser::new(&registry);
        let event = registry.get_event("noncesSeen").unwrap();

        let value = parser
            .parse_event(&[vec![0x01; 32]], &raw(&["01", "02", "03"]), event)
            .unwrap();
        assert_eq!(
            value.field("nonces"),
            Some(&TypedValue::List(vec![
                TypedValue::integer(1),
                TypedValue::integer(2),
                TypedValue::integer(3)
            ]))
        );

        let err = parser.parse_event(&[], &[], event).unwrap_err();
        assert!(matches!(err, AbiError::ResultArity(_)));
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = CallOutcome::ContractError(ContractErrorOutcome {
            code: ReturnCode::UserError,
            message: "boom".into(),
        });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "returnCode": "user error", "returnMessage": "boom" })
        );
    }
}
