//! Registry and codec behaviour against the RewardsVault fixture ABI

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;

use mxabi::domain::abi::{Address, FieldValue};
use mxabi::infrastructure::abi::load_abi_file;
use mxabi::{AbiCodec, AbiError, AbiRegistry, BinaryCodec, CodecConfig, TypedValue};

const EXAMPLE_ABI: &str = include_str!("data/example.abi.json");

const REWARD_HEX: &str = "010000000445474c440000000201f400000000000003e80000000000000000";

fn registry() -> AbiRegistry {
    AbiRegistry::from_json_str(EXAMPLE_ABI).unwrap()
}

fn reward(token: &str, value: u64, duration: u64) -> TypedValue {
    TypedValue::structure(
        "Reward",
        vec![
            FieldValue::new("reward_type", TypedValue::variant("Variable", 1, vec![])),
            FieldValue::new("reward_token_id", TypedValue::TokenIdentifier(token.into())),
            FieldValue::new("value", TypedValue::integer(value)),
            FieldValue::new("duration_in_blocks", TypedValue::integer(duration)),
            FieldValue::new("start_epoch", TypedValue::integer(0u64)),
        ],
    )
}

#[test]
fn test_load_from_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/example.abi.json");
    let registry = load_abi_file(path).unwrap();

    assert_eq!(registry.name.as_deref(), Some("RewardsVault"));
    assert!(registry.constructor.is_some());
    assert!(registry.get_endpoint("getRewards").is_ok());
    assert!(registry.get_event("noncesSeen").is_ok());
    assert_eq!(registry.get_enum("Action").unwrap().variants.len(), 3);
}

#[test]
fn test_missing_file() {
    let err = load_abi_file("/no/such/file.abi.json").unwrap_err();
    assert!(err.to_string().starts_with("File not found"));
}

#[test]
fn test_known_vectors() {
    let registry = registry();
    let codec = BinaryCodec::new(&registry);

    let ty = registry.parse_type("Reward").unwrap();
    let bytes = hex::decode(REWARD_HEX).unwrap();
    let value = codec.decode_top_level(&bytes, &ty).unwrap();
    assert_eq!(value, reward("EGLD", 500, 1000));
    assert_eq!(codec.encode_top_level(&value, &ty).unwrap(), bytes);

    let ty = registry.parse_type("DepositEvent").unwrap();
    let value = codec
        .decode_top_level(&hex::decode("00000000000003db000000").unwrap(), &ty)
        .unwrap();
    assert_eq!(value.field("tx_nonce"), Some(&TypedValue::integer(987u64)));
    assert_eq!(value.field("opt_gas_limit"), Some(&TypedValue::none()));
}

#[test]
fn test_nested_decode_reports_bytes_read() {
    let registry = registry();
    let codec = BinaryCodec::new(&registry);
    let ty = registry.parse_type("List<Reward>").unwrap();

    let mut bytes = hex::decode(format!("00000002{REWARD_HEX}{REWARD_HEX}")).unwrap();
    let expected_len = bytes.len();
    bytes.extend_from_slice(&[0xaa, 0xbb]);

    let decoded = codec.decode_nested(&bytes, &ty).unwrap();
    assert_eq!(decoded.bytes_read, expected_len);
    assert_eq!(
        decoded.value,
        TypedValue::List(vec![reward("EGLD", 500, 1000), reward("EGLD", 500, 1000)])
    );

    assert!(matches!(
        codec.decode_top_level(&bytes, &ty),
        Err(AbiError::MalformedData(_))
    ));
}

#[test]
fn test_enum_with_fields() {
    let registry = registry();
    let codec = BinaryCodec::new(&registry);
    let ty = registry.parse_type("Action").unwrap();

    let transfer = TypedValue::variant(
        "Transfer",
        5,
        vec![
            FieldValue::new("to", TypedValue::Address(Address([7; 32]))),
            FieldValue::new("amount", TypedValue::integer(258u32)),
        ],
    );
    let encoded = codec.encode_nested(&transfer, &ty).unwrap();
    assert_eq!(encoded.len(), 1 + 32 + 4 + 2);
    assert_eq!(encoded[0], 5);
    assert_eq!(codec.decode_top_level(&encoded, &ty).unwrap(), transfer);

    let pause = codec.decode_top_level(&[1], &ty).unwrap();
    assert_eq!(pause, TypedValue::variant("Pause", 1, vec![]));
    assert!(matches!(
        codec.decode_top_level(&[9], &ty),
        Err(AbiError::MalformedData(_))
    ));
}

#[test]
fn test_registry_errors() {
    let registry = registry();

    assert_eq!(
        registry.parse_type("List<Missing>").unwrap_err(),
        AbiError::UnresolvedType("Missing".into())
    );
    assert!(matches!(
        registry.parse_type("List<u8"),
        Err(AbiError::TypeSyntax { .. })
    ));
    assert_eq!(
        registry.get_endpoint("withdraw").unwrap_err().to_string(),
        "endpoint not found: withdraw"
    );
    assert!(matches!(
        registry.get_struct("Status"),
        Err(AbiError::NotFound { .. })
    ));

    let codec = BinaryCodec::new(&registry);
    let ty = registry.parse_type("variadic<u8>").unwrap();
    assert!(matches!(
        codec.decode_nested(&[1, 2], &ty),
        Err(AbiError::InvalidTypeUsage(_))
    ));
}

#[test]
fn test_limits_are_configurable() {
    let registry = registry();
    let ty = registry.parse_type("List<List<List<u8>>>").unwrap();
    let bytes = hex::decode("000000010000000105").unwrap();

    let shallow = BinaryCodec::new(&registry).with_config(CodecConfig {
        max_depth: 2,
        ..CodecConfig::default()
    });
    assert!(matches!(
        shallow.decode_top_level(&bytes, &ty),
        Err(AbiError::MalformedData(_))
    ));

    let codec = BinaryCodec::new(&registry);
    assert!(codec.decode_top_level(&bytes, &ty).is_ok());
}

#[test]
fn test_shared_registry_across_threads() {
    let registry = Arc::new(registry());
    let inputs: Vec<Vec<u8>> = (0..8u64)
        .map(|i| {
            let mut bytes = hex::decode(REWARD_HEX).unwrap();
            let start = bytes.len() - 8;
            bytes[start..].copy_from_slice(&i.to_be_bytes());
            bytes
        })
        .collect();

    let sequential: Vec<TypedValue> = {
        let codec = BinaryCodec::new(&registry);
        let ty = registry.parse_type("Reward").unwrap();
        inputs
            .iter()
            .map(|bytes| codec.decode_top_level(bytes, &ty).unwrap())
            .collect()
    };

    let handles: Vec<_> = inputs
        .into_iter()
        .map(|bytes| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let codec = BinaryCodec::new(&registry);
                let ty = registry.parse_type("Reward").unwrap();
                codec.decode_top_level(&bytes, &ty).unwrap()
            })
        })
        .collect();
    let concurrent: Vec<TypedValue> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(concurrent, sequential);
    assert_eq!(
        concurrent[3].field("start_epoch"),
        Some(&TypedValue::integer(3u64))
    );
}
