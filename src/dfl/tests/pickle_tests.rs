//! Tests for the restricted pickle codec

use super::test_utils::fixture;
use crate::dfl::pickle::{dumps, loads};
use crate::dfl::{MetaValue, NdArray};
use crate::errors::WatermarkError;

fn assert_invalid(bytes: &[u8]) {
    let result = loads(bytes);
    assert!(
        matches!(result, Err(WatermarkError::InvalidMetadata(_))),
        "expected invalid metadata, got {:?}",
        result
    );
}

#[test]
fn test_protocol_0_text_opcodes() {
    // pickle.dumps({'a': [1, 2.5, 'x', None, True]}, 0)
    let bytes = b"(dp0\nVa\np1\n(lp2\nI1\naF2.5\naVx\np3\naNaI01\nas.";
    let expected = MetaValue::Dict(vec![(
        MetaValue::str("a"),
        MetaValue::List(vec![
            MetaValue::Int(1),
            MetaValue::Float(2.5),
            MetaValue::str("x"),
            MetaValue::Null,
            MetaValue::Bool(true),
        ]),
    )]);
    assert_eq!(loads(bytes).unwrap(), expected);
}

#[test]
fn test_unicode_escapes() {
    let bytes = b"Vcaf\\u00e9 \\U0001f600\n.";
    assert_eq!(loads(bytes).unwrap(), MetaValue::str("caf\u{e9} \u{1f600}"));
}

#[test]
fn test_long1_integers() {
    // 2**40 and -2**63 under protocol 2
    assert_eq!(
        loads(b"\x80\x02\x8a\x06\x00\x00\x00\x00\x00\x01.").unwrap(),
        MetaValue::Int(1 << 40)
    );
    assert_eq!(
        loads(b"\x80\x02\x8a\x08\x00\x00\x00\x00\x00\x00\x00\x80.").unwrap(),
        MetaValue::Int(i64::MIN)
    );
}

#[test]
fn test_integer_beyond_64_bits_is_invalid() {
    // 2**64
    assert_invalid(b"\x80\x02\x8a\t\x00\x00\x00\x00\x00\x00\x00\x00\x01.");
}

#[test]
fn test_sets_and_frozensets() {
    // pickle.dumps(({1, 2}, frozenset([3])), 4)
    let bytes = b"\x80\x04\x95\x10\x00\x00\x00\x00\x00\x00\x00\x8f\x94(K\x01K\x02\x90(K\x03\x91\x94\x86\x94.";
    let expected = MetaValue::Tuple(vec![
        MetaValue::Set(vec![MetaValue::Int(1), MetaValue::Int(2)]),
        MetaValue::FrozenSet(vec![MetaValue::Int(3)]),
    ]);
    assert_eq!(loads(bytes).unwrap(), expected);
}

#[test]
fn test_bytearray8_is_bytes() {
    let bytes = b"\x80\x05\x95\r\x00\x00\x00\x00\x00\x00\x00\x96\x02\x00\x00\x00\x00\x00\x00\x00ab\x94.";
    assert_eq!(loads(bytes).unwrap(), MetaValue::Bytes(b"ab".to_vec()));
}

#[test]
fn test_reduce_is_never_called() {
    // A pickle whose REDUCE would run os.system('echo hi')
    let bytes = b"\x80\x02cposix\nsystem\nq\x00X\x07\x00\x00\x00echo hiq\x01\x85q\x02Rq\x03.";
    let expected = MetaValue::Reduce {
        callable: Box::new(MetaValue::Global {
            module: "posix".to_string(),
            name: "system".to_string(),
        }),
        args: Box::new(MetaValue::Tuple(vec![MetaValue::str("echo hi")])),
    };
    assert_eq!(loads(bytes).unwrap(), expected);
}

#[test]
fn test_build_updates_memoized_object() {
    let value = loads(&fixture("dfl_extractor_p4.pickle")).unwrap();

    // The second array fetches the already built float64 dtype from the memo
    let matrix = NdArray::from_value(value.get("image_to_face_mat").unwrap()).unwrap();
    let polys = value.get("seg_ie_polys").unwrap().get("polys").unwrap();
    let points = NdArray::from_value(polys.as_sequence().unwrap()[0].get("pts").unwrap()).unwrap();
    assert_eq!(matrix.dtype, "f8");
    assert_eq!(points.dtype, "f4");
    assert_eq!(points.to_f64_vec().unwrap(), vec![1.5, 2.5, 40.0, 2.5, 20.0, 30.0]);
}

#[test]
fn test_writer_output_reads_back() {
    let ints = [0, 255, 256, 65535, 65536, -1, i32::MIN as i64, i64::MAX, i64::MIN];
    let tuples = vec![
        MetaValue::Tuple(Vec::new()),
        MetaValue::Tuple(vec![MetaValue::Null]),
        MetaValue::Tuple(vec![MetaValue::Bool(false); 5]),
    ];
    let value = MetaValue::Dict(vec![
        (MetaValue::str("ints"), MetaValue::List(ints.into_iter().map(MetaValue::Int).collect())),
        (MetaValue::str("long text"), MetaValue::Str("x".repeat(300))),
        (MetaValue::str("blob"), MetaValue::Bytes(vec![0xAB; 300])),
        (MetaValue::str("tuples"), MetaValue::List(tuples)),
        (MetaValue::Int(7), MetaValue::FrozenSet(vec![MetaValue::Float(-0.5)])),
        (MetaValue::str("array"), NdArray::uint8(vec![1, 2, 3, 4], vec![2, 2]).to_value()),
    ]);

    assert_eq!(loads(&dumps(&value).unwrap()).unwrap(), value);
}

#[test]
fn test_large_lists_are_batched() {
    let value = MetaValue::List(vec![MetaValue::Null; 2500]);
    let bytes = dumps(&value).unwrap();
    let appends = bytes.iter().filter(|&&b| b == b'e').count();
    assert_eq!(appends, 3);
    assert_eq!(loads(&bytes).unwrap(), value);
}

#[test]
fn test_truncated_pickle_is_invalid() {
    let bytes = fixture("dfl_extractor_p4.pickle");
    assert_invalid(&bytes[..bytes.len() / 2]);
    assert_invalid(b"");
}

#[test]
fn test_declared_length_beyond_input_is_invalid() {
    assert_invalid(b"\x80\x04B\xff\xff\xff\xff.");
}

#[test]
fn test_object_opcodes_are_rejected() {
    // INST and PERSID
    assert_invalid(b"(i__main__\nThing\n.");
    assert_invalid(b"P1\n.");
}

#[test]
fn test_stack_underflow_is_invalid() {
    assert_invalid(b"\x80\x04a.");
    assert_invalid(b"\x80\x04(.");
    assert_invalid(b"\x80\x04K\x01(\x86.");
}

#[test]
fn test_missing_memo_slot_is_invalid() {
    assert_invalid(b"\x80\x04h\x05.");
}

#[test]
fn test_deep_nesting_is_invalid() {
    let mut bytes = vec![0x80, 0x04];
    bytes.extend(std::iter::repeat(b']').take(100));
    bytes.extend(std::iter::repeat(b'a').take(99));
    bytes.push(b'.');
    assert_invalid(&bytes);
}

#[test]
fn test_memo_expansion_is_bounded() {
    let mut bytes = vec![0x80, 0x04, b'C', 0xFF];
    bytes.extend(std::iter::repeat(0u8).take(255));
    bytes.extend([0x94, b']', b'(']);
    for _ in 0..80_000 {
        bytes.extend([b'h', 0]);
    }
    bytes.extend([b'e', b'.']);
    assert_invalid(&bytes);
}
