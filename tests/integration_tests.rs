//! Integration tests for tagdoc
//!
//! These tests drive the public encoder and decoder end to end.

use tagdoc::*;

fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn u16_at(buf: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes(buf[offset..offset + 2].try_into().unwrap())
}

/// Writes a document touching every field kind and array flavor
fn encode_everything(ser: &mut Serializer<'_>) -> Result<()> {
    ser.open_root_document(10)?;
    ser.bool_single(1, false)?;
    ser.int32_single(2, -70_000)?;
    ser.uint32_single(3, 7)?;
    ser.int64_single(4, i64::MIN)?;
    ser.uint64_single(5, u64::MAX)?;
    ser.float32_single(6, -0.25)?;
    ser.float64_single(7, core::f64::consts::PI)?;
    ser.datetime_single(8, 638_000_000_000_000_000)?;
    ser.string_single(9, "grüße")?;
    ser.binary_single(10, &[0xDE, 0xAD, 0xBE, 0xEF, 0x01])?;

    ser.open_nested_document(11, 3)?;
    ser.string_single(1, "")?;
    ser.close_nested_document()?;

    ser.bool_array(12, &[true, false, true])?;
    ser.int32_array(13, &[-1, 0, 1])?;
    ser.uint32_array(14, &[u32::MAX])?;
    ser.int64_array(15, &[])?;
    ser.uint64_array(16, &[1, 2])?;
    ser.float32_array(17, &[1.5])?;
    ser.float64_array(18, &[2.5, -2.5])?;
    ser.datetime_array(19, &[99])?;

    ser.open_string_array(20)?;
    ser.string_element("alpha")?;
    ser.string_element("beta")?;
    ser.close_array()?;

    ser.open_binary_array(21)?;
    ser.binary_element(b"xyz")?;
    ser.binary_element(&[])?;
    ser.close_array()?;

    ser.open_document_array(22)?;
    for i in 0..3u32 {
        ser.open_document_element(4)?;
        ser.uint32_single(1, i * 1000)?;
        ser.close_document_element()?;
    }
    ser.close_array()?;

    ser.close_root_document()
}

#[test]
fn test_scalar_scenario() {
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    ser.bool_single(1, true).unwrap();
    ser.float32_single(2, 5.5).unwrap();
    ser.uint32_single(3, 200).unwrap();
    ser.close_root_document().unwrap();

    let bytes = buf.as_slice();
    assert_eq!(u16_at(bytes, 4), 3);
    let tags: Vec<u8> = {
        let mut offset = 8;
        let mut tags = Vec::new();
        while offset < bytes.len() {
            tags.push(bytes[offset]);
            offset += field_len(bytes, offset).unwrap();
        }
        tags
    };
    assert_eq!(tags, vec![0x07, 0x04, 0x49]);

    let doc = read_document(bytes).unwrap();
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.get(1), Some(&DecodedValue::Bool(true)));
    assert_eq!(doc.get(2).and_then(DecodedValue::as_f32), Some(5.5));
    assert_eq!(doc.get(3).and_then(DecodedValue::as_u32), Some(200));
}

#[test]
fn test_nested_document_scenario() {
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    ser.string_single(1, "Example of string").unwrap();
    ser.open_nested_document(2, 2).unwrap();
    ser.uint32_single(3, 100).unwrap();
    ser.float64_single(4, 100.01).unwrap();
    ser.close_nested_document().unwrap();
    ser.close_root_document().unwrap();
    assert!(ser.is_balanced());

    let bytes = buf.as_slice();
    assert_eq!(u32_at(bytes, 0) as usize, bytes.len() - 4);

    let doc = read_document(bytes).unwrap();
    assert_eq!(doc.doc_id, 1);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.get(1).and_then(DecodedValue::as_str), Some("Example of string"));

    let nested = doc.get(2).and_then(DecodedValue::as_document).unwrap();
    assert_eq!(nested.doc_id, 2);
    assert_eq!(nested.len(), 2);
    assert_eq!(nested.get(3).and_then(DecodedValue::as_u32), Some(100));
    assert_eq!(nested.get(4).and_then(DecodedValue::as_f64), Some(100.01));
}

#[test]
fn test_every_kind_roundtrip() {
    let mut buf = GrowableBuffer::new();
    encode_everything(&mut Serializer::new(&mut buf)).unwrap();

    let doc = read_document(buf.as_slice()).unwrap();
    assert_eq!(doc.doc_id, 10);
    assert_eq!(doc.len(), 22);

    assert_eq!(doc.get(1).and_then(DecodedValue::as_bool), Some(false));
    assert_eq!(doc.get(2).and_then(DecodedValue::as_i32), Some(-70_000));
    assert_eq!(doc.get(3).and_then(DecodedValue::as_u32), Some(7));
    assert_eq!(doc.get(4).and_then(DecodedValue::as_i64), Some(i64::MIN));
    assert_eq!(doc.get(5).and_then(DecodedValue::as_u64), Some(u64::MAX));
    assert_eq!(doc.get(6).and_then(DecodedValue::as_f32), Some(-0.25));
    assert_eq!(doc.get(7).and_then(DecodedValue::as_f64), Some(core::f64::consts::PI));
    assert_eq!(
        doc.get(8).and_then(DecodedValue::as_datetime),
        Some(638_000_000_000_000_000)
    );
    assert_eq!(doc.get(9).and_then(DecodedValue::as_str), Some("grüße"));
    assert_eq!(
        doc.get(10).and_then(DecodedValue::as_binary),
        Some(&[0xDE, 0xAD, 0xBE, 0xEF, 0x01][..])
    );

    let nested = doc.get(11).and_then(DecodedValue::as_document).unwrap();
    assert_eq!(nested.doc_id, 3);
    assert_eq!(nested.get(1).and_then(DecodedValue::as_str), Some(""));

    let array = |id| doc.get(id).and_then(DecodedValue::as_array).unwrap();
    assert_eq!(array(12), &DecodedArray::Bools(vec![true, false, true]));
    assert_eq!(array(13).as_i32s(), Some(&[-1, 0, 1][..]));
    assert_eq!(array(14), &DecodedArray::Uint32s(vec![u32::MAX]));
    assert_eq!(array(15).as_i64s(), Some(&[][..]));
    assert_eq!(array(16), &DecodedArray::Uint64s(vec![1, 2]));
    assert_eq!(array(17), &DecodedArray::Float32s(vec![1.5]));
    assert_eq!(array(18), &DecodedArray::Float64s(vec![2.5, -2.5]));
    assert_eq!(array(19), &DecodedArray::DateTimes(vec![99]));
    assert_eq!(array(20).as_strings(), Some(&["alpha", "beta"][..]));
    assert_eq!(array(21).as_binaries(), Some(&[&b"xyz"[..], &[][..]][..]));

    let elements = array(22).as_documents().unwrap();
    assert_eq!(elements.len(), 3);
    for (i, element) in elements.iter().enumerate() {
        assert_eq!(element.doc_id, 4);
        assert_eq!(
            element.get(1).and_then(DecodedValue::as_u32),
            Some(i as u32 * 1000)
        );
    }
}

#[test]
fn test_growth_transparency() {
    let mut presized = GrowableBuffer::with_capacity(64 * 1024);
    encode_everything(&mut Serializer::new(&mut presized)).unwrap();
    assert!(presized.capacity() >= presized.len());

    for start in [0, 1, 4, 17, 256] {
        let mut buf = GrowableBuffer::with_capacity(start);
        encode_everything(&mut Serializer::new(&mut buf)).unwrap();
        assert_eq!(buf.as_slice(), presized.as_slice(), "start capacity {start}");
    }
}

#[test]
fn test_growth_across_many_thresholds() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let encode = |buf: &mut GrowableBuffer| {
        let mut ser = Serializer::new(buf);
        ser.open_root_document(1).unwrap();
        ser.open_binary_array(1).unwrap();
        for chunk in payload.chunks(333) {
            ser.binary_element(chunk).unwrap();
        }
        ser.close_array().unwrap();
        ser.close_root_document().unwrap();
    };

    let mut small = GrowableBuffer::with_capacity(0);
    encode(&mut small);
    let mut exact = GrowableBuffer::with_capacity(small.len());
    encode(&mut exact);
    assert_eq!(small.as_slice(), exact.as_slice());

    let doc = read_document(small.as_slice()).unwrap();
    let chunks = doc.get(1).and_then(DecodedValue::as_array).unwrap();
    let joined: Vec<u8> = chunks.as_binaries().unwrap().concat();
    assert_eq!(joined, payload);
}

#[test]
fn test_frame_balance() {
    // Nested document left open at root close
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    ser.open_nested_document(1, 2).unwrap();
    assert_eq!(ser.depth(), 2);
    assert_eq!(ser.close_root_document(), Err(Error::UnbalancedFrame));

    // Array left open at root close
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    ser.open_string_array(1).unwrap();
    assert!(ser.close_root_document().is_err());
    assert!(!ser.is_balanced());

    // Element close with only a nested document open
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    ser.open_nested_document(1, 2).unwrap();
    assert!(matches!(
        ser.close_document_element(),
        Err(Error::EncoderMisuse(_))
    ));

    // Array close with nothing open
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    assert_eq!(ser.close_array(), Err(Error::UnbalancedFrame));
    assert_eq!(ser.close_root_document(), Err(Error::UnbalancedFrame));
}

#[test]
fn test_unknown_kinds_are_skipped() {
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    ser.int32_array(1, &[5, 6, 7]).unwrap();
    ser.string_single(2, "after").unwrap();
    ser.close_root_document().unwrap();

    // A newer writer's array kind 0x1F in place of int32
    let mut bytes = buf.into_vec();
    assert_eq!(bytes[8], 0x88);
    bytes[8] = 0x9F;

    let doc = read_document(&bytes).unwrap();
    assert_eq!(doc.len(), 2);
    match doc.get(1) {
        Some(DecodedValue::Unknown { tag, raw }) => {
            assert_eq!(*tag, 0x9F);
            assert_eq!(raw.len(), field_len(&bytes, 8).unwrap());
        }
        other => panic!("expected unknown value, got {other:?}"),
    }
    assert_eq!(doc.get(2).and_then(DecodedValue::as_str), Some("after"));
}

#[test]
fn test_reserved_tag_bits_are_corrupt() {
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    ser.bool_single(1, true).unwrap();
    ser.close_root_document().unwrap();

    let mut bytes = buf.into_vec();
    bytes[8] = 0xC7;
    assert_eq!(read_document(&bytes), Err(Error::TruncatedOrCorrupt { offset: 8 }));
}

#[test]
fn test_truncation_never_panics() {
    let mut buf = GrowableBuffer::new();
    encode_everything(&mut Serializer::new(&mut buf)).unwrap();
    let bytes = buf.as_slice();

    for len in 0..bytes.len() {
        let err = read_document(&bytes[..len]).unwrap_err();
        assert!(err.is_decode_error(), "prefix {len}: {err:?}");
    }
}

#[test]
fn test_read_documents_stream() {
    let mut buf = GrowableBuffer::new();
    for id in 1..=4u16 {
        let mut ser = Serializer::new(&mut buf);
        ser.open_root_document(id).unwrap();
        ser.uint32_single(1, u32::from(id) * 100).unwrap();
        ser.close_root_document().unwrap();
    }

    let bytes = buf.as_slice();
    let docs = read_documents(bytes).unwrap();
    assert_eq!(docs.len(), 4);
    for (i, doc) in docs.iter().enumerate() {
        assert_eq!(usize::from(doc.doc_id), i + 1);
        assert_eq!(
            doc.get(1).and_then(DecodedValue::as_u32),
            Some((i as u32 + 1) * 100)
        );
    }

    // roots differ in size: 100 and 200 are compact, 300 and 400 are not
    let mut offset = 0;
    let mut lens = Vec::new();
    while offset < bytes.len() {
        let len = document_len(bytes, offset).unwrap();
        lens.push(len);
        offset += len;
    }
    assert_eq!(lens, vec![12, 12, 16, 16]);
    assert_eq!(offset, bytes.len());
    assert!(read_documents(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn test_buffer_reuse_after_clear() {
    let mut buf = GrowableBuffer::new();
    encode_everything(&mut Serializer::new(&mut buf)).unwrap();
    let first = buf.as_slice().to_vec();
    let capacity = buf.capacity();

    buf.clear();
    assert!(buf.is_empty());
    assert_eq!(buf.capacity(), capacity);

    encode_everything(&mut Serializer::new(&mut buf)).unwrap();
    assert_eq!(buf.as_slice(), &first[..]);
}

#[test]
fn test_kind_names_and_tags() {
    assert_eq!(Kind::Uint32.tag(), 0x09);
    assert_eq!(Kind::Uint32.compact_tag(), 0x49);
    assert_eq!(Kind::Uint32.array_tag(), 0x89);
    assert_eq!(Kind::Document.array_tag(), 0x81);
    assert!(!Kind::String.has_compact_form());
    assert_eq!(Kind::Float64.fixed_width(), Some(8));
    assert_eq!(Kind::String.fixed_width(), None);
}

#[test]
fn test_nesting_limit_roundtrip() {
    let mut buf = GrowableBuffer::new();
    let mut ser = Serializer::new(&mut buf);
    ser.open_root_document(1).unwrap();
    for level in 0..MAX_NESTING_DEPTH {
        ser.open_nested_document(1, level as u16 + 2).unwrap();
    }
    ser.uint32_single(2, 64).unwrap();
    assert_eq!(
        ser.open_nested_document(1, 0),
        Err(Error::NestingTooDeep { offset: ser.position() })
    );
    for _ in 0..MAX_NESTING_DEPTH {
        ser.close_nested_document().unwrap();
    }
    ser.close_root_document().unwrap();

    let root = read_document(buf.as_slice()).unwrap();
    let mut doc = &root;
    for _ in 0..MAX_NESTING_DEPTH {
        doc = doc.get(1).and_then(DecodedValue::as_document).unwrap();
    }
    assert_eq!(usize::from(doc.doc_id), MAX_NESTING_DEPTH + 1);
    assert_eq!(doc.get(2).and_then(DecodedValue::as_u32), Some(64));
}
