//! Record framing: section order, multi-field records, bitmap reuse and
//! reader recovery, on synthesized GRIB2 bytes.

use bytes::Bytes;
use grib2_parser::{parse_record, ErrorKind, Grib2Error, Grib2Reader};
use test_utils::{create_test_grid, FieldSpec, Grib2Builder, GridTemplate};

fn small_grid() -> GridTemplate {
    GridTemplate::lat_lon(4, 3, 40.0, 10.0, 1.0, 1.0)
}

fn single_record() -> Vec<u8> {
    Grib2Builder::new()
        .field(FieldSpec::new(small_grid(), create_test_grid(4, 3)).parameter(0, 0).surface(103, 2))
        .build()
}

#[test]
fn test_single_field_record() {
    let data = Bytes::from(single_record());
    let record = parse_record(&data, 0).expect("record parses");
    assert_eq!(record.consumed, data.len());
    assert_eq!(record.messages.len(), 1);

    let message = &record.messages[0];
    assert_eq!(message.discipline(), 0);
    assert_eq!(message.identification.center, 7);
    assert_eq!(message.reference_time().to_rfc3339(), "2024-01-15T12:00:00+00:00");
    assert_eq!(message.point_count(), 12);
    assert_eq!(message.packing_template(), 0);
    assert_eq!(message.product_definition.first_surface.surface_type, 103);
    assert_eq!(message.product_definition.first_surface.value, Some(2.0));
    assert!(message.product_definition.second_surface.is_none());
    assert!(message.local_use.is_none());

    let numbers: Vec<u8> = message.sections.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![0, 1, 3, 4, 5, 6, 7]);
    let span_end: usize = message.sections.iter().map(|s| s.length).sum::<usize>() + 4;
    assert_eq!(span_end, data.len());
}

#[test]
fn test_multi_field_record_shares_sections() {
    let other_grid = GridTemplate::lat_lon(2, 2, 0.0, 0.0, 1.0, 1.0);
    let data = Bytes::from(
        Grib2Builder::new()
            .local_use(vec![9, 9, 9])
            .field(FieldSpec::new(small_grid(), vec![1.0; 12]).parameter(0, 0))
            .field(FieldSpec::new(small_grid(), vec![2.0; 12]).parameter(2, 2))
            .field(FieldSpec::new(other_grid, vec![3.0; 4]).parameter(2, 3))
            .build(),
    );
    let record = parse_record(&data, 0).unwrap();
    assert_eq!(record.messages.len(), 3);

    let [first, second, third] = &record.messages[..] else {
        panic!("expected three fields");
    };
    assert_eq!(first.field_index, 0);
    assert_eq!(second.field_index, 1);
    assert_eq!(third.field_index, 2);
    assert_eq!(first.grid_definition, second.grid_definition);
    assert_ne!(second.grid_definition, third.grid_definition);
    assert_eq!(second.product_definition.parameter_category, 2);
    assert_eq!(third.point_count(), 4);
    // Local use carries over to every field of the record
    assert_eq!(third.local_use.as_ref().map(|l| l.data.to_vec()), Some(vec![9, 9, 9]));
    assert!(record.messages.iter().all(|m| m.record_length == data.len()));
}

#[test]
fn test_bitmap_reuse_within_record() {
    let mask = vec![true, false, true, true, false, true, true, true, true, false, true, true];
    let data = Bytes::from(
        Grib2Builder::new()
            .field(FieldSpec::new(small_grid(), create_test_grid(4, 3)).bitmap(mask.clone()))
            .field(FieldSpec::new(small_grid(), vec![7.0; 12]).reuse_bitmap())
            .build(),
    );
    let record = parse_record(&data, 0).unwrap();
    let reused = &record.messages[1];
    assert_eq!(reused.bitmap.indicator, 254);
    assert_eq!(reused.bitmap.data, record.messages[0].bitmap.data);
    for (i, present) in mask.iter().enumerate() {
        assert_eq!(reused.bitmap.is_present(i), *present);
    }
}

#[test]
fn test_bitmap_reuse_without_earlier_bitmap() {
    let data = Bytes::from(
        Grib2Builder::new()
            .field(FieldSpec::new(small_grid(), vec![1.0; 12]).reuse_bitmap())
            .build(),
    );
    let err = parse_record(&data, 0).unwrap_err();
    assert_eq!(err.consumed, Some(data.len()));
    assert!(matches!(err.error, Grib2Error::InvalidSection { section: 6, .. }));
}

#[test]
fn test_out_of_order_sections() {
    let mut bytes = single_record();
    // Turn section 4 into a second section 5
    let section3_len = u32::from_be_bytes(bytes[37..41].try_into().unwrap()) as usize;
    let section4 = 37 + section3_len;
    bytes[section4 + 4] = 5;
    let data = Bytes::from(bytes);
    let err = parse_record(&data, 0).unwrap_err();
    assert_eq!(err.error.kind(), ErrorKind::Format);
    assert_eq!(err.consumed, Some(data.len()));
}

#[test]
fn test_truncated_record() {
    let mut bytes = single_record();
    bytes.truncate(bytes.len() - 10);
    let data = Bytes::from(bytes);
    let err = parse_record(&data, 0).unwrap_err();
    assert!(matches!(err.error, Grib2Error::InvalidFormat(_)));
    assert_eq!(err.consumed, None);
}

#[test]
fn test_edition_one_is_skipped_by_length() {
    let mut bytes = b"GRIB".to_vec();
    bytes.extend_from_slice(&[0, 0, 12, 1]);
    bytes.extend_from_slice(&[0; 4]);
    let data = Bytes::from(bytes);
    let err = parse_record(&data, 0).unwrap_err();
    assert_eq!(err.error, Grib2Error::UnsupportedEdition(1));
    assert_eq!(err.consumed, Some(12));
}

#[test]
fn test_reader_skips_garbage_between_records() {
    let mut bytes = b"leading junk".to_vec();
    bytes.extend(single_record());
    bytes.extend_from_slice(b"\0\0\0padding");
    bytes.extend(single_record());
    bytes.extend_from_slice(b"trailing");

    let messages: Vec<_> = Grib2Reader::new(Bytes::from(bytes)).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.is_ok()));
    let offsets: Vec<usize> = messages.iter().map(|m| m.as_ref().unwrap().offset).collect();
    assert_eq!(offsets[0], 12);
}

#[test]
fn test_reader_recovers_after_bad_record() {
    let good = single_record();
    let mut bad = good.clone();
    // Declared length beyond the buffer: length unknown, reader resyncs
    bad[8..16].copy_from_slice(&u64::MAX.to_be_bytes());

    let mut bytes = bad;
    bytes.extend(good.clone());
    let mut reader = Grib2Reader::new(Bytes::from(bytes));

    let first = reader.next().expect("an item");
    assert!(first.is_err());
    let second = reader.next().expect("an item").expect("the good record");
    assert_eq!(second.offset, good.len());
    assert!(reader.next().is_none());
}

#[test]
fn test_reader_flattens_multi_field_records() {
    let record = Grib2Builder::new()
        .field(FieldSpec::new(small_grid(), vec![1.0; 12]))
        .field(FieldSpec::new(small_grid(), vec![2.0; 12]))
        .build();
    let total = record.len() * 2;
    let mut bytes = record.clone();
    bytes.extend(record);
    let mut reader = Grib2Reader::new(Bytes::from(bytes));
    let mut count = 0;
    while let Some(message) = reader.next_message().unwrap() {
        assert_eq!(message.field_index, count % 2);
        count += 1;
    }
    assert_eq!(count, 4);
    assert_eq!(reader.offset(), total);
}

#[test]
fn test_reader_reports_failed_record_offset() {
    let good = single_record();
    let mut bad = good.clone();
    bad[7] = 3;

    let mut bytes = good.clone();
    bytes.extend(bad);
    bytes.extend(good.clone());
    let mut reader = Grib2Reader::new(Bytes::from(bytes));

    assert!(reader.next_message().unwrap().is_some());
    assert_eq!(reader.record_offset(), 0);
    let err = reader.next_message().unwrap_err();
    assert_eq!(err.error, Grib2Error::UnsupportedEdition(3));
    assert_eq!(reader.record_offset(), good.len());
    let third = reader.next_message().unwrap().unwrap();
    assert_eq!(third.offset, 2 * good.len());
}
