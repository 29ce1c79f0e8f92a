use nist_itl::{AsciiRecord, BinaryField, BinaryRecord, ErrorKind, Message, Record};

type TestResult = anyhow::Result<()>;

#[test]
fn round_trips_two_type2_records() -> TestResult {
    let mut msg = Message::new()?;
    msg.set_tot("TOTFORTEST")?;

    let mut r1 = AsciiRecord::with_options(2, true, true)?;
    r1.field_mut(2).unwrap().set_value(1i64)?;
    msg.push(Record::Ascii(r1))?;

    let mut r2 = AsciiRecord::with_options(2, true, true)?;
    r2.field_mut(2).unwrap().set_value(2i64)?;
    msg.push(Record::Ascii(r2))?;

    let bytes = msg.to_nist()?;

    let mut reparsed = Message::new()?;
    reparsed.parse(&bytes)?;
    assert_eq!(reparsed.len(), 3);
    assert_eq!(reparsed.tot().unwrap().as_str(), Some("TOTFORTEST"));
    assert!(reparsed.get_by_type_idc(2, 1).is_some());
    assert!(reparsed.get_by_type_idc(2, 2).is_some());
    Ok(())
}

#[test]
fn round_trips_a_mixed_ascii_and_binary_field_record() -> TestResult {
    let mut msg = Message::new()?;
    let mut fingerprint = AsciiRecord::with_options(10, true, true)?;
    let image = b"\xff\xd8not really a jpeg but good enough".to_vec();
    fingerprint.push_binary_field(BinaryField::new(10, 999, image.clone()))?;
    msg.push(Record::Ascii(fingerprint))?;

    let bytes = msg.to_nist()?;

    let mut reparsed = Message::new()?;
    reparsed.parse(&bytes)?;
    assert_eq!(reparsed.len(), 2);

    let record = reparsed.get(1).unwrap().as_ascii().unwrap();
    let data = record.get("DATA").unwrap().as_binary().unwrap();
    assert_eq!(data.value(), image.as_slice());
    Ok(())
}

#[test]
fn round_trips_a_pure_binary_record() -> TestResult {
    let mut msg = Message::new()?;
    let mut signature = BinaryRecord::new(4);
    signature.set_idc(1);
    signature.set_value(b"raw signature bytes".to_vec());
    msg.push(Record::Binary(signature))?;

    let bytes = msg.to_nist()?;

    let mut reparsed = Message::new()?;
    reparsed.parse(&bytes)?;
    assert_eq!(reparsed.len(), 2);
    let record = reparsed.get(1).unwrap().as_binary().unwrap();
    assert_eq!(record.record_type(), 4);
    assert_eq!(record.idc(), 1);
    assert_eq!(record.value(), b"raw signature bytes");
    Ok(())
}

#[test]
fn bad_cnt_content_is_rejected_on_parse() -> TestResult {
    let mut msg = Message::new()?;
    let mut r = AsciiRecord::with_options(2, true, true)?;
    r.field_mut(2).unwrap().set_value(1i64)?;
    msg.push(Record::Ascii(r))?;

    let mut bytes = msg.to_nist()?;

    let cnt_pos = bytes
        .windows(6)
        .position(|w| w == b"1.003:")
        .expect("CNT field present");
    assert_eq!(bytes[cnt_pos + 6], b'1');
    bytes[cnt_pos + 6] = b'9';

    let mut reparsed = Message::new()?;
    let err = reparsed.parse(&bytes).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadContent);
    Ok(())
}

#[test]
fn duplicate_alias_is_rejected() -> TestResult {
    use nist_itl::Field;

    let mut r = AsciiRecord::with_options(2, false, true)?;
    let mut a = Field::new(2, 3);
    a.set_alias("SAME");
    r.push_field(a)?;

    let mut b = Field::new(2, 4);
    b.set_alias("SAME");
    let err = r.push_field(b).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadAliasDuplicate);
    Ok(())
}

#[test]
fn subfield_shape_must_match_its_fields_mask() -> TestResult {
    use nist_itl::{Mask, SubField};

    let mut f = nist_itl::Field::with_mask(2, 3, Mask::S);
    let mut sf = SubField::new(Mask::I);
    sf.add_values(["a", "b"])?;
    let err = f.add_subfields([sf]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadSubfieldValue);
    Ok(())
}

#[test]
fn truncated_nist_buffer_is_too_short() -> TestResult {
    let mut msg = Message::new()?;
    let bytes = msg.to_nist()?;
    let mut reparsed = Message::new()?;
    let err = reparsed.parse(&bytes[..bytes.len() - 2]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NistTooShort);
    Ok(())
}
