
//! Parsing and serializing tagged records against registered descriptions.

use nsif::field::{Field, FieldKind};
use nsif::tre::describe::{Cond, Descriptor, TreDescription};
use nsif::tre::interpret::{self, FieldMap};
use nsif::tre::{Tre, registry};

// the registry is process-wide, so every test uses its own tags

fn aircraft_description() -> TreDescription {
    TreDescription::compile(&[
        Descriptor::bcs_a("AC_MSN_ID", 20, "Aircraft Mission ID"),
        Descriptor::bcs_a("AC_TAIL_NO", 10, "Aircraft Tail Number"),
        Descriptor::bcs_a("AC_TO", 12, "Aircraft Take-off"),
        Descriptor::bcs_a("SENSOR_ID_TYPE", 4, "Sensor ID Type"),
        Descriptor::bcs_a("SENSOR_ID", 6, "Sensor ID"),
        Descriptor::bcs_n("SCENE_SOURCE", 1, "Scene Source"),
        Descriptor::bcs_n("SCNUM", 6, "Scene Number"),
        Descriptor::bcs_n("PDATE", 8, "Processing Date"),
        Descriptor::bcs_n("IMHOSTNO", 6, "Immediate Scene Host"),
        Descriptor::bcs_n("IMREQID", 5, "Immediate Scene Request ID"),
        Descriptor::bcs_n("MPLAN", 3, "Mission Plan Mode"),
        Descriptor::bcs_a("ENTLOC", 25, "Entry Location"),
        Descriptor::bcs_a("LOC_ACCY", 6, "Location Accuracy"),
        Descriptor::bcs_a("ENTELV", 6, "Entry Elevation"),
        Descriptor::bcs_a("ELV_UNIT", 1, "Elevation Units"),
        Descriptor::bcs_a("EXITLOC", 25, "Exit Location"),
        Descriptor::bcs_a("EXITELV", 6, "Exit Elevation"),
        Descriptor::bcs_a("TMAP", 7, "True Map Angle"),
        Descriptor::bcs_a("ROW_SPACING", 7, "Row Spacing"),
        Descriptor::bcs_a("ROW_SPACING_UNITS", 1, "Row Spacing Units"),
        Descriptor::bcs_a("COL_SPACING", 7, "Column Spacing"),
        Descriptor::bcs_a("COL_SPACING_UNITS", 1, "Column Spacing Units"),
        Descriptor::bcs_a("FOCAL_LENGTH", 6, "Focal Length"),
        Descriptor::bcs_a("SENSERIAL", 6, "Sensor Serial Number"),
        Descriptor::bcs_a("ABSWVER", 7, "Airborne Software Version"),
        Descriptor::bcs_a("CAL_DATE", 8, "Calibration Date"),
        Descriptor::bcs_n("PATCH_TOT", 4, "Patch Total"),
        Descriptor::bcs_n("MTI_TOT", 3, "MTI Total"),
        Descriptor::End,
    ]).unwrap()
}

#[test]
fn fixed_layout_record_round_trips() {
    let description = aircraft_description();

    let mut fields = FieldMap::new();
    fields.insert("AC_MSN_ID".to_owned(), Field::bcs_a("MISSION7", 20).unwrap());
    fields.insert("SENSOR_ID".to_owned(), Field::bcs_a("EO1", 6).unwrap());
    fields.insert("SCNUM".to_owned(), Field::bcs_n(42, 6).unwrap());
    fields.insert("PATCH_TOT".to_owned(), Field::bcs_n(17, 4).unwrap());

    let bytes = interpret::serialize(&description, &fields).unwrap();
    assert_eq!(bytes.len(), 207); // the sum of all the declared field widths

    let parsed = interpret::parse(&description, &bytes, 0);
    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.consumed, bytes.len());
    assert_eq!(parsed.fields.len(), 28);

    assert_eq!(parsed.fields["AC_MSN_ID"].as_str().unwrap(), "MISSION7");
    assert_eq!(parsed.fields["SENSOR_ID"].as_str().unwrap(), "EO1");
    assert_eq!(parsed.fields["SCNUM"].as_u64().unwrap(), 42);
    assert_eq!(parsed.fields["PATCH_TOT"].as_u64().unwrap(), 17);

    // fields never stored came back as their default padding
    assert_eq!(parsed.fields["AC_TAIL_NO"].as_str().unwrap(), "");
    assert_eq!(parsed.fields["MTI_TOT"].as_u64().unwrap(), 0);

    // a parse-serialize cycle reproduces the record exactly
    assert_eq!(interpret::serialize(&description, &parsed.fields).unwrap(), bytes);
}

#[test]
fn registered_records_decode_through_their_tag() {
    registry::register("BNDST0", TreDescription::compile(&[
        Descriptor::bcs_a("ROW_SPACING", 7, "Row Spacing"),
        Descriptor::bcs_n("BANDCOUNT", 4, "Number of Bands"),
        Descriptor::looped("BANDCOUNT"),
            Descriptor::bcs_a("BANDPEAK", 5, "Band Peak Response"),
            Descriptor::bcs_a("BANDLBOUND", 5, "Band Lower Wavelength"),
            Descriptor::bcs_a("BANDUBOUND", 5, "Band Upper Wavelength"),
        Descriptor::EndLoop,
        Descriptor::End,
    ]).unwrap()).unwrap();

    let mut tre = Tre::new("BNDST0").unwrap();
    tre.insert("ROW_SPACING", Field::bcs_a("0000.5", 7).unwrap()).unwrap();
    tre.insert("BANDCOUNT", Field::bcs_n(2, 4).unwrap()).unwrap();
    tre.insert("BANDPEAK[0]", Field::bcs_a("0.555", 5).unwrap()).unwrap();
    tre.insert("BANDLBOUND[0]", Field::bcs_a("0.500", 5).unwrap()).unwrap();
    tre.insert("BANDUBOUND[0]", Field::bcs_a("0.600", 5).unwrap()).unwrap();
    tre.insert("BANDPEAK[1]", Field::bcs_a("0.880", 5).unwrap()).unwrap();

    let bytes = tre.record_bytes().unwrap();
    assert_eq!(bytes.len(), 7 + 4 + 2 * 15);

    let parsed = interpret::parse(&registry::find_any("BNDST0").unwrap(), &bytes, 0);
    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.fields["BANDPEAK[1]"].as_str().unwrap(), "0.880");
    assert_eq!(parsed.fields["BANDUBOUND[1]"].as_str().unwrap(), ""); // was never stored
}

#[test]
fn zero_loop_iterations_occupy_zero_bytes() {
    let description = TreDescription::compile(&[
        Descriptor::bcs_n("COUNT", 3, "Count"),
        Descriptor::looped("COUNT"),
            Descriptor::bcs_a("NAME", 10, "Name"),
        Descriptor::EndLoop,
        Descriptor::bcs_a("AFTER", 2, "After"),
        Descriptor::End,
    ]).unwrap();

    let parsed = interpret::parse(&description, b"000OK", 0);
    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.fields.len(), 2);
    assert_eq!(parsed.fields["AFTER"].as_str().unwrap(), "OK");

    assert_eq!(interpret::serialize(&description, &parsed.fields).unwrap(), b"000OK");
}

#[test]
fn conditional_branches_are_exclusive() {
    let description = TreDescription::compile(&[
        Descriptor::bcs_a("MODE", 1, "Mode"),
        Descriptor::when("MODE", Cond::Eq, "A"),
            Descriptor::bcs_a("ADATA", 4, "A Data"),
        Descriptor::EndIf,
        Descriptor::when("MODE", Cond::Ne, "A"),
            Descriptor::bcs_a("BDATA", 6, "B Data"),
        Descriptor::EndIf,
        Descriptor::End,
    ]).unwrap();

    let taken_a = interpret::parse(&description, b"Aaaaa", 0);
    assert!(taken_a.warnings.is_empty());
    assert!(taken_a.fields.contains_key("ADATA"));
    assert!(!taken_a.fields.contains_key("BDATA"));

    let taken_b = interpret::parse(&description, b"Xbbbbbb", 0);
    assert!(taken_b.warnings.is_empty());
    assert!(!taken_b.fields.contains_key("ADATA"));
    assert!(taken_b.fields.contains_key("BDATA"));

    assert_eq!(interpret::serialize(&description, &taken_a.fields).unwrap(), b"Aaaaa");
    assert_eq!(interpret::serialize(&description, &taken_b.fields).unwrap(), b"Xbbbbbb");
}

#[test]
fn numeric_conditions_compare_by_value() {
    let description = TreDescription::compile(&[
        Descriptor::bcs_n("LEVEL", 3, "Level"),
        Descriptor::when("LEVEL", Cond::Gt, "5"),
            Descriptor::bcs_a("EXTRA", 2, "Extra"),
        Descriptor::EndIf,
        Descriptor::End,
    ]).unwrap();

    assert!(interpret::parse(&description, b"006XX", 0).fields.contains_key("EXTRA"));
    assert!(!interpret::parse(&description, b"005", 0).fields.contains_key("EXTRA"));
}

#[test]
fn computed_lengths_account_for_every_byte() {
    let description = TreDescription::compile(&[
        Descriptor::bcs_a("RESRC", 4, "Resource"),
        Descriptor::bcs_n("RECNT", 3, "Record Count"),
        Descriptor::looped("RECNT"),
            Descriptor::bcs_n("ENGLN", 2, "Label Length"),
            Descriptor::computed_length("ENGLN"),
            Descriptor::bcs_a("ENGLBL", 0, "Label"),
            Descriptor::bcs_n("ENGDATC", 4, "Data Byte Count"),
            Descriptor::computed_length("ENGDATC"),
            Descriptor::binary("ENGDATA", 0, "Data"),
        Descriptor::EndLoop,
        Descriptor::End,
    ]).unwrap();

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"SRC ");
    bytes.extend_from_slice(b"002");
    bytes.extend_from_slice(b"05");        // ENGLN[0]
    bytes.extend_from_slice(b"TEMP1");     // ENGLBL[0]
    bytes.extend_from_slice(b"0003");      // ENGDATC[0]
    bytes.extend_from_slice(&[1, 2, 3]);   // ENGDATA[0]
    bytes.extend_from_slice(b"02");        // ENGLN[1]
    bytes.extend_from_slice(b"RH");        // ENGLBL[1]
    bytes.extend_from_slice(b"0000");      // ENGDATC[1]
    // ENGDATA[1] occupies zero bytes

    let parsed = interpret::parse(&description, &bytes, 0);
    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.consumed, bytes.len());

    assert_eq!(parsed.fields["ENGLBL[0]"].as_str().unwrap(), "TEMP1");
    assert_eq!(parsed.fields["ENGDATA[0]"].raw_bytes(), &[1, 2, 3]);
    assert_eq!(parsed.fields["ENGLBL[1]"].as_str().unwrap(), "RH");

    // a zero computed length still materializes the field, empty
    assert!(parsed.fields["ENGDATA[1]"].is_empty());

    assert_eq!(interpret::serialize(&description, &parsed.fields).unwrap(), bytes);
}

#[test]
fn trailing_payload_consumes_the_rest_of_the_record() {
    let description = TreDescription::compile(&[
        Descriptor::bcs_a("KIND", 2, "Kind"),
        Descriptor::rest_of_record(FieldKind::Binary, "PAYLOAD", "Payload"),
        Descriptor::End,
    ]).unwrap();

    let parsed = interpret::parse(&description, b"AB\x01\x02\x03\x04", 0);
    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.fields["PAYLOAD"].raw_bytes(), &[1, 2, 3, 4]);

    assert_eq!(interpret::serialize(&description, &parsed.fields).unwrap(), b"AB\x01\x02\x03\x04");
}

#[test]
fn malformed_records_warn_and_keep_the_parsed_prefix() {
    let description = TreDescription::compile(&[
        Descriptor::bcs_a("HEAD", 4, "Head"),
        Descriptor::bcs_n("COUNT", 3, "Count"),
        Descriptor::looped("COUNT"),
            Descriptor::bcs_a("NAME", 8, "Name"),
        Descriptor::EndLoop,
        Descriptor::End,
    ]).unwrap();

    // the count claims two entries but only one fits
    let parsed = interpret::parse(&description, b"HEAD002FIRST   ", 0);
    assert_eq!(parsed.warnings.len(), 1);
    assert_eq!(parsed.fields["HEAD"].as_str().unwrap(), "HEAD");
    assert_eq!(parsed.fields["NAME[0]"].as_str().unwrap(), "FIRST");
    assert!(!parsed.fields.contains_key("NAME[1]"));

    // an unparsable count warns too
    let unparsable = interpret::parse(&description, b"HEADxyz", 0);
    assert_eq!(unparsable.warnings.len(), 1);
    assert_eq!(unparsable.fields.len(), 2); // HEAD and the unusable COUNT

    // excess bytes after the walk are reported as well
    let excess = interpret::parse(&description, b"HEAD000TRAILING", 0);
    assert_eq!(excess.warnings.len(), 1);
    assert_eq!(excess.consumed, 7);
}

#[test]
fn length_variants_select_by_declared_length() {
    registry::register_for_length("VARTR0", 4, TreDescription::compile(&[
        Descriptor::bcs_a("SHORT", 4, "Short Form"),
        Descriptor::End,
    ]).unwrap()).unwrap();

    registry::register_for_length("VARTR0", 8, TreDescription::compile(&[
        Descriptor::bcs_a("LONG", 8, "Long Form"),
        Descriptor::End,
    ]).unwrap()).unwrap();

    let short = interpret::parse(&registry::find("VARTR0", 4).unwrap(), b"abcd", 0);
    assert!(short.fields.contains_key("SHORT"));

    let long = interpret::parse(&registry::find("VARTR0", 8).unwrap(), b"abcdefgh", 0);
    assert!(long.fields.contains_key("LONG"));

    assert!(registry::find("VARTR0", 6).is_none()); // no generic fallback registered
}

#[test]
fn oversized_values_fail_to_serialize() {
    let description = TreDescription::compile(&[
        Descriptor::bcs_a("NAME", 4, "Name"),
        Descriptor::End,
    ]).unwrap();

    let mut fields = FieldMap::new();
    fields.insert("NAME".to_owned(), Field::from_raw(FieldKind::BcsA, b"TOO LONG".to_vec()));

    assert!(interpret::serialize(&description, &fields).is_err());
}
