//! Cross-format tests over a registered record graph.

use payload_codecs::utils::Blob;
use payload_codecs::{
    binary, decode, encode, json, registry, xml, CodecOptions, Encoding, Error, Format, Payload,
    Reflected, Schema, Value,
};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

#[derive(Debug, Clone, Default, PartialEq)]
struct Address {
    street: String,
    city: String,
    zip: String,
}

impl Reflected for Address {
    fn schema() -> Schema<Self> {
        Schema::builder("Address")
            .field("Street", |a: &Address| a.street.clone(), |a, v| a.street = v)
            .field("City", |a: &Address| a.city.clone(), |a, v| a.city = v)
            .field("Zip", |a: &Address| a.zip.clone(), |a, v| a.zip = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct LineItem {
    sku: String,
    quantity: u32,
    unit_price: f64,
}

impl Reflected for LineItem {
    fn schema() -> Schema<Self> {
        Schema::builder("LineItem")
            .field("Sku", |l: &LineItem| l.sku.clone(), |l, v| l.sku = v)
            .field("Quantity", |l: &LineItem| l.quantity, |l, v| l.quantity = v)
            .field(
                "UnitPrice",
                |l: &LineItem| l.unit_price,
                |l, v| l.unit_price = v,
            )
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Invoice {
    number: String,
    customer: String,
    paid: bool,
    total: f64,
    reference: Option<String>,
    billing: Address,
    delivery: Option<Address>,
    items: Vec<LineItem>,
    tags: Vec<String>,
    stamp: Blob,
    internal_code: String,
    state: String,
}

impl Reflected for Invoice {
    fn schema() -> Schema<Self> {
        Schema::builder("Invoice")
            .field("Number", |i: &Invoice| i.number.clone(), |i, v| i.number = v)
            .field(
                "Customer",
                |i: &Invoice| i.customer.clone(),
                |i, v| i.customer = v,
            )
            .field("Paid", |i: &Invoice| i.paid, |i, v| i.paid = v)
            .field("Total", |i: &Invoice| i.total, |i, v| i.total = v)
            .field(
                "Reference",
                |i: &Invoice| i.reference.clone(),
                |i, v| i.reference = v,
            )
            .nested(
                "Billing",
                |i: &Invoice| i.billing.clone(),
                |i, v| i.billing = v,
            )
            .nested_opt(
                "Delivery",
                |i: &Invoice| i.delivery.clone(),
                |i, v| i.delivery = v,
            )
            .nested_seq("Items", |i: &Invoice| i.items.clone(), |i, v| i.items = v)
            .field("Tags", |i: &Invoice| i.tags.clone(), |i, v| i.tags = v)
            .field("Stamp", |i: &Invoice| i.stamp.clone(), |i, v| i.stamp = v)
            .field(
                "InternalCode",
                |i: &Invoice| i.internal_code.clone(),
                |i, v| i.internal_code = v,
            )
            .skip()
            .field("State", |i: &Invoice| i.state.clone(), |i, v| i.state = v)
            .rename("status")
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Ghost {
    id: u32,
}

impl Reflected for Ghost {
    fn schema() -> Schema<Self> {
        Schema::builder("Ghost")
            .field("Id", |g: &Ghost| g.id, |g, v| g.id = v)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Carrier {
    ghost: Ghost,
}

impl Reflected for Carrier {
    fn schema() -> Schema<Self> {
        Schema::builder("Carrier")
            .nested("Ghost", |c: &Carrier| c.ghost.clone(), |c, v| c.ghost = v)
            .build()
    }
}

fn register_all() {
    registry::register::<Invoice>().unwrap();
    registry::register::<Address>().unwrap();
    registry::register::<LineItem>().unwrap();
}

fn sample_invoice() -> Invoice {
    Invoice {
        number: "F-2024-001".to_string(),
        customer: "Acme GmbH".to_string(),
        paid: true,
        total: 1249.5,
        reference: None,
        billing: Address {
            street: "1 Main St".to_string(),
            city: "Lyon".to_string(),
            zip: "69000".to_string(),
        },
        delivery: None,
        items: vec![
            LineItem {
                sku: "K-100".to_string(),
                quantity: 2,
                unit_price: 499.75,
            },
            LineItem {
                sku: "P-7".to_string(),
                quantity: 1,
                unit_price: 250.0,
            },
        ],
        tags: vec!["export".to_string(), "priority".to_string()],
        stamp: Blob::new(vec![0xCA, 0xFE]),
        internal_code: "X99".to_string(),
        state: "open".to_string(),
    }
}

#[test]
fn null_and_blank_inputs_produce_null_outputs_everywhere() {
    assert_eq!(binary::to_bytes::<Invoice>(None).unwrap(), None);
    assert_eq!(binary::from_bytes::<Invoice>(None).unwrap(), None);
    assert_eq!(binary::from_bytes::<Invoice>(Some(&[])).unwrap(), None);

    assert_eq!(xml::to_string::<Invoice>(None).unwrap(), None);
    assert_eq!(xml::from_str::<Invoice>(None).unwrap(), None);
    assert_eq!(xml::from_str::<Invoice>(Some("  \n\t ")).unwrap(), None);

    assert_eq!(json::strict::to_string::<Invoice>(None).unwrap(), None);
    assert_eq!(json::strict::from_str::<Invoice>(Some("")).unwrap(), None);
    assert_eq!(
        json::strict::from_str::<Invoice>(Some("null")).unwrap(),
        None
    );

    assert_eq!(json::flex::to_string::<Invoice>(None).unwrap(), None);
    assert_eq!(json::flex::from_str::<Invoice>(Some(" ")).unwrap(), None);
    assert_eq!(json::flex::from_str::<Invoice>(Some("null")).unwrap(), None);
    assert_eq!(json::flex::parse(None).unwrap(), None);

    let options = CodecOptions::default();
    assert_eq!(
        encode::<Invoice>(Format::Binary, None, &options).unwrap(),
        None
    );
    assert_eq!(
        decode::<Invoice>(Format::JsonFlex, None, &options).unwrap(),
        None
    );
}

#[test]
fn binary_round_trips_the_full_graph() {
    register_all();
    let bytes = binary::to_bytes(Some(&sample_invoice())).unwrap().unwrap();
    let back: Invoice = binary::from_bytes(Some(&bytes)).unwrap().unwrap();
    assert_eq!(back, sample_invoice());
}

#[test]
fn binary_rejects_unregistered_types_anywhere_in_the_graph() {
    let err = binary::to_bytes(Some(&Ghost { id: 1 })).unwrap_err();
    assert!(matches!(err, Error::NotSerializable(name) if name == "Ghost"));

    registry::register::<Carrier>().unwrap();
    let err = binary::to_bytes(Some(&Carrier {
        ghost: Ghost { id: 2 },
    }))
    .unwrap_err();
    assert!(matches!(err, Error::NotSerializable(name) if name == "Ghost"));
}

#[test]
fn binary_decode_into_the_wrong_type_is_a_type_mismatch() {
    register_all();
    let bytes = binary::to_bytes(Some(&sample_invoice().billing))
        .unwrap()
        .unwrap();
    let err = binary::from_bytes::<LineItem>(Some(&bytes)).unwrap_err();
    assert!(matches!(
        err,
        Error::TypeMismatch { expected, found }
            if expected == "LineItem" && found == "Address"
    ));
}

#[test]
fn xml_document_has_declaration_namespaces_and_type_named_root() {
    let text = xml::to_string(Some(&sample_invoice())).unwrap().unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(text.contains(
        "<Invoice xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">"
    ));
    assert!(text.contains("<Delivery/>"));
    assert!(text.ends_with("</Invoice>"));

    let back: Invoice = xml::from_str(Some(&text)).unwrap().unwrap();
    assert_eq!(back, sample_invoice());
}

#[test]
fn xml_declared_encoding_wins_and_garbles_deterministically() {
    let text = "<?xml version=\"1.0\" encoding=\"iso-8859-1\"?>\
                <Address><Street>Cr\u{e9}mieux</Street><City>Paris</City>\
                <Zip>75012</Zip></Address>";
    let first: Address = xml::from_str_with(Some(text), Encoding::Utf8)
        .unwrap()
        .unwrap();
    let second: Address = xml::from_str_with(Some(text), Encoding::Utf8)
        .unwrap()
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.street, "CrÃ©mieux");
    assert_eq!(first.zip, "75012");
}

#[test]
fn xml_indented_flat_record_has_three_plus_member_lines() {
    let address = sample_invoice().billing;
    let text = xml::to_string_with(
        Some(&address),
        xml::XmlWriteOptions {
            indent: true,
            encoding: Encoding::Utf8,
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(text.lines().count(), 3 + Address::schema().fields().len());
}

#[test]
fn strict_json_writes_declaration_order_and_ignores_annotations() {
    let text = json::strict::to_string(Some(&sample_invoice()))
        .unwrap()
        .unwrap();
    assert!(text.starts_with(r#"{"Number":"F-2024-001","Customer":"Acme GmbH","Paid":true"#));
    // Null members are gone, annotations are not applied.
    assert!(!text.contains("Reference"));
    assert!(!text.contains("Delivery"));
    assert!(text.contains(r#""InternalCode":"X99""#));
    assert!(text.contains(r#""State":"open""#));
    assert!(!text.contains("status"));

    let back: Invoice = json::strict::from_str(Some(&text)).unwrap().unwrap();
    assert_eq!(back, sample_invoice());
}

#[test]
fn flex_json_applies_annotations_and_optionally_keeps_nulls() {
    let text = json::flex::to_string(Some(&sample_invoice()))
        .unwrap()
        .unwrap();
    assert!(!text.contains("InternalCode"));
    assert!(text.contains(r#""status":"open""#));
    assert!(!text.contains("Reference"));

    let text = json::flex::to_string_with(
        Some(&sample_invoice()),
        json::flex::FlexOptions {
            ignore_nulls: false,
        },
    )
    .unwrap()
    .unwrap();
    assert!(text.contains(r#""Reference":null"#));
    assert!(text.contains(r#""Delivery":null"#));
}

#[test]
fn strict_decode_is_case_sensitive_and_flex_decode_is_not() {
    let source = r#"{"number":"F-9","Customer":"Duo"}"#;

    let strict: Invoice = json::strict::from_str(Some(source)).unwrap().unwrap();
    assert_eq!(strict.number, "");
    assert_eq!(strict.customer, "Duo");

    let flex: Invoice = json::flex::from_str(Some(source)).unwrap().unwrap();
    assert_eq!(flex.number, "F-9");
    assert_eq!(flex.customer, "Duo");
}

#[test]
fn unknown_keys_are_ignored_and_missing_members_keep_defaults() {
    let source = r#"{"Wholly":"unknown","Number":"F-3"}"#;
    let from_json: Invoice = json::strict::from_str(Some(source)).unwrap().unwrap();
    assert_eq!(from_json.number, "F-3");
    assert_eq!(from_json.items, Vec::new());
    assert_eq!(from_json.total, 0.0);

    let source = "<Address><Mystery>1</Mystery><City>Nice</City></Address>";
    let from_xml: Address = xml::from_str(Some(source)).unwrap().unwrap();
    assert_eq!(from_xml.city, "Nice");
    assert_eq!(from_xml.street, "");
}

#[test]
fn malformed_sources_fail_with_malformed_input() {
    register_all();
    assert!(matches!(
        json::strict::from_str::<Invoice>(Some(r#"{"Number""#)).unwrap_err(),
        Error::MalformedInput(_)
    ));
    assert!(matches!(
        json::flex::parse(Some("[1, 2")).unwrap_err(),
        Error::MalformedInput(_)
    ));
    assert!(matches!(
        xml::from_str::<Address>(Some("<Address><City></Address>")).unwrap_err(),
        Error::MalformedInput(_)
    ));
    assert!(matches!(
        binary::from_bytes::<Invoice>(Some(&[0xC0, 0xDC, 0x01, 0xFF])).unwrap_err(),
        Error::MalformedInput(_)
    ));
}

#[test]
fn dynamic_parse_exposes_source_token_types() {
    let value = json::flex::parse(Some(
        r#"{"invoice":"F-1","count":2,"total":12.5,"paid":false,"items":["a","b"],"extra":null}"#,
    ))
    .unwrap()
    .unwrap();
    assert_eq!(value.get("invoice").and_then(Value::as_str), Some("F-1"));
    assert_eq!(value.get("count").and_then(Value::as_i64), Some(2));
    assert_eq!(value.get("total").and_then(Value::as_f64), Some(12.5));
    assert_eq!(value.get("paid").and_then(Value::as_bool), Some(false));
    assert_eq!(
        value.get("items").and_then(Value::as_seq).map(<[Value]>::len),
        Some(2)
    );
    assert!(value.get("extra").is_some_and(Value::is_null));
}

#[test]
fn erased_decodes_resolve_types_by_runtime_name() {
    register_all();

    let text = r#"{"street":"5 Rue Neuve","city":"Lille","zip":"59000"}"#;
    let boxed = json::flex::from_str_as("Address", Some(text)).unwrap().unwrap();
    let address = boxed.downcast::<Address>().unwrap();
    assert_eq!(address.city, "Lille");

    let text = "<Address><Street>5 Rue Neuve</Street></Address>";
    let boxed = xml::from_str_as("Address", Some(text), Encoding::Utf8)
        .unwrap()
        .unwrap();
    let address = boxed.downcast::<Address>().unwrap();
    assert_eq!(address.street, "5 Rue Neuve");

    assert!(matches!(
        json::flex::from_str_as("Nobody", Some("{}")).unwrap_err(),
        Error::InvalidArgument(_)
    ));
}

#[test]
fn facade_dispatch_matches_the_direct_calls() {
    register_all();
    let options = CodecOptions::default();
    let invoice = sample_invoice();

    for format in [Format::Binary, Format::Xml, Format::JsonStrict] {
        let payload = encode(format, Some(&invoice), &options).unwrap().unwrap();
        let back: Invoice = decode(format, Some(&payload), &options).unwrap().unwrap();
        assert_eq!(back, invoice, "format {format:?}");
    }

    // The permissive dialect drops the skipped member and writes the
    // renamed one under a name decode does not consult.
    let payload = encode(Format::JsonFlex, Some(&invoice), &options)
        .unwrap()
        .unwrap();
    let back: Invoice = decode(Format::JsonFlex, Some(&payload), &options)
        .unwrap()
        .unwrap();
    let mut expected = invoice.clone();
    expected.internal_code = String::new();
    expected.state = String::new();
    assert_eq!(back, expected);

    let err = decode::<Invoice>(
        Format::Binary,
        Some(&Payload::Text("{}".to_string())),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

impl Arbitrary for LineItem {
    fn arbitrary(g: &mut Gen) -> Self {
        LineItem {
            sku: ascii_token(g),
            quantity: u32::arbitrary(g),
            // Quarter steps keep the value exact through decimal text.
            unit_price: f64::from(u16::arbitrary(g)) / 4.0,
        }
    }
}

fn ascii_token(g: &mut Gen) -> String {
    let length = usize::arbitrary(g) % 12;
    (0..length)
        .map(|_| {
            char::from(
                *g.choose(b"abcdefghijklmnopqrstuvwxyz0123456789-")
                    .unwrap_or(&b'x'),
            )
        })
        .collect()
}

#[quickcheck]
fn prop_text_formats_round_trip_line_items(item: LineItem) -> bool {
    let xml_text = xml::to_string(Some(&item)).unwrap().unwrap();
    let from_xml: LineItem = xml::from_str(Some(&xml_text)).unwrap().unwrap();

    let strict_text = json::strict::to_string(Some(&item)).unwrap().unwrap();
    let from_strict: LineItem = json::strict::from_str(Some(&strict_text))
        .unwrap()
        .unwrap();

    let flex_text = json::flex::to_string(Some(&item)).unwrap().unwrap();
    let from_flex: LineItem = json::flex::from_str(Some(&flex_text)).unwrap().unwrap();

    from_xml == item && from_strict == item && from_flex == item
}

#[quickcheck]
fn prop_binary_round_trips_line_items(item: LineItem) -> bool {
    registry::register::<LineItem>().unwrap();
    let bytes = binary::to_bytes(Some(&item)).unwrap().unwrap();
    binary::from_bytes::<LineItem>(Some(&bytes)).unwrap() == Some(item)
}
