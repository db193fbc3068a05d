use super::xml_of;
use crate::cifti2::MetaData;
use crate::error::CiftiError;

#[test]
fn overwrite_keeps_first_position() {
    let mut md = MetaData::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]);
    md.set("a", "10");

    let pairs: Vec<(&str, &str)> = md.iter().collect();
    assert_eq!(pairs, vec![("a", "10"), ("b", "2"), ("c", "3")]);
    assert_eq!(md.len(), 3);
    assert_eq!(md.get("a"), Some("10"));
    assert_eq!(md.get("zzz"), None);
}

#[test]
fn remove_missing_key_fails() {
    let mut md = MetaData::from_pairs([("a", "1")]);
    assert!(matches!(md.remove("b"), Err(CiftiError::KeyNotFound(ref k)) if k == "b"));
    assert_eq!(md.remove("a").unwrap(), "1");
    assert!(md.is_empty());
}

#[test]
fn difference_update_removes_other_keys() {
    let mut md = MetaData::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]);
    let other = MetaData::from_pairs([("a", "x"), ("c", "y")]);

    md.difference_update(Some(&other)).unwrap();
    assert_eq!(md.keys().collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn difference_update_is_all_or_nothing() {
    let mut md = MetaData::from_pairs([("a", "1"), ("b", "2")]);
    let other = MetaData::from_pairs([("a", ""), ("missing", "")]);

    let err = md.difference_update(Some(&other)).unwrap_err();
    assert!(matches!(err, CiftiError::KeyNotFound(ref k) if k == "missing"));
    assert_eq!(md.len(), 2);

    assert!(matches!(
        md.difference_update(None),
        Err(CiftiError::InvalidArgument(_))
    ));
}

#[test]
fn writes_name_value_pairs_in_order() {
    let md = MetaData::from_pairs([("Provenance", "wb_command"), ("Description", "")]);
    assert_eq!(
        xml_of(&md),
        "<MetaData>\
         <MD><Name>Provenance</Name><Value>wb_command</Value></MD>\
         <MD><Name>Description</Name><Value/></MD>\
         </MetaData>"
    );
    assert_eq!(xml_of(&MetaData::new()), "<MetaData/>");
}

#[test]
fn serializes_as_json_object() {
    let md = MetaData::from_pairs([("z", "1"), ("a", "2")]);
    let json = serde_json::to_string(&md).unwrap();
    assert_eq!(json, r#"{"z":"1","a":"2"}"#);
}
