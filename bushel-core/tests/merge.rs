use bushel_core::merge::{merge_restore_images, resolve_signing};
use bushel_core::RestoreImageRecord;
use chrono::{DateTime, TimeZone, Utc};

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn image(source: &str) -> RestoreImageRecord {
    RestoreImageRecord {
        version: "14.2.1".into(),
        build_number: "23C71".into(),
        release_date: at(2023, 12, 19),
        download_url: format!("https://{source}/UniversalMac_14.2.1_23C71_Restore.ipsw"),
        file_size: 0,
        sha256_hash: String::new(),
        sha1_hash: String::new(),
        is_signed: None,
        is_prerelease: false,
        source: source.into(),
        notes: None,
        source_updated_at: None,
    }
}

#[test]
fn merge_keeps_identity_fields_from_first() {
    let first = image("ipsw.me");
    let mut second = image("appledb.dev");
    second.version = "14.2.1 (b)".into();
    second.release_date = at(2024, 1, 1);
    second.is_prerelease = true;

    let merged = merge_restore_images(&first, &second);

    assert_eq!(merged.build_number, first.build_number);
    assert_eq!(merged.version, first.version);
    assert_eq!(merged.release_date, first.release_date);
    assert_eq!(merged.download_url, first.download_url);
    assert_eq!(merged.source, "ipsw.me");
    assert!(!merged.is_prerelease);
}

#[test]
fn merge_backfills_hashes_and_size_only_when_missing() {
    let mut first = image("ipsw.me");
    first.sha1_hash = "aaaa".into();
    let mut second = image("appledb.dev");
    second.sha256_hash = "X".into();
    second.sha1_hash = "bbbb".into();
    second.file_size = 13_921_471_423;

    let merged = merge_restore_images(&first, &second);

    assert_eq!(merged.sha256_hash, "X");
    assert_eq!(merged.sha1_hash, "aaaa", "existing hash must not be replaced");
    assert_eq!(merged.file_size, 13_921_471_423);

    first.file_size = 42;
    assert_eq!(merge_restore_images(&first, &second).file_size, 42);
}

#[test]
fn merge_combines_notes() {
    struct Case {
        name: &'static str,
        first: Option<&'static str>,
        second: Option<&'static str>,
        expected: Option<&'static str>,
    }

    let cases = vec![
        Case { name: "both present", first: Some("a"), second: Some("b"), expected: Some("a; b") },
        Case { name: "only first", first: Some("a"), second: None, expected: Some("a") },
        Case { name: "only second", first: None, second: Some("b"), expected: Some("b") },
        Case { name: "empty first", first: Some(""), second: Some("b"), expected: Some("b") },
        Case { name: "neither", first: None, second: Some(""), expected: None },
    ];

    for case in cases {
        let mut first = image("ipsw.me");
        first.notes = case.first.map(str::to_string);
        let mut second = image("appledb.dev");
        second.notes = case.second.map(str::to_string);

        let merged = merge_restore_images(&first, &second);
        assert_eq!(merged.notes.as_deref(), case.expected, "case: {}", case.name);
    }
}

#[test]
fn authoritative_source_wins_in_either_order() {
    let mut authoritative = image("mesu.apple.com");
    authoritative.is_signed = Some(false);
    let mut other = image("ipsw.me");
    other.is_signed = Some(true);
    other.source_updated_at = Some(at(2030, 1, 1));

    assert_eq!(merge_restore_images(&authoritative, &other).is_signed, Some(false));
    assert_eq!(merge_restore_images(&other, &authoritative).is_signed, Some(false));
}

#[test]
fn authoritative_source_with_unknown_status_does_not_win() {
    let authoritative = image("tss.virtualbuddy.app");
    let mut other = image("ipsw.me");
    other.is_signed = Some(true);

    assert_eq!(resolve_signing(&authoritative, &other), Some(true));
}

#[test]
fn later_timestamp_wins() {
    let mut older = image("ipsw.me");
    older.is_signed = Some(true);
    older.source_updated_at = Some(at(2024, 1, 1));
    let mut newer = image("appledb.dev");
    newer.is_signed = Some(false);
    newer.source_updated_at = Some(at(2024, 2, 1));

    assert_eq!(resolve_signing(&older, &newer), Some(false));
    assert_eq!(resolve_signing(&newer, &older), Some(false));
}

#[test]
fn later_timestamp_with_unknown_status_falls_back() {
    let mut older = image("ipsw.me");
    older.is_signed = Some(true);
    older.source_updated_at = Some(at(2024, 1, 1));
    let mut newer = image("appledb.dev");
    newer.source_updated_at = Some(at(2024, 2, 1));

    assert_eq!(resolve_signing(&older, &newer), Some(true));
}

#[test]
fn single_timestamp_wins() {
    let mut untimed = image("ipsw.me");
    untimed.is_signed = Some(false);
    let mut timed = image("appledb.dev");
    timed.is_signed = Some(true);
    timed.source_updated_at = Some(at(2024, 2, 1));

    assert_eq!(resolve_signing(&untimed, &timed), Some(true));
    assert_eq!(resolve_signing(&timed, &untimed), Some(true));
}

#[test]
fn untimed_disagreement_is_conservative() {
    let mut a = image("ipsw.me");
    a.is_signed = Some(true);
    let mut b = image("theapplewiki.com");
    b.is_signed = Some(false);

    assert_eq!(merge_restore_images(&a, &b).is_signed, Some(false));
    assert_eq!(merge_restore_images(&b, &a).is_signed, Some(false));
}

#[test]
fn untimed_partial_knowledge() {
    let mut known = image("ipsw.me");
    known.is_signed = Some(true);
    let unknown = image("mrmacintosh.com");

    assert_eq!(resolve_signing(&known, &unknown), Some(true));
    assert_eq!(resolve_signing(&unknown, &known), Some(true));
    assert_eq!(resolve_signing(&unknown, &unknown), None);
}

#[test]
fn equal_timestamps_fall_through_to_untimed_rule() {
    let stamp = Some(at(2024, 2, 1));
    let mut signed = image("ipsw.me");
    signed.is_signed = Some(true);
    signed.source_updated_at = stamp;
    let mut unsigned = image("appledb.dev");
    unsigned.is_signed = Some(false);
    unsigned.source_updated_at = stamp;

    assert_eq!(resolve_signing(&signed, &unsigned), Some(false));
    assert_eq!(resolve_signing(&unsigned, &signed), Some(false));

    let mut unknown = image("theapplewiki.com");
    unknown.source_updated_at = stamp;

    assert_eq!(resolve_signing(&signed, &unknown), Some(true));
    assert_eq!(resolve_signing(&unknown, &signed), Some(true));
}
