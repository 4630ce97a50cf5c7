use bushel_core::notes_format::EncodedNotes;
use bushel_core::sources::virtualbuddy::StatusResponse;
use bushel_core::sources::{
    appledb, ipsw, mesu, mrmacintosh, parse_restore_file_name, restore_image_links, swiftversion,
    theapplewiki, xcodereleases,
};
use chrono::{DateTime, TimeZone, Utc};

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

const RELEASE_URL: &str = "https://updates.cdn-apple.com/2023FallFCS/fullrestores/052-22662/UniversalMac_14.2.1_23C71_Restore.ipsw";
const BETA_URL: &str = "https://updates.cdn-apple.com/2024SummerSeed/fullrestores/062-16632/UniversalMac_15.0_24A5264n_Restore.ipsw";

#[test]
fn restore_file_names_yield_version_and_build() {
    let parsed = parse_restore_file_name(RELEASE_URL).unwrap();
    assert_eq!(parsed.version, "14.2.1");
    assert_eq!(parsed.build_number, "23C71");

    let beta = parse_restore_file_name(BETA_URL).unwrap();
    assert_eq!(beta.version, "15.0");
    assert_eq!(beta.build_number, "24A5264n");

    assert!(parse_restore_file_name("https://example.com/iPhone15,2_17.2_21C62_Restore.ipsw").is_none());
}

#[test]
fn restore_links_are_found_in_document_order() {
    let text = format!(
        r#"<a href="{BETA_URL}">beta</a> plain text [{RELEASE_URL} label] https://example.com/other.ipsw"#
    );
    assert_eq!(restore_image_links(&text), vec![BETA_URL.to_string(), RELEASE_URL.to_string()]);
    assert!(restore_image_links("nothing to see").is_empty());
}

#[test]
fn ipsw_device_firmwares_become_records() {
    let body = format!(
        r#"{{
            "name": "Apple Virtual Machine 1",
            "identifier": "VirtualMac2,1",
            "firmwares": [
                {{
                    "identifier": "VirtualMac2,1",
                    "version": "14.2.1",
                    "buildid": "23C71",
                    "url": "{RELEASE_URL}",
                    "filesize": 13921471423,
                    "sha1sum": "ABCDEF0123",
                    "sha256sum": "FEDCBA9876",
                    "releasedate": "2023-12-19T18:04:08Z",
                    "uploaddate": "2023-12-19T17:41:45Z",
                    "signed": true
                }},
                {{
                    "version": "14.2",
                    "buildid": "23C64",
                    "url": "https://example.com/UniversalMac_14.2_23C64_Restore.ipsw",
                    "uploaddate": "2023-12-11T18:00:00Z",
                    "signed": false
                }},
                {{
                    "version": "14.1",
                    "buildid": "23B74",
                    "url": "https://example.com/UniversalMac_14.1_23B74_Restore.ipsw"
                }}
            ]
        }}"#
    );

    let records = ipsw::parse_device(&body).unwrap();

    assert_eq!(records.len(), 2, "firmware without any date is skipped");
    let first = &records[0];
    assert_eq!(first.build_number, "23C71");
    assert_eq!(first.file_size, 13_921_471_423);
    assert_eq!(first.sha1_hash, "abcdef0123");
    assert_eq!(first.sha256_hash, "fedcba9876");
    assert_eq!(first.is_signed, Some(true));
    assert_eq!(first.source, ipsw::SOURCE_ID);
    assert_eq!(first.release_date, Utc.with_ymd_and_hms(2023, 12, 19, 18, 4, 8).unwrap());

    let second = &records[1];
    assert_eq!(second.release_date, Utc.with_ymd_and_hms(2023, 12, 11, 18, 0, 0).unwrap());
    assert_eq!(second.is_signed, Some(false));
    assert_eq!(second.file_size, 0);
    assert!(second.sha256_hash.is_empty());

    assert!(ipsw::parse_device("<html>").is_err());
}

#[test]
fn appledb_keeps_virtual_mac_restore_images() {
    let body = format!(
        r#"[
            {{
                "osStr": "macOS",
                "version": "14.2.1",
                "build": "23C71",
                "released": "2023-12-19",
                "signed": ["VirtualMac2,1", "Mac14,2"],
                "sources": [
                    {{
                        "type": "ipsw",
                        "deviceMap": ["VirtualMac2,1", "Mac14,2"],
                        "links": [{{"url": "{RELEASE_URL}", "active": true}}],
                        "hashes": {{"sha2-256": "4A1B", "sha1": "C0FF"}},
                        "size": 13921471423
                    }}
                ]
            }},
            {{
                "version": "15.0 beta",
                "build": "24A5264n",
                "released": "2024-06-10",
                "beta": true,
                "signed": false,
                "sources": [
                    {{
                        "type": "ipsw",
                        "deviceMap": ["VirtualMac2,1"],
                        "links": [{{"url": "{BETA_URL}"}}]
                    }}
                ]
            }},
            {{
                "version": "14.0",
                "build": "23A344",
                "released": "2023-09",
                "sources": [{{"type": "ipsw", "deviceMap": ["VirtualMac2,1"], "links": [{{"url": "https://x"}}]}}]
            }},
            {{
                "version": "14.1",
                "build": "23B74",
                "released": "2023-10-25",
                "sources": [{{"type": "ota", "deviceMap": ["VirtualMac2,1"], "links": [{{"url": "https://x"}}]}}]
            }},
            {{
                "version": "13.6",
                "build": "22G120",
                "released": "2023-09-21",
                "sources": [{{"type": "ipsw", "deviceMap": ["Mac14,2"], "links": [{{"url": "https://x"}}]}}]
            }}
        ]"#
    );
    let updated = at(2024, 3, 2);

    let records = appledb::parse_main(&body, Some(updated)).unwrap();

    assert_eq!(records.len(), 2);
    let release = &records[0];
    assert_eq!(release.build_number, "23C71");
    assert_eq!(release.release_date, at(2023, 12, 19));
    assert_eq!(release.download_url, RELEASE_URL);
    assert_eq!(release.sha256_hash, "4a1b");
    assert_eq!(release.sha1_hash, "c0ff");
    assert_eq!(release.file_size, 13_921_471_423);
    assert_eq!(release.is_signed, Some(true));
    assert!(!release.is_prerelease);
    assert_eq!(release.source_updated_at, Some(updated));

    let beta = &records[1];
    assert_eq!(beta.is_signed, Some(false));
    assert!(beta.is_prerelease);

    assert!(appledb::parse_main("{}", None).is_err());
}

#[test]
fn appledb_signing_list_without_virtual_mac_means_unsigned() {
    let body = format!(
        r#"[{{
            "version": "14.2.1",
            "build": "23C71",
            "released": "2023-12-19",
            "signed": ["Mac14,2"],
            "sources": [{{"type": "ipsw", "deviceMap": ["VirtualMac2,1"], "links": [{{"url": "{RELEASE_URL}"}}]}}]
        }},
        {{
            "version": "14.2",
            "build": "23C64",
            "released": "2023-12-11",
            "sources": [{{"type": "ipsw", "deviceMap": ["VirtualMac2,1"], "links": [{{"url": "{RELEASE_URL}"}}]}}]
        }}]"#
    );

    let records = appledb::parse_main(&body, None).unwrap();

    assert_eq!(records[0].is_signed, Some(false));
    assert_eq!(records[1].is_signed, None);
    assert_eq!(records[1].source_updated_at, None);
}

#[test]
fn mesu_feed_yields_the_currently_signed_image() {
    let plist = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>MobileDeviceSoftwareVersionsByVersion</key>
    <dict>
        <key>1</key>
        <dict>
            <key>BuildVersion</key>
            <string>23C71</string>
            <key>FirmwareSHA1</key>
            <string>ABCDEF</string>
            <key>FirmwareURL</key>
            <string>{RELEASE_URL}</string>
            <key>ProductVersion</key>
            <string>14.2.1</string>
        </dict>
    </dict>
</dict>
</plist>"#
    );
    let fetched_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();

    let record = mesu::parse_feed(&plist, fetched_at).unwrap().unwrap();

    assert_eq!(record.build_number, "23C71");
    assert_eq!(record.version, "14.2.1");
    assert_eq!(record.download_url, RELEASE_URL);
    assert_eq!(record.sha1_hash, "abcdef");
    assert_eq!(record.is_signed, Some(true));
    assert_eq!(record.release_date, fetched_at);
    assert_eq!(record.source_updated_at, Some(fetched_at));
    assert_eq!(record.source, mesu::SOURCE_ID);
}

#[test]
fn mesu_feed_without_entry_or_plist() {
    let fetched_at = at(2024, 3, 1);
    let incomplete = "<plist><dict><key>BuildVersion</key><string>23C71</string></dict></plist>";

    assert_eq!(mesu::parse_feed(incomplete, fetched_at).unwrap(), None);
    assert!(mesu::parse_feed("<html>Service Unavailable</html>", fetched_at).is_err());
}

#[test]
fn mrmacintosh_rows_with_links_and_dates_become_records() {
    let html = format!(
        r#"<html><body><table>
<tr><th>Version</th><th>Date</th><th>Link</th></tr>
<tr><td>macOS 15.0 Beta 1</td><td>6/10/24</td><td><a href="{BETA_URL}">Download</a></td></tr>
<tr><td>macOS 14.2.1</td><td>12/19/2023</td><td><a href="{RELEASE_URL}">Download</a></td></tr>
<tr><td>macOS 14.2</td><td>TBA</td><td><a href="https://example.com/UniversalMac_14.2_23C64_Restore.ipsw">Download</a></td></tr>
</table></body></html>"#
    );

    let records = mrmacintosh::parse_database(&html);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].build_number, "24A5264n");
    assert_eq!(records[0].release_date, at(2024, 6, 10));
    assert!(records[0].is_prerelease);
    assert_eq!(records[0].is_signed, None);

    assert_eq!(records[1].build_number, "23C71");
    assert_eq!(records[1].version, "14.2.1");
    assert_eq!(records[1].release_date, at(2023, 12, 19));
    assert!(!records[1].is_prerelease);
    assert_eq!(records[1].source, mrmacintosh::SOURCE_ID);

    assert!(mrmacintosh::parse_database("<html></html>").is_empty());
}

#[test]
fn wiki_rows_carry_hashes_and_sizes() {
    let wikitext = format!(
        "{{| class=\"wikitable\"\n\
         |-\n\
         ! Version\n\
         ! Build\n\
         |-\n\
         | 14.2.1\n\
         | [{RELEASE_URL} UniversalMac_14.2.1_23C71_Restore.ipsw]\n\
         | {{{{date|2023|12|19}}}}\n\
         | A1B2C3D4E5F6A7B8C9D0A1B2C3D4E5F6A7B8C9D0\n\
         | 13921471423\n\
         |-\n\
         | 15.0 beta\n\
         | [{BETA_URL} UniversalMac_15.0_24A5264n_Restore.ipsw]\n\
         | 2024-06-10\n\
         |-\n\
         | 14.2\n\
         | no link here\n\
         | 2023-12-11\n\
         |}}"
    );

    let records = theapplewiki::parse_wikitext(&wikitext);

    assert_eq!(records.len(), 2);
    let release = &records[0];
    assert_eq!(release.build_number, "23C71");
    assert_eq!(release.release_date, at(2023, 12, 19));
    assert_eq!(release.sha1_hash, "a1b2c3d4e5f6a7b8c9d0a1b2c3d4e5f6a7b8c9d0");
    assert_eq!(release.file_size, 13_921_471_423);
    assert!(!release.is_prerelease);

    let beta = &records[1];
    assert_eq!(beta.build_number, "24A5264n");
    assert_eq!(beta.release_date, at(2024, 6, 10));
    assert!(beta.sha1_hash.is_empty());
    assert_eq!(beta.file_size, 0);
    assert!(beta.is_prerelease);
    assert_eq!(beta.source, theapplewiki::SOURCE_ID);
}

#[test]
fn xcode_releases_encode_requirements_in_notes() {
    let body = r#"[
        {
            "name": "Xcode",
            "version": {"number": "15.1", "build": "15C65", "release": {"release": true}},
            "date": {"year": 2023, "month": 12, "day": 11},
            "requires": "13.5",
            "sdks": {"macOS": [{"number": "14.2", "build": "23C53"}]},
            "compilers": {"swift": [{"number": "5.9.2", "build": "5.9.2.2.56"}]},
            "links": {
                "download": {"url": "https://download.developer.apple.com/Xcode_15.1.xip"},
                "notes": {"url": "https://developer.apple.com/documentation/xcode-release-notes/xcode-15_1-release-notes"}
            }
        },
        {
            "name": "Xcode",
            "version": {"number": "15.2", "build": "15C5500c", "release": {"beta": 2}},
            "date": {"year": 2023, "month": 11, "day": 28}
        },
        {
            "name": "Xcode",
            "version": {"number": "15.0", "build": "15A240d", "release": {"gm": true}},
            "date": {"year": 2023, "month": 9, "day": 12}
        },
        {
            "name": "Xcode Tools",
            "version": {"number": "1.0", "build": "7B85", "release": {"release": true}},
            "date": {"year": 2003, "month": 10, "day": 24}
        },
        {
            "name": "Xcode",
            "version": {"number": "2.0", "release": {"release": true}},
            "date": {"year": 2005, "month": 4, "day": 29}
        }
    ]"#;

    let records = xcodereleases::parse_releases(body).unwrap();

    assert_eq!(records.len(), 3);

    let release = &records[0];
    assert_eq!(release.version, "15.1");
    assert_eq!(release.build_number, "15C65");
    assert_eq!(release.release_date, at(2023, 12, 11));
    assert!(!release.is_prerelease);
    assert_eq!(release.included_swift_version.as_deref(), Some("5.9.2"));
    assert_eq!(
        release.download_url.as_deref(),
        Some("https://download.developer.apple.com/Xcode_15.1.xip")
    );
    assert_eq!(release.minimum_macos, None);
    let notes = EncodedNotes::parse(release.notes.as_deref().unwrap());
    assert_eq!(notes.requires.as_deref(), Some("macOS 13.5"));
    assert_eq!(
        notes.notes_url.as_deref(),
        Some("https://developer.apple.com/documentation/xcode-release-notes/xcode-15_1-release-notes")
    );

    let beta = &records[1];
    assert_eq!(beta.version, "15.2 Beta 2");
    assert!(beta.is_prerelease);
    assert_eq!(beta.notes, None);
    assert_eq!(beta.included_swift_version, None);

    assert!(!records[2].is_prerelease, "GM counts as a final release");
}

#[test]
fn swift_versions_are_read_from_the_release_table() {
    let html = r#"<table>
<tr><th>Date</th><th>Swift</th><th>Xcode</th></tr>
<tr><td>Dec 11, 2023</td><td>5.9.2</td><td>15.1</td></tr>
<tr>
  <td><span class="date">Sep 18, 2023</span></td>
  <td><a href="https://swift.org">5.9</a></td>
  <td>15.0</td>
</tr>
<tr><td>TBD</td><td>6.0</td><td>16.0</td></tr>
</table>"#;

    let records = swiftversion::parse_page(html);
    let summary: Vec<(&str, DateTime<Utc>)> = records
        .iter()
        .map(|r| (r.version.as_str(), r.release_date))
        .collect();

    assert_eq!(
        summary,
        vec![("5.9.2", at(2023, 12, 11)), ("5.9", at(2023, 9, 18))]
    );
    assert!(swiftversion::parse_page("<p>maintenance</p>").is_empty());
}

#[test]
fn virtualbuddy_answers_only_for_the_requested_build() {
    let response: StatusResponse =
        serde_json::from_str(r#"{"build": "23C71", "isSigned": false, "version": "14.2.1"}"#).unwrap();
    assert_eq!(response.signing_for("23C71"), Some(false));
    assert_eq!(response.signing_for("23C64"), None);

    let unnamed: StatusResponse = serde_json::from_str(r#"{"isSigned": true}"#).unwrap();
    assert_eq!(unnamed.signing_for("23C71"), Some(true));

    let empty: StatusResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(empty.signing_for("23C71"), None);
}
