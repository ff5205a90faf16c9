use storefront_api::media::image_data;
use storefront_api::media::resolver::{
    MediaKind, MediaSlots, MediaSource, classify_url, resolve,
};

fn slots<'a>() -> MediaSlots<'a> {
    MediaSlots::default()
}

#[test]
fn empty_slots_resolve_to_placeholder() {
    assert_eq!(resolve(1, &slots()), None);
}

#[test]
fn single_populated_slot_is_selected() {
    let s = MediaSlots {
        image_file: Some("images/image_1_cover.png"),
        ..slots()
    };
    let resolved = resolve(7, &s).unwrap();
    assert_eq!(resolved.kind, MediaKind::Image);
    assert_eq!(
        resolved.source,
        MediaSource::LocalPath("/uploads/images/image_1_cover.png".into())
    );

    let s = MediaSlots {
        image_data: Some("{\"contentType\":\"image/png\",\"data\":\"aGk=\"}"),
        ..slots()
    };
    let resolved = resolve(7, &s).unwrap();
    assert_eq!(resolved.kind, MediaKind::Image);
    assert_eq!(
        resolved.source,
        MediaSource::ApiEndpoint("/api/products/7/img".into())
    );

    let s = MediaSlots {
        pdf_file: Some("pdfs/pdf_1_guide.pdf"),
        ..slots()
    };
    let resolved = resolve(7, &s).unwrap();
    assert_eq!(resolved.kind, MediaKind::Pdf);

    let s = MediaSlots {
        pdf_data: Some("aGk="),
        ..slots()
    };
    let resolved = resolve(7, &s).unwrap();
    assert_eq!(resolved.kind, MediaKind::Pdf);
    assert_eq!(
        resolved.source,
        MediaSource::ApiEndpoint("/api/products/7/pdf".into())
    );

    let s = MediaSlots {
        storage_url: Some("https://example.com/a.pdf"),
        ..slots()
    };
    let resolved = resolve(7, &s).unwrap();
    assert_eq!(resolved.kind, MediaKind::Pdf);
    assert!(matches!(resolved.source, MediaSource::ProxiedUrl(_)));
}

#[test]
fn priority_order_wins_regardless_of_other_slots() {
    // All five populated: the image file wins.
    let all = MediaSlots {
        image_file: Some("images/a.png"),
        image_data: Some("aGk="),
        pdf_file: Some("pdfs/a.pdf"),
        pdf_data: Some("aGk="),
        storage_url: Some("https://example.com/x.jpg"),
    };
    let resolved = resolve(1, &all).unwrap();
    assert_eq!(
        resolved.source,
        MediaSource::LocalPath("/uploads/images/a.png".into())
    );

    // Drop slots one by one; the next priority takes over each time.
    let s = MediaSlots {
        image_file: None,
        ..all
    };
    assert_eq!(
        resolve(1, &s).unwrap().source,
        MediaSource::ApiEndpoint("/api/products/1/img".into())
    );

    let s = MediaSlots {
        image_file: None,
        image_data: None,
        ..all
    };
    assert_eq!(
        resolve(1, &s).unwrap().source,
        MediaSource::LocalPath("/uploads/pdfs/a.pdf".into())
    );

    let s = MediaSlots {
        image_file: None,
        image_data: None,
        pdf_file: None,
        ..all
    };
    assert_eq!(
        resolve(1, &s).unwrap().source,
        MediaSource::ApiEndpoint("/api/products/1/pdf".into())
    );

    let s = MediaSlots {
        image_file: None,
        image_data: None,
        pdf_file: None,
        pdf_data: None,
        ..all
    };
    assert!(matches!(
        resolve(1, &s).unwrap().source,
        MediaSource::ProxiedUrl(_)
    ));
}

#[test]
fn blank_slots_count_as_empty() {
    let s = MediaSlots {
        image_file: Some("   "),
        image_data: Some(""),
        pdf_file: None,
        pdf_data: None,
        storage_url: Some("https://example.com/pic.png"),
    };
    let resolved = resolve(1, &s).unwrap();
    assert!(matches!(resolved.source, MediaSource::ProxiedUrl(_)));
}

#[test]
fn proxied_url_is_percent_encoded() {
    let s = MediaSlots {
        storage_url: Some("https://example.com/a photo.png?x=1&y=2"),
        ..slots()
    };
    let resolved = resolve(1, &s).unwrap();
    let MediaSource::ProxiedUrl(url) = resolved.source else {
        panic!("expected proxied url");
    };
    assert!(url.starts_with("/api/proxy/image?url="));
    assert!(!url.contains(' '));
    assert!(!url[url.find('=').unwrap()..].contains('&'));
}

#[test]
fn url_classification_heuristic() {
    assert_eq!(classify_url("https://x.com/a.pdf"), MediaKind::Pdf);
    // Query string after the extension is tolerated.
    assert_eq!(classify_url("https://x.com/a.pdf?x=1"), MediaKind::Pdf);
    // Substring match.
    assert_eq!(classify_url("https://x.com/photo123"), MediaKind::Image);
    assert_eq!(classify_url("https://x.com/IMG_2031"), MediaKind::Image);
    // Known image extension.
    assert_eq!(classify_url("https://x.com/banner.webp"), MediaKind::Image);
    // Unknown URLs default to image.
    assert_eq!(classify_url("https://x.com/file"), MediaKind::Image);
    // ".pdf" in the middle of the path is not an extension match.
    assert_eq!(classify_url("https://x.com/a.pdf.png"), MediaKind::Image);
}

#[test]
fn image_data_envelope_round_trips() {
    let payload = b"\x89PNG\r\n\x1a\nfakepixels";
    let stored = image_data::encode("image/png", payload);
    let decoded = image_data::decode(&stored).unwrap();
    assert_eq!(decoded.content_type, "image/png");
    assert_eq!(decoded.bytes, payload);
}

#[test]
fn legacy_raw_base64_image_data_is_still_readable() {
    // Legacy rows hold bare base64 with no envelope; the reader assumes JPEG.
    let stored = "aGVsbG8gd29ybGQ=";
    let decoded = image_data::decode(stored).unwrap();
    assert_eq!(decoded.content_type, "image/jpeg");
    assert_eq!(decoded.bytes, b"hello world");
}

#[test]
fn unreadable_image_data_yields_none() {
    assert!(image_data::decode("not base64 at all!!!").is_none());
    // Envelope with broken base64 payload.
    assert!(image_data::decode("{\"contentType\":\"image/png\",\"data\":\"%%%\"}").is_none());
}
