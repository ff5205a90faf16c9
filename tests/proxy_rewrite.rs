use storefront_api::media::proxy::{
    Provider, extract_drive_file_id, extract_google_photo_id, infer_image_mime_from_url,
    is_google_short_link, is_heic, looks_like_image, prepare_url,
};

#[test]
fn google_photos_share_link_rewrites_to_googleusercontent() {
    let prepared = prepare_url("https://photos.google.com/share/abc/photo/AAAA-bb_cc123?key=xyz");
    assert_eq!(prepared.provider, Provider::GoogleUserContent);
    assert_eq!(
        prepared.url,
        "https://lh3.googleusercontent.com/d/AAAA-bb_cc123=w1200"
    );
}

#[test]
fn google_photos_token_is_extracted_from_anywhere_in_the_url() {
    let id = extract_google_photo_id("https://photos.google.com/lr/album/AF1QipNx-7_abcDEF123");
    assert_eq!(id.as_deref(), Some("AF1QipNx-7_abcDEF123"));

    // Path segment form.
    let id = extract_google_photo_id("https://photos.google.com/photo/XyZ-123_a?x=1");
    assert_eq!(id.as_deref(), Some("XyZ-123_a"));

    assert_eq!(extract_google_photo_id("https://photos.google.com/"), None);
}

#[test]
fn short_links_are_recognized() {
    assert!(is_google_short_link("https://photos.app.goo.gl/AbCd123"));
    assert!(is_google_short_link("https://goo.gl/photos/xyz"));
    assert!(!is_google_short_link(
        "https://photos.google.com/photo/abc"
    ));
}

#[test]
fn dropbox_links_get_the_download_flag() {
    let prepared = prepare_url("https://www.dropbox.com/s/abc/pic.png");
    assert_eq!(prepared.provider, Provider::Dropbox);
    assert_eq!(prepared.url, "https://www.dropbox.com/s/abc/pic.png?dl=1");

    // Existing query string appends instead.
    let prepared = prepare_url("https://www.dropbox.com/s/abc/pic.png?raw=0");
    assert_eq!(
        prepared.url,
        "https://www.dropbox.com/s/abc/pic.png?raw=0&dl=1"
    );

    // Already flagged: untouched.
    let prepared = prepare_url("https://www.dropbox.com/s/abc/pic.png?dl=1");
    assert_eq!(prepared.url, "https://www.dropbox.com/s/abc/pic.png?dl=1");
}

#[test]
fn onedrive_links_get_the_download_flag() {
    let prepared = prepare_url("https://1drv.ms/i/s!Abc");
    assert_eq!(prepared.provider, Provider::OneDrive);
    assert_eq!(prepared.url, "https://1drv.ms/i/s!Abc?download=1");
}

#[test]
fn drive_file_links_rewrite_to_uc_view() {
    let prepared =
        prepare_url("https://drive.google.com/file/d/1AbC-dEf_G/view?usp=sharing");
    assert_eq!(prepared.provider, Provider::GoogleDrive);
    assert_eq!(
        prepared.url,
        "https://drive.google.com/uc?export=view&id=1AbC-dEf_G"
    );

    assert_eq!(
        extract_drive_file_id("https://drive.google.com/drive/my-drive"),
        None
    );
}

#[test]
fn supabase_signed_urls_pass_through_flagged() {
    let url = "https://abc.supabase.co/storage/v1/object/sign/bucket/pic.png?token=jwt";
    let prepared = prepare_url(url);
    assert_eq!(prepared.provider, Provider::Supabase);
    assert_eq!(prepared.url, url);
}

#[test]
fn unknown_urls_are_untouched() {
    let prepared = prepare_url("https://example.com/images/pic.png");
    assert_eq!(prepared.provider, Provider::Other);
    assert_eq!(prepared.url, "https://example.com/images/pic.png");
}

#[test]
fn image_content_type_matching_is_broad() {
    assert!(looks_like_image("image/png"));
    assert!(looks_like_image("IMAGE/JPEG; charset=binary"));
    assert!(looks_like_image("application/octet-stream"));
    assert!(looks_like_image("binary/octet-stream"));
    assert!(!looks_like_image("text/html"));
    assert!(!looks_like_image("application/pdf"));
}

#[test]
fn mime_inference_from_url_extension() {
    assert_eq!(
        infer_image_mime_from_url("https://x.com/a.JPG?x=1"),
        Some("image/jpeg")
    );
    assert_eq!(
        infer_image_mime_from_url("https://x.com/a.webp"),
        Some("image/webp")
    );
    assert_eq!(infer_image_mime_from_url("https://x.com/a"), None);
}

#[test]
fn heic_signature_is_detected_at_the_bmff_offset() {
    // size(4) + "ftyp" + major brand.
    let mut heic = vec![0, 0, 0, 24];
    heic.extend_from_slice(b"ftypheic");
    heic.extend_from_slice(&[0; 8]);
    assert!(is_heic(&heic));

    let mut heif = vec![0, 0, 0, 24];
    heif.extend_from_slice(b"ftypheix");
    heif.extend_from_slice(&[0; 8]);
    assert!(is_heic(&heif));

    // JPEG magic is not HEIC.
    assert!(!is_heic(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0]));
    // An mp4 ftyp brand is not HEIC either.
    let mut mp4 = vec![0, 0, 0, 24];
    mp4.extend_from_slice(b"ftypisom");
    mp4.extend_from_slice(&[0; 8]);
    assert!(!is_heic(&mp4));
    // Too short to carry the box.
    assert!(!is_heic(b"ftyp"));
}
