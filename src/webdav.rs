//! Minimal WebDAV client: folder listing and single-resource content type.
//!
//! Only `PROPFIND` is spoken. Listings use `Depth: 1`, metadata lookups
//! `Depth: 0`; neither sends a body so the server answers with its default
//! property set.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use tracing::{debug, instrument, warn};

use crate::error::DavError;
use crate::image_ref::ImageRef;
use crate::source::{DirectoryLister, ExistenceValidator};

const DAV_NS: &str = "DAV:";
const DEPTH: &str = "Depth";
const JPEG_MEDIA_TYPE: &str = "image/jpeg";
const JPEG_SUFFIXES: [&str; 2] = [".jpg", ".jpeg"];

#[derive(Debug, Clone)]
pub struct DavClient {
    http: Client,
    base: String,
    propfind: Method,
}

impl DavClient {
    /// `base` is the scheme/authority prefix every server href is appended to.
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        let propfind = Method::from_bytes(b"PROPFIND").context("PROPFIND method")?;
        Ok(Self {
            http,
            base: base.into(),
            propfind,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn propfind(&self, url: &str, depth: &'static str) -> Result<String, DavError> {
        let response = self
            .http
            .request(self.propfind.clone(), url)
            .header(ACCEPT, HeaderValue::from_static("application/xml"))
            .header(DEPTH, HeaderValue::from_static(depth))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DavError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }

    /// Declared media type of a single resource.
    #[instrument(skip_all, fields(uri = %image))]
    pub async fn content_type(&self, image: &ImageRef) -> Result<String, DavError> {
        let body = self.propfind(image.as_str(), "0").await?;
        parse_content_type(&body)
    }

    /// Full resource body, used by the display side to decode a photo.
    pub async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, DavError> {
        let response = self.http.get(image.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DavError::Status {
                url: image.to_string(),
                status,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl DirectoryLister for DavClient {
    #[instrument(skip(self))]
    async fn list(&self, folder: &str) -> Result<Vec<ImageRef>, DavError> {
        let url = format!("{}{}", self.base, folder);
        let body = self.propfind(&url, "1").await?;
        let hrefs = parse_hrefs(&body)?;
        let total = hrefs.len();
        let images: Vec<ImageRef> = hrefs
            .into_iter()
            .filter(|href| is_jpeg_link(href))
            .map(|href| absolute_uri(&self.base, &href))
            .collect();
        debug!(total, images = images.len(), "folder listed");
        Ok(images)
    }
}

#[async_trait]
impl ExistenceValidator for DavClient {
    async fn validate(&self, image: &ImageRef) -> bool {
        match self.content_type(image).await {
            Ok(content_type) => {
                let ok = is_jpeg_media_type(&content_type);
                if !ok {
                    debug!(uri = %image, content_type = %content_type, "not a jpeg");
                }
                ok
            }
            Err(DavError::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                debug!(uri = %image, "image no longer exists");
                false
            }
            Err(err) => {
                warn!(uri = %image, parse = err.is_parse(), "metadata lookup failed: {err}");
                false
            }
        }
    }
}

/// Every `DAV:href` in a multistatus document, trimmed, in document order.
pub fn parse_hrefs(xml: &str) -> Result<Vec<String>, DavError> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(doc
        .descendants()
        .filter(|node| node.has_tag_name((DAV_NS, "href")))
        .filter_map(|node| node.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect())
}

/// Text of the first `DAV:getcontenttype` in a multistatus document.
pub fn parse_content_type(xml: &str) -> Result<String, DavError> {
    let doc = roxmltree::Document::parse(xml)?;
    doc.descendants()
        .find(|node| node.has_tag_name((DAV_NS, "getcontenttype")))
        .and_then(|node| node.text())
        .map(|text| text.trim().to_string())
        .ok_or(DavError::MissingProperty("getcontenttype"))
}

#[inline]
pub fn is_jpeg_link(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    JPEG_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Compares the media-type essence, ignoring parameters and case.
pub fn is_jpeg_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|essence| essence.eq_ignore_ascii_case(JPEG_MEDIA_TYPE))
}

fn absolute_uri(base: &str, href: &str) -> ImageRef {
    if Url::parse(href).is_ok() {
        ImageRef::new(href)
    } else {
        ImageRef::new(format!("{base}{href}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/photos/</D:href>
    <D:propstat><D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop></D:propstat>
  </D:response>
  <D:response>
    <D:href>/photos/a.jpg</D:href>
    <D:propstat><D:prop><D:getcontenttype>image/jpeg</D:getcontenttype></D:prop></D:propstat>
  </D:response>
  <D:response>
    <D:href>/photos/notes.txt</D:href>
  </D:response>
  <D:response>
    <D:href>
      /photos/B.JPG
    </D:href>
  </D:response>
</D:multistatus>"#;

    #[test]
    fn hrefs_come_back_in_document_order() {
        let hrefs = parse_hrefs(LISTING).unwrap();
        assert_eq!(
            hrefs,
            vec![
                "/photos/",
                "/photos/a.jpg",
                "/photos/notes.txt",
                "/photos/B.JPG"
            ]
        );
    }

    #[test]
    fn hrefs_resolve_by_namespace_not_prefix() {
        let xml = r#"<multistatus xmlns="DAV:" xmlns:x="urn:other">
            <response><href>/p/one.jpeg</href><x:href>/p/decoy.jpg</x:href></response>
        </multistatus>"#;
        assert_eq!(parse_hrefs(xml).unwrap(), vec!["/p/one.jpeg"]);
    }

    #[test]
    fn malformed_listing_is_a_parse_error() {
        let err = parse_hrefs("<D:multistatus xmlns:D=\"DAV:\">").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn content_type_is_first_match() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/p/a.jpg</d:href>
            <d:propstat><d:prop><d:getcontenttype> image/jpeg </d:getcontenttype></d:prop></d:propstat>
            </d:response></d:multistatus>"#;
        assert_eq!(parse_content_type(xml).unwrap(), "image/jpeg");
    }

    #[test]
    fn missing_content_type_is_reported() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/p/a.jpg</d:href></d:response></d:multistatus>"#;
        let err = parse_content_type(xml).unwrap_err();
        assert!(matches!(err, DavError::MissingProperty("getcontenttype")));
        assert!(err.is_parse());
    }

    #[test]
    fn jpeg_links_match_case_insensitively() {
        assert!(is_jpeg_link("/p/a.jpg"));
        assert!(is_jpeg_link("/p/B.JPG"));
        assert!(is_jpeg_link("/p/c.JpEg"));
        assert!(!is_jpeg_link("/p/notes.txt"));
        assert!(!is_jpeg_link("/p/"));
        assert!(!is_jpeg_link("/p/a.jpg.png"));
    }

    #[test]
    fn jpeg_media_type_ignores_parameters() {
        assert!(is_jpeg_media_type("image/jpeg"));
        assert!(is_jpeg_media_type("Image/JPEG; charset=binary"));
        assert!(!is_jpeg_media_type("image/png"));
        assert!(!is_jpeg_media_type("httpd/unix-directory"));
        assert!(!is_jpeg_media_type(""));
    }

    #[test]
    fn absolute_hrefs_are_kept() {
        let base = "http://frame.local:8080";
        assert_eq!(
            absolute_uri(base, "/p/a.jpg").as_str(),
            "http://frame.local:8080/p/a.jpg"
        );
        assert_eq!(
            absolute_uri(base, "https://cdn.local/p/a.jpg").as_str(),
            "https://cdn.local/p/a.jpg"
        );
    }
}
