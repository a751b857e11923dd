// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::image::{ImageRef, LinkRef};
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Image and link references found on one page, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtract {
    pub images: Vec<ImageRef>,
    pub links: Vec<LinkRef>,
}

/// Extract `<img>` and `<a href>` references from a page body.
/// Uses the `scraper` crate, which recovers from malformed markup the way browsers do,
/// so a broken page yields whatever references survive rather than an error.
pub fn extract(page_url: &str, html: &[u8]) -> PageExtract {
    let text = String::from_utf8_lossy(html);
    let document = Html::parse_document(&text);

    let extract = PageExtract {
        images: extract_images(&document),
        links: extract_links(&document),
    };

    tracing::debug!(
        page_url,
        images = extract.images.len(),
        links = extract.links.len(),
        "Extracted page references"
    );
    extract
}

/// Every `<img>` with a usable source, duplicates included.
/// Falls back to `data-src` for lazy-loaded images.
fn extract_images(document: &Html) -> Vec<ImageRef> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let attrs = element.value();
            let src = [attrs.attr("src"), attrs.attr("data-src")]
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|s| !s.is_empty())?;

            Some(ImageRef {
                src: src.to_string(),
                alt: attrs.attr("alt").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Distinct non-empty `href` values, first occurrence first
fn extract_links(document: &Html) -> Vec<LinkRef> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            let href = href.trim();
            if !href.is_empty() && seen.insert(href.to_string()) {
                links.push(LinkRef {
                    href: href.to_string(),
                });
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.com/";

    #[test]
    fn test_extract_images_in_document_order() {
        let html = r#"
            <html><body>
                <img src="/first.png" alt="First">
                <p><img src="second.jpg"></p>
                <img src="https://cdn.example.com/third.gif" alt="">
            </body></html>
        "#;
        let extract = extract(PAGE, html.as_bytes());

        assert_eq!(
            extract.images,
            vec![
                ImageRef {
                    src: "/first.png".to_string(),
                    alt: "First".to_string()
                },
                ImageRef {
                    src: "second.jpg".to_string(),
                    alt: String::new()
                },
                ImageRef {
                    src: "https://cdn.example.com/third.gif".to_string(),
                    alt: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_img_without_source_is_absent() {
        let html = r#"<img alt="no source"><img src=""><img src="  "><img src="/ok.png">"#;
        let extract = extract(PAGE, html.as_bytes());

        assert_eq!(extract.images.len(), 1);
        assert_eq!(extract.images[0].src, "/ok.png");
    }

    #[test]
    fn test_lazy_loaded_image_uses_data_src() {
        let html = r#"<img data-src="/lazy.webp" alt="Lazy"><img src="" data-src="/also-lazy.png">"#;
        let extract = extract(PAGE, html.as_bytes());

        assert_eq!(extract.images.len(), 2);
        assert_eq!(extract.images[0].src, "/lazy.webp");
        assert_eq!(extract.images[1].src, "/also-lazy.png");
    }

    #[test]
    fn test_duplicate_images_are_kept() {
        let html = r#"<img src="/a.png"><img src="/a.png">"#;
        let extract = extract(PAGE, html.as_bytes());
        assert_eq!(extract.images.len(), 2);
    }

    #[test]
    fn test_extract_links_first_occurrence_order() {
        let html = r#"
            <a href="/b">B</a>
            <a href="/a">A</a>
            <a href="/b">B again</a>
            <a href="">Empty</a>
            <a>No href</a>
        "#;
        let extract = extract(PAGE, html.as_bytes());

        let hrefs: Vec<&str> = extract.links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/b", "/a"]);
    }

    #[test]
    fn test_malformed_markup_is_tolerated() {
        let html = r#"<html><body><div><img src="/a.png" alt="A"<p><a href="/next">next
            <img src="/b.png"></table></span>"#;
        let extract = extract(PAGE, html.as_bytes());

        assert!(extract.images.iter().any(|i| i.src == "/b.png"));
        assert!(extract.links.iter().any(|l| l.href == "/next"));
    }

    #[test]
    fn test_non_utf8_body_is_tolerated() {
        let mut body = b"<p>caf\xe9</p><img src=\"/menu.png\">".to_vec();
        body.extend_from_slice(b"<a href=\"/about\">about</a>");
        let extract = extract(PAGE, &body);

        assert_eq!(extract.images.len(), 1);
        assert_eq!(extract.links.len(), 1);
    }

    #[test]
    fn test_non_ascii_content() {
        let html = r#"
            <p>Привет мир</p>
            <img src="/фото.jpg" alt="Фото">
            <a href="/page1">Link 1</a>
        "#;
        let extract = extract(PAGE, html.as_bytes());

        assert_eq!(extract.images[0].alt, "Фото");
        assert_eq!(extract.links[0].href, "/page1");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract(PAGE, b""), PageExtract::default());
    }
}
