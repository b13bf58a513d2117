//! String rewrites applied to the bundle while inlining. Each function takes
//! the current text and returns the rewritten text plus whether anything
//! changed where the caller cares.

use crate::error::{PaperWalletError, Result};
use base64::{engine::general_purpose, Engine as _};
use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};
use std::path::Path;

pub const FONT_FALLBACK: &str = r#"font-family: "Courier New", monospace;"#;

pub const OFFLINE_CSP: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
style-src 'self' 'unsafe-inline'; font-src 'self' data:; img-src 'self' data: blob:;";

const IMAGE_NAME: &str = r"(?:wallet-generator|blank(?:\s|%20)+wallet(?:\s|%20)+image)\.png";

static SOURCE_MAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*//# sourceMappingURL=.*$\n?").expect("valid regex"));

static IMAGE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"import\s+(\w+)\s+from\s+["']([^"']*{})["']"#,
        IMAGE_NAME
    ))
    .expect("valid regex")
});

static IMAGE_DYNAMIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"import\(\s*["']([^"']*{})["']\s*\)"#, IMAGE_NAME)).expect("valid regex")
});

static IMAGE_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"(["'])([^"']*{})(["'])"#, IMAGE_NAME)).expect("valid regex")
});

static SCRIPT_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</(script)").expect("valid regex"));

static STYLE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</(style)").expect("valid regex"));

static SCRIPT_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<script[^>]*>").expect("valid regex"));

static SCRIPT_CLOSE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</script>").expect("valid regex"));

static STYLESHEET_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<link[^>]*rel=["']stylesheet["'][^>]*>\s*"#).expect("valid regex")
});

static PRECONNECT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<link[^>]*rel=["']preconnect["'][^>]*>\s*"#).expect("valid regex")
});

static GOOGLE_FONTS_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<link[^>]*href=["']https://fonts\.googleapis\.com[^"']*["'][^>]*>\s*"#)
        .expect("valid regex")
});

static ASSET_FONT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)font-family:[^;]*Asset[^;]*;").expect("valid regex"));

static CSP_META: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta\s+http-equiv=["']Content-Security-Policy["'][^>]*>\s*"#)
        .expect("valid regex")
});

static VIEWPORT_META: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<meta\s+name=["']viewport["'][^>]*>"#).expect("valid regex"));

static HEAD_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head[^>]*>").expect("valid regex"));

static HEAD_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</head>").expect("valid regex"));

static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*(["']?)([^"')]+)(["']?)\s*\)"#).expect("valid regex")
});

pub fn data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => return None,
    })
}

pub fn strip_source_maps(js: &str) -> String {
    SOURCE_MAP.replace_all(js, "").into_owned()
}

/// Points every reference to the wallet template image at `data_url`.
/// Returns how many references were rewritten.
pub fn embed_image_references(js: &str, data_url: &str) -> (String, usize) {
    let mut count = 0;

    let js = IMAGE_IMPORT.replace_all(js, |caps: &Captures| {
        count += 1;
        format!("const {} = '{}'", &caps[1], data_url)
    });
    let js = IMAGE_DYNAMIC_IMPORT.replace_all(&js, |_: &Captures| {
        count += 1;
        format!("Promise.resolve('{}')", data_url)
    });
    let js = IMAGE_QUOTED.replace_all(&js, |caps: &Captures| {
        count += 1;
        format!("{}{}{}", &caps[1], data_url, &caps[3])
    });

    (js.into_owned(), count)
}

/// Rewrites every `</script` as `<\/script`, keeping the original case.
pub fn escape_script_close(js: &str) -> String {
    SCRIPT_CLOSE
        .replace_all(js, |caps: &Captures| format!("<\\/{}", &caps[1]))
        .into_owned()
}

pub fn has_unescaped_close(js: &str) -> bool {
    SCRIPT_CLOSE.is_match(js)
}

fn external_script_pattern(script: &str) -> Result<Regex> {
    Regex::new(&format!(
        r#"(?i)<script[^>]*src=["'][^"']*{}["'][^>]*></script>"#,
        regex::escape(script)
    ))
    .map_err(|e| PaperWalletError::inline(e.to_string()))
}

/// Whether `html` still loads `script` through an external `<script src>`
/// tag. Mentions of the file name anywhere else do not count.
pub fn references_script(html: &str, script: &str) -> Result<bool> {
    Ok(external_script_pattern(script)?.is_match(html))
}

/// Swaps the external `<script src=".../{script}">` tag for an inline one.
/// The module/crossorigin tag emitted by Vite is tried first.
pub fn replace_script_tag(html: &str, script: &str, js: &str) -> Result<String> {
    let specific = Regex::new(&format!(
        r#"(?i)<script[^>]*type=["']module["'][^>]*crossorigin[^>]*src=["'][^"']*{}["'][^>]*></script>"#,
        regex::escape(script)
    ))
    .map_err(|e| PaperWalletError::inline(e.to_string()))?;
    let general = external_script_pattern(script)?;

    let inline = format!("<script>\n{}\n</script>", js);
    for pattern in [&specific, &general] {
        if pattern.is_match(html) {
            return Ok(pattern.replace_all(html, NoExpand(&inline)).into_owned());
        }
    }
    Err(PaperWalletError::inline(format!(
        "Failed to replace script tag for {}",
        script
    )))
}

pub fn remove_external_links(html: &str) -> String {
    let html = STYLESHEET_LINK.replace_all(html, "");
    let html = PRECONNECT_LINK.replace_all(&html, "");
    GOOGLE_FONTS_LINK.replace_all(&html, "").into_owned()
}

pub fn apply_font_fallback(text: &str) -> String {
    ASSET_FONT.replace_all(text, NoExpand(FONT_FALLBACK)).into_owned()
}

/// Embeds `url(...)` references that resolve to files under `base` as data
/// URIs. Remote, data and unresolvable references are left alone.
pub fn embed_css_urls(css: &str, base: &Path) -> (String, Vec<std::path::PathBuf>) {
    let mut embedded = Vec::new();
    let out = CSS_URL.replace_all(css, |caps: &Captures| {
        let target = caps[2].trim();
        if target.starts_with("data:") || target.contains("://") || target.starts_with("//") {
            return caps[0].to_string();
        }
        let clean = target
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or(target)
            .trim_start_matches('/');
        let path = base.join(clean);
        match (mime_for(&path), std::fs::read(&path)) {
            (Some(mime), Ok(bytes)) => {
                embedded.push(path);
                format!("url(\"{}\")", data_url(&bytes, mime))
            }
            _ => {
                tracing::warn!("Leaving unresolved stylesheet reference {}", target);
                caps[0].to_string()
            }
        }
    });
    (out.into_owned(), embedded)
}

/// Rewrites every `</style` as `<\/style` so the stylesheet cannot close
/// its own block.
pub fn escape_style_close(css: &str) -> String {
    STYLE_CLOSE
        .replace_all(css, |caps: &Captures| format!("<\\/{}", &caps[1]))
        .into_owned()
}

pub fn inline_stylesheet(html: &str, css: &str) -> String {
    let block = format!("<style>\n{}\n</style>\n", escape_style_close(css));
    match HEAD_CLOSE.find(html) {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + block.len());
            out.push_str(&html[..m.start()]);
            out.push_str(&block);
            out.push_str(&html[m.start()..]);
            out
        }
        None => format!("{}{}", block, html),
    }
}

/// Replaces any existing policy with the offline one. The new meta goes after
/// the viewport meta, or first in `<head>` when there is none.
pub fn apply_csp(html: &str) -> String {
    let html = CSP_META.replace_all(html, "").into_owned();
    let meta = format!(
        r#"<meta http-equiv="Content-Security-Policy" content="{}">"#,
        OFFLINE_CSP
    );
    let anchor = VIEWPORT_META.find(&html).or_else(|| HEAD_OPEN.find(&html));
    match anchor {
        Some(m) => format!("{}\n    {}{}", &html[..m.end()], meta, &html[m.end()..]),
        None => {
            tracing::warn!("No <head> found; Content-Security-Policy not applied");
            html
        }
    }
}

/// Checks that every opening script tag has a closing one.
pub fn validate_script_tags(html: &str) -> Result<usize> {
    let open = SCRIPT_OPEN_TAG.find_iter(html).count();
    let close = SCRIPT_CLOSE_TAG.find_iter(html).count();
    if open != close {
        return Err(PaperWalletError::inline(format!(
            "Mismatched script tags: {} opening, {} closing",
            open, close
        )));
    }
    Ok(open)
}
