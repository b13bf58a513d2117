//! Folds a bundler's `dist/` output into a single self-contained
//! `index.html` that works offline from `file://`.

pub mod rewrite;

use crate::error::{PaperWalletError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bundler {
    Vite,
    Webpack,
}

impl FromStr for Bundler {
    type Err = PaperWalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vite" => Ok(Bundler::Vite),
            "webpack" => Ok(Bundler::Webpack),
            other => Err(PaperWalletError::config(format!("Unknown bundler: {}", other))),
        }
    }
}

/// Where an asset candidate lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRoot {
    /// Inside the output directory. Removed once embedded.
    Dist,
    /// Relative to the project root (the output directory's parent). Never removed.
    Project,
}

/// Files one bundler leaves in its output directory.
#[derive(Debug, Clone)]
pub struct BundleLayout {
    pub html: &'static str,
    pub script: &'static str,
    pub stylesheet: Option<&'static str>,
    pub images: &'static [(AssetRoot, &'static str)],
    pub strip_source_maps: bool,
    pub inject_csp: bool,
}

const VITE_IMAGES: &[(AssetRoot, &str)] = &[
    (AssetRoot::Dist, "wallet-generator.png"),
    (AssetRoot::Dist, "blank wallet image.png"),
    (AssetRoot::Project, "src/images/blank wallet image.png"),
];

impl Bundler {
    pub fn layout(&self) -> BundleLayout {
        match self {
            Bundler::Vite => BundleLayout {
                html: "index.html",
                script: "wallet-generator.js",
                stylesheet: Some("wallet-generator.css"),
                images: VITE_IMAGES,
                strip_source_maps: false,
                inject_csp: true,
            },
            Bundler::Webpack => BundleLayout {
                html: "index.html",
                script: "bundle.js",
                stylesheet: Some("main.css"),
                images: &[],
                strip_source_maps: true,
                inject_csp: false,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineFlags {
    pub script: bool,
    pub stylesheet: bool,
    pub image: Option<PathBuf>,
    pub image_references: usize,
    pub stylesheet_assets: usize,
    pub csp: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineReport {
    pub output: PathBuf,
    pub bytes: usize,
    pub sha256: String,
    pub flags: InlineFlags,
    pub removed: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum InlineOutcome {
    Inlined(InlineReport),
    /// `index.html` no longer references an external script and that script
    /// is gone; the file was left as is.
    AlreadyInlined { output: PathBuf },
}

pub struct Inliner {
    dist: PathBuf,
    layout: BundleLayout,
}

impl Inliner {
    pub fn new(bundler: Bundler, dist: impl Into<PathBuf>) -> Self {
        Self::with_layout(bundler.layout(), dist)
    }

    pub fn with_layout(layout: BundleLayout, dist: impl Into<PathBuf>) -> Self {
        Self {
            dist: dist.into(),
            layout,
        }
    }

    fn project_root(&self) -> PathBuf {
        match self.dist.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn resolve(&self, root: AssetRoot, name: &str) -> PathBuf {
        match root {
            AssetRoot::Dist => self.dist.join(name),
            AssetRoot::Project => self.project_root().join(name),
        }
    }

    pub fn run(&self) -> Result<InlineOutcome> {
        let html_path = self.dist.join(self.layout.html);
        let script_path = self.dist.join(self.layout.script);

        if !html_path.is_file() {
            return Err(PaperWalletError::missing_input(html_path));
        }
        let html = fs::read_to_string(&html_path)?;
        let referenced = rewrite::references_script(&html, self.layout.script)?;

        match (referenced, script_path.is_file()) {
            (true, false) => return Err(PaperWalletError::missing_input(script_path)),
            (false, false) => {
                tracing::info!("{} is already inlined", html_path.display());
                return Ok(InlineOutcome::AlreadyInlined { output: html_path });
            }
            (false, true) => {
                return Err(PaperWalletError::inline(format!(
                    "{} does not reference {}",
                    html_path.display(),
                    self.layout.script
                )))
            }
            (true, true) => {}
        }

        tracing::info!("Creating standalone HTML file in {}", self.dist.display());

        let mut flags = InlineFlags::default();
        let mut js = fs::read_to_string(&script_path)?;
        if self.layout.strip_source_maps {
            js = rewrite::strip_source_maps(&js);
        }

        let image = self.find_image();
        match &image {
            Some(path) => {
                let bytes = fs::read(path)?;
                let mime = rewrite::mime_for(path).unwrap_or("image/png");
                let (embedded, count) =
                    rewrite::embed_image_references(&js, &rewrite::data_url(&bytes, mime));
                js = embedded;
                tracing::info!("Embedded wallet image {} ({} references)", path.display(), count);
                flags.image = Some(path.clone());
                flags.image_references = count;
            }
            None if !self.layout.images.is_empty() => {
                tracing::warn!("Wallet image not found. The page may not render its template.");
            }
            None => {}
        }

        let js = rewrite::escape_script_close(&js);
        if rewrite::has_unescaped_close(&js) {
            return Err(PaperWalletError::inline("Script contains unescaped </script>"));
        }
        let mut html = rewrite::replace_script_tag(&html, self.layout.script, &js)?;
        flags.script = true;

        html = rewrite::remove_external_links(&html);
        html = rewrite::apply_font_fallback(&html);

        let stylesheet_path = self.layout.stylesheet.map(|name| self.dist.join(name));
        let mut stylesheet_assets = Vec::new();
        if let Some(path) = stylesheet_path.as_ref().filter(|p| p.is_file()) {
            let css = rewrite::apply_font_fallback(&fs::read_to_string(path)?);
            let (css, assets) = rewrite::embed_css_urls(&css, &self.dist);
            html = rewrite::inline_stylesheet(&html, &css);
            flags.stylesheet = true;
            flags.stylesheet_assets = assets.len();
            stylesheet_assets = assets;
            tracing::info!("Inlined stylesheet {}", path.display());
        } else if let Some(path) = &stylesheet_path {
            tracing::warn!("Stylesheet {} not found, skipping", path.display());
        }

        if self.layout.inject_csp {
            html = rewrite::apply_csp(&html);
            flags.csp = true;
        }

        let tags = rewrite::validate_script_tags(&html)?;
        write_atomic(&self.dist, &html_path, html.as_bytes())?;
        tracing::info!("Validated HTML structure ({} script tags)", tags);

        let mut redundant = vec![script_path];
        redundant.extend(stylesheet_path.filter(|_| flags.stylesheet));
        if flags.image.is_some() {
            redundant.extend(
                self.layout
                    .images
                    .iter()
                    .filter(|(root, _)| *root == AssetRoot::Dist)
                    .map(|(root, name)| self.resolve(*root, name)),
            );
        }
        redundant.extend(
            stylesheet_assets
                .into_iter()
                .filter(|path| self.is_inside_dist(path)),
        );
        let removed = remove_files(&redundant);

        let report = InlineReport {
            bytes: html.len(),
            sha256: hex::encode(Sha256::digest(html.as_bytes())),
            output: html_path,
            flags,
            removed,
        };
        tracing::info!(
            "Standalone HTML written to {} ({:.2} KB)",
            report.output.display(),
            report.bytes as f64 / 1024.0
        );
        Ok(InlineOutcome::Inlined(report))
    }

    fn is_inside_dist(&self, path: &Path) -> bool {
        path.starts_with(&self.dist)
            && !path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
    }

    fn find_image(&self) -> Option<PathBuf> {
        self.layout
            .images
            .iter()
            .map(|(root, name)| self.resolve(*root, name))
            .find(|path| path.is_file())
    }
}

pub fn inline_bundle(bundler: Bundler, dist: &Path) -> Result<InlineOutcome> {
    Inliner::new(bundler, dist).run()
}

/// Writes through a temp file in `dir` so a failed run never leaves a
/// half-written `target`.
fn write_atomic(dir: &Path, target: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(target).map_err(|e| PaperWalletError::Io(e.error))?;
    Ok(())
}

fn remove_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in paths.iter().filter(|p| p.is_file()) {
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!("Removed {}", path.display());
                removed.push(path.clone());
            }
            Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VITE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Bitcoin Paper Wallet</title>
    <link rel="preconnect" href="https://fonts.googleapis.com">
    <link href="https://fonts.googleapis.com/css2?family=Asset&display=swap" rel="stylesheet">
    <style>.title { font-family: 'Asset', serif; }</style>
    <script type="module" crossorigin src="/wallet-generator.js"></script>
    <link rel="stylesheet" crossorigin href="/wallet-generator.css">
  </head>
  <body><div id="app"></div></body>
</html>
"#;

    const VITE_JS: &str = r#"const t="/wallet-generator.png";const end="</script>";"#;

    fn vite_project() -> (TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let dist = root.path().join("dist");
        fs::create_dir(&dist).unwrap();
        fs::write(dist.join("index.html"), VITE_HTML).unwrap();
        fs::write(dist.join("wallet-generator.js"), VITE_JS).unwrap();
        fs::write(dist.join("wallet-generator.css"), "body { color: #222; }").unwrap();
        fs::write(dist.join("wallet-generator.png"), [0x89, b'P', b'N', b'G']).unwrap();
        (root, dist)
    }

    #[test]
    fn test_vite_bundle_is_inlined() {
        let (_root, dist) = vite_project();
        let outcome = inline_bundle(Bundler::Vite, &dist).unwrap();
        let InlineOutcome::Inlined(report) = outcome else {
            panic!("expected an inlined bundle");
        };

        let html = fs::read_to_string(dist.join("index.html")).unwrap();
        assert!(!html.contains("src=\"/wallet-generator.js\""));
        assert!(html.contains("<script>\nconst t=\"data:image/png;base64,iVBORw==\""));
        assert!(html.contains(r"<\/script>"));
        assert!(!html.contains("fonts.googleapis.com"));
        assert!(!html.contains("rel=\"stylesheet\""));
        assert!(html.contains(r#"font-family: "Courier New", monospace;"#));
        assert!(html.contains("<style>\nbody { color: #222; }\n</style>"));
        assert!(html.contains(rewrite::OFFLINE_CSP));

        assert!(report.flags.script && report.flags.stylesheet && report.flags.csp);
        assert_eq!(report.flags.image_references, 1);
        assert_eq!(report.bytes, html.len());
        assert_eq!(report.sha256, hex::encode(Sha256::digest(html.as_bytes())));
        assert_eq!(report.removed.len(), 3);

        let mut left: Vec<_> = fs::read_dir(&dist)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left, vec!["index.html".to_string()]);
    }

    #[test]
    fn test_stylesheet_assets_are_removed() {
        let (_root, dist) = vite_project();
        fs::write(
            dist.join("wallet-generator.css"),
            "@font-face{font-family:Mono;src:url(/asset.woff2)} body{background:url(../outside.png)}",
        )
        .unwrap();
        fs::write(dist.join("asset.woff2"), [7u8, 7, 7]).unwrap();
        fs::write(dist.parent().unwrap().join("outside.png"), [1u8]).unwrap();

        let InlineOutcome::Inlined(report) = inline_bundle(Bundler::Vite, &dist).unwrap() else {
            panic!("expected an inlined bundle");
        };
        let html = fs::read_to_string(dist.join("index.html")).unwrap();

        assert_eq!(report.flags.stylesheet_assets, 2);
        assert!(html.contains("data:font/woff2;base64,BwcH"));
        assert!(report.removed.contains(&dist.join("asset.woff2")));
        assert!(!dist.join("asset.woff2").exists());
        assert!(dist.parent().unwrap().join("outside.png").exists());
    }

    #[test]
    fn test_rerun_with_self_naming_script() {
        let (_root, dist) = vite_project();
        fs::write(
            dist.join("wallet-generator.js"),
            "console.log('wallet-generator.js loaded');",
        )
        .unwrap();

        inline_bundle(Bundler::Vite, &dist).unwrap();
        let first = fs::read(dist.join("index.html")).unwrap();
        assert!(String::from_utf8_lossy(&first).contains("wallet-generator.js loaded"));

        let outcome = inline_bundle(Bundler::Vite, &dist).unwrap();
        assert!(matches!(outcome, InlineOutcome::AlreadyInlined { .. }));
        assert_eq!(fs::read(dist.join("index.html")).unwrap(), first);
    }

    #[test]
    fn test_second_run_is_noop() {
        let (_root, dist) = vite_project();
        inline_bundle(Bundler::Vite, &dist).unwrap();
        let first = fs::read(dist.join("index.html")).unwrap();

        let outcome = inline_bundle(Bundler::Vite, &dist).unwrap();
        assert!(matches!(outcome, InlineOutcome::AlreadyInlined { .. }));
        assert_eq!(fs::read(dist.join("index.html")).unwrap(), first);
    }

    #[test]
    fn test_project_image_is_kept() {
        let (root, dist) = vite_project();
        fs::remove_file(dist.join("wallet-generator.png")).unwrap();
        let images = root.path().join("src/images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("blank wallet image.png"), [1u8, 2, 3]).unwrap();

        let InlineOutcome::Inlined(report) = inline_bundle(Bundler::Vite, &dist).unwrap() else {
            panic!("expected an inlined bundle");
        };
        assert_eq!(report.flags.image, Some(images.join("blank wallet image.png")));
        assert!(images.join("blank wallet image.png").exists());
    }

    #[test]
    fn test_missing_html() {
        let dir = tempfile::tempdir().unwrap();
        let err = inline_bundle(Bundler::Vite, dir.path()).unwrap_err();
        assert!(matches!(err, PaperWalletError::MissingInput { ref path } if path.ends_with("index.html")));
    }

    #[test]
    fn test_missing_referenced_script_leaves_html() {
        let (_root, dist) = vite_project();
        fs::remove_file(dist.join("wallet-generator.js")).unwrap();

        let err = inline_bundle(Bundler::Vite, &dist).unwrap_err();
        assert!(matches!(err, PaperWalletError::MissingInput { ref path } if path.ends_with("wallet-generator.js")));
        assert_eq!(fs::read_to_string(dist.join("index.html")).unwrap(), VITE_HTML);
    }

    #[test]
    fn test_unreplaceable_script_tag_writes_nothing() {
        let (_root, dist) = vite_project();
        let html = "<html><head></head><body>wallet-generator.js</body></html>";
        fs::write(dist.join("index.html"), html).unwrap();

        assert!(matches!(
            inline_bundle(Bundler::Vite, &dist),
            Err(PaperWalletError::Inline(_))
        ));
        assert_eq!(fs::read_to_string(dist.join("index.html")).unwrap(), html);
        assert!(dist.join("wallet-generator.js").exists());
    }

    #[test]
    fn test_webpack_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path();
        fs::write(
            dist.join("index.html"),
            r#"<html><head><link href="main.css" rel="stylesheet"></head><body><script defer src="bundle.js"></script></body></html>"#,
        )
        .unwrap();
        fs::write(dist.join("bundle.js"), "run();\n//# sourceMappingURL=bundle.js.map\n").unwrap();
        fs::write(dist.join("main.css"), "h1 { font-family: Asset; }").unwrap();

        let InlineOutcome::Inlined(report) = inline_bundle(Bundler::Webpack, dist).unwrap() else {
            panic!("expected an inlined bundle");
        };
        let html = fs::read_to_string(dist.join("index.html")).unwrap();

        assert!(html.contains("<script>\nrun();\n\n</script>"));
        assert!(!html.contains("sourceMappingURL"));
        assert!(html.contains(r#"<style>
h1 { font-family: "Courier New", monospace; }
</style>"#));
        assert!(!html.contains("Content-Security-Policy"));
        assert!(!report.flags.csp);
        assert!(!dist.join("bundle.js").exists());
        assert!(!dist.join("main.css").exists());
    }

    #[test]
    fn test_bundler_from_str() {
        assert_eq!("vite".parse::<Bundler>().unwrap(), Bundler::Vite);
        assert_eq!("Webpack".parse::<Bundler>().unwrap(), Bundler::Webpack);
        assert!("rollup".parse::<Bundler>().is_err());
    }
}
