//! Where downloaded assets live on disk and how the pages refer to them.
//!
//! Every asset has two names: a file below the public directory
//! (`public/assets/heroes/luxus-minimalist.jpg`) and the web path the
//! manifest stores for the page templates (`/assets/heroes/luxus-minimalist.jpg`).

use crate::error::{Error, Result};
use crate::types::{AssetRef, Manifest};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory below the public directory that holds all materialized assets
pub const ASSET_DIR: &str = "assets";
pub const HERO_DIR: &str = "heroes";
pub const PORTFOLIO_DIR: &str = "portfolio";

/// Hero images and videos always land under fixed extensions
pub const HERO_IMAGE_EXT: &str = ".jpg";
pub const HERO_VIDEO_EXT: &str = ".mp4";

/// Convert a camelCase key to kebab-case: `dataRoiDriven` -> `data-roi-driven`
pub fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Extension (with leading dot) of the last segment of the URL path.
///
/// Query strings and fragments are ignored.
///
/// ```text
/// derive_extension("https://host/path/img-42.jpg?x=1")  → Ok(".jpg")
/// derive_extension("https://host/noext")                → Err(MalformedAssetUrl)
/// derive_extension("https://host/dir/")                 → Err(MalformedAssetUrl)
/// ```
pub fn derive_extension(url: &str) -> Result<String> {
    let malformed = || Error::MalformedAssetUrl {
        url: url.to_string(),
    };

    let parsed = Url::parse(url).map_err(|_| malformed())?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .ok_or_else(malformed)?;

    match segment.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < segment.len() => Ok(segment[dot..].to_string()),
        _ => Err(malformed()),
    }
}

/// Portfolio ids become filename stems, so they must be a single plain segment
pub fn validate_portfolio_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidManifest("Empty portfolio id".to_string()));
    }
    if id == "." || id == ".." || id.contains('/') || id.contains('\\') {
        return Err(Error::InvalidManifest(format!(
            "Portfolio id '{}' must be a single path segment",
            id
        )));
    }
    Ok(())
}

/// Reject manifests whose portfolio ids would collide or escape the asset directory
pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    let mut seen = HashSet::new();
    for item in &manifest.portfolio {
        validate_portfolio_id(&item.id)?;
        if !seen.insert(item.id.as_str()) {
            return Err(Error::InvalidManifest(format!(
                "Duplicate portfolio id '{}'",
                item.id
            )));
        }
    }
    Ok(())
}

/// Destination of one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTarget {
    pub file: PathBuf,
    pub web_path: String,
}

/// Maps manifest fields to their local files and web paths
#[derive(Debug, Clone)]
pub struct AssetLayout {
    public_dir: PathBuf,
}

impl AssetLayout {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// `<public_dir>/assets`
    pub fn asset_root(&self) -> PathBuf {
        self.public_dir.join(ASSET_DIR)
    }

    /// Resolve the destination for one manifest field.
    ///
    /// Portfolio entries take their extension from the source URL, so
    /// this fails with `MalformedAssetUrl` when the URL has none.
    pub fn target(&self, manifest: &Manifest, asset: &AssetRef) -> Result<AssetTarget> {
        let (dir, file_name) = match asset {
            AssetRef::HeroImage(v) => (HERO_DIR, format!("{}{}", v.slug(), HERO_IMAGE_EXT)),
            AssetRef::HeroVideo(v) => (HERO_DIR, format!("{}{}", v.slug(), HERO_VIDEO_EXT)),
            AssetRef::Portfolio(i) => {
                let item = manifest.portfolio.get(*i).ok_or_else(|| {
                    Error::InvalidManifest(format!("No portfolio entry at index {}", i))
                })?;
                validate_portfolio_id(&item.id)?;
                let ext = derive_extension(&item.image)?;
                (PORTFOLIO_DIR, format!("{}{}", item.id, ext))
            }
        };

        Ok(AssetTarget {
            file: self.asset_root().join(dir).join(&file_name),
            web_path: format!("/{}/{}/{}", ASSET_DIR, dir, file_name),
        })
    }

    /// File on disk that a web path stored in the manifest refers to.
    ///
    /// Returns `None` for paths outside the asset root or containing `..`.
    pub fn resolve_web_path(&self, web_path: &str) -> Option<PathBuf> {
        let relative = web_path.strip_prefix('/')?;
        let mut parts = relative.split('/');
        if parts.next() != Some(ASSET_DIR) {
            return None;
        }
        let mut file = self.asset_root();
        for part in parts {
            if part.is_empty() || part == "." || part == ".." {
                return None;
            }
            file.push(part);
        }
        Some(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HeroVariant;

    fn manifest_with_portfolio(items: &[(&str, &str)]) -> Manifest {
        let portfolio: Vec<serde_json::Value> = items
            .iter()
            .map(|(id, image)| {
                serde_json::json!({"id": id, "title": "T", "location": "1010 Wien", "image": image})
            })
            .collect();
        let hero = serde_json::json!({"image": "https://x/h.jpg", "video": "https://x/h.mp4"});
        serde_json::from_value(serde_json::json!({
            "heroes": {
                "luxusMinimalist": hero,
                "cinematicStorytelling": hero,
                "dataRoiDriven": hero,
                "editorialMagazine": hero
            },
            "portfolio": portfolio
        }))
        .unwrap()
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("luxusMinimalist"), "luxus-minimalist");
        assert_eq!(kebab_case("dataRoiDriven"), "data-roi-driven");
        assert_eq!(kebab_case("plain"), "plain");
    }

    #[test]
    fn test_derive_extension() {
        assert_eq!(
            derive_extension("https://host/path/img-42.jpg?x=1").unwrap(),
            ".jpg"
        );
        assert_eq!(
            derive_extension("https://tempfile.aiquickdraw.com/s/abc.png#frag").unwrap(),
            ".png"
        );
        assert_eq!(
            derive_extension("https://host/archive.tar.gz").unwrap(),
            ".gz"
        );
    }

    #[test]
    fn test_derive_extension_rejects_missing() {
        for url in [
            "https://host/noext",
            "https://host/dir/",
            "https://host/file.",
            "https://host/.hidden",
            "https://host",
            "not a url",
        ] {
            match derive_extension(url) {
                Err(Error::MalformedAssetUrl { url: reported }) => assert_eq!(reported, url),
                other => panic!("expected MalformedAssetUrl for {}, got {:?}", url, other),
            }
        }
    }

    #[test]
    fn test_extension_ignores_dots_in_query() {
        assert!(derive_extension("https://host/noext?file=a.jpg").is_err());
    }

    #[test]
    fn test_hero_targets() {
        let layout = AssetLayout::new("public");
        let manifest = manifest_with_portfolio(&[]);

        let image = layout
            .target(&manifest, &AssetRef::HeroImage(HeroVariant::LuxusMinimalist))
            .unwrap();
        assert_eq!(
            image.file,
            PathBuf::from("public/assets/heroes/luxus-minimalist.jpg")
        );
        assert_eq!(image.web_path, "/assets/heroes/luxus-minimalist.jpg");

        let video = layout
            .target(&manifest, &AssetRef::HeroVideo(HeroVariant::EditorialMagazine))
            .unwrap();
        assert_eq!(video.web_path, "/assets/heroes/editorial-magazine.mp4");
    }

    #[test]
    fn test_portfolio_target_uses_source_extension() {
        let layout = AssetLayout::new("public");
        let manifest = manifest_with_portfolio(&[("p1", "https://x/p1.png?sig=abc")]);

        let target = layout.target(&manifest, &AssetRef::Portfolio(0)).unwrap();
        assert_eq!(target.file, PathBuf::from("public/assets/portfolio/p1.png"));
        assert_eq!(target.web_path, "/assets/portfolio/p1.png");
    }

    #[test]
    fn test_portfolio_target_rejects_unsafe_id() {
        let layout = AssetLayout::new("public");
        let manifest = manifest_with_portfolio(&[("../etc", "https://x/p.jpg")]);
        let result = layout.target(&manifest, &AssetRef::Portfolio(0));
        assert!(matches!(result, Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_validate_manifest_duplicate_ids() {
        let manifest =
            manifest_with_portfolio(&[("p1", "https://x/a.jpg"), ("p1", "https://x/b.jpg")]);
        let err = validate_manifest(&manifest).unwrap_err();
        assert!(err.to_string().contains("Duplicate portfolio id 'p1'"));
    }

    #[test]
    fn test_resolve_web_path() {
        let layout = AssetLayout::new("/srv/site/public");
        assert_eq!(
            layout.resolve_web_path("/assets/portfolio/p1.png"),
            Some(PathBuf::from("/srv/site/public/assets/portfolio/p1.png"))
        );
        assert_eq!(layout.resolve_web_path("/assets/../secret"), None);
        assert_eq!(layout.resolve_web_path("/images/a.jpg"), None);
        assert_eq!(layout.resolve_web_path("assets/a.jpg"), None);
    }
}
