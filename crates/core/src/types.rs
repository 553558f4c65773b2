use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Complete asset manifest consumed by the page templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_at: Option<String>,
    pub heroes: Heroes,
    pub portfolio: Vec<PortfolioItem>,
    /// Top-level fields this tool does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Hero assets, one pair per homepage design variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heroes {
    pub luxus_minimalist: HeroAsset,
    pub cinematic_storytelling: HeroAsset,
    pub data_roi_driven: HeroAsset,
    pub editorial_magazine: HeroAsset,
}

impl Heroes {
    pub fn get(&self, variant: HeroVariant) -> &HeroAsset {
        match variant {
            HeroVariant::LuxusMinimalist => &self.luxus_minimalist,
            HeroVariant::CinematicStorytelling => &self.cinematic_storytelling,
            HeroVariant::DataRoiDriven => &self.data_roi_driven,
            HeroVariant::EditorialMagazine => &self.editorial_magazine,
        }
    }

    pub fn get_mut(&mut self, variant: HeroVariant) -> &mut HeroAsset {
        match variant {
            HeroVariant::LuxusMinimalist => &mut self.luxus_minimalist,
            HeroVariant::CinematicStorytelling => &mut self.cinematic_storytelling,
            HeroVariant::DataRoiDriven => &mut self.data_roi_driven,
            HeroVariant::EditorialMagazine => &mut self.editorial_magazine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroAsset {
    pub image: String,
    pub video: String,
}

/// Single property in the portfolio gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioItem {
    /// Unique; doubles as the local filename stem
    pub id: String,
    pub title: String,
    pub location: String,
    pub image: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The four homepage design variants, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeroVariant {
    LuxusMinimalist,
    CinematicStorytelling,
    DataRoiDriven,
    EditorialMagazine,
}

impl HeroVariant {
    pub const ALL: [HeroVariant; 4] = [
        HeroVariant::LuxusMinimalist,
        HeroVariant::CinematicStorytelling,
        HeroVariant::DataRoiDriven,
        HeroVariant::EditorialMagazine,
    ];

    /// Key as it appears in the manifest JSON
    pub fn key(self) -> &'static str {
        match self {
            HeroVariant::LuxusMinimalist => "luxusMinimalist",
            HeroVariant::CinematicStorytelling => "cinematicStorytelling",
            HeroVariant::DataRoiDriven => "dataRoiDriven",
            HeroVariant::EditorialMagazine => "editorialMagazine",
        }
    }

    /// Filename stem, e.g. `luxus-minimalist`
    pub fn slug(self) -> String {
        crate::layout::kebab_case(self.key())
    }
}

/// Which field of the manifest an asset lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    HeroImage(HeroVariant),
    HeroVideo(HeroVariant),
    /// Index into `Manifest::portfolio`
    Portfolio(usize),
}

impl AssetRef {
    /// Human-readable field path, e.g. `heroes.luxusMinimalist.video`
    pub fn describe(&self, manifest: &Manifest) -> String {
        match self {
            AssetRef::HeroImage(v) => format!("heroes.{}.image", v.key()),
            AssetRef::HeroVideo(v) => format!("heroes.{}.video", v.key()),
            AssetRef::Portfolio(i) => match manifest.portfolio.get(*i) {
                Some(item) => format!("portfolio[{}] ({})", i, item.id),
                None => format!("portfolio[{}]", i),
            },
        }
    }
}

/// Whether the manifest still references remote URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestState {
    Remote,
    Local,
    Mixed { remote: usize, local: usize },
}

impl Manifest {
    /// Every asset field in processing order: heroes (image, video per
    /// variant), then portfolio in array order.
    pub fn asset_refs(&self) -> Vec<AssetRef> {
        let mut refs = Vec::with_capacity(HeroVariant::ALL.len() * 2 + self.portfolio.len());
        for variant in HeroVariant::ALL {
            refs.push(AssetRef::HeroImage(variant));
            refs.push(AssetRef::HeroVideo(variant));
        }
        refs.extend((0..self.portfolio.len()).map(AssetRef::Portfolio));
        refs
    }

    pub fn field(&self, asset: &AssetRef) -> Option<&str> {
        match asset {
            AssetRef::HeroImage(v) => Some(&self.heroes.get(*v).image),
            AssetRef::HeroVideo(v) => Some(&self.heroes.get(*v).video),
            AssetRef::Portfolio(i) => self.portfolio.get(*i).map(|p| p.image.as_str()),
        }
    }

    pub fn set_field(&mut self, asset: &AssetRef, value: String) {
        match asset {
            AssetRef::HeroImage(v) => self.heroes.get_mut(*v).image = value,
            AssetRef::HeroVideo(v) => self.heroes.get_mut(*v).video = value,
            AssetRef::Portfolio(i) => {
                if let Some(item) = self.portfolio.get_mut(*i) {
                    item.image = value;
                }
            }
        }
    }

    pub fn state(&self) -> ManifestState {
        let (remote, local) = self
            .asset_refs()
            .iter()
            .filter_map(|r| self.field(r))
            .fold((0, 0), |(remote, local), value| {
                if is_remote(value) {
                    (remote + 1, local)
                } else {
                    (remote, local + 1)
                }
            });

        match (remote, local) {
            (_, 0) => ManifestState::Remote,
            (0, _) => ManifestState::Local,
            (remote, local) => ManifestState::Mixed { remote, local },
        }
    }
}

/// True for `http://` and `https://` URLs (case-insensitive scheme)
pub fn is_remote(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        serde_json::from_str(
            r#"{
              "generated_at": "2025-01-10T09:00:00.000Z",
              "heroes": {
                "luxusMinimalist": {"image": "https://x/a.jpg", "video": "https://x/a.mp4"},
                "cinematicStorytelling": {"image": "https://x/b.jpg", "video": "https://x/b.mp4"},
                "dataRoiDriven": {"image": "https://x/c.jpg", "video": "https://x/c.mp4"},
                "editorialMagazine": {"image": "https://x/d.jpg", "video": "https://x/d.mp4"}
              },
              "portfolio": [
                {"id": "villa-hietzing", "title": "Villa Hietzing", "location": "1130 Wien", "image": "https://x/v.png"}
              ],
              "generator": "kie"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_asset_refs_order() {
        let manifest = sample();
        let refs = manifest.asset_refs();
        assert_eq!(refs.len(), 9);
        assert_eq!(refs[0], AssetRef::HeroImage(HeroVariant::LuxusMinimalist));
        assert_eq!(refs[1], AssetRef::HeroVideo(HeroVariant::LuxusMinimalist));
        assert_eq!(refs[6], AssetRef::HeroImage(HeroVariant::EditorialMagazine));
        assert_eq!(refs[8], AssetRef::Portfolio(0));
    }

    #[test]
    fn test_state_transitions() {
        let mut manifest = sample();
        assert_eq!(manifest.state(), ManifestState::Remote);

        manifest.set_field(
            &AssetRef::HeroImage(HeroVariant::DataRoiDriven),
            "/assets/heroes/data-roi-driven.jpg".into(),
        );
        assert_eq!(
            manifest.state(),
            ManifestState::Mixed { remote: 8, local: 1 }
        );

        for r in manifest.asset_refs() {
            manifest.set_field(&r, "/assets/x".into());
        }
        assert_eq!(manifest.state(), ManifestState::Local);
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let manifest = sample();
        assert_eq!(manifest.extra.get("generator"), Some(&Value::from("kie")));

        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"generator\":\"kie\""));
        assert!(json.contains("\"luxusMinimalist\""));
        assert!(!json.contains("downloaded_at"));
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://tempfile.aiquickdraw.com/a.jpg"));
        assert!(is_remote("HTTP://host/a.jpg"));
        assert!(!is_remote("/assets/heroes/a.jpg"));
        assert!(!is_remote("assets/a.jpg"));
    }

    #[test]
    fn test_describe() {
        let manifest = sample();
        assert_eq!(
            AssetRef::HeroVideo(HeroVariant::CinematicStorytelling).describe(&manifest),
            "heroes.cinematicStorytelling.video"
        );
        assert_eq!(
            AssetRef::Portfolio(0).describe(&manifest),
            "portfolio[0] (villa-hietzing)"
        );
    }

    #[test]
    fn test_variant_slugs() {
        let slugs: Vec<String> = HeroVariant::ALL.iter().map(|v| v.slug()).collect();
        assert_eq!(
            slugs,
            vec![
                "luxus-minimalist",
                "cinematic-storytelling",
                "data-roi-driven",
                "editorial-magazine"
            ]
        );
    }
}
