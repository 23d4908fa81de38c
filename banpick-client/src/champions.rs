// Static champion metadata, fetched from the data CDN and keyed by
// game-client version. The core only depends on the set of valid champion
// identifiers; the rest of the document rides along for display layers.

use std::collections::HashMap;

use serde::Deserialize;

use crate::api::ApiError;

pub const CDN_BASE_URL: &str = "https://ddragon.leagueoflegends.com";

/// Metadata languages the backend rooms are known to use.
pub const LANGUAGES: [&str; 4] = ["ko_KR", "en_US", "ja_JP", "zh_CN"];

/// The champion document as served by the CDN.
#[derive(Debug, Clone, Deserialize)]
pub struct ChampionDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub version: String,
    pub data: HashMap<String, ChampionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChampionEntry {
    pub id: String,
    pub key: String,
    pub name: String,
    pub title: String,
    pub image: ChampionImage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChampionImage {
    pub full: String,
}

/// Champion catalog: the valid-identifier set plus a name-sorted listing.
#[derive(Debug, Clone)]
pub struct ChampionCatalog {
    version: String,
    entries: Vec<ChampionEntry>,
}

impl ChampionCatalog {
    pub fn from_document(doc: ChampionDocument) -> Self {
        let mut entries: Vec<ChampionEntry> = doc.data.into_values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        ChampionCatalog {
            version: doc.version,
            entries,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` names a champion in this catalog.
    pub fn is_valid(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Entries sorted by display name.
    pub fn entries(&self) -> &[ChampionEntry] {
        &self.entries
    }
}

/// The CDN document URL for a version/language pair.
pub fn document_url(version: &str, language: &str) -> String {
    format!("{CDN_BASE_URL}/cdn/{version}/data/{language}/champion.json")
}

/// Fetch and index the champion document for `version` in `language`.
pub async fn fetch(
    http: &reqwest::Client,
    version: &str,
    language: &str,
) -> Result<ChampionCatalog, ApiError> {
    let url = document_url(version, language);
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|source| ApiError::Http {
            url: url.clone(),
            source,
        })?;
    if !response.status().is_success() {
        return Err(ApiError::Status {
            url,
            status: response.status(),
        });
    }
    let doc: ChampionDocument = response.json().await.map_err(|source| ApiError::Http {
        url: url.clone(),
        source,
    })?;
    Ok(ChampionCatalog::from_document(doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> ChampionDocument {
        let raw = r#"{
            "type": "champion",
            "format": "standAloneComplex",
            "version": "14.1.1",
            "data": {
                "Zed": {
                    "id": "Zed", "key": "238", "name": "Zed",
                    "title": "the Master of Shadows",
                    "image": { "full": "Zed.png" }
                },
                "Aatrox": {
                    "id": "Aatrox", "key": "266", "name": "Aatrox",
                    "title": "the Darkin Blade",
                    "image": { "full": "Aatrox.png" }
                },
                "Ahri": {
                    "id": "Ahri", "key": "103", "name": "Ahri",
                    "title": "the Nine-Tailed Fox",
                    "image": { "full": "Ahri.png" }
                }
            }
        }"#;
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn catalog_sorts_entries_by_name() {
        let catalog = ChampionCatalog::from_document(sample_document());
        let names: Vec<&str> = catalog.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Aatrox", "Ahri", "Zed"]);
        assert_eq!(catalog.version(), "14.1.1");
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn validity_checks_use_exact_ids() {
        let catalog = ChampionCatalog::from_document(sample_document());
        assert!(catalog.is_valid("Ahri"));
        assert!(!catalog.is_valid("ahri"));
        assert!(!catalog.is_valid("Teemo"));
    }

    #[test]
    fn document_url_is_keyed_by_version_and_language() {
        assert_eq!(
            document_url("14.1.1", "ko_KR"),
            "https://ddragon.leagueoflegends.com/cdn/14.1.1/data/ko_KR/champion.json"
        );
    }
}
