//! Whois Service - resolve a free-text name to a character

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::application::ports::outbound::{ImageKind, ImageResolverPort};
use crate::application::services::artwork::resolve_or_placeholder;
use crate::application::services::GameDataService;
use crate::domain::entities::Character;

#[derive(Debug, Clone, Serialize)]
pub struct WhoisResult {
    pub character: Character,
    /// `false` for an exact alias hit, `true` for a fuzzy guess
    pub is_guess: bool,
    /// Similarity in percent
    pub score: u8,
    /// The alias that matched, normalized
    pub matched: String,
    pub profile: Option<BTreeMap<String, String>>,
}

pub struct WhoisService {
    data: Arc<GameDataService>,
    images: Arc<dyn ImageResolverPort>,
}

impl WhoisService {
    pub fn new(data: Arc<GameDataService>, images: Arc<dyn ImageResolverPort>) -> Self {
        Self { data, images }
    }

    pub async fn whois(&self, name: &str) -> WhoisResult {
        let data = self.data.snapshot().await;
        let roster = &data.roster;

        let (id, is_guess, score, matched) = match roster.id_of(name) {
            Some(id) => (id.clone(), false, 100, name.to_string()),
            None => {
                let m = roster.match_name(name);
                (m.id, true, m.score, m.name)
            }
        };
        debug!(query = %name, chara_id = %id, score, is_guess, "Whois lookup");

        let mut character = roster.character(&id, 3);
        if !id.is_unknown() {
            character.icon =
                Some(resolve_or_placeholder(self.images.as_ref(), ImageKind::Icon, &id, 3).await);
        }

        WhoisResult {
            character,
            is_guess,
            score,
            matched,
            profile: roster.profile(&id).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::MockImageResolverPort;
    use crate::application::test_support::{sample_data, StaticImageResolver};
    use crate::domain::value_objects::CharaId;

    fn service(images: Arc<dyn ImageResolverPort>) -> WhoisService {
        let data = Arc::new(GameDataService::new(sample_data()));
        WhoisService::new(data, images)
    }

    #[tokio::test]
    async fn test_exact_alias_hit() {
        let whois = service(Arc::new(StaticImageResolver::new(8)));
        let result = whois.whois("小仓唯").await;
        assert_eq!(result.character.id, CharaId::from("1018"));
        assert_eq!(result.character.name, "镜华");
        assert!(!result.is_guess);
        assert_eq!(result.score, 100);
        assert!(result.character.has_icon());
        assert!(result.profile.is_some());
    }

    #[tokio::test]
    async fn test_fuzzy_guess() {
        let whois = service(Arc::new(StaticImageResolver::new(8)));
        let result = whois.whois("pecorinne").await;
        assert_eq!(result.character.id, CharaId::from("1060"));
        assert!(result.is_guess);
        assert!(result.score >= 60 && result.score < 100);
    }

    #[tokio::test]
    async fn test_unknown_character_skips_artwork() {
        let mut images = MockImageResolverPort::new();
        images.expect_resolve().never();
        let whois = service(Arc::new(images));

        let result = whois.whois("未知角色").await;
        assert!(result.character.id.is_unknown());
        assert!(!result.character.has_icon());
    }
}
